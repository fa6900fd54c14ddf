// Numeric mode: whether TEV arithmetic runs on integers or floats.
//
// Float mode approximates the 8-bit fixed-point math with trunc/round and
// fractional wraparound. Integer mode uses int4 registers, shifts and masks.
// Texture coordinates stay in floats in both modes.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericMode {
    #[default]
    Float,
    Integer,
}

impl NumericMode {
    pub fn is_integer(self) -> bool {
        self == NumericMode::Integer
    }

    pub fn scalar(self) -> &'static str {
        match self {
            NumericMode::Float => "float",
            NumericMode::Integer => "int",
        }
    }

    pub fn vec2(self) -> &'static str {
        match self {
            NumericMode::Float => "float2",
            NumericMode::Integer => "int2",
        }
    }

    pub fn vec3(self) -> &'static str {
        match self {
            NumericMode::Float => "float3",
            NumericMode::Integer => "int3",
        }
    }

    pub fn vec4(self) -> &'static str {
        match self {
            NumericMode::Float => "float4",
            NumericMode::Integer => "int4",
        }
    }

    /// Integer literal in this mode's syntax.
    pub fn lit(self, value: i32) -> Lit {
        Lit { value, mode: self }
    }

    /// `value` broadcast over `n` components, comma separated.
    pub fn splat(self, value: i32, n: usize) -> Splat {
        Splat { lit: self.lit(value), n }
    }

    /// Shared helpers: the u8 wraparound and the coordinate shifts.
    pub fn write_helpers(self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self {
            NumericMode::Float => {
                out.write_str(
                    "float4 CHK_O_U8(float4 x)\n{\n\treturn frac(((x) + 1024.0) * (1.0/256.0)) * 256.0;\n}\n\n",
                )?;
            }
            NumericMode::Integer => {
                out.write_str("int4 CHK_O_U8(int4 x)\n{\n\treturn x & 255;\n}\n\n")?;
            }
        }
        // Arithmetic shifts on the float coordinate path. Negative values
        // round toward minus infinity like the hardware's shifter.
        out.write_str(concat!(
            "float2 BSH(float2 x, float2 n)\n{\n",
            "\tfloat2 z = exp2(n);\n",
            "\tfloat2 y = (1.0 / z) - 1.0;\n",
            "\tx.x = (x.x - ((z.x < 1.0 && x.x < 0.0) ? y.x : 0.0)) * z.x;\n",
            "\tx.y = (x.y - ((z.y < 1.0 && x.y < 0.0) ? y.y : 0.0)) * z.y;\n",
            "\treturn trunc(x);\n}\n\n",
            "float2 BSHR(float2 x, float2 y, float2 z)\n{\n",
            "\tx.x = (x.x - ((x.x < 0.0) ? y.x : 0.0)) * z.x;\n",
            "\tx.y = (x.y - ((x.y < 0.0) ? y.y : 0.0)) * z.y;\n",
            "\treturn trunc(x);\n}\n\n",
        ))?;
        // y must be positive.
        out.write_str("float fastmod(float x, float y)\n{\n\ty = sign(x) * y;\n\treturn frac(x / y) * y;\n}\n\n")?;
        Ok(())
    }
}

impl fmt::Display for NumericMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NumericMode::Float => "float",
            NumericMode::Integer => "integer",
        })
    }
}

/// A literal rendered as `255.0` in float mode and `255` in integer mode.
#[derive(Debug, Clone, Copy)]
pub struct Lit {
    value: i32,
    mode: NumericMode,
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            NumericMode::Float => write!(f, "{}.0", self.value),
            NumericMode::Integer => write!(f, "{}", self.value),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Splat {
    lit: Lit,
    n: usize,
}

impl fmt::Display for Splat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.n {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", self.lit)?;
        }
        Ok(())
    }
}
