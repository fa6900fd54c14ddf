// Indirect texturing registers (TEV_IND and RAS1_IREF).
//
// An indirect stage samples one texture and uses the result to perturb
// the coordinates of a regular TEV stage's lookup.

use serde::{Deserialize, Serialize};

/// Bit width of the offsets stored in the indirect texture.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum IndTexFormat {
    #[default]
    Bits8 = 0,
    Bits5 = 1,
    Bits4 = 2,
    Bits3 = 3,
}

impl IndTexFormat {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            0 => IndTexFormat::Bits8,
            1 => IndTexFormat::Bits5,
            2 => IndTexFormat::Bits4,
            _ => IndTexFormat::Bits3,
        }
    }

    /// Mask selecting the offset bits.
    pub fn offset_mask(self) -> u8 {
        match self {
            IndTexFormat::Bits8 => 0xFF,
            IndTexFormat::Bits5 => 0x1F,
            IndTexFormat::Bits4 => 0x0F,
            IndTexFormat::Bits3 => 0x07,
        }
    }

    /// Mask selecting the bits left over for the bump alpha.
    ///
    /// When all eight bits are offsets the top five are reused.
    pub fn bump_alpha_mask(self) -> u8 {
        match self {
            IndTexFormat::Bits8 => 0xF8,
            IndTexFormat::Bits5 => 0xE0,
            IndTexFormat::Bits4 => 0xF0,
            IndTexFormat::Bits3 => 0xF8,
        }
    }

    /// Bias added to each biased axis: -128 for signed 8-bit, +1 otherwise.
    pub fn bias_value(self) -> i32 {
        match self {
            IndTexFormat::Bits8 => -128,
            _ => 1,
        }
    }
}

/// Axes of the indirect offset that receive the format bias.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum IndTexBias {
    #[default]
    None = 0,
    S = 1,
    T = 2,
    St = 3,
    U = 4,
    Su = 5,
    Tu = 6,
    Stu = 7,
}

impl IndTexBias {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x7 {
            0 => IndTexBias::None,
            1 => IndTexBias::S,
            2 => IndTexBias::T,
            3 => IndTexBias::St,
            4 => IndTexBias::U,
            5 => IndTexBias::Su,
            6 => IndTexBias::Tu,
            _ => IndTexBias::Stu,
        }
    }

    /// Swizzle naming the biased components.
    pub fn swizzle(self) -> &'static str {
        ["", "x", "y", "xy", "z", "xz", "yz", "xyz"][self as usize]
    }
}

/// Component of the indirect sample used as bump alpha.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum IndTexAlphaSel {
    #[default]
    Off = 0,
    S = 1,
    T = 2,
    U = 3,
}

impl IndTexAlphaSel {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            0 => IndTexAlphaSel::Off,
            1 => IndTexAlphaSel::S,
            2 => IndTexAlphaSel::T,
            _ => IndTexAlphaSel::U,
        }
    }
}

/// Offset matrix selection (4-bit `mid` field).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndMatrix {
    /// No offset; also what the reserved codes 4, 8, 12..15 do.
    #[default]
    Off,
    /// 2x3 matrix `n` (0..2) from the indirect matrix registers.
    Regular(u8),
    /// Offset s-component times the texcoord, scale from matrix `n`.
    S(u8),
    /// Offset t-component times the texcoord, scale from matrix `n`.
    T(u8),
}

impl IndMatrix {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0xF {
            m @ 1..=3 => IndMatrix::Regular(m - 1),
            m @ 5..=7 => IndMatrix::S(m - 5),
            m @ 9..=11 => IndMatrix::T(m - 9),
            _ => IndMatrix::Off,
        }
    }

    pub fn to_raw(self) -> u8 {
        match self {
            IndMatrix::Off => 0,
            IndMatrix::Regular(n) => 1 + (n % 3),
            IndMatrix::S(n) => 5 + (n % 3),
            IndMatrix::T(n) => 9 + (n % 3),
        }
    }
}

/// Coordinate wrap applied before adding the indirect offset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum IndWrap {
    #[default]
    Off = 0,
    Wrap256 = 1,
    Wrap128 = 2,
    Wrap64 = 3,
    Wrap32 = 4,
    Wrap16 = 5,
    /// Coordinate replaced by zero. Reserved code 7 behaves the same.
    Zero = 6,
}

impl IndWrap {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x7 {
            0 => IndWrap::Off,
            1 => IndWrap::Wrap256,
            2 => IndWrap::Wrap128,
            3 => IndWrap::Wrap64,
            4 => IndWrap::Wrap32,
            5 => IndWrap::Wrap16,
            _ => IndWrap::Zero,
        }
    }

    /// Wrap period in 128-per-texel fixed units, as the hardware tabulates it.
    pub fn period(self) -> u32 {
        const PERIODS: [u32; 7] = [0, 256 * 128, 128 * 128, 64 * 128, 32 * 128, 16 * 128, 1];
        PERIODS[self as usize]
    }
}

/// Indirect configuration of one TEV stage (TEV_IND).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndirectStage {
    /// Indirect stage (0..3) providing the offset.
    pub ind_stage: u8,
    pub format: IndTexFormat,
    pub bias: IndTexBias,
    pub alpha_sel: IndTexAlphaSel,
    pub matrix: IndMatrix,
    pub wrap_s: IndWrap,
    pub wrap_t: IndWrap,
    /// Add the result to the previous stage's coordinate.
    pub add_prev: bool,
    /// Use the unmodified coordinate for LOD. No effect on generated code.
    pub utc_lod: bool,
}

impl IndirectStage {
    /// Any of the matrix, wrap or add-prev fields is non-zero.
    pub fn is_active(&self) -> bool {
        self.matrix != IndMatrix::Off
            || self.wrap_s != IndWrap::Off
            || self.wrap_t != IndWrap::Off
            || self.add_prev
    }
}

/// One RAS1_IREF entry: where indirect stage `n` reads from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndirectRef {
    pub tex_coord: u8,
    pub tex_map: u8,
}
