// Software model of one TEV stage and the alpha test, in the integer
// arithmetic the generated shaders use. Tests check generated formulas
// against it.

use crate::gx::alpha::{AlphaTest, AlphaTestResult};
use crate::gx::tev::{AlphaCombiner, ColorCombiner, TevAlphaArg, TevBias, TevColorArg, TevOp, TevRegId, TevScale};
use crate::shadergen::combiner::TevCompareOp;

pub type Rgba = [i32; 4];

/// The four TEV registers, in destination order: prev, c0, c1, c2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TevRegisters(pub [Rgba; 4]);

impl TevRegisters {
    pub fn prev(&self) -> Rgba {
        self.0[TevRegId::Prev as usize]
    }

    pub fn get(&self, reg: TevRegId) -> Rgba {
        self.0[reg as usize]
    }
}

/// Per-stage inputs other than the registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageInputs {
    pub tex: Rgba,
    pub ras: Rgba,
    pub konst: Rgba,
}

impl Default for StageInputs {
    fn default() -> Self {
        Self { tex: [255; 4], ras: [0; 4], konst: [255; 4] }
    }
}

fn color_operand(arg: TevColorArg, regs: &TevRegisters, inputs: &StageInputs) -> [i32; 3] {
    let rgb = |v: Rgba| [v[0], v[1], v[2]];
    let aaa = |v: Rgba| [v[3]; 3];
    match arg {
        TevColorArg::Cprev => rgb(regs.0[0]),
        TevColorArg::Aprev => aaa(regs.0[0]),
        TevColorArg::C0 => rgb(regs.0[1]),
        TevColorArg::A0 => aaa(regs.0[1]),
        TevColorArg::C1 => rgb(regs.0[2]),
        TevColorArg::A1 => aaa(regs.0[2]),
        TevColorArg::C2 => rgb(regs.0[3]),
        TevColorArg::A2 => aaa(regs.0[3]),
        TevColorArg::TexC => rgb(inputs.tex),
        TevColorArg::TexA => aaa(inputs.tex),
        TevColorArg::RasC => rgb(inputs.ras),
        TevColorArg::RasA => aaa(inputs.ras),
        TevColorArg::One => [255; 3],
        TevColorArg::Half => [128; 3],
        TevColorArg::Konst => rgb(inputs.konst),
        TevColorArg::Zero => [0; 3],
    }
}

fn alpha_operand(arg: TevAlphaArg, regs: &TevRegisters, inputs: &StageInputs) -> i32 {
    match arg {
        TevAlphaArg::Aprev => regs.0[0][3],
        TevAlphaArg::A0 => regs.0[1][3],
        TevAlphaArg::A1 => regs.0[2][3],
        TevAlphaArg::A2 => regs.0[3][3],
        TevAlphaArg::TexA => inputs.tex[3],
        TevAlphaArg::RasA => inputs.ras[3],
        TevAlphaArg::Konst => inputs.konst[3],
        TevAlphaArg::Zero => 0,
    }
}

/// Operands of one component after the u8 wrap applied to `a`, `b`, `c`.
#[derive(Debug, Clone, Copy)]
struct Operands {
    a: i32,
    b: i32,
    c: i32,
    d: i32,
}

/// Settings of one combiner half.
#[derive(Debug, Clone, Copy)]
struct Formula {
    bias: TevBias,
    op: TevOp,
    scale: TevScale,
    clamp: bool,
    lerp: LerpForm,
}

/// Shape the `lerp(a, b, c)` term reduces to for a given operand selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LerpForm {
    /// `a` and `b` read the same input, or `c` is zero.
    PassA,
    /// `c` is ONE, which normalizes to 256.
    PassB,
    /// `a` is zero: `b * c`.
    ScaleB,
    /// `b` is zero: `a * (256 - c)`.
    ScaleA,
    Full,
}

impl LerpForm {
    pub const ALL: [LerpForm; 5] =
        [LerpForm::PassA, LerpForm::PassB, LerpForm::ScaleB, LerpForm::ScaleA, LerpForm::Full];

    fn classify(a_eq_b: bool, c_is_zero: bool, c_is_one: bool, a_is_zero: bool, b_is_zero: bool) -> Self {
        if a_eq_b || c_is_zero {
            LerpForm::PassA
        } else if c_is_one {
            LerpForm::PassB
        } else if a_is_zero {
            LerpForm::ScaleB
        } else if b_is_zero {
            LerpForm::ScaleA
        } else {
            LerpForm::Full
        }
    }

    pub fn for_color(color: &ColorCombiner) -> Self {
        Self::classify(
            color.a == color.b,
            color.c == TevColorArg::Zero,
            color.c == TevColorArg::One,
            color.a == TevColorArg::Zero,
            color.b == TevColorArg::Zero,
        )
    }

    /// Alpha has no ONE input, so `PassB` never applies.
    pub fn for_alpha(alpha: &AlphaCombiner) -> Self {
        Self::classify(
            alpha.a == alpha.b,
            alpha.c == TevAlphaArg::Zero,
            false,
            alpha.a == TevAlphaArg::Zero,
            alpha.b == TevAlphaArg::Zero,
        )
    }

    /// `c` is already normalized to 0..256.
    fn eval(self, a: i32, b: i32, c: i32, scale: i32, lerp_bias: i32) -> i32 {
        match self {
            LerpForm::PassA => a * scale,
            LerpForm::PassB => b * scale,
            LerpForm::ScaleB => (b * c * scale + lerp_bias) >> 8,
            LerpForm::ScaleA => (a * (256 - c) * scale + lerp_bias) >> 8,
            LerpForm::Full => ((a * 256 + (b - a) * c) * scale + lerp_bias) >> 8,
        }
    }
}

fn regular(x: Operands, f: Formula) -> i32 {
    let c = x.c + (x.c >> 7);
    let scale = match f.scale {
        TevScale::Scale2 => 2,
        TevScale::Scale4 => 4,
        _ => 1,
    };
    let bias = match f.bias {
        TevBias::AddHalf => 128,
        TevBias::SubHalf => -128,
        _ => 0,
    };
    let lerp_bias = match (f.op, f.scale == TevScale::DivideBy2) {
        (TevOp::Add, false) => 128,
        (TevOp::Sub, false) => 127,
        (_, true) => 0,
    };
    let lerp = f.lerp.eval(x.a, x.b, c, scale, lerp_bias);
    let d = (x.d + bias) * scale;
    let result = if f.op == TevOp::Sub { d - lerp } else { d + lerp };
    // Halving floors, for negative unclamped values too.
    if f.scale == TevScale::DivideBy2 {
        result >> 1
    } else {
        result
    }
}

fn clamp(value: i32, clamped: bool) -> i32 {
    if clamped {
        value.clamp(0, 255)
    } else {
        value.clamp(-1024, 1023)
    }
}

fn gt_or_eq(op: TevCompareOp, lhs: i32, rhs: i32) -> bool {
    match op {
        TevCompareOp::R8Eq
        | TevCompareOp::Gr16Eq
        | TevCompareOp::Bgr24Eq
        | TevCompareOp::Rgb8Eq
        | TevCompareOp::A8Eq => lhs == rhs,
        _ => lhs > rhs,
    }
}

fn packed(op: TevCompareOp, v: [i32; 3]) -> i32 {
    match op {
        TevCompareOp::R8Gt | TevCompareOp::R8Eq => v[0],
        TevCompareOp::Gr16Gt | TevCompareOp::Gr16Eq => v[0] + (v[1] << 8),
        _ => v[0] + (v[1] << 8) + (v[2] << 16),
    }
}

fn wrap3(v: [i32; 3]) -> [i32; 3] {
    v.map(|x| x & 255)
}

/// Runs one stage over `regs`, writing the destinations.
pub fn run_stage(regs: &mut TevRegisters, color: &ColorCombiner, alpha: &AlphaCombiner, inputs: &StageInputs) {
    let ca = wrap3(color_operand(color.a, regs, inputs));
    let cb = wrap3(color_operand(color.b, regs, inputs));
    let cc = wrap3(color_operand(color.c, regs, inputs));
    let cd = color_operand(color.d, regs, inputs);
    let aa = alpha_operand(alpha.a, regs, inputs) & 255;
    let ab = alpha_operand(alpha.b, regs, inputs) & 255;
    let ac = alpha_operand(alpha.c, regs, inputs) & 255;
    let ad = alpha_operand(alpha.d, regs, inputs);

    let mut rgb = [0; 3];
    if color.bias == TevBias::Compare {
        let op = TevCompareOp::for_color(color.scale, color.op);
        for i in 0..3 {
            let hit = match op {
                TevCompareOp::Rgb8Gt | TevCompareOp::Rgb8Eq => gt_or_eq(op, ca[i], cb[i]),
                _ => gt_or_eq(op, packed(op, ca), packed(op, cb)),
            };
            rgb[i] = clamp(cd[i] + if hit { cc[i] } else { 0 }, color.clamp);
        }
    } else {
        let f = Formula {
            bias: color.bias,
            op: color.op,
            scale: color.scale,
            clamp: color.clamp,
            lerp: LerpForm::for_color(color),
        };
        for i in 0..3 {
            rgb[i] = clamp(regular(Operands { a: ca[i], b: cb[i], c: cc[i], d: cd[i] }, f), f.clamp);
        }
    }

    let a = if alpha.bias == TevBias::Compare {
        let op = TevCompareOp::for_alpha(alpha.scale, alpha.op);
        let hit = match op {
            TevCompareOp::A8Gt | TevCompareOp::A8Eq => gt_or_eq(op, aa, ab),
            // The packed compares read the color operands.
            _ => gt_or_eq(op, packed(op, ca), packed(op, cb)),
        };
        clamp(ad + if hit { ac } else { 0 }, alpha.clamp)
    } else {
        let f = Formula {
            bias: alpha.bias,
            op: alpha.op,
            scale: alpha.scale,
            clamp: alpha.clamp,
            lerp: LerpForm::for_alpha(alpha),
        };
        clamp(regular(Operands { a: aa, b: ab, c: ac, d: ad }, f), f.clamp)
    };

    let cdest = &mut regs.0[color.dest as usize];
    cdest[..3].copy_from_slice(&rgb);
    regs.0[alpha.dest as usize][3] = a;
}

/// Alpha test outcome, using the pretest shortcut where it applies.
pub fn alpha_test_passes(test: &AlphaTest, alpha: u8) -> bool {
    match test.test_result() {
        AlphaTestResult::Pass => true,
        AlphaTestResult::Fail => false,
        AlphaTestResult::Undetermined => test.evaluate(alpha),
    }
}
