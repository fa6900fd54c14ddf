// TEV combiner: raster and konst inputs, operand setup, the regular lerp
// and compare formulas, and the overflow tracker threading.
//
// Each half computes, in 8-bit fixed point,
//
//     dest = clamp((d + bias) OP lerp(a, b, c') , lo, hi) * scale
//
// with c' = c + (c >> 7) so that dividing by 256 replaces dividing by 255.

use std::fmt::{self, Write};

use super::numeric::NumericMode;
use super::overflow::{OverflowTracker, TevSource};
use super::swap::Swizzle;
use super::uid::StageUid;
use super::{Emit, StageState};
use crate::gx::tev::{
    KonstChannel, KonstSource, RasColorChan, TevAlphaArg, TevBias, TevColorArg, TevOp, TevRegId, TevScale,
};

// ---------------------------------------------------------------------------
// Compare operations
// ---------------------------------------------------------------------------

/// The ten compare formulas a stage in compare mode can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TevCompareOp {
    R8Gt,
    R8Eq,
    Gr16Gt,
    Gr16Eq,
    Bgr24Gt,
    Bgr24Eq,
    Rgb8Gt,
    Rgb8Eq,
    A8Gt,
    A8Eq,
}

impl TevCompareOp {
    pub const ALL: [TevCompareOp; 10] = [
        TevCompareOp::R8Gt,
        TevCompareOp::R8Eq,
        TevCompareOp::Gr16Gt,
        TevCompareOp::Gr16Eq,
        TevCompareOp::Bgr24Gt,
        TevCompareOp::Bgr24Eq,
        TevCompareOp::Rgb8Gt,
        TevCompareOp::Rgb8Eq,
        TevCompareOp::A8Gt,
        TevCompareOp::A8Eq,
    ];

    const SHARED: [TevCompareOp; 6] = [
        TevCompareOp::R8Gt,
        TevCompareOp::R8Eq,
        TevCompareOp::Gr16Gt,
        TevCompareOp::Gr16Eq,
        TevCompareOp::Bgr24Gt,
        TevCompareOp::Bgr24Eq,
    ];

    fn index(scale: TevScale, op: TevOp) -> usize {
        ((scale as usize) << 1) | op as usize
    }

    /// Compare selected by a color combiner's scale and op fields.
    pub fn for_color(scale: TevScale, op: TevOp) -> Self {
        match Self::index(scale, op) {
            i @ 0..=5 => Self::SHARED[i],
            6 => TevCompareOp::Rgb8Gt,
            _ => TevCompareOp::Rgb8Eq,
        }
    }

    /// Compare selected by an alpha combiner; the per-channel modes compare alpha.
    pub fn for_alpha(scale: TevScale, op: TevOp) -> Self {
        match Self::index(scale, op) {
            i @ 0..=5 => Self::SHARED[i],
            6 => TevCompareOp::A8Gt,
            _ => TevCompareOp::A8Eq,
        }
    }

    /// Operand packing compared on the left and right, for the scalar compares.
    fn packed(self, num: NumericMode, operand: &str) -> String {
        match self {
            TevCompareOp::R8Gt | TevCompareOp::R8Eq => format!("{operand}.r"),
            TevCompareOp::A8Gt | TevCompareOp::A8Eq => format!("{operand}.a"),
            TevCompareOp::Gr16Gt | TevCompareOp::Gr16Eq if num.is_integer() => {
                format!("({operand}.r + ({operand}.g << 8))")
            }
            TevCompareOp::Gr16Gt | TevCompareOp::Gr16Eq => format!("dot({operand}.rgb, c16)"),
            _ if num.is_integer() => format!("({operand}.r + ({operand}.g << 8) + ({operand}.b << 16))"),
            _ => format!("dot({operand}.rgb, c24)"),
        }
    }

    fn is_equality(self) -> bool {
        matches!(
            self,
            TevCompareOp::R8Eq
                | TevCompareOp::Gr16Eq
                | TevCompareOp::Bgr24Eq
                | TevCompareOp::Rgb8Eq
                | TevCompareOp::A8Eq
        )
    }

    /// Writes the term added to `tin_d`. `alpha` selects the `.a` half;
    /// the A8 compares always produce alpha.
    pub fn write(self, out: &mut dyn Write, num: NumericMode, alpha: bool) -> fmt::Result {
        match (self, num) {
            (TevCompareOp::Rgb8Gt, NumericMode::Float) => {
                return out.write_str("(max(sign(tin_a.rgb - tin_b.rgb - 0.5), float3(0.0,0.0,0.0)) * tin_c.rgb)")
            }
            (TevCompareOp::Rgb8Eq, NumericMode::Float) => {
                return out.write_str(
                    "((float3(1.0,1.0,1.0) - max(sign(abs(tin_a.rgb - tin_b.rgb) - 0.5),float3(0.0,0.0,0.0))) * tin_c.rgb)",
                )
            }
            (TevCompareOp::Rgb8Gt, NumericMode::Integer) => {
                return out.write_str("(max(sign(tin_a.rgb - tin_b.rgb), int3(0,0,0)) * tin_c.rgb)")
            }
            (TevCompareOp::Rgb8Eq, NumericMode::Integer) => {
                return out.write_str("((int3(1,1,1) - abs(sign(tin_a.rgb - tin_b.rgb))) * tin_c.rgb)")
            }
            _ => {}
        }

        let alpha = alpha || matches!(self, TevCompareOp::A8Gt | TevCompareOp::A8Eq);
        let comp = if alpha { ".a" } else { ".rgb" };
        let zero = if alpha { num.lit(0).to_string() } else { format!("{}({})", num.vec3(), num.splat(0, 3)) };
        let lhs = self.packed(num, "tin_a");
        let rhs = self.packed(num, "tin_b");
        let cond = match (num, self.is_equality()) {
            (NumericMode::Float, false) => {
                let gap = if matches!(self, TevCompareOp::R8Gt | TevCompareOp::A8Gt) { " " } else { "  " };
                format!("{lhs} >={gap}({rhs} + 0.5)")
            }
            (NumericMode::Float, true) => format!("abs({lhs} - {rhs}) < 0.5"),
            (NumericMode::Integer, false) => format!("{lhs} > {rhs}"),
            (NumericMode::Integer, true) => format!("{lhs} == {rhs}"),
        };
        write!(out, "(({cond}) ? tin_c{comp} : {zero})")
    }
}

// ---------------------------------------------------------------------------
// Input tables
// ---------------------------------------------------------------------------

fn color_input(arg: TevColorArg, num: NumericMode) -> String {
    match arg {
        TevColorArg::Cprev => "prev.rgb".into(),
        TevColorArg::Aprev => "prev.aaa".into(),
        TevColorArg::C0 => "c0.rgb".into(),
        TevColorArg::A0 => "c0.aaa".into(),
        TevColorArg::C1 => "c1.rgb".into(),
        TevColorArg::A1 => "c1.aaa".into(),
        TevColorArg::C2 => "c2.rgb".into(),
        TevColorArg::A2 => "c2.aaa".into(),
        TevColorArg::TexC => "tex_t.rgb".into(),
        TevColorArg::TexA => "tex_t.aaa".into(),
        TevColorArg::RasC => "ras_t.rgb".into(),
        TevColorArg::RasA => "ras_t.aaa".into(),
        TevColorArg::One => num.splat(255, 3).to_string(),
        TevColorArg::Half => num.splat(128, 3).to_string(),
        TevColorArg::Konst => "konst_t.rgb".into(),
        TevColorArg::Zero => num.splat(0, 3).to_string(),
    }
}

fn alpha_input(arg: TevAlphaArg, num: NumericMode) -> String {
    match arg {
        TevAlphaArg::Aprev => "prev.a".into(),
        TevAlphaArg::A0 => "c0.a".into(),
        TevAlphaArg::A1 => "c1.a".into(),
        TevAlphaArg::A2 => "c2.a".into(),
        TevAlphaArg::TexA => "tex_t.a".into(),
        TevAlphaArg::RasA => "ras_t.a".into(),
        TevAlphaArg::Konst => "konst_t.a".into(),
        TevAlphaArg::Zero => num.lit(0).to_string(),
    }
}

fn color_output(dest: TevRegId) -> &'static str {
    ["prev.rgb", "c0.rgb", "c1.rgb", "c2.rgb"][dest as usize]
}

fn alpha_output(dest: TevRegId) -> &'static str {
    ["prev.a", "c0.a", "c1.a", "c2.a"][dest as usize]
}

// ---------------------------------------------------------------------------
// Raster and konst
// ---------------------------------------------------------------------------

/// Loads `ras_t` when the stage reads the rasterized color. Runs before
/// the texture fetch.
pub fn write_stage_raster(out: &mut dyn Write, cx: &Emit<'_>, stage: &StageUid, st: &mut StageState) -> fmt::Result {
    if !stage.uses_ras() {
        return Ok(());
    }
    let num = cx.num;
    let vec4 = num.vec4();
    let chan = stage.ras_chan;
    let expr = match chan {
        RasColorChan::Color0 | RasColorChan::Color1 => {
            let c = chan as usize;
            if !st.ras_expanded[c] {
                writeln!(out, "colors_{c} = round(colors_{c} * 255.0);")?;
                st.ras_expanded[c] = true;
            }
            if num.is_integer() {
                format!("int4(colors_{c})")
            } else {
                format!("colors_{c}")
            }
        }
        RasColorChan::AlphaBump => format!("{vec4}(a_bump,a_bump,a_bump,a_bump)"),
        RasColorChan::AlphaBumpNormalized if num.is_integer() => {
            "((int4(a_bump,a_bump,a_bump,a_bump) * 255 + 124) / 248)".to_string()
        }
        RasColorChan::AlphaBumpNormalized => "round(float4(a_bump,a_bump,a_bump,a_bump)*(255.0/248.0))".to_string(),
        _ => format!("{vec4}({})", num.splat(0, 4)),
    };
    writeln!(out, "ras_t = {expr}.{};", Swizzle(stage.ras_swap))?;
    st.tracker
        .set_raster(matches!(chan, RasColorChan::Color0 | RasColorChan::Color1));
    Ok(())
}

fn konst_channel(channel: KonstChannel) -> &'static str {
    match channel {
        KonstChannel::Rgb => "rgb",
        KonstChannel::R => "r",
        KonstChannel::G => "g",
        KonstChannel::B => "b",
        KonstChannel::A => "a",
    }
}

fn konst_color(source: KonstSource, num: NumericMode) -> String {
    match source {
        KonstSource::Fixed(v) => num.splat(i32::from(v), 3).to_string(),
        KonstSource::Register { index, channel } => {
            let swizzle = match channel {
                KonstChannel::Rgb => "rgb".to_string(),
                c => konst_channel(c).repeat(3),
            };
            if num.is_integer() {
                format!("int3(k[{index}].{swizzle})")
            } else {
                format!("k[{index}].{swizzle}")
            }
        }
    }
}

fn konst_alpha(source: KonstSource, num: NumericMode) -> String {
    match source {
        KonstSource::Fixed(v) => num.lit(i32::from(v)).to_string(),
        KonstSource::Register { index, channel } => {
            let component = konst_channel(channel);
            if num.is_integer() {
                format!("int(k[{index}].{component})")
            } else {
                format!("k[{index}].{component}")
            }
        }
    }
}

fn write_konst(out: &mut dyn Write, cx: &Emit<'_>, stage: &StageUid, st: &mut StageState) -> fmt::Result {
    let kc = stage.konst.color;
    let ka = stage.konst.alpha;
    writeln!(
        out,
        "konst_t = {}({},{});",
        cx.num.vec4(),
        konst_color(kc.source(), cx.num),
        konst_alpha(ka.source(), cx.num)
    )?;
    st.tracker.set_konst(kc.source().is_register() || ka.source().is_register());
    Ok(())
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// Numeric-mode spellings of the regular formula pieces.
struct FormulaTables {
    scale_left: [&'static str; 4],
    bias: [&'static str; 4],
    /// Indexed by `2 * op + (scale != DivideBy2)`.
    lerp_bias: [&'static str; 4],
    c_scale: &'static str,
}

const FLOAT_TABLES: FormulaTables = FormulaTables {
    scale_left: ["", " * 2.0", " * 4.0", ""],
    bias: ["", " + 128.0", " - 128.0", ""],
    lerp_bias: ["", " + 128.0", "", " + 127.0"],
    c_scale: "256.0",
};

const INT_TABLES: FormulaTables = FormulaTables {
    scale_left: ["", " * 2", " * 4", ""],
    bias: ["", " + 128", " - 128", ""],
    lerp_bias: ["", " + 128", "", " + 127"],
    c_scale: "256",
};

/// One half of a combiner, with the color and alpha differences factored out.
struct Half {
    comp: &'static str,
    a_is_zero: bool,
    b_is_zero: bool,
    c_is_zero: bool,
    c_is_one: bool,
    a_eq_b: bool,
    bias: TevBias,
    op: TevOp,
    scale: TevScale,
}

fn write_regular(out: &mut dyn Write, num: NumericMode, h: &Half) -> fmt::Result {
    let t = if num.is_integer() { &INT_TABLES } else { &FLOAT_TABLES };
    let c = h.comp;
    let l = t.scale_left[h.scale as usize];
    let lb = t.lerp_bias[2 * h.op as usize + usize::from(h.scale != TevScale::DivideBy2)];
    let k = t.c_scale;

    let divided = |inner: String| match num {
        NumericMode::Float => format!("trunc(({inner})*(1.0/256.0))"),
        NumericMode::Integer => format!("(({inner}) >> 8)"),
    };
    let lerp = if h.a_eq_b || h.c_is_zero {
        format!("(tin_a{c}{l})")
    } else if h.c_is_one {
        format!("(tin_b{c}{l})")
    } else if h.a_is_zero {
        divided(format!("((tin_b{c}*tin_c{c}){l}){lb}"))
    } else if h.b_is_zero {
        divided(format!("((tin_a{c}*({k} - tin_c{c})){l}){lb}"))
    } else {
        divided(format!("((tin_a{c}*{k} + (tin_b{c}-tin_a{c})*tin_c{c}){l}){lb}"))
    };
    let op = if h.op == TevOp::Sub { "-" } else { "+" };
    let expr = format!("(((tin_d{c}{}){l}) {op} {lerp})", t.bias[h.bias as usize]);
    // Both halvings round toward negative infinity, matching the integer shift.
    match (h.scale, num) {
        (TevScale::DivideBy2, NumericMode::Float) => write!(out, "floor({expr} * 0.5)"),
        (TevScale::DivideBy2, NumericMode::Integer) => write!(out, "({expr} >> 1)"),
        _ => out.write_str(&expr),
    }
}

fn write_output(
    out: &mut dyn Write,
    num: NumericMode,
    dest: &str,
    clamp: bool,
    body: impl FnOnce(&mut dyn Write) -> fmt::Result,
) -> fmt::Result {
    let (lo, hi) = if clamp { (0, 255) } else { (-1024, 1023) };
    if num.is_integer() {
        write!(out, "{dest} = clamp(")?;
        body(&mut *out)?;
        writeln!(out, ",{lo},{hi});")
    } else {
        write!(out, "{dest} = round(clamp(")?;
        body(&mut *out)?;
        writeln!(out, ",{},{}));", num.lit(lo), num.lit(hi))
    }
}

fn write_inputs(out: &mut dyn Write, cx: &Emit<'_>, stage: &StageUid, tracker: &OverflowTracker) -> fmt::Result {
    let num = cx.num;
    let vec4 = num.vec4();
    let cc = &stage.color;
    let ac = &stage.alpha;
    for (name, c, a) in [("tin_a", cc.a, ac.a), ("tin_b", cc.b, ac.b), ("tin_c", cc.c, ac.c)] {
        let wrap = if tracker.needs_wrap(c, a) { "CHK_O_U8" } else { "" };
        writeln!(out, "{name} = {wrap}({vec4}({},{}));", color_input(c, num), alpha_input(a, num))?;
    }

    let normalize_rgb = cc.c != TevColorArg::Zero && cc.bias != TevBias::Compare;
    let normalize_a = ac.c != TevAlphaArg::Zero && ac.bias != TevBias::Compare;
    let swizzle = match (normalize_rgb, normalize_a) {
        (true, true) => Some(""),
        (true, false) => Some(".rgb"),
        (false, true) => Some(".a"),
        (false, false) => None,
    };
    if let Some(s) = swizzle {
        if num.is_integer() {
            writeln!(out, "tin_c{s} = tin_c{s}+(tin_c{s}>>7);")?;
        } else {
            writeln!(out, "tin_c{s} = tin_c{s}+trunc(tin_c{s}*(1.0/128.0));")?;
        }
    }
    writeln!(out, "tin_d = {vec4}({},{});", color_input(cc.d, num), alpha_input(ac.d, num))
}

/// Konst, operands and both combine formulas of one stage.
pub fn write_stage_combiner(out: &mut dyn Write, cx: &Emit<'_>, stage: &StageUid, st: &mut StageState) -> fmt::Result {
    let num = cx.num;
    if stage.uses_konst() {
        write_konst(out, cx, stage, st)?;
    }
    write_inputs(out, cx, stage, &st.tracker)?;

    let cc = stage.color;
    out.write_str("// color combine\n")?;
    write_output(out, num, color_output(cc.dest), cc.clamp, |out| {
        if cc.bias == TevBias::Compare {
            out.write_str("tin_d.rgb+")?;
            TevCompareOp::for_color(cc.scale, cc.op).write(out, num, false)
        } else {
            write_regular(
                out,
                num,
                &Half {
                    comp: ".rgb",
                    a_is_zero: cc.a == TevColorArg::Zero,
                    b_is_zero: cc.b == TevColorArg::Zero,
                    c_is_zero: cc.c == TevColorArg::Zero,
                    c_is_one: cc.c == TevColorArg::One,
                    a_eq_b: cc.a == cc.b,
                    bias: cc.bias,
                    op: cc.op,
                    scale: cc.scale,
                },
            )
        }
    })?;

    let ac = stage.alpha;
    out.write_str("// alpha combine\n")?;
    write_output(out, num, alpha_output(ac.dest), ac.clamp, |out| {
        if ac.bias == TevBias::Compare {
            out.write_str("tin_d.a+")?;
            TevCompareOp::for_alpha(ac.scale, ac.op).write(out, num, true)
        } else {
            write_regular(
                out,
                num,
                &Half {
                    comp: ".a",
                    a_is_zero: ac.a == TevAlphaArg::Zero,
                    b_is_zero: ac.b == TevAlphaArg::Zero,
                    c_is_zero: ac.c == TevAlphaArg::Zero,
                    c_is_one: false,
                    a_eq_b: ac.a == ac.b,
                    bias: ac.bias,
                    op: ac.op,
                    scale: ac.scale,
                },
            )
        }
    })?;
    out.write_str("\n")?;

    st.tracker.record_stage(cc.dest, cc.clamp, ac.dest, ac.clamp);
    Ok(())
}

/// Moves the last stage's result into `prev` and wraps it if it may have
/// overflowed.
pub fn write_final_output(out: &mut dyn Write, last: &StageUid, tracker: &OverflowTracker) -> fmt::Result {
    let cdest = last.color.dest;
    let adest = last.alpha.dest;
    if cdest != TevRegId::Prev {
        writeln!(out, "prev.rgb = {};", color_output(cdest))?;
    }
    if adest != TevRegId::Prev {
        writeln!(out, "prev.a = {};", alpha_output(adest))?;
    }
    if tracker.get(TevSource::color_dest(cdest)) || tracker.get(TevSource::alpha_dest(adest)) {
        out.write_str("prev = CHK_O_U8(prev);\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gx::tev::{KonstAlphaSel, KonstColorSel, KonstSel};
    use crate::shadergen::dialect::ApiType;
    use crate::shadergen::uid::PixelShaderUidData;

    const SCALES: [TevScale; 4] = [TevScale::Scale1, TevScale::Scale2, TevScale::Scale4, TevScale::DivideBy2];
    const OPS: [TevOp; 2] = [TevOp::Add, TevOp::Sub];

    fn combine(uid: &PixelShaderUidData, stage: &StageUid, num: NumericMode) -> String {
        let cx = Emit { uid, dialect: ApiType::OpenGl.dialect(), num };
        let mut st = StageState::default();
        let mut text = String::new();
        write_stage_raster(&mut text, &cx, stage, &mut st).unwrap();
        write_stage_combiner(&mut text, &cx, stage, &mut st).unwrap();
        text
    }

    fn header() -> PixelShaderUidData {
        PixelShaderUidData::record_globals(
            &crate::gx::state::PixelPipelineState::default(),
            &crate::config::HostConfig::default(),
            ApiType::OpenGl.dialect(),
            NumericMode::Float,
            crate::shadergen::RenderMode::Default,
        )
    }

    #[test]
    fn rgb8_only_reachable_from_color() {
        for scale in SCALES {
            for op in OPS {
                let alpha = TevCompareOp::for_alpha(scale, op);
                assert!(!matches!(alpha, TevCompareOp::Rgb8Gt | TevCompareOp::Rgb8Eq));
                let color = TevCompareOp::for_color(scale, op);
                assert!(!matches!(color, TevCompareOp::A8Gt | TevCompareOp::A8Eq));
            }
        }
    }

    #[test]
    fn every_compare_is_reachable() {
        let mut seen = Vec::new();
        for scale in SCALES {
            for op in OPS {
                seen.push(TevCompareOp::for_color(scale, op));
                seen.push(TevCompareOp::for_alpha(scale, op));
            }
        }
        for op in TevCompareOp::ALL {
            assert!(seen.contains(&op), "{op:?} unreachable");
        }
    }

    #[test]
    fn compare_text_per_mode() {
        let mut text = String::new();
        TevCompareOp::R8Gt.write(&mut text, NumericMode::Float, false).unwrap();
        assert_eq!(text, "((tin_a.r >= (tin_b.r + 0.5)) ? tin_c.rgb : float3(0.0,0.0,0.0))");

        let mut text = String::new();
        TevCompareOp::Gr16Eq.write(&mut text, NumericMode::Float, true).unwrap();
        assert_eq!(text, "((abs(dot(tin_a.rgb, c16) - dot(tin_b.rgb, c16)) < 0.5) ? tin_c.a : 0.0)");

        let mut text = String::new();
        TevCompareOp::Bgr24Gt.write(&mut text, NumericMode::Integer, false).unwrap();
        assert_eq!(
            text,
            "(((tin_a.r + (tin_a.g << 8) + (tin_a.b << 16)) > (tin_b.r + (tin_b.g << 8) + (tin_b.b << 16))) ? tin_c.rgb : int3(0,0,0))"
        );

        let mut text = String::new();
        TevCompareOp::A8Eq.write(&mut text, NumericMode::Integer, true).unwrap();
        assert_eq!(text, "((tin_a.a == tin_b.a) ? tin_c.a : 0)");
    }

    #[test]
    fn passthrough_stage() {
        let uid = header();
        let text = combine(&uid, &StageUid::default(), NumericMode::Float);
        assert!(text.contains("tin_a = (float4(0.0,0.0,0.0,0.0));"));
        assert!(text.contains("tin_d = float4(prev.rgb,prev.a);"));
        assert!(text.contains("prev.rgb = round(clamp((((tin_d.rgb)) + (tin_a.rgb)),0.0,255.0));"));
        assert!(text.contains("prev.a = round(clamp((((tin_d.a)) + (tin_a.a)),0.0,255.0));"));
        assert!(!text.contains("tin_c = tin_c+"));
    }

    #[test]
    fn general_lerp_float_and_integer() {
        let uid = header();
        let mut stage = StageUid::default();
        stage.color.a = TevColorArg::TexC;
        stage.color.b = TevColorArg::RasC;
        stage.color.c = TevColorArg::Konst;
        stage.color.d = TevColorArg::Zero;
        stage.konst = KonstSel { color: KonstColorSel::HALF, alpha: KonstAlphaSel::ONE };
        stage.ras_chan = RasColorChan::Color0;

        let text = combine(&uid, &stage, NumericMode::Float);
        assert!(text.contains("colors_0 = round(colors_0 * 255.0);\n"));
        assert!(text.contains("ras_t = colors_0.rgba;\n"));
        assert!(text.contains("konst_t = float4(128.0,128.0,128.0,255.0);\n"));
        assert!(text.contains("tin_b = CHK_O_U8(float4(ras_t.rgb,0.0));"));
        assert!(text.contains("tin_c = (float4(konst_t.rgb,0.0));"));
        assert!(text.contains("tin_c.rgb = tin_c.rgb+trunc(tin_c.rgb*(1.0/128.0));"));
        assert!(text.contains(
            "trunc((((tin_a.rgb*256.0 + (tin_b.rgb-tin_a.rgb)*tin_c.rgb)) + 128.0)*(1.0/256.0))"
        ));

        let text = combine(&uid, &stage, NumericMode::Integer);
        assert!(text.contains("ras_t = int4(colors_0).rgba;\n"));
        assert!(text.contains("konst_t = int4(128,128,128,255);\n"));
        assert!(text.contains("tin_c.rgb = tin_c.rgb+(tin_c.rgb>>7);"));
        assert!(text.contains("((((tin_a.rgb*256 + (tin_b.rgb-tin_a.rgb)*tin_c.rgb)) + 128) >> 8)"));
        assert!(text.contains("prev.rgb = clamp("));
    }

    #[test]
    fn divide_by_two_uses_the_rounding_bias() {
        let uid = header();
        let mut stage = StageUid::default();
        stage.color.a = TevColorArg::C0;
        stage.color.b = TevColorArg::C1;
        stage.color.c = TevColorArg::TexC;
        stage.color.scale = TevScale::DivideBy2;
        stage.color.op = TevOp::Sub;
        stage.color.clamp = false;
        let text = combine(&uid, &stage, NumericMode::Float);
        assert!(text.contains("prev.rgb = round(clamp(floor((((tin_d.rgb)) - trunc(("));
        assert!(text.contains(")*(1.0/256.0))) * 0.5),-1024.0,1023.0));"));
    }

    #[test]
    fn reserved_konst_selectors_are_bounded() {
        let uid = header();
        let mut stage = StageUid::default();
        stage.color.a = TevColorArg::Konst;
        stage.alpha.a = TevAlphaArg::Konst;
        stage.konst = KonstSel { color: KonstColorSel(0x0A), alpha: KonstAlphaSel(0x0D) };
        let text = combine(&uid, &stage, NumericMode::Float);
        assert!(text.contains("konst_t = float4(0.0,0.0,0.0,0.0);\n"));
        assert!(text.contains("tin_a = (float4(konst_t.rgb,konst_t.a));"));

        stage.konst.alpha = KonstAlphaSel(0x1C);
        let text = combine(&uid, &stage, NumericMode::Float);
        assert!(text.contains("tin_a = CHK_O_U8(float4(konst_t.rgb,konst_t.a));"));
    }

    #[test]
    fn konst_register_reads() {
        assert_eq!(konst_color(KonstColorSel(0x0E).source(), NumericMode::Float), "k[2].rgb");
        assert_eq!(konst_color(KonstColorSel(0x15).source(), NumericMode::Float), "k[1].ggg");
        assert_eq!(konst_color(KonstColorSel(0x0C).source(), NumericMode::Integer), "int3(k[0].rgb)");
        assert_eq!(konst_alpha(KonstAlphaSel(0x1F).source(), NumericMode::Integer), "int(k[3].a)");
        assert_eq!(konst_color(KonstColorSel::ONE.source(), NumericMode::Float), "255.0,255.0,255.0");
    }

    #[test]
    fn final_copy_and_wrap() {
        let mut last = StageUid::default();
        last.color.dest = TevRegId::Reg1;
        let mut tracker = OverflowTracker::new();
        tracker.record_stage(TevRegId::Reg1, true, TevRegId::Prev, true);
        let mut text = String::new();
        write_final_output(&mut text, &last, &tracker).unwrap();
        assert_eq!(text, "prev.rgb = c1.rgb;\n");

        tracker.record_stage(TevRegId::Reg1, false, TevRegId::Prev, true);
        let mut text = String::new();
        write_final_output(&mut text, &last, &tracker).unwrap();
        assert_eq!(text, "prev.rgb = c1.rgb;\nprev = CHK_O_U8(prev);\n");
    }
}
