// Indirect texturing: the per-indirect-stage lookups that run once after
// the prologue, and the per-TEV-stage offset computation.

use std::fmt::{self, Write};

use super::uid::StageUid;
use super::Emit;
use crate::gx::indirect::{IndMatrix, IndTexAlphaSel, IndTexBias, IndTexFormat, IndWrap, IndirectStage};
use crate::gx::state::MAX_IND_STAGES;

/// Float-mode divisors keeping only the bump alpha bits, indexed by format.
const BUMP_ALPHA_SCALE: [&str; 4] = ["(1.0/8.0)", "(1.0/32.0)", "(1.0/16.0)", "(1.0/8.0)"];
const BUMP_ALPHA_NORM: [&str; 4] = ["8.0", "32.0", "16.0", "8.0"];

/// Float-mode divisors keeping only the offset bits, formats 1..3.
const OFFSET_SCALE: [&str; 4] = ["", "(1.0/32.0)", "(1.0/16.0)", "(1.0/8.0)"];
const OFFSET_NORM: [&str; 4] = ["", "32.0", "16.0", "8.0"];

/// Samples every used indirect map into `indtexN`.
pub fn write_lookups(out: &mut dyn Write, cx: &Emit<'_>) -> fmt::Result {
    let uid = cx.uid;
    for i in 0..MAX_IND_STAGES.min(uid.num_ind_stages as usize) {
        if uid.ind_stages_used & (1 << i) == 0 {
            continue;
        }
        let iref = uid.ind_refs[i];
        match iref.tex_coord {
            Some(tc) => writeln!(out, "t_coord = BSHR(uv{tc}.xy, cindscale[{i}].xy, cindscale[{i}].zw);")?,
            None => out.write_str("t_coord = float2(0.0,0.0);\n")?,
        }
        let map = u32::from(iref.tex_map);
        if cx.num.is_integer() {
            write!(out, "int3 indtex{i} = int3(round(")?;
        } else {
            write!(out, "float3 indtex{i} = round(")?;
        }
        cx.dialect
            .write_sample(out, map, format_args!("(round(t_coord) * (1.0/128.0)) * texdim[{map}].xy"))?;
        out.write_str(".abg * 255.0)")?;
        if cx.num.is_integer() {
            out.write_str(")")?;
        }
        out.write_str(";\n")?;
    }
    Ok(())
}

fn alpha_sel_component(sel: IndTexAlphaSel) -> &'static str {
    match sel {
        IndTexAlphaSel::Off => "",
        IndTexAlphaSel::S => "x",
        IndTexAlphaSel::T => "y",
        IndTexAlphaSel::U => "z",
    }
}

fn write_bias(out: &mut dyn Write, cx: &Emit<'_>, n: usize, ind: &IndirectStage) -> fmt::Result {
    let value = cx.num.lit(ind.format.bias_value());
    let axes = ind.bias.swizzle();
    match ind.bias {
        IndTexBias::None => Ok(()),
        IndTexBias::S | IndTexBias::T | IndTexBias::U => writeln!(out, "indtevcrd{n}.{axes} += {value};"),
        IndTexBias::St | IndTexBias::Su | IndTexBias::Tu => {
            writeln!(out, "indtevcrd{n}.{axes} += {}({value}, {value});", cx.num.vec2())
        }
        IndTexBias::Stu => writeln!(out, "indtevcrd{n}.{axes} += {}({value}, {value}, {value});", cx.num.vec3()),
    }
}

fn write_matrix(out: &mut dyn Write, cx: &Emit<'_>, n: usize, ind: &IndirectStage, tex_coord: u8) -> fmt::Result {
    // Offsets are integers in integer mode; the matrix math stays in floats.
    let crd = if cx.num.is_integer() { format!("float3(indtevcrd{n})") } else { format!("indtevcrd{n}") };
    let (scale_row, swizzle) = match ind.matrix {
        IndMatrix::Off => return writeln!(out, "float2 indtevtrans{n} = float2(0.0,0.0);"),
        IndMatrix::Regular(m) => {
            let k = 2 * u32::from(m);
            writeln!(
                out,
                "float2 indtevtrans{n} = float2(dot(cindmtx[{k}].xyz, {crd}), dot(cindmtx[{}].xyz, {crd}));",
                k + 1
            )?;
            writeln!(out, "indtevtrans{n} = BSHR(indtevtrans{n}, float2(7.0,7.0), float2(1.0,1.0)/8.0);")?;
            return writeln!(out, "indtevtrans{n} = BSH(indtevtrans{n}, cindmtx[{k}].ww);");
        }
        IndMatrix::S(m) => (2 * u32::from(m), "xx"),
        IndMatrix::T(m) => (2 * u32::from(m), "yy"),
    };
    if cx.num.is_integer() {
        writeln!(out, "float2 indtevtrans{n} = uv{tex_coord}.xy * float2(indtevcrd{n}.{swizzle});")?;
    } else {
        writeln!(out, "float2 indtevtrans{n} = uv{tex_coord}.xy * indtevcrd{n}.{swizzle};")?;
    }
    writeln!(out, "indtevtrans{n} = BSHR(indtevtrans{n}, float2(255.0,255.0), float2(1.0,1.0)/256.0);")?;
    writeln!(out, "indtevtrans{n} = BSH(indtevtrans{n}, cindmtx[{scale_row}].ww);")
}

fn write_wrap(out: &mut dyn Write, axis: char, wrap: IndWrap, tex_coord: u8) -> fmt::Result {
    match wrap {
        IndWrap::Off => writeln!(out, "wrappedcoord.{axis} = uv{tex_coord}.{axis};"),
        IndWrap::Zero => writeln!(out, "wrappedcoord.{axis} = 0.0;"),
        _ => writeln!(out, "wrappedcoord.{axis} = fastmod(uv{tex_coord}.{axis}, {}.0);", wrap.period()),
    }
}

/// Offset texture coordinate of stage `n` into `tevcoord`.
pub fn write_stage_offset(out: &mut dyn Write, cx: &Emit<'_>, n: usize, stage: &StageUid) -> fmt::Result {
    let Some(ind) = &stage.indirect else {
        return Ok(());
    };
    // Only read when the wraps or an S/T matrix need it.
    let tc = stage.tex_coord.unwrap_or(0);
    let bt = ind.ind_stage;
    let fmt_index = ind.format as usize;
    let integer = cx.num.is_integer();

    out.write_str("// indirect op\n")?;
    if ind.alpha_sel != IndTexAlphaSel::Off {
        let component = alpha_sel_component(ind.alpha_sel);
        if integer {
            writeln!(out, "a_bump = indtex{bt}.{component} & {};", ind.format.bump_alpha_mask())?;
        } else {
            writeln!(
                out,
                "a_bump = floor(indtex{bt}.{component} * {}) * {};",
                BUMP_ALPHA_SCALE[fmt_index], BUMP_ALPHA_NORM[fmt_index]
            )?;
        }
    }

    let vec3 = cx.num.vec3();
    match (ind.format, integer) {
        (IndTexFormat::Bits8, _) => writeln!(out, "{vec3} indtevcrd{n} = indtex{bt};")?,
        (format, true) => writeln!(out, "int3 indtevcrd{n} = indtex{bt} & {};", format.offset_mask())?,
        (_, false) => writeln!(
            out,
            "float3 indtevcrd{n} = round(frac(indtex{bt} * {}) * {});",
            OFFSET_SCALE[fmt_index], OFFSET_NORM[fmt_index]
        )?,
    }
    write_bias(out, cx, n, ind)?;
    write_matrix(out, cx, n, ind, tc)?;
    write_wrap(out, 'x', ind.wrap_s, tc)?;
    write_wrap(out, 'y', ind.wrap_t, tc)?;

    let assign = if ind.add_prev { "+=" } else { "=" };
    writeln!(out, "tevcoord {assign} wrappedcoord + indtevtrans{n};")
}
