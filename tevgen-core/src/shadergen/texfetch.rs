// Per-stage texture coordinate and sample.

use std::fmt::{self, Write};

use super::swap::Swizzle;
use super::uid::StageUid;
use super::{Emit, StageState};

/// Sampler offset of the normal map paired with a texture map.
const NORMAL_MAP_SAMPLER_BASE: u32 = 8;

/// Writes `tex_t` for one stage. Indirect stages already left their
/// coordinate in `tevcoord`.
pub fn write_stage_fetch(out: &mut dyn Write, cx: &Emit<'_>, stage: &StageUid, st: &mut StageState) -> fmt::Result {
    if !stage.tex_enabled {
        let vec4 = cx.num.vec4();
        return writeln!(out, "tex_t = {vec4}({});", cx.num.splat(255, 4));
    }

    if stage.indirect.is_none() {
        match stage.tex_coord {
            Some(tc) => writeln!(out, "tevcoord = uv{tc}.xy;")?,
            None => out.write_str("tevcoord = float2(0.0,0.0);\n")?,
        }
    }

    let map = u32::from(stage.tex_map);
    let integer = cx.num.is_integer();
    out.write_str(if integer { "tex_t = int4(round(" } else { "tex_t = round(" })?;
    cx.dialect
        .write_sample(out, map, format_args!("(round(tevcoord) * (1.0/128.0)) * texdim[{map}].xy"))?;
    write!(out, ".{} * 255.0)", Swizzle(stage.tex_swap))?;
    out.write_str(if integer { ");\n" } else { ";\n" })?;

    if stage.normal_map {
        out.write_str("nrm_t = ")?;
        cx.dialect.write_sample(
            out,
            NORMAL_MAP_SAMPLER_BASE + map,
            format_args!("(round(tevcoord) * (1.0/128.0)) * texdim[{map}].xy"),
        )?;
        out.write_str(";\n")?;
        let assign = if st.normal_map_seen { "+=" } else { "=" };
        writeln!(out, "nrm_acc {assign} float4(nrm_t.xyz * 2.0 - 1.0, nrm_t.w);")?;
        writeln!(out, "nrm_coord = (round(tevcoord) * (1.0/128.0)) * texdim[{map}].xy;")?;
        st.normal_map_seen = true;
    }
    Ok(())
}
