// Shader prologue: header comment, helpers, resource declarations, the
// entry point, register declarations and texgen normalization.

use std::fmt::{self, Write};

use smallvec::SmallVec;

use super::dialect::{EntryInterface, Interpolant, InterpolantName, Semantic, UniformField};
use super::uid::PixelShaderUidData;
use super::{Emit, RenderMode};

/// Pixel constant block, in D3D9 register order.
const PS_UNIFORMS: [UniformField; 12] = [
    UniformField::new("float4", "color", 4, 0),
    UniformField::new("float4", "k", 4, 4),
    UniformField::new("float4", "alphaRef", 0, 8),
    UniformField::new("float4", "texdim", 8, 9),
    UniformField::new("float4", "czbias", 2, 17),
    UniformField::new("float4", "cindscale", 4, 19),
    UniformField::new("float4", "cindmtx", 6, 23),
    UniformField::new("float4", "cfogcolor", 0, 29),
    UniformField::new("float4", "cfogi", 0, 30),
    UniformField::new("float4", "cfogf", 2, 31),
    UniformField::new("float4", "czslope", 0, 33),
    UniformField::new("float4", "cefbscale", 0, 34),
];

/// Material and light registers, only declared with per-pixel lighting.
const PS_LIGHT_UNIFORMS: [UniformField; 2] = [
    UniformField::new("float4", "cpmtrl", 4, 35),
    UniformField::new("float4", "cplight", 40, 39),
];

/// Vertex outputs read by the shader, in declaration order.
pub fn interpolants(uid: &PixelShaderUidData) -> SmallVec<[Interpolant; 12]> {
    let mut list = SmallVec::new();
    for n in 0..2 {
        list.push(Interpolant { name: InterpolantName::Colors(n), components: 4, semantic: Semantic::Color(n) });
    }
    let num_tex_gens = uid.num_tex_gens;
    if !uid.packed_interpolants() {
        for i in 0..num_tex_gens {
            list.push(Interpolant { name: InterpolantName::Uv(i), components: 3, semantic: Semantic::TexCoord(i) });
        }
        list.push(Interpolant {
            name: InterpolantName::ClipPos,
            components: 4,
            semantic: Semantic::TexCoord(num_tex_gens),
        });
        if uid.pixel_lighting {
            list.push(Interpolant {
                name: InterpolantName::Normal,
                components: 4,
                semantic: Semantic::TexCoord(num_tex_gens + 1),
            });
        }
    } else if uid.pixel_lighting {
        // Position and normal ride in the w of all eight texcoords.
        for i in 0..8 {
            list.push(Interpolant { name: InterpolantName::Uv(i), components: 4, semantic: Semantic::TexCoord(i) });
        }
    } else {
        for i in 0..num_tex_gens {
            let components = if i < 4 { 4 } else { 3 };
            list.push(Interpolant { name: InterpolantName::Uv(i), components, semantic: Semantic::TexCoord(i) });
        }
    }
    list
}

/// Everything before `main`.
pub fn write_header(out: &mut dyn Write, cx: &Emit<'_>) -> fmt::Result {
    let uid = cx.uid;
    writeln!(out, "//Pixel Shader for TEV stages")?;
    writeln!(
        out,
        "//{} TEV stages, {} texgens, {} IND stages",
        uid.num_stages, uid.num_tex_gens, uid.num_ind_stages
    )?;
    cx.dialect.write_preamble(out, uid.bounding_box)?;
    cx.num.write_helpers(out)?;

    // Normal maps live in the upper eight samplers.
    let samplers = if uid.normal_maps { 16 } else { 8 };
    for i in 0..samplers {
        cx.dialect.declare_sampler(out, i)?;
    }
    for i in 0..samplers {
        cx.dialect.declare_texture(out, i)?;
    }
    out.write_str("\n")?;

    let mut fields: SmallVec<[UniformField; 14]> = SmallVec::from_slice(&PS_UNIFORMS);
    if uid.pixel_lighting {
        fields.extend_from_slice(&PS_LIGHT_UNIFORMS);
    }
    cx.dialect.declare_uniform_block(out, &fields)?;
    if uid.bounding_box {
        cx.dialect.declare_bounding_box(out)?;
    }
    out.write_str("\n")
}

/// Opens `main`. Returns `false` when the depth-only body is already
/// complete and nothing else may be written.
pub fn write_entry(out: &mut dyn Write, cx: &Emit<'_>) -> Result<bool, fmt::Error> {
    let uid = cx.uid;
    let interpolants = interpolants(uid);
    let entry = EntryInterface {
        dual_source: uid.render_mode == RenderMode::DualSourceBlend,
        depth_output: uid.per_pixel_depth,
        early_depth: uid.forced_early_z,
        qualifier: uid.qualifier,
        interpolants: &interpolants,
    };
    cx.dialect.begin_entry(out, &entry)?;
    if uid.packed_interpolants() {
        out.write_str("float4 clipPos = float4(0.0,0.0,0.0,0.0);\n")?;
    }

    if uid.render_mode == RenderMode::DepthOnly {
        out.write_str("ocol0 = float4(0.0,0.0,0.0,0.0);\n")?;
        cx.dialect.end_entry(out)?;
        return Ok(false);
    }
    Ok(true)
}

/// TEV registers and the scratch variables every stage uses.
pub fn write_registers(out: &mut dyn Write, cx: &Emit<'_>) -> fmt::Result {
    let num = cx.num;
    let vec4 = num.vec4();
    if num.is_integer() {
        out.write_str("int4 c0 = int4(color[1]), c1 = int4(color[2]), c2 = int4(color[3]), prev = int4(color[0]);\n")?;
    } else {
        out.write_str("float4 c0 = color[1], c1 = color[2], c2 = color[3], prev = color[0];\n")?;
    }
    let zero4 = num.splat(0, 4);
    writeln!(
        out,
        "{vec4} tex_t = {vec4}({zero4}), ras_t = {vec4}({zero4}), konst_t = {vec4}({zero4});"
    )?;
    if !num.is_integer() {
        out.write_str("float3 c16 = float3(1.0,256.0,0.0), c24 = float3(1.0,256.0,256.0*256.0);\n")?;
    }
    writeln!(out, "{} a_bump = {};", num.scalar(), num.lit(0))?;
    out.write_str("float2 tevcoord = float2(0.0,0.0);\n")?;
    out.write_str("float2 wrappedcoord = float2(0.0,0.0), t_coord = float2(0.0,0.0);\n")?;
    writeln!(
        out,
        "{vec4} tin_a = {vec4}({zero4}), tin_b = {vec4}({zero4}), tin_c = {vec4}({zero4}), tin_d = {vec4}({zero4});"
    )?;
    if cx.uid.normal_maps {
        out.write_str("float4 nrm_t = float4(0.0,0.0,0.0,0.0), nrm_acc = float4(0.0,0.0,0.0,0.0);\n")?;
        out.write_str("float2 nrm_coord = float2(0.0,0.0);\n")?;
    }
    if num.is_integer() && cx.uid.pixel_lighting && cx.uid.lighting.num_color_chans > 0 {
        out.write_str("int4 ilacc;\n")?;
    }
    out.write_str("\n")
}

/// Lighting inputs shared by every lit channel and the specular pass.
pub fn write_lighting_inputs(out: &mut dyn Write, cx: &Emit<'_>) -> fmt::Result {
    if cx.uid.packed_interpolants() {
        out.write_str("float3 _norm0 = normalize(float3(uv4.w,uv5.w,uv6.w));\n\n")?;
        out.write_str("float3 pos = float3(uv0.w,uv1.w,uv7.w);\n")?;
    } else {
        out.write_str("float3 _norm0 = normalize(Normal.xyz);\n\n")?;
        out.write_str("float3 pos = float3(clipPos.x,clipPos.y,Normal.w);\n")?;
    }
    out.write_str("float4 mat, lacc;\nfloat3 ldir, h;\nfloat dist, dist2, attn;\n")
}

/// Window position fixup and texgen normalization to 128-per-texel units.
pub fn write_texgens(out: &mut dyn Write, cx: &Emit<'_>) -> fmt::Result {
    let uid = cx.uid;
    if uid.packed_interpolants() {
        out.write_str("clipPos = float4(rawpos.x, rawpos.y, uv2.w, uv3.w);\n")?;
    } else {
        out.write_str("clipPos = float4(rawpos.x, rawpos.y, clipPos.z, clipPos.w);\n")?;
    }

    if uid.num_tex_gens == 0 {
        // Stages without a texgen still read uv0.
        return out.write_str("float3 uv0 = float3(0.0,0.0,0.0);\n");
    }
    for i in 0..uid.num_tex_gens {
        if uid.tex_projection & (1 << i) != 0 {
            writeln!(out, "if (uv{i}.z != 0.0) uv{i}.xy = uv{i}.xy / uv{i}.z;")?;
        }
        writeln!(out, "uv{i}.xy = round(128.0 * uv{i}.xy * texdim[{i}].zw);")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use crate::gx::state::PixelPipelineState;
    use crate::shadergen::dialect::ApiType;
    use crate::shadergen::numeric::NumericMode;

    fn record(num_tex_gens: u8, pixel_lighting: bool) -> PixelShaderUidData {
        let mut state = PixelPipelineState::default();
        state.gen_mode.num_tex_gens = num_tex_gens;
        let host = HostConfig { per_pixel_lighting: pixel_lighting, ..Default::default() };
        PixelShaderUidData::record_globals(&state, &host, ApiType::D3D11.dialect(), NumericMode::Float, RenderMode::Default)
    }

    #[test]
    fn unpacked_interpolants_follow_texgens() {
        let list = interpolants(&record(2, true));
        let names: Vec<String> = list.iter().map(|i| i.name.to_string()).collect();
        assert_eq!(names, ["colors_0", "colors_1", "uv0", "uv1", "clipPos", "Normal"]);
        assert_eq!(list[4].semantic, Semantic::TexCoord(2));
        assert_eq!(list[5].semantic, Semantic::TexCoord(3));
    }

    #[test]
    fn packed_interpolants_widen_the_first_four() {
        let list = interpolants(&record(7, false));
        assert_eq!(list.len(), 9);
        assert_eq!(list[2].components, 4);
        assert_eq!(list[6].components, 3);

        let lit = interpolants(&record(7, true));
        assert_eq!(lit.len(), 10);
        assert!(lit.iter().skip(2).all(|i| i.components == 4));
    }

    #[test]
    fn no_texgens_declares_a_zero_uv0() {
        let uid = record(0, false);
        let cx = Emit { uid: &uid, dialect: ApiType::D3D11.dialect(), num: NumericMode::Float };
        let mut text = String::new();
        write_texgens(&mut text, &cx).unwrap();
        assert!(text.ends_with("float3 uv0 = float3(0.0,0.0,0.0);\n"));
    }
}
