// Everything after the last TEV stage: specular, alpha test, depth,
// z-texture, fog and the color outputs.

use std::fmt::{self, Write};

use super::lighting::write_attenuation;
use super::numeric::NumericMode;
use super::uid::{AlphaTestUid, DepthSource, FogUid, PixelShaderUidData};
use super::{Emit, RenderMode};
use crate::gx::alpha::{AlphaTestOp, AlphaTestResult, CompareMode};
use crate::gx::depth::ZTexOp;
use crate::gx::fog::{FogFunction, FogProjection};

/// Depth is carried as a 24-bit integer in a float.
const DEPTH_RANGE: &str = "16777216.0";

fn write_specular(out: &mut dyn Write, cx: &Emit<'_>) -> fmt::Result {
    out.write_str("// normal-mapped specular\n")?;
    out.write_str("float3 dpx = ddx(pos), dpy = ddy(pos);\n")?;
    out.write_str("float2 duvx = ddx(nrm_coord), duvy = ddy(nrm_coord);\n")?;
    out.write_str("float3 dpy_perp = cross(dpy, _norm0), dpx_perp = cross(_norm0, dpx);\n")?;
    out.write_str("float3 tangent = dpy_perp * duvx.x + dpx_perp * duvy.x;\n")?;
    out.write_str("float3 binormal = dpy_perp * duvx.y + dpx_perp * duvy.y;\n")?;
    out.write_str("float tbn_scale = rsqrt(max(dot(tangent, tangent), dot(binormal, binormal)));\n")?;
    out.write_str(
        "_norm0 = normalize(tangent * tbn_scale * nrm_acc.x + binormal * tbn_scale * nrm_acc.y + _norm0 * nrm_acc.z);\n",
    )?;
    out.write_str("float3 View = normalize(-pos);\nfloat4 spec = float4(0.0,0.0,0.0,0.0);\n")?;

    let chan = &cx.uid.lighting.color[0];
    for light in 0..8u8 {
        if chan.light_mask & (1 << light) == 0 {
            continue;
        }
        write_attenuation(out, light, chan.attn_fn, chan.diff_fn)?;
        writeln!(
            out,
            "spec.rgb += attn * pow(saturate(dot(normalize(ldir + View), _norm0)), 4.0 + 60.0 * saturate(nrm_acc.w)) * cplight[{}].rgb;",
            5 * u32::from(light)
        )?;
    }
    match cx.num {
        NumericMode::Float => out.write_str("prev.rgb = clamp(prev.rgb + round(spec.rgb), 0.0, 255.0);\n"),
        NumericMode::Integer => out.write_str("prev.rgb = clamp(prev.rgb + int3(round(spec.rgb)), 0, 255);\n"),
    }
}

fn alpha_compare(mode: CompareMode) -> &'static str {
    match mode {
        CompareMode::Never => "(false)",
        CompareMode::Less => "(prev.a <  {})",
        CompareMode::Equal => "(prev.a == {})",
        CompareMode::LessEqual => "(prev.a <= {})",
        CompareMode::Greater => "(prev.a >  {})",
        CompareMode::NotEqual => "(prev.a != {})",
        CompareMode::GreaterEqual => "(prev.a >= {})",
        CompareMode::Always => "(true)",
    }
}

fn write_compare(out: &mut dyn Write, mode: CompareMode, reference: &str) -> fmt::Result {
    out.write_str(&alpha_compare(mode).replace("{}", reference))
}

fn write_alpha_test(out: &mut dyn Write, cx: &Emit<'_>, test: &AlphaTestUid) -> fmt::Result {
    let (ref0, ref1) = match cx.num {
        NumericMode::Float => ("alphaRef.r", "alphaRef.g"),
        NumericMode::Integer => ("int(alphaRef.r)", "int(alphaRef.g)"),
    };
    let logic = match test.logic {
        AlphaTestOp::And => " && ",
        AlphaTestOp::Or => " || ",
        AlphaTestOp::Xor => " != ",
        AlphaTestOp::Xnor => " == ",
    };

    out.write_str("if(!( ")?;
    write_compare(out, test.comp0, ref0)?;
    out.write_str(logic)?;
    write_compare(out, test.comp1, ref1)?;
    out.write_str(" )) {\n")?;

    out.write_str("\tocol0 = float4(0.0,0.0,0.0,0.0);\n")?;
    if cx.uid.render_mode == RenderMode::DualSourceBlend {
        out.write_str("\tocol1 = float4(0.0,0.0,0.0,0.0);\n")?;
    }
    if cx.uid.per_pixel_depth {
        out.write_str("\tdepth = 1.0;\n")?;
    }
    // Discarding would skip the depth write an early test already made.
    if !test.zcomploc_hack {
        for line in cx.dialect.discard().lines() {
            writeln!(out, "\t{line}")?;
        }
    }
    out.write_str("}\n")
}

fn write_depth_source(out: &mut dyn Write, source: DepthSource) -> fmt::Result {
    match source {
        DepthSource::Frozen => {
            out.write_str("float2 screenpos = rawpos.xy * cefbscale.xy;\n")?;
            out.write_str("float zCoord = czslope.z + czslope.x * screenpos.x + czslope.y * screenpos.y;\n")
        }
        DepthSource::Rasterizer => writeln!(out, "float zCoord = rawpos.z * {DEPTH_RANGE};"),
        DepthSource::Perspective => {
            out.write_str("float zCoord = czbias[1].x + (clipPos.z / clipPos.w) * czbias[1].y;\n")
        }
    }
}

fn write_ztexture(out: &mut dyn Write, op: ZTexOp) -> fmt::Result {
    let accumulate = if op == ZTexOp::Add { " + zCoord" } else { "" };
    writeln!(out, "zCoord = dot(czbias[0].xyzw, float4(tex_t)) + czbias[1].w{accumulate};")
}

fn write_fog(out: &mut dyn Write, num: NumericMode, fog: &FogUid) -> fmt::Result {
    match fog.proj {
        FogProjection::Perspective => writeln!(
            out,
            "float ze = (cfogf[0].x * {DEPTH_RANGE}) / (cfogi.y - trunc(zCoord / exp2(cfogi.w)));"
        )?,
        FogProjection::Orthographic => writeln!(out, "float ze = cfogf[0].x * zCoord / {DEPTH_RANGE};")?,
    }

    if fog.range_adjust {
        // Distance from the viewport center, from the fog range table.
        out.write_str("float x_adjust = (2.0 * (clipPos.x / cfogf[0].w)) - 1.0 - cfogf[0].z;\n")?;
        out.write_str("x_adjust = sqrt(x_adjust * x_adjust + cfogf[1].x * cfogf[1].x) / cfogf[1].x;\n")?;
        out.write_str("ze *= x_adjust;\n")?;
    }

    out.write_str("float fog = clamp(ze - cfogf[0].y, 0.0, 1.0);\n")?;
    match fog.fsel {
        FogFunction::Exp => out.write_str("fog = 1.0 - exp2(-8.0 * fog);\n")?,
        FogFunction::Exp2 => out.write_str("fog = 1.0 - exp2(-8.0 * fog * fog);\n")?,
        FogFunction::BackwardsExp => out.write_str("fog = exp2(-8.0 * (1.0 - fog));\n")?,
        FogFunction::BackwardsExp2 => out.write_str("fog = 1.0 - fog;\nfog = exp2(-8.0 * fog * fog);\n")?,
        _ => {}
    }

    match num {
        NumericMode::Float => {
            out.write_str("float ifog = round(fog * 256.0);\n")?;
            out.write_str("prev.rgb = trunc((prev.rgb * (256.0 - ifog) + cfogcolor.rgb * ifog) * (1.0/256.0));\n")
        }
        NumericMode::Integer => {
            out.write_str("int ifog = int(round(fog * 256.0));\n")?;
            out.write_str("prev.rgb = (prev.rgb * (256 - ifog) + int3(cfogcolor.rgb) * ifog) >> 8;\n")
        }
    }
}

fn write_outputs(out: &mut dyn Write, cx: &Emit<'_>) -> fmt::Result {
    let uid = cx.uid;
    if uid.render_mode == RenderMode::AlphaPass {
        return match cx.num {
            NumericMode::Float => out.write_str("ocol0 = float4(prev.rgb, alphaRef.a) * (1.0/255.0);\n"),
            NumericMode::Integer => {
                out.write_str("ocol0 = float4(float3(prev.rgb), alphaRef.a) * (1.0/255.0);\n")
            }
        };
    }

    if uid.fog.fsel != FogFunction::Off {
        write_fog(out, cx.num, &uid.fog)?;
    }
    out.write_str("ocol0 = float4(prev) * (1.0/255.0);\n")?;

    if uid.render_mode == RenderMode::DualSourceBlend {
        if cx.dialect.dual_source_replicates_alpha() {
            out.write_str("ocol1 = float4(prev.a, prev.a, prev.a, 0.0) * (1.0/255.0);\n")?;
        } else {
            out.write_str("ocol1 = float4(prev) * (1.0/255.0);\n")?;
        }
        // Blending reads the constant destination alpha from ocol0.
        out.write_str("ocol0.a = alphaRef.a*(1.0/255.0);\n")?;
    }
    Ok(())
}

/// Writes the epilogue and closes the entry point. Expects `prev` to hold
/// the wrapped result of the last stage.
pub fn write_epilogue(out: &mut dyn Write, cx: &Emit<'_>) -> fmt::Result {
    let uid: &PixelShaderUidData = cx.uid;

    if uid.specular() {
        write_specular(out, cx)?;
    }

    if uid.alpha_test.pretest != AlphaTestResult::Pass {
        write_alpha_test(out, cx, &uid.alpha_test)?;
    }

    write_depth_source(out, uid.depth_source)?;
    let depth_write = format!("depth = zCoord / {DEPTH_RANGE};\n");
    if uid.per_pixel_depth && uid.early_ztest {
        out.write_str(&depth_write)?;
    }
    if uid.ztex_op != ZTexOp::Disable {
        write_ztexture(out, uid.ztex_op)?;
    }
    if uid.per_pixel_depth && !uid.early_ztest {
        out.write_str(&depth_write)?;
    }

    write_outputs(out, cx)?;

    if uid.bounding_box {
        cx.dialect.write_bounding_box_update(out)?;
    }
    cx.dialect.end_entry(out)
}
