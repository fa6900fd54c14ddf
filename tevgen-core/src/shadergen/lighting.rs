// Per-pixel lighting for the vertex color channels.
//
// Runs before the TEV stages and overwrites `colors_0` / `colors_1` with
// the lit result, in the same 0..1 range the interpolants arrive in.

use std::fmt::{self, Write};

use super::uid::{ChannelInput, ChannelUid};
use super::Emit;
use crate::gx::lighting::{AttenuationFunction, DiffuseFunction};

/// Lights per channel.
const NUM_LIGHTS: u8 = 8;

fn write_input(out: &mut dyn Write, input: ChannelInput, register: usize, component: &str) -> fmt::Result {
    let dot = if component.is_empty() { "" } else { "." };
    match input {
        ChannelInput::Register => write!(out, "cpmtrl[{register}]{dot}{component}"),
        ChannelInput::Vertex(v) => write!(out, "round(colors_{v}{dot}{component} * 255.0)"),
        ChannelInput::White if component.is_empty() => out.write_str("float4(255.0,255.0,255.0,255.0)"),
        ChannelInput::White => out.write_str("255.0"),
    }
}

/// Direction and attenuation of light `i`, leaving `ldir` and `attn` set.
pub fn write_attenuation(
    out: &mut dyn Write,
    light: u8,
    attn_fn: AttenuationFunction,
    diff_fn: DiffuseFunction,
) -> fmt::Result {
    let base = 5 * u32::from(light);
    writeln!(out, "ldir = cplight[{}].xyz - pos.xyz;", base + 3)?;
    match attn_fn {
        AttenuationFunction::None => {
            out.write_str("ldir = normalize(ldir);\n")?;
            out.write_str("attn = 1.0;\n")?;
            out.write_str("if (length(ldir) == 0.0)\n\t ldir = _norm0;\n")?;
        }
        AttenuationFunction::Spec => {
            out.write_str("ldir = normalize(ldir);\n")?;
            writeln!(
                out,
                "attn = (dot(_norm0, ldir) >= 0.0) ? max(0.0, dot(_norm0, cplight[{}].xyz)) : 0.0;",
                base + 4
            )?;
            let normalize = if diff_fn == DiffuseFunction::None { "" } else { "normalize" };
            writeln!(
                out,
                "attn = max(0.0, dot(cplight[{}].xyz, float3(1.0, attn, attn*attn))) / dot({normalize}(cplight[{}].xyz), float3(1.0, attn, attn*attn));",
                base + 1,
                base + 2
            )?;
        }
        AttenuationFunction::Spot => {
            out.write_str("dist2 = dot(ldir, ldir);\ndist = sqrt(dist2);\nldir = ldir / dist;\n")?;
            writeln!(out, "attn = max(0.0, dot(ldir, cplight[{}].xyz));", base + 4)?;
            writeln!(
                out,
                "attn = max(0.0, dot(cplight[{}].xyz, float3(1.0, attn, attn*attn))) / dot(cplight[{}].xyz, float3(1.0,dist,dist2));",
                base + 1,
                base + 2
            )?;
        }
    }
    Ok(())
}

fn write_light(out: &mut dyn Write, light: u8, chan: &ChannelUid, swizzle: &str) -> fmt::Result {
    write_attenuation(out, light, chan.attn_fn, chan.diff_fn)?;
    let color = 5 * u32::from(light);
    match chan.diff_fn {
        DiffuseFunction::None => writeln!(out, "lacc.{swizzle} += round(attn * cplight[{color}].{swizzle});")?,
        DiffuseFunction::Sign => writeln!(
            out,
            "lacc.{swizzle} += round(attn * (dot(ldir, _norm0)) * cplight[{color}].{swizzle});"
        )?,
        DiffuseFunction::Clamp => writeln!(
            out,
            "lacc.{swizzle} += round(attn * max(0.0,dot(ldir, _norm0)) * cplight[{color}].{swizzle});"
        )?,
    }
    out.write_str("\n")
}

fn write_lights(out: &mut dyn Write, chan: &ChannelUid, swizzle: &str) -> fmt::Result {
    if !chan.enabled {
        return Ok(());
    }
    for light in 0..NUM_LIGHTS {
        if chan.light_mask & (1 << light) != 0 {
            write_light(out, light, chan, swizzle)?;
        }
    }
    Ok(())
}

/// Lights every recorded color channel.
pub fn write_lighting(out: &mut dyn Write, cx: &Emit<'_>) -> fmt::Result {
    let lighting = &cx.uid.lighting;
    for j in 0..lighting.num_color_chans as usize {
        let color = &lighting.color[j];
        let alpha = &lighting.alpha[j];
        out.write_str("{\n")?;

        out.write_str("mat = ")?;
        write_input(out, color.mat, j + 2, "")?;
        out.write_str(";\n")?;
        out.write_str("lacc = ")?;
        if color.enabled {
            write_input(out, color.amb, j, "")?;
        } else {
            write_input(out, ChannelInput::White, j, "")?;
        }
        out.write_str(";\n")?;

        out.write_str("mat.w = ")?;
        write_input(out, alpha.mat, j + 2, "w")?;
        out.write_str(";\n")?;
        out.write_str("lacc.w = ")?;
        if alpha.enabled {
            write_input(out, alpha.amb, j, "w")?;
        } else {
            write_input(out, ChannelInput::White, j, "w")?;
        }
        out.write_str(";\n")?;

        write_lights(out, color, "rgb")?;
        write_lights(out, alpha, "a")?;

        if cx.num.is_integer() {
            out.write_str("ilacc = int4(lacc);\n")?;
            out.write_str("ilacc = clamp(ilacc, 0, 255);\n")?;
            out.write_str("ilacc += ilacc >> 7;\n")?;
            writeln!(out, "colors_{j} = float4((int4(mat) * ilacc) >> 8) / 255.0;")?;
        } else {
            out.write_str("lacc = clamp(lacc, 0.0, 255.0);\n")?;
            out.write_str("lacc = lacc + floor(lacc / 128.0);\n")?;
            writeln!(out, "colors_{j} = floor((mat * lacc)/256.0)/255.0;")?;
        }
        out.write_str("}\n")?;
    }
    Ok(())
}
