// CLI command handlers
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use tevgen_core::{
    generate_pixel_shader, pixel_shader_uid, ApiType, HostConfig, NumericMode, PixelPipelineState, RenderMode,
    ShaderCache, ShaderTarget,
};

/// Target settings shared by every subcommand.
pub struct TargetArgs {
    pub api: ApiType,
    pub numeric: NumericMode,
    pub render_mode: RenderMode,
    pub config: Option<PathBuf>,
}

impl TargetArgs {
    fn target(&self, strict: bool) -> Result<ShaderTarget> {
        if strict {
            ShaderTarget::new(self.api, self.numeric).context("Invalid shader target")
        } else {
            Ok(ShaderTarget::or_float(self.api, self.numeric))
        }
    }

    fn host(&self) -> Result<HostConfig> {
        match &self.config {
            Some(path) => HostConfig::load(path),
            None => Ok(HostConfig::default()),
        }
    }
}

pub fn parse_numeric(s: &str) -> std::result::Result<NumericMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "float" | "f" => Ok(NumericMode::Float),
        "integer" | "int" | "i" => Ok(NumericMode::Integer),
        other => Err(format!("unknown numeric mode '{other}' (expected float or integer)")),
    }
}

fn read_snapshot(path: &Path) -> Result<PixelPipelineState> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    PixelPipelineState::from_json(&text).with_context(|| format!("Invalid snapshot: {}", path.display()))
}

fn shader_extension(api: ApiType) -> &'static str {
    match api {
        ApiType::OpenGl | ApiType::Vulkan => "glsl",
        _ => "hlsl",
    }
}

pub fn generate(snapshot: &Path, args: &TargetArgs, output: Option<&Path>) -> Result<()> {
    let state = read_snapshot(snapshot)?;
    let host = args.host()?;
    let shader = generate_pixel_shader(&state, &host, args.target(true)?, args.render_mode)
        .context("Failed to generate pixel shader")?;
    let code = shader.code.unwrap_or_default();

    match output {
        Some(path) => {
            fs::write(path, &code).with_context(|| format!("Failed to write shader: {}", path.display()))?;
            println!("Wrote {} ({} bytes, uid {})", path.display(), code.len(), shader.uid);
        }
        None => print!("{code}"),
    }
    Ok(())
}

pub fn uid(snapshot: &Path, args: &TargetArgs) -> Result<()> {
    let state = read_snapshot(snapshot)?;
    let host = args.host()?;
    let uid = pixel_shader_uid(&state, &host, args.target(true)?, args.render_mode)
        .context("Failed to compute shader UID")?;
    println!("hash: {uid}");
    println!("bits: {}", uid.bit_len());
    println!("key:  {}", uid.to_hex());
    Ok(())
}

pub fn template(output: Option<&Path>, config: bool) -> Result<()> {
    let json = if config {
        serde_json::to_string_pretty(&HostConfig::default()).context("Failed to serialize config")?
    } else {
        serde_json::to_string_pretty(&PixelPipelineState::default()).context("Failed to serialize snapshot")?
    };
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write template: {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Snapshot files in `dir`, sorted by name.
fn collect_snapshots(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))? {
        let path = entry.context("Failed to read directory entry")?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Generates every snapshot in `input_dir`, writing one file per distinct
/// shader into `output_dir`.
pub fn batch(input_dir: &Path, output_dir: &Path, args: &TargetArgs, pb: &ProgressBar) -> Result<()> {
    let snapshots = collect_snapshots(input_dir)?;
    let host = args.host()?;
    // Batches tolerate D3D9 plus integer and fall back to float.
    let target = args.target(false)?;
    fs::create_dir_all(output_dir).context("Failed to create output directory")?;

    pb.set_length(snapshots.len() as u64);
    let mut cache = ShaderCache::new();
    for path in &snapshots {
        pb.set_message(path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
        let state = read_snapshot(path)?;
        let misses = cache.misses();
        let (uid, code) = cache
            .get_or_generate(&state, &host, target, args.render_mode)
            .with_context(|| format!("Failed to generate shader for {}", path.display()))?;
        if cache.misses() != misses {
            let out = output_dir.join(format!("ps_{uid}.{}", shader_extension(target.api())));
            fs::write(&out, code.as_bytes()).with_context(|| format!("Failed to write shader: {}", out.display()))?;
        }
        log::info!("{} -> {uid}", path.display());
        pb.inc(1);
    }
    pb.finish_with_message("Batch complete");

    println!(
        "{} snapshots, {} unique shaders ({} cache hits) written to {}",
        snapshots.len(),
        cache.len(),
        cache.hits(),
        output_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("Int"), Ok(NumericMode::Integer));
        assert_eq!(parse_numeric("float"), Ok(NumericMode::Float));
        assert!(parse_numeric("fixed").is_err());
    }

    #[test]
    fn test_template_round_trips_through_validation() {
        let json = serde_json::to_string_pretty(&PixelPipelineState::default()).unwrap();
        assert_eq!(PixelPipelineState::from_json(&json).unwrap(), PixelPipelineState::default());
    }
}
