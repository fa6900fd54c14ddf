// Host/backend settings that influence shader generation.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Capabilities of the backend the shaders are compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendInfo {
    /// Early depth test can be forced from the shader.
    pub supports_early_z: bool,
    pub supports_dual_source_blend: bool,
    pub supports_bounding_box: bool,
    pub supports_pixel_lighting: bool,
}

impl Default for BackendInfo {
    fn default() -> Self {
        Self {
            supports_early_z: true,
            supports_dual_source_blend: true,
            supports_bounding_box: false,
            supports_pixel_lighting: true,
        }
    }
}

/// User and backend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Take depth from the rasterizer instead of recomputing it.
    pub fast_depth_calc: bool,
    pub per_pixel_lighting: bool,
    pub bounding_box: bool,
    pub msaa: bool,
    pub ssaa: bool,
    pub backend: BackendInfo,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            fast_depth_calc: true,
            per_pixel_lighting: false,
            bounding_box: false,
            msaa: false,
            ssaa: false,
            backend: BackendInfo::default(),
        }
    }
}

impl HostConfig {
    /// Loads a JSON config, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: HostConfig =
                serde_json::from_str(&content).context("Failed to parse config file")?;
            Ok(config)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Per-pixel lighting is requested and the backend can run it.
    pub fn pixel_lighting_enabled(&self) -> bool {
        self.per_pixel_lighting && self.backend.supports_pixel_lighting
    }

    pub fn bounding_box_enabled(&self) -> bool {
        self.bounding_box && self.backend.supports_bounding_box
    }
}
