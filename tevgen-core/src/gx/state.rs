// Immutable snapshot of the pixel-pipeline registers.
//
// `PixelPipelineState` gathers every BP/XF field the pixel shader generator
// reads: gen mode, the 16 TEV stages, the swap table, indirect references,
// alpha test, fog, z-texture, depth mode and the lighting channels. It is
// plain data; the generator never mutates it.

use serde::{Deserialize, Serialize};

use super::alpha::AlphaTest;
use super::depth::{DepthMode, ZTexture};
use super::fog::FogParams;
use super::indirect::IndirectRef;
use super::lighting::LightingState;
use super::tev::{SwapMode, TevStage};
use crate::error::ShaderGenError;

pub const MAX_TEV_STAGES: usize = 16;
pub const MAX_TEX_GENS: usize = 8;
pub const MAX_IND_STAGES: usize = 4;

// ---------------------------------------------------------------------------
// Gen mode
// ---------------------------------------------------------------------------

/// GEN_MODE register fields that shape the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenMode {
    /// Active TEV stages, 1..16.
    pub num_tev_stages: u8,
    /// Active texture coordinate generators, 0..8.
    pub num_tex_gens: u8,
    /// Active indirect stages, 0..4.
    pub num_ind_stages: u8,
    /// Depth is frozen to the slope of a reference primitive.
    pub z_freeze: bool,
}

impl Default for GenMode {
    fn default() -> Self {
        Self {
            num_tev_stages: 1,
            num_tex_gens: 0,
            num_ind_stages: 0,
            z_freeze: false,
        }
    }
}

/// Texgen output projection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TexProjection {
    #[default]
    St = 0,
    /// Homogeneous coordinate; divided by q in the pixel shader.
    Stq = 1,
}

// ---------------------------------------------------------------------------
// Pipeline snapshot
// ---------------------------------------------------------------------------

/// Everything the pixel shader generator consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelPipelineState {
    pub gen_mode: GenMode,
    pub stages: [TevStage; MAX_TEV_STAGES],
    pub swap_table: [SwapMode; 4],
    pub ind_refs: [IndirectRef; MAX_IND_STAGES],
    pub alpha_test: AlphaTest,
    pub fog: FogParams,
    pub ztex: ZTexture,
    pub depth: DepthMode,
    pub lighting: LightingState,
    pub tex_projection: [TexProjection; MAX_TEX_GENS],
    /// Bit `n` set: texture map `n` has a normal map bound in sampler `8 + n`.
    pub normal_map_mask: u8,
}

impl Default for PixelPipelineState {
    fn default() -> Self {
        Self {
            gen_mode: GenMode::default(),
            stages: [TevStage::default(); MAX_TEV_STAGES],
            swap_table: [SwapMode::IDENTITY; 4],
            ind_refs: [IndirectRef::default(); MAX_IND_STAGES],
            alpha_test: AlphaTest::default(),
            fog: FogParams::default(),
            ztex: ZTexture::default(),
            depth: DepthMode::default(),
            lighting: LightingState::default(),
            tex_projection: [TexProjection::St; MAX_TEX_GENS],
            normal_map_mask: 0,
        }
    }
}

impl PixelPipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active TEV stages, clamped to 1..16.
    pub fn num_stages(&self) -> usize {
        (self.gen_mode.num_tev_stages as usize).clamp(1, MAX_TEV_STAGES)
    }

    pub fn num_tex_gens(&self) -> usize {
        (self.gen_mode.num_tex_gens as usize).min(MAX_TEX_GENS)
    }

    pub fn num_ind_stages(&self) -> usize {
        (self.gen_mode.num_ind_stages as usize).min(MAX_IND_STAGES)
    }

    pub fn active_stages(&self) -> &[TevStage] {
        &self.stages[..self.num_stages()]
    }

    /// Parses a JSON snapshot and validates it.
    pub fn from_json(text: &str) -> Result<Self, ShaderGenError> {
        let state: PixelPipelineState = serde_json::from_str(text)?;
        state.validate()?;
        Ok(state)
    }

    /// Rejects values the register fields cannot encode.
    ///
    /// The generator itself masks every field, so this only matters for
    /// snapshots built by hand or loaded from JSON.
    pub fn validate(&self) -> Result<(), ShaderGenError> {
        let gen = &self.gen_mode;
        if gen.num_tev_stages == 0 || gen.num_tev_stages as usize > MAX_TEV_STAGES {
            return Err(ShaderGenError::invalid_state(format!(
                "num_tev_stages is {}, expected 1..={MAX_TEV_STAGES}",
                gen.num_tev_stages
            )));
        }
        if gen.num_tex_gens as usize > MAX_TEX_GENS {
            return Err(ShaderGenError::invalid_state(format!(
                "num_tex_gens is {}, expected at most {MAX_TEX_GENS}",
                gen.num_tex_gens
            )));
        }
        if gen.num_ind_stages as usize > MAX_IND_STAGES {
            return Err(ShaderGenError::invalid_state(format!(
                "num_ind_stages is {}, expected at most {MAX_IND_STAGES}",
                gen.num_ind_stages
            )));
        }
        if self.lighting.num_color_chans > 2 {
            return Err(ShaderGenError::invalid_state(format!(
                "num_color_chans is {}, expected at most 2",
                self.lighting.num_color_chans
            )));
        }
        for (n, stage) in self.active_stages().iter().enumerate() {
            if stage.order.tex_map as usize >= MAX_TEX_GENS || stage.order.tex_coord as usize >= MAX_TEX_GENS {
                return Err(ShaderGenError::invalid_state(format!(
                    "stage {n}: texmap {} / texcoord {} out of range",
                    stage.order.tex_map, stage.order.tex_coord
                )));
            }
            if stage.alpha.ras_swap > 3 || stage.alpha.tex_swap > 3 {
                return Err(ShaderGenError::invalid_state(format!(
                    "stage {n}: swap selects must be 0..=3"
                )));
            }
            if stage.indirect.ind_stage as usize >= MAX_IND_STAGES {
                return Err(ShaderGenError::invalid_state(format!(
                    "stage {n}: indirect stage {} out of range",
                    stage.indirect.ind_stage
                )));
            }
        }
        for (n, iref) in self.ind_refs.iter().enumerate() {
            if iref.tex_map as usize >= MAX_TEX_GENS || iref.tex_coord as usize >= MAX_TEX_GENS {
                return Err(ShaderGenError::invalid_state(format!(
                    "indirect reference {n} out of range"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_valid() {
        let state = PixelPipelineState::new();
        assert!(state.validate().is_ok());
        assert_eq!(state.num_stages(), 1);
        assert_eq!(state.active_stages().len(), 1);
    }

    #[test]
    fn rejects_zero_stages() {
        let mut state = PixelPipelineState::new();
        state.gen_mode.num_tev_stages = 0;
        assert!(matches!(state.validate(), Err(ShaderGenError::InvalidState { .. })));
        // The accessor still clamps for the generator.
        assert_eq!(state.num_stages(), 1);
    }

    #[test]
    fn rejects_out_of_range_texmap() {
        let mut state = PixelPipelineState::new();
        state.stages[0].order.tex_map = 9;
        assert!(state.validate().is_err());
    }

    #[test]
    fn json_snapshot_fills_missing_fields() {
        let state = PixelPipelineState::from_json(r#"{"gen_mode":{"num_tev_stages":3,"num_tex_gens":1,"num_ind_stages":0,"z_freeze":false}}"#)
            .unwrap();
        assert_eq!(state.num_stages(), 3);
        assert_eq!(state.swap_table[2], SwapMode::IDENTITY);
    }

    #[test]
    fn json_snapshot_is_validated() {
        let err = PixelPipelineState::from_json(r#"{"gen_mode":{"num_tev_stages":17,"num_tex_gens":0,"num_ind_stages":0,"z_freeze":false}}"#);
        assert!(err.is_err());
    }
}
