// Unit tests for the TEV overflow tracker
use proptest::prelude::*;
use tevgen_core::gx::tev::{TevColorArg, TevRegId};
use tevgen_core::shadergen::overflow::{OverflowTracker, TevSource};
use tevgen_core::{generate_pixel_shader, ApiType, HostConfig, NumericMode, PixelPipelineState, RenderMode, ShaderTarget};

const REGS: [TevRegId; 4] = [TevRegId::Prev, TevRegId::Reg0, TevRegId::Reg1, TevRegId::Reg2];

proptest! {
    #[test]
    fn test_last_write_decides_boundedness(writes in prop::collection::vec((0u8..4, any::<bool>(), 0u8..4, any::<bool>()), 0..24)) {
        let mut tracker = OverflowTracker::new();
        let mut color_clamp: [Option<bool>; 4] = [None; 4];
        let mut alpha_clamp: [Option<bool>; 4] = [None; 4];
        for &(cd, cc, ad, ac) in &writes {
            tracker.record_stage(TevRegId::from_raw(cd), cc, TevRegId::from_raw(ad), ac);
            color_clamp[cd as usize] = Some(cc);
            alpha_clamp[ad as usize] = Some(ac);
        }
        for (i, reg) in REGS.into_iter().enumerate() {
            // Registers nobody wrote keep their unknown starting state.
            prop_assert_eq!(tracker.is_bounded(TevSource::color_dest(reg)), color_clamp[i].unwrap_or(false));
            prop_assert_eq!(tracker.is_bounded(TevSource::alpha_dest(reg)), alpha_clamp[i].unwrap_or(false));
        }
        prop_assert!(tracker.is_bounded(TevSource::TexC));
        prop_assert!(tracker.is_bounded(TevSource::Half));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stage `n` reads CPREV as `a` and writes prev with the given clamp.
    fn chain(clamps: &[bool]) -> PixelPipelineState {
        let mut state = PixelPipelineState::default();
        state.gen_mode.num_tev_stages = clamps.len() as u8;
        for (stage, &clamp) in state.stages.iter_mut().zip(clamps) {
            stage.color.a = TevColorArg::Cprev;
            stage.color.clamp = clamp;
        }
        state
    }

    fn stage_texts(state: &PixelPipelineState) -> Vec<String> {
        let target = ShaderTarget::new(ApiType::OpenGl, NumericMode::Float).unwrap();
        let code = generate_pixel_shader(state, &HostConfig::default(), target, RenderMode::Default)
            .unwrap()
            .code
            .unwrap();
        code.split("// TEV stage ").skip(1).map(str::to_string).collect()
    }

    const WRAPPED: &str = "tin_a = CHK_O_U8(float4(prev.rgb,0.0));";
    const PLAIN: &str = "tin_a = (float4(prev.rgb,0.0));";

    #[test]
    fn test_clamped_chain_stays_bounded() {
        let stages = stage_texts(&chain(&[true, true, true]));
        assert_eq!(stages.len(), 3);
        // prev is unknown until the first stage clamps it.
        assert!(stages[0].contains(WRAPPED));
        assert!(stages[1].contains(PLAIN));
        assert!(stages[2].contains(PLAIN));
    }

    #[test]
    fn test_unclamped_stage_wraps_until_reclamped() {
        let stages = stage_texts(&chain(&[true, false, true, true]));
        assert!(stages[1].contains(PLAIN));
        assert!(stages[2].contains(WRAPPED));
        assert!(stages[3].contains(PLAIN));
    }

    #[test]
    fn test_unclamped_last_stage_wraps_output() {
        let target = ShaderTarget::new(ApiType::Vulkan, NumericMode::Integer).unwrap();
        let code = generate_pixel_shader(&chain(&[false]), &HostConfig::default(), target, RenderMode::Default)
            .unwrap()
            .code
            .unwrap();
        assert!(code.contains("prev = CHK_O_U8(prev);"));
    }

    #[test]
    fn test_raster_and_konst_sources() {
        let mut tracker = OverflowTracker::new();
        tracker.set_raster(false);
        assert!(tracker.is_bounded(TevSource::RasC));
        tracker.set_raster(true);
        assert!(!tracker.is_bounded(TevSource::RasA));
        tracker.set_konst(false);
        assert!(!tracker.needs_wrap(TevColorArg::Konst, tevgen_core::gx::tev::TevAlphaArg::Zero));
        tracker.set_konst(true);
        assert!(tracker.needs_wrap(TevColorArg::Konst, tevgen_core::gx::tev::TevAlphaArg::Zero));
    }
}
