// Unit tests for dialect output
#[cfg(test)]
mod tests {
    use tevgen_core::gx::fog::FogFunction;
    use tevgen_core::gx::tev::{RasColorChan, TevColorArg};
    use tevgen_core::{
        generate_pixel_shader, ApiType, HostConfig, NumericMode, PixelPipelineState, RenderMode, ShaderGenError,
        ShaderTarget,
    };

    fn textured_state() -> PixelPipelineState {
        let mut state = PixelPipelineState::default();
        state.gen_mode.num_tev_stages = 2;
        state.gen_mode.num_tex_gens = 2;
        state.stages[0].color.a = TevColorArg::TexC;
        state.stages[0].color.b = TevColorArg::RasC;
        state.stages[0].order.enable = true;
        state.stages[0].order.color_chan = RasColorChan::Color0;
        state.stages[1].color.d = TevColorArg::C0;
        state.fog.fsel = FogFunction::Exp;
        state
    }

    #[test]
    fn test_every_dialect_generates() {
        let state = textured_state();
        let host = HostConfig::default();
        for api in ApiType::ALL {
            for numeric in [NumericMode::Float, NumericMode::Integer] {
                let target = match ShaderTarget::new(api, numeric) {
                    Ok(target) => target,
                    Err(err) => {
                        assert!(api.is_d3d9() && numeric == NumericMode::Integer, "{err}");
                        assert!(matches!(err, ShaderGenError::UnsupportedNumericMode { .. }));
                        continue;
                    }
                };
                for mode in RenderMode::ALL {
                    let text = generate_pixel_shader(&state, &host, target, mode).unwrap().code.unwrap();
                    let opens = text.matches('{').count();
                    let closes = text.matches('}').count();
                    assert_eq!(opens, closes, "{api} / {numeric} / {mode}");
                    assert!(text.starts_with("//Pixel Shader for TEV stages\n//2 TEV stages, 2 texgens, 0 IND stages\n"));
                    assert!(text.ends_with("}\n"), "{api} / {numeric} / {mode}");
                }
            }
        }
    }

    #[test]
    fn test_entry_point_per_dialect() {
        let state = textured_state();
        let host = HostConfig::default();
        let gl = generate_pixel_shader(
            &state,
            &host,
            ShaderTarget::new(ApiType::OpenGl, NumericMode::Float).unwrap(),
            RenderMode::Default,
        )
        .unwrap();
        assert!(gl.code.unwrap().contains("void main()\n{\n"));

        let dx = generate_pixel_shader(
            &state,
            &host,
            ShaderTarget::new(ApiType::D3D11, NumericMode::Float).unwrap(),
            RenderMode::Default,
        )
        .unwrap();
        assert!(dx.code.unwrap().contains("cbuffer PSBlock : register(b0) {\n"));
    }

    #[test]
    fn test_fog_only_outside_alpha_pass() {
        let state = textured_state();
        let host = HostConfig::default();
        let target = ShaderTarget::new(ApiType::Vulkan, NumericMode::Float).unwrap();
        let default = generate_pixel_shader(&state, &host, target, RenderMode::Default).unwrap().code.unwrap();
        let alpha_pass = generate_pixel_shader(&state, &host, target, RenderMode::AlphaPass).unwrap().code.unwrap();
        assert!(default.contains("cfogcolor"));
        assert!(default.contains("exp2(-8.0 * fog)"));
        assert!(!alpha_pass.contains("exp2(-8.0 * fog)"));
    }
}
