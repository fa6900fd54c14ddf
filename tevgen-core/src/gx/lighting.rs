//! XF color channel (lighting) configuration consumed by per-pixel lighting.
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSrc {
    #[default]
    Register = 0,
    Vertex = 1,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiffuseFunction {
    #[default]
    None = 0,
    Sign = 1,
    Clamp = 2,
}

/// Attenuation mode. The hardware's "none" and "directional" codes
/// behave identically and both map to `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttenuationFunction {
    Spec = 0,
    Spot = 1,
    #[default]
    None = 2,
}

/// A single lit channel (material + ambient + light enable).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LitChannel {
    pub enabled: bool,
    pub mat_src: ColorSrc,
    pub amb_src: ColorSrc,
    pub light_mask: u8,
    pub diff_fn: DiffuseFunction,
    pub attn_fn: AttenuationFunction,
}

impl LitChannel {
    /// Builds a channel from the raw XF `chan_ctrl` fields.
    pub fn from_raw(enable: bool, amb_src: u8, mat_src: u8, light_mask: u8, diff_fn: u8, attn_fn: u8) -> Self {
        Self {
            enabled: enable,
            amb_src: if amb_src == 0 { ColorSrc::Register } else { ColorSrc::Vertex },
            mat_src: if mat_src == 0 { ColorSrc::Register } else { ColorSrc::Vertex },
            light_mask,
            diff_fn: match diff_fn {
                1 => DiffuseFunction::Sign,
                2 => DiffuseFunction::Clamp,
                _ => DiffuseFunction::None,
            },
            attn_fn: match attn_fn & 0x3 {
                0 => AttenuationFunction::Spec,
                1 => AttenuationFunction::Spot,
                _ => AttenuationFunction::None,
            },
        }
    }
}

/// Vertex colors present in the current vertex format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexComponents {
    pub color0: bool,
    pub color1: bool,
}

impl VertexComponents {
    pub fn has_color(&self, channel: usize) -> bool {
        match channel {
            0 => self.color0,
            _ => self.color1,
        }
    }
}

/// Lighting state for the two color channels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LightingState {
    pub num_color_chans: u8,
    pub color: [LitChannel; 2],
    pub alpha: [LitChannel; 2],
    pub components: VertexComponents,
}

impl LightingState {
    pub fn set_num_channels(&mut self, n: u8) {
        self.num_color_chans = n.min(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_attenuation_codes() {
        assert_eq!(LitChannel::from_raw(true, 0, 0, 1, 2, 0).attn_fn, AttenuationFunction::Spec);
        assert_eq!(LitChannel::from_raw(true, 0, 0, 1, 2, 1).attn_fn, AttenuationFunction::Spot);
        assert_eq!(LitChannel::from_raw(true, 0, 0, 1, 2, 2).attn_fn, AttenuationFunction::None);
        assert_eq!(LitChannel::from_raw(true, 0, 0, 1, 2, 3).attn_fn, AttenuationFunction::None);
    }

    #[test]
    fn num_channels_is_clamped() {
        let mut state = LightingState::default();
        state.set_num_channels(5);
        assert_eq!(state.num_color_chans, 2);
    }
}
