//! TEV pixel shader generator.
//!
//! Translates a GameCube GPU register snapshot ([`gx::PixelPipelineState`])
//! into pixel shader source for one of several dialects, together with a
//! [`PixelShaderUid`] that identifies every snapshot producing the same text.
//!
//! # Modules
//! - [`gx`]: the register snapshot
//! - [`shadergen`]: the generator, dialects and UID
//! - [`cache`]: UID-keyed cache of generated text
//! - [`reference`]: software model of the combiner and alpha test
//! - [`config`]: host and backend settings
//! - [`error`]: error types

pub mod cache;
pub mod config;
pub mod error;
pub mod gx;
pub mod reference;
pub mod shadergen;

pub use cache::ShaderCache;
pub use config::{BackendInfo, HostConfig};
pub use error::{Result, ShaderGenError};
pub use gx::PixelPipelineState;
pub use shadergen::{
    generate_into, generate_pixel_shader, pixel_shader_uid, ApiType, GeneratedShader, NullSink, NumericMode,
    PixelShaderUid, RenderMode, ShaderCode, ShaderSink, ShaderTarget,
};
