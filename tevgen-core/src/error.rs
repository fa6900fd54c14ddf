//! Error Handling
//!
//! Error types for the shader generator using `thiserror`.
//!
//! # Error Categories
//! - **Output errors**: the fixed-size text buffer overflowed
//! - **Target errors**: a dialect cannot run the requested numeric mode
//! - **Snapshot errors**: out-of-range register values, malformed JSON
//! - **Formatting errors**: a sink refused a write

use thiserror::Error;

use crate::shadergen::{ApiType, NumericMode};

/// Shader generator error types.
///
/// Register decoding is total, so none of these come from a well-formed
/// snapshot; they describe misuse of the buffers, targets or loaders.
#[derive(Error, Debug)]
pub enum ShaderGenError {
    /// The generated text ran past the end of the output buffer.
    #[error("Shader buffer overrun: output exceeded {capacity} bytes and the canary was eaten\nSuggestion: {suggestion}")]
    CanaryEaten { capacity: usize, suggestion: String },

    /// The dialect has no integer math.
    #[error("Numeric mode {mode:?} is not supported by {api:?}\nSuggestion: {suggestion}")]
    UnsupportedNumericMode {
        api: ApiType,
        mode: NumericMode,
        suggestion: String,
    },

    /// A snapshot field holds a value the hardware register cannot encode.
    #[error("Invalid pipeline snapshot: {message}\nSuggestion: {suggestion}")]
    InvalidState { message: String, suggestion: String },

    /// Snapshot JSON could not be parsed.
    #[error("Snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A sink returned `fmt::Error`.
    #[error("Shader text formatting failed")]
    Format,
}

impl ShaderGenError {
    pub fn canary_eaten(capacity: usize) -> Self {
        Self::CanaryEaten {
            capacity,
            suggestion: "Generate into a larger ShaderCode buffer.".to_string(),
        }
    }

    pub fn unsupported_numeric_mode(api: ApiType, mode: NumericMode) -> Self {
        Self::UnsupportedNumericMode {
            api,
            mode,
            suggestion: "Use NumericMode::Float for D3D9-class targets.".to_string(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
            suggestion: "Check the snapshot against the register field widths.".to_string(),
        }
    }
}

impl From<std::fmt::Error> for ShaderGenError {
    #[cold]
    fn from(_: std::fmt::Error) -> Self {
        ShaderGenError::Format
    }
}

pub type Result<T> = std::result::Result<T, ShaderGenError>;
