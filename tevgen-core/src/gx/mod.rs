// GX (Graphics eXecutor) register snapshot consumed by the shader generator.
//
// Submodules mirror the hardware register groups. `state` aggregates them
// into the `PixelPipelineState` handed to `shadergen`.

pub mod alpha;
pub mod depth;
pub mod fog;
pub mod indirect;
pub mod lighting;
pub mod state;
pub mod tev;

pub use self::state::{GenMode, PixelPipelineState, TexProjection};
