//! TEV pixel shader generation.
//!
//! One traversal of a [`PixelPipelineState`] records the [`PixelShaderUid`]
//! and, when the sink wants text, writes the shader source. Recording runs
//! first; every emitter then reads its decisions back from the recorded UID
//! only, so equal UIDs always mean equal text.
//!
//! Emission order inside `main`:
//! - prologue: registers, per-pixel lighting, texgen normalization
//! - indirect lookups
//! - per stage: indirect offset, raster color, texture fetch, combiners
//! - final `prev` fixup and the epilogue

pub mod combiner;
pub mod dialect;
mod epilogue;
mod indirect;
mod lighting;
pub mod numeric;
pub mod overflow;
mod prologue;
pub mod sink;
pub mod swap;
mod texfetch;
pub mod uid;

use std::fmt::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::HostConfig;
use crate::error::{Result, ShaderGenError};
use crate::gx::state::PixelPipelineState;

pub use self::dialect::{ApiType, ShaderDialect};
pub use self::numeric::NumericMode;
pub use self::overflow::OverflowTracker;
pub use self::sink::{NullSink, ShaderCode, ShaderSink};
pub use self::uid::{PixelShaderUid, PixelShaderUidData};

use self::swap::SwapTable;
use self::uid::StageUid;

// ---------------------------------------------------------------------------
// Targets and modes
// ---------------------------------------------------------------------------

/// How the draw uses destination alpha.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RenderMode {
    #[default]
    Default = 0,
    /// Second pass writing the constant destination alpha.
    AlphaPass = 1,
    /// Constant alpha in `ocol0`, the blend alpha in `ocol1`.
    DualSourceBlend = 2,
    /// Depth only; color is written as zero.
    DepthOnly = 3,
}

impl RenderMode {
    pub const ALL: [RenderMode; 4] =
        [RenderMode::Default, RenderMode::AlphaPass, RenderMode::DualSourceBlend, RenderMode::DepthOnly];

    pub fn name(self) -> &'static str {
        match self {
            RenderMode::Default => "default",
            RenderMode::AlphaPass => "alpha-pass",
            RenderMode::DualSourceBlend => "dual-source",
            RenderMode::DepthOnly => "depth-only",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RenderMode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown render mode '{s}'"))
    }
}

/// Dialect plus numeric mode, validated against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderTarget {
    api: ApiType,
    numeric: NumericMode,
}

impl ShaderTarget {
    /// Fails when the dialect has no integer math and `numeric` asks for it.
    pub fn new(api: ApiType, numeric: NumericMode) -> Result<Self> {
        if numeric.is_integer() && !api.dialect().supports_integer_math() {
            return Err(ShaderGenError::unsupported_numeric_mode(api, numeric));
        }
        Ok(Self { api, numeric })
    }

    /// Like [`ShaderTarget::new`], but falls back to float math.
    pub fn or_float(api: ApiType, numeric: NumericMode) -> Self {
        Self::new(api, numeric).unwrap_or_else(|_| {
            log::warn!("{api} has no integer math, generating in float mode");
            Self { api, numeric: NumericMode::Float }
        })
    }

    pub fn api(&self) -> ApiType {
        self.api
    }

    pub fn numeric(&self) -> NumericMode {
        self.numeric
    }

    pub fn dialect(&self) -> &'static dyn ShaderDialect {
        self.api.dialect()
    }
}

/// Generated source plus its cache key.
#[derive(Debug, Clone)]
pub struct GeneratedShader {
    /// `None` for UID-only generation.
    pub code: Option<String>,
    pub uid: PixelShaderUid,
}

// ---------------------------------------------------------------------------
// Emission context
// ---------------------------------------------------------------------------

/// Read-only inputs of every emitter.
#[derive(Clone, Copy)]
pub struct Emit<'a> {
    pub uid: &'a PixelShaderUidData,
    pub dialect: &'static dyn ShaderDialect,
    pub num: NumericMode,
}

/// State threaded forward through the stage loop.
#[derive(Debug, Default)]
pub struct StageState {
    pub tracker: OverflowTracker,
    /// `colors_N` already scaled to 0..255.
    pub ras_expanded: [bool; 2],
    pub normal_map_seen: bool,
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

fn effective_render_mode(mode: RenderMode, host: &HostConfig) -> RenderMode {
    if mode == RenderMode::DualSourceBlend && !host.backend.supports_dual_source_blend {
        log::warn!("Backend lacks dual-source blending, using a separate alpha pass");
        return RenderMode::AlphaPass;
    }
    mode
}

/// Records the complete UID: globals, then every active stage.
fn record(
    state: &PixelPipelineState,
    host: &HostConfig,
    target: ShaderTarget,
    render_mode: RenderMode,
) -> PixelShaderUidData {
    if state.fog.fsel != state.fog.fsel.canonical() {
        log::warn!("Reserved fog function {:?}, treating it as linear", state.fog.fsel);
    }

    let mut uid = PixelShaderUidData::record_globals(state, host, target.dialect(), target.numeric, render_mode);
    if render_mode == RenderMode::DepthOnly {
        return uid;
    }
    let swap = SwapTable::build(&state.swap_table);
    for n in 0..uid.num_stages as usize {
        let stage = StageUid::record(state, n, &swap, &uid);
        log::trace!(
            "stage {n}: color {:?} -> {:?}, alpha {:?} -> {:?}, tex {}",
            stage.color.inputs(),
            stage.color.dest,
            stage.alpha.inputs(),
            stage.alpha.dest,
            if stage.tex_enabled { "on" } else { "off" }
        );
        uid.stages[n] = stage;
    }
    uid
}

fn write_shader(out: &mut dyn Write, cx: &Emit<'_>) -> fmt::Result {
    let uid = cx.uid;
    prologue::write_header(out, cx)?;
    if !prologue::write_entry(out, cx)? {
        return Ok(());
    }
    prologue::write_registers(out, cx)?;
    if uid.pixel_lighting && uid.lighting.num_color_chans > 0 {
        prologue::write_lighting_inputs(out, cx)?;
        lighting::write_lighting(out, cx)?;
    }
    prologue::write_texgens(out, cx)?;
    indirect::write_lookups(out, cx)?;

    let mut st = StageState::default();
    for (n, stage) in uid.active_stages().iter().enumerate() {
        writeln!(out, "\n// TEV stage {n}")?;
        indirect::write_stage_offset(out, cx, n, stage)?;
        combiner::write_stage_raster(out, cx, stage, &mut st)?;
        texfetch::write_stage_fetch(out, cx, stage, &mut st)?;
        combiner::write_stage_combiner(out, cx, stage, &mut st)?;
    }
    if let Some(last) = uid.active_stages().last() {
        combiner::write_final_output(out, last, &st.tracker)?;
    }
    epilogue::write_epilogue(out, cx)
}

/// Generates into any sink and returns the UID. Text is only formatted when
/// [`ShaderSink::wants_text`] says so; the UID is the same either way.
pub fn generate_into<W: ShaderSink>(
    sink: &mut W,
    state: &PixelPipelineState,
    host: &HostConfig,
    target: ShaderTarget,
    render_mode: RenderMode,
) -> Result<PixelShaderUid> {
    let render_mode = effective_render_mode(render_mode, host);
    let data = record(state, host, target, render_mode);

    if sink.wants_text() {
        let cx = Emit { uid: &data, dialect: target.dialect(), num: target.numeric };
        write_shader(sink, &cx)?;
    }

    let uid = data.finalize();
    log::debug!(
        "Pixel shader {uid}: {} stages, {} texgens, {} indirect stages, {} / {} ({render_mode})",
        uid.data().num_stages,
        uid.data().num_tex_gens,
        uid.data().num_ind_stages,
        target.api,
        target.numeric
    );
    Ok(uid)
}

/// Generates into a caller-provided buffer and checks its canary.
pub fn generate_into_code(
    code: &mut ShaderCode,
    state: &PixelPipelineState,
    host: &HostConfig,
    target: ShaderTarget,
    render_mode: RenderMode,
) -> Result<PixelShaderUid> {
    let uid = generate_into(code, state, host, target, render_mode)?;
    if !code.canary_intact() {
        log::error!(
            "Pixel shader {uid} overran its {} byte buffer, the canary was eaten",
            code.capacity()
        );
        return Err(ShaderGenError::canary_eaten(code.capacity()));
    }
    Ok(uid)
}

/// Text and UID for one draw.
pub fn generate_pixel_shader(
    state: &PixelPipelineState,
    host: &HostConfig,
    target: ShaderTarget,
    render_mode: RenderMode,
) -> Result<GeneratedShader> {
    let mut code = ShaderCode::new();
    let uid = generate_into_code(&mut code, state, host, target, render_mode)?;
    Ok(GeneratedShader { code: Some(code.into_string()), uid })
}

/// UID only; no text is formatted.
pub fn pixel_shader_uid(
    state: &PixelPipelineState,
    host: &HostConfig,
    target: ShaderTarget,
    render_mode: RenderMode,
) -> Result<PixelShaderUid> {
    generate_into(&mut NullSink, state, host, target, render_mode)
}
