//! Pixel shader UID.
//!
//! The UID records exactly the state the emitters branch on, in canonical
//! form: reserved register codes are folded onto the code they behave like,
//! and fields are only recorded where the text actually reads them. Every
//! emitter reads its decisions back from the recorded UID instead of from
//! the snapshot, so two snapshots with equal UIDs always produce equal text.
//!
//! The typed record is packed into a bit string with `bitvec`; packing only
//! includes fields whose presence is implied by fields packed before them,
//! so the packed words compare equal exactly when the records do.

use std::fmt;
use std::hash::{Hash, Hasher};

use bitvec::prelude::*;
use smallvec::SmallVec;

use super::dialect::{ApiType, InterpolationQualifier, ShaderDialect};
use super::numeric::NumericMode;
use super::swap::SwapTable;
use super::RenderMode;
use crate::config::HostConfig;
use crate::gx::alpha::{AlphaTestOp, AlphaTestResult, CompareMode};
use crate::gx::depth::ZTexOp;
use crate::gx::fog::{FogFunction, FogProjection};
use crate::gx::indirect::{IndMatrix, IndWrap, IndirectStage};
use crate::gx::lighting::{AttenuationFunction, ColorSrc, DiffuseFunction, LitChannel, VertexComponents};
use crate::gx::state::{PixelPipelineState, TexProjection, MAX_IND_STAGES, MAX_TEV_STAGES};
use crate::gx::tev::{
    AlphaCombiner, ColorCombiner, KonstAlphaSel, KonstColorSel, KonstSel, RasColorChan, SwapMode, TevAlphaArg,
    TevColorArg,
};

// ---------------------------------------------------------------------------
// Typed record
// ---------------------------------------------------------------------------

/// Where the shader takes the fragment depth from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DepthSource {
    /// Clip-space z / w scaled by the viewport.
    #[default]
    Perspective = 0,
    /// `rawpos.z` from the rasterizer.
    Rasterizer = 1,
    /// Plane equation of the frozen reference primitive.
    Frozen = 2,
}

/// Where a lighting channel reads its material or ambient color.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelInput {
    /// Material uniform.
    #[default]
    Register,
    /// Vertex color 0 or 1.
    Vertex(u8),
    /// The vertex has no color; reads opaque white.
    White,
}

impl ChannelInput {
    fn resolve(src: ColorSrc, channel: usize, components: VertexComponents) -> Self {
        match src {
            ColorSrc::Register => ChannelInput::Register,
            ColorSrc::Vertex if components.has_color(channel) => ChannelInput::Vertex(channel as u8),
            ColorSrc::Vertex if components.color0 => ChannelInput::Vertex(0),
            ColorSrc::Vertex => ChannelInput::White,
        }
    }

    fn code(self) -> u32 {
        match self {
            ChannelInput::Register => 0,
            ChannelInput::Vertex(0) => 1,
            ChannelInput::Vertex(_) => 2,
            ChannelInput::White => 3,
        }
    }
}

/// One lit channel (color or alpha half).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelUid {
    pub mat: ChannelInput,
    pub enabled: bool,
    pub amb: ChannelInput,
    pub light_mask: u8,
    pub diff_fn: DiffuseFunction,
    pub attn_fn: AttenuationFunction,
}

impl ChannelUid {
    fn record(chan: &LitChannel, index: usize, components: VertexComponents) -> Self {
        let mut uid = ChannelUid {
            mat: ChannelInput::resolve(chan.mat_src, index, components),
            enabled: chan.enabled,
            ..Default::default()
        };
        if chan.enabled {
            uid.amb = ChannelInput::resolve(chan.amb_src, index, components);
            uid.light_mask = chan.light_mask;
            if chan.light_mask != 0 {
                uid.diff_fn = chan.diff_fn;
                uid.attn_fn = chan.attn_fn;
            }
        }
        uid
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightingUid {
    pub num_color_chans: u8,
    pub color: [ChannelUid; 2],
    pub alpha: [ChannelUid; 2],
}

/// Indirect reference of one used indirect stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndRefUid {
    /// Texgen feeding the lookup, `None` when out of range.
    pub tex_coord: Option<u8>,
    pub tex_map: u8,
}

/// Per-stage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageUid {
    pub color: ColorCombiner,
    /// Swap selects are zeroed; the resolved swaps are below.
    pub alpha: AlphaCombiner,
    pub tex_enabled: bool,
    pub tex_map: u8,
    pub tex_swap: SwapMode,
    pub normal_map: bool,
    pub ras_chan: RasColorChan,
    pub ras_swap: SwapMode,
    pub konst: KonstSel,
    /// Texgen read by the coordinate code, `None` when no `uvN` is read.
    pub tex_coord: Option<u8>,
    pub indirect: Option<IndirectStage>,
}

impl Default for StageUid {
    fn default() -> Self {
        Self {
            color: ColorCombiner::default(),
            alpha: AlphaCombiner::default(),
            tex_enabled: false,
            tex_map: 0,
            tex_swap: SwapMode::IDENTITY,
            normal_map: false,
            ras_chan: RasColorChan::Zero,
            ras_swap: SwapMode::IDENTITY,
            konst: KonstSel::default(),
            tex_coord: None,
            indirect: None,
        }
    }
}

impl StageUid {
    /// Records stage `n` of `state`.
    pub fn record(state: &PixelPipelineState, n: usize, swap: &SwapTable, header: &PixelShaderUidData) -> Self {
        let stage = &state.stages[n];
        let mut uid = StageUid {
            color: stage.color,
            alpha: AlphaCombiner { ras_swap: 0, tex_swap: 0, ..stage.alpha },
            ..Default::default()
        };

        let num_tex_gens = header.num_tex_gens as usize;
        let tc = stage.order.tex_coord & 7;
        let has_tex_coord = (tc as usize) < num_tex_gens;
        let has_ind = stage.indirect.is_active() && (stage.indirect.ind_stage as usize) < header.num_ind_stages as usize;

        if has_ind {
            let mut ind = IndirectStage { utc_lod: false, ..stage.indirect };
            if !has_tex_coord && matches!(ind.matrix, IndMatrix::S(_) | IndMatrix::T(_)) {
                ind.matrix = IndMatrix::Off;
            }
            let reads_uv = ind.wrap_s != IndWrap::Zero
                || ind.wrap_t != IndWrap::Zero
                || matches!(ind.matrix, IndMatrix::S(_) | IndMatrix::T(_));
            if reads_uv {
                uid.tex_coord = Some(if has_tex_coord { tc } else { 0 });
            }
            uid.indirect = Some(ind);
        }

        if stage.uses_ras() {
            uid.ras_chan = stage.order.color_chan.canonical();
            uid.ras_swap = swap.resolve(stage.alpha.ras_swap);
        }

        if stage.order.enable {
            uid.tex_enabled = true;
            uid.tex_map = stage.order.tex_map & 7;
            uid.tex_swap = swap.resolve(stage.alpha.tex_swap);
            uid.normal_map = header.pixel_lighting && state.normal_map_mask & (1 << uid.tex_map) != 0;
            if !has_ind && has_tex_coord {
                uid.tex_coord = Some(tc);
            }
        }

        if stage.uses_konst() {
            uid.konst = canonical_konst(stage.konst);
        }
        uid
    }

    pub fn uses_ras(&self) -> bool {
        self.color.uses(TevColorArg::RasC) || self.color.uses(TevColorArg::RasA) || self.alpha.uses(TevAlphaArg::RasA)
    }

    pub fn uses_konst(&self) -> bool {
        self.color.uses(TevColorArg::Konst) || self.alpha.uses(TevAlphaArg::Konst)
    }
}

/// Selectors that read the same value collapse onto one code.
fn canonical_konst(sel: KonstSel) -> KonstSel {
    let kc = match sel.color.0 & 0x1F {
        0x08..=0x0B => 0x08,
        kc => kc,
    };
    let ka = match sel.alpha.0 & 0x1F {
        0x08..=0x0F => 0x08,
        ka => ka,
    };
    KonstSel { color: KonstColorSel(kc), alpha: KonstAlphaSel(ka) }
}

/// Alpha test summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlphaTestUid {
    pub pretest: AlphaTestResult,
    pub comp0: CompareMode,
    pub comp1: CompareMode,
    pub logic: AlphaTestOp,
    /// Early depth test emulated by never discarding.
    pub zcomploc_hack: bool,
}

impl Default for AlphaTestUid {
    fn default() -> Self {
        Self {
            pretest: AlphaTestResult::Pass,
            comp0: CompareMode::Always,
            comp1: CompareMode::Always,
            logic: AlphaTestOp::And,
            zcomploc_hack: false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FogUid {
    pub fsel: FogFunction,
    pub proj: FogProjection,
    pub range_adjust: bool,
}

/// The full typed record behind a [`PixelShaderUid`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PixelShaderUidData {
    pub api: ApiType,
    pub numeric: NumericMode,
    pub render_mode: RenderMode,
    pub num_stages: u8,
    pub num_tex_gens: u8,
    pub num_ind_stages: u8,
    pub pixel_lighting: bool,
    pub bounding_box: bool,
    pub qualifier: InterpolationQualifier,
    /// Any stage samples a normal map.
    pub normal_maps: bool,
    /// Bit `i`: texgen `i` is STQ.
    pub tex_projection: u8,
    pub forced_early_z: bool,
    pub per_pixel_depth: bool,
    pub ind_stages_used: u8,
    pub ind_refs: [IndRefUid; MAX_IND_STAGES],
    pub lighting: LightingUid,
    pub stages: [StageUid; MAX_TEV_STAGES],
    pub depth_source: DepthSource,
    pub ztex_op: ZTexOp,
    /// Depth is written before the z-texture.
    pub early_ztest: bool,
    pub alpha_test: AlphaTestUid,
    pub fog: FogUid,
}

impl PixelShaderUidData {
    /// Records everything decided before the stage loop, plus the epilogue
    /// summaries. Stage records are added by [`StageUid::record`].
    pub fn record_globals(
        state: &PixelPipelineState,
        host: &HostConfig,
        dialect: &dyn ShaderDialect,
        numeric: NumericMode,
        render_mode: RenderMode,
    ) -> Self {
        let num_stages = state.num_stages();
        let num_tex_gens = state.num_tex_gens();
        let num_ind_stages = state.num_ind_stages();
        let pixel_lighting = host.pixel_lighting_enabled() && dialect.supports_pixel_lighting();

        let qualifier = if !dialect.supports_interpolation_qualifiers() {
            InterpolationQualifier::None
        } else if host.ssaa {
            InterpolationQualifier::Sample
        } else if host.msaa {
            InterpolationQualifier::Centroid
        } else {
            InterpolationQualifier::None
        };

        let depth = &state.depth;
        let early_z_available = host.backend.supports_early_z && dialect.supports_early_depth();
        let forced_early_z = early_z_available && depth.uses_early_test();
        let per_pixel_depth = (state.ztex.op != ZTexOp::Disable && depth.uses_late_test())
            || (!host.fast_depth_calc
                && depth.test_enable
                && !forced_early_z
                && render_mode != RenderMode::DepthOnly)
            || state.gen_mode.z_freeze;

        let mut ind_stages_used = 0u8;
        for stage in state.active_stages() {
            if stage.indirect.is_active() && (stage.indirect.ind_stage as usize) < num_ind_stages {
                ind_stages_used |= 1 << stage.indirect.ind_stage;
            }
        }
        let mut ind_refs = [IndRefUid::default(); MAX_IND_STAGES];
        for (i, iref) in state.ind_refs.iter().enumerate().take(num_ind_stages) {
            if ind_stages_used & (1 << i) != 0 {
                let tc = iref.tex_coord & 7;
                ind_refs[i] = IndRefUid {
                    tex_coord: ((tc as usize) < num_tex_gens).then_some(tc),
                    tex_map: iref.tex_map & 7,
                };
            }
        }

        let mut tex_projection = 0u8;
        for (i, proj) in state.tex_projection.iter().enumerate().take(num_tex_gens) {
            if *proj == TexProjection::Stq {
                tex_projection |= 1 << i;
            }
        }

        let normal_maps = pixel_lighting
            && state
                .active_stages()
                .iter()
                .any(|s| s.order.enable && state.normal_map_mask & (1 << (s.order.tex_map & 7)) != 0);

        let mut lighting = LightingUid::default();
        if pixel_lighting {
            let lit = &state.lighting;
            lighting.num_color_chans = lit.num_color_chans.min(2);
            for j in 0..lighting.num_color_chans as usize {
                lighting.color[j] = ChannelUid::record(&lit.color[j], j, lit.components);
                lighting.alpha[j] = ChannelUid::record(&lit.alpha[j], j, lit.components);
            }
        }

        let mut uid = PixelShaderUidData {
            api: dialect.api(),
            numeric,
            render_mode,
            num_stages: num_stages as u8,
            num_tex_gens: num_tex_gens as u8,
            num_ind_stages: num_ind_stages as u8,
            pixel_lighting,
            bounding_box: host.bounding_box_enabled() && dialect.supports_bounding_box(),
            qualifier,
            normal_maps,
            tex_projection,
            forced_early_z,
            per_pixel_depth,
            ind_stages_used,
            ind_refs,
            lighting,
            stages: [StageUid::default(); MAX_TEV_STAGES],
            depth_source: DepthSource::Perspective,
            ztex_op: ZTexOp::Disable,
            early_ztest: false,
            alpha_test: AlphaTestUid::default(),
            fog: FogUid::default(),
        };

        if render_mode == RenderMode::DepthOnly {
            // Nothing past the entry point is written.
            uid.tex_projection = 0;
            uid.ind_stages_used = 0;
            uid.ind_refs = [IndRefUid::default(); MAX_IND_STAGES];
            uid.lighting = LightingUid::default();
            return uid;
        }

        uid.depth_source = if state.gen_mode.z_freeze {
            DepthSource::Frozen
        } else if dialect.reads_fragment_depth() && host.fast_depth_calc {
            DepthSource::Rasterizer
        } else {
            DepthSource::Perspective
        };

        let fsel = state.fog.fsel.canonical();
        if render_mode != RenderMode::AlphaPass {
            uid.fog.fsel = fsel;
            if fsel != FogFunction::Off {
                uid.fog.proj = state.fog.proj;
                uid.fog.range_adjust = state.fog.range_adjust;
            }
        }
        let skip_ztexture = !per_pixel_depth && uid.fog.fsel == FogFunction::Off;
        if !skip_ztexture {
            uid.ztex_op = state.ztex.op;
        }
        if per_pixel_depth && uid.ztex_op != ZTexOp::Disable {
            uid.early_ztest = depth.uses_early_test();
        }

        let pretest = state.alpha_test.test_result();
        uid.alpha_test.pretest = pretest;
        if pretest != AlphaTestResult::Pass {
            uid.alpha_test.comp0 = state.alpha_test.comp0;
            uid.alpha_test.comp1 = state.alpha_test.comp1;
            uid.alpha_test.logic = state.alpha_test.logic;
            uid.alpha_test.zcomploc_hack = depth.uses_early_test() && depth.update_enable && !early_z_available;
        }
        uid
    }

    pub fn active_stages(&self) -> &[StageUid] {
        &self.stages[..self.num_stages as usize]
    }

    /// Clip position and normal live in the w of the texcoords.
    pub fn packed_interpolants(&self) -> bool {
        self.num_tex_gens >= 7
    }

    /// Normal-mapped specular runs over the lights of color channel 0.
    pub fn specular(&self) -> bool {
        self.normal_maps && self.lighting.num_color_chans > 0 && self.lighting.color[0].enabled
    }

    fn pack(&self) -> BitVec<u32, Lsb0> {
        let mut w = BitWriter::default();
        w.put(self.api as u32, 3);
        w.put(self.numeric as u32, 1);
        w.put(self.render_mode as u32, 2);
        w.put(u32::from(self.num_stages.saturating_sub(1)), 4);
        w.put(u32::from(self.num_tex_gens), 4);
        w.put(u32::from(self.num_ind_stages), 3);
        w.flag(self.pixel_lighting);
        w.flag(self.bounding_box);
        w.put(self.qualifier as u32, 2);
        w.flag(self.normal_maps);
        w.put(u32::from(self.tex_projection), self.num_tex_gens as usize);
        w.flag(self.forced_early_z);
        w.flag(self.per_pixel_depth);
        w.put(u32::from(self.ind_stages_used), 4);
        for (i, iref) in self.ind_refs.iter().enumerate() {
            if self.ind_stages_used & (1 << i) != 0 {
                w.option(iref.tex_coord, 3);
                w.put(u32::from(iref.tex_map), 3);
            }
        }

        if self.pixel_lighting {
            w.put(u32::from(self.lighting.num_color_chans), 2);
            for j in 0..self.lighting.num_color_chans as usize {
                for chan in [&self.lighting.color[j], &self.lighting.alpha[j]] {
                    w.put(chan.mat.code(), 2);
                    w.flag(chan.enabled);
                    if chan.enabled {
                        w.put(chan.amb.code(), 2);
                        w.put(u32::from(chan.light_mask), 8);
                        if chan.light_mask != 0 {
                            w.put(chan.diff_fn as u32, 2);
                            w.put(chan.attn_fn as u32, 2);
                        }
                    }
                }
            }
        }

        if self.render_mode == RenderMode::DepthOnly {
            return w.bits;
        }

        for stage in self.active_stages() {
            pack_stage(&mut w, stage);
        }

        w.put(self.depth_source as u32, 2);
        w.put(self.ztex_op as u32, 2);
        if self.per_pixel_depth && self.ztex_op != ZTexOp::Disable {
            w.flag(self.early_ztest);
        }
        w.put(self.alpha_test.pretest as u32, 2);
        if self.alpha_test.pretest != AlphaTestResult::Pass {
            w.put(self.alpha_test.comp0 as u32, 3);
            w.put(self.alpha_test.comp1 as u32, 3);
            w.put(self.alpha_test.logic as u32, 2);
            w.flag(self.alpha_test.zcomploc_hack);
        }
        if self.render_mode != RenderMode::AlphaPass {
            w.put(self.fog.fsel as u32, 3);
            if self.fog.fsel != FogFunction::Off {
                w.put(self.fog.proj as u32, 1);
                w.flag(self.fog.range_adjust);
            }
        }
        w.bits
    }

    /// Packs and hashes the record.
    pub fn finalize(self) -> PixelShaderUid {
        let bits = self.pack();
        let bit_len = bits.len() as u32;
        let words: SmallVec<[u32; 32]> = SmallVec::from_vec(bits.into_vec());

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&bit_len.to_le_bytes());
        for word in &words {
            hasher.update(&word.to_le_bytes());
        }
        PixelShaderUid {
            data: Box::new(self),
            words,
            bit_len,
            hash: hasher.finalize(),
        }
    }
}

fn pack_stage(w: &mut BitWriter, stage: &StageUid) {
    let cc = &stage.color;
    w.put(cc.a as u32, 4);
    w.put(cc.b as u32, 4);
    w.put(cc.c as u32, 4);
    w.put(cc.d as u32, 4);
    w.put(cc.bias as u32, 2);
    w.put(cc.op as u32, 1);
    w.flag(cc.clamp);
    w.put(cc.scale as u32, 2);
    w.put(cc.dest as u32, 2);

    let ac = &stage.alpha;
    w.put(ac.a as u32, 3);
    w.put(ac.b as u32, 3);
    w.put(ac.c as u32, 3);
    w.put(ac.d as u32, 3);
    w.put(ac.bias as u32, 2);
    w.put(ac.op as u32, 1);
    w.flag(ac.clamp);
    w.put(ac.scale as u32, 2);
    w.put(ac.dest as u32, 2);

    w.flag(stage.tex_enabled);
    if stage.tex_enabled {
        w.put(u32::from(stage.tex_map), 3);
        w.swap(stage.tex_swap);
        w.flag(stage.normal_map);
    }

    if stage.uses_ras() {
        w.put(stage.ras_chan as u32, 3);
        w.swap(stage.ras_swap);
    }
    if stage.uses_konst() {
        w.put(u32::from(stage.konst.color.0), 5);
        w.put(u32::from(stage.konst.alpha.0), 5);
    }

    w.option(stage.tex_coord, 3);
    w.flag(stage.indirect.is_some());
    if let Some(ind) = &stage.indirect {
        w.put(u32::from(ind.ind_stage), 2);
        w.put(ind.format as u32, 2);
        w.put(ind.bias as u32, 3);
        w.put(ind.alpha_sel as u32, 2);
        w.put(u32::from(ind.matrix.to_raw()), 4);
        w.put(ind.wrap_s as u32, 3);
        w.put(ind.wrap_t as u32, 3);
        w.flag(ind.add_prev);
    }
}

#[derive(Default)]
struct BitWriter {
    bits: BitVec<u32, Lsb0>,
}

impl BitWriter {
    fn put(&mut self, value: u32, width: usize) {
        self.bits.extend_from_bitslice(&value.view_bits::<Lsb0>()[..width]);
    }

    fn flag(&mut self, value: bool) {
        self.bits.push(value);
    }

    fn option(&mut self, value: Option<u8>, width: usize) {
        self.flag(value.is_some());
        if let Some(v) = value {
            self.put(u32::from(v), width);
        }
    }

    fn swap(&mut self, swap: SwapMode) {
        for lane in swap.lanes() {
            self.put(lane as u32, 2);
        }
    }
}

// ---------------------------------------------------------------------------
// Packed UID
// ---------------------------------------------------------------------------

/// Packed, hashable cache key of a generated pixel shader.
#[derive(Clone)]
pub struct PixelShaderUid {
    data: Box<PixelShaderUidData>,
    words: SmallVec<[u32; 32]>,
    bit_len: u32,
    hash: u32,
}

impl PixelShaderUid {
    pub fn data(&self) -> &PixelShaderUidData {
        &self.data
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn bit_len(&self) -> u32 {
        self.bit_len
    }

    /// CRC-32 of the packed words.
    pub fn hash_value(&self) -> u32 {
        self.hash
    }

    /// Packed words as one hex string, most significant word first.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.words.len() * 8);
        for word in self.words.iter().rev() {
            out.push_str(&format!("{word:08x}"));
        }
        out
    }
}

impl PartialEq for PixelShaderUid {
    fn eq(&self, other: &Self) -> bool {
        self.bit_len == other.bit_len && self.words == other.words
    }
}

impl Eq for PixelShaderUid {}

impl Hash for PixelShaderUid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash);
    }
}

impl fmt::Debug for PixelShaderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelShaderUid")
            .field("hash", &format_args!("{:08x}", self.hash))
            .field("bit_len", &self.bit_len)
            .finish()
    }
}

impl fmt::Display for PixelShaderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.hash)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
