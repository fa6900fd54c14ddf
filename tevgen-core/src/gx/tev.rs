// TEV (Texture Environment) stage registers for the GameCube GX pipeline.
//
// The GameCube GPU has 16 TEV stages that combine textures, rasterized
// colors, and constant colors to produce final pixel output. Each stage
// computes d OP lerp(a, b, c) with configurable bias, scale and clamping,
// separately for color and alpha. This module stores the per-stage state
// exactly as the BP registers encode it; `shadergen` turns it into shader
// source.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TEV enums
// ---------------------------------------------------------------------------

/// Color channel input selector for a TEV stage.
///
/// Each TEV stage has four color inputs (a, b, c, d). This enum selects
/// which source feeds into each slot. Values match the hardware register
/// encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TevColorArg {
    /// Previous stage color RGB.
    Cprev = 0,
    /// Previous stage alpha broadcast to RGB.
    Aprev = 1,
    /// Color register 0 RGB.
    C0 = 2,
    /// Alpha register 0 broadcast to RGB.
    A0 = 3,
    /// Color register 1 RGB.
    C1 = 4,
    /// Alpha register 1 broadcast to RGB.
    A1 = 5,
    /// Color register 2 RGB.
    C2 = 6,
    /// Alpha register 2 broadcast to RGB.
    A2 = 7,
    /// Texture color RGB.
    TexC = 8,
    /// Texture alpha broadcast to RGB.
    TexA = 9,
    /// Rasterized color RGB.
    RasC = 10,
    /// Rasterized alpha broadcast to RGB.
    RasA = 11,
    /// Constant one (255).
    One = 12,
    /// Constant half (128).
    Half = 13,
    /// Konst color selection (per-stage configurable constant).
    Konst = 14,
    /// Constant zero.
    Zero = 15,
}

impl TevColorArg {
    pub const ALL: [TevColorArg; 16] = [
        TevColorArg::Cprev,
        TevColorArg::Aprev,
        TevColorArg::C0,
        TevColorArg::A0,
        TevColorArg::C1,
        TevColorArg::A1,
        TevColorArg::C2,
        TevColorArg::A2,
        TevColorArg::TexC,
        TevColorArg::TexA,
        TevColorArg::RasC,
        TevColorArg::RasA,
        TevColorArg::One,
        TevColorArg::Half,
        TevColorArg::Konst,
        TevColorArg::Zero,
    ];

    /// Decodes the 4-bit register field.
    pub fn from_raw(raw: u8) -> Self {
        Self::ALL[(raw & 0xF) as usize]
    }
}

/// Alpha channel input selector for a TEV stage.
///
/// Alpha has no ONE/HALF inputs, so only eight sources exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TevAlphaArg {
    /// Previous stage alpha.
    Aprev = 0,
    /// Alpha register 0.
    A0 = 1,
    /// Alpha register 1.
    A1 = 2,
    /// Alpha register 2.
    A2 = 3,
    /// Texture alpha.
    TexA = 4,
    /// Rasterized alpha.
    RasA = 5,
    /// Konst alpha selection.
    Konst = 6,
    /// Constant zero.
    Zero = 7,
}

impl TevAlphaArg {
    pub const ALL: [TevAlphaArg; 8] = [
        TevAlphaArg::Aprev,
        TevAlphaArg::A0,
        TevAlphaArg::A1,
        TevAlphaArg::A2,
        TevAlphaArg::TexA,
        TevAlphaArg::RasA,
        TevAlphaArg::Konst,
        TevAlphaArg::Zero,
    ];

    /// Decodes the 3-bit register field.
    pub fn from_raw(raw: u8) -> Self {
        Self::ALL[(raw & 0x7) as usize]
    }
}

/// Bias applied to the d operand, or the compare-mode marker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TevBias {
    #[default]
    Zero = 0,
    AddHalf = 1,
    SubHalf = 2,
    /// The stage runs one of the compare formulas instead of the lerp.
    Compare = 3,
}

impl TevBias {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            0 => TevBias::Zero,
            1 => TevBias::AddHalf,
            2 => TevBias::SubHalf,
            _ => TevBias::Compare,
        }
    }
}

/// Arithmetic operation applied in a TEV stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TevOp {
    #[default]
    Add = 0,
    Sub = 1,
}

impl TevOp {
    pub fn from_raw(raw: u8) -> Self {
        if raw & 1 == 0 {
            TevOp::Add
        } else {
            TevOp::Sub
        }
    }
}

/// Output scale factor applied after the TEV combine operation.
///
/// In compare mode the same two bits select the comparison width.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TevScale {
    #[default]
    Scale1 = 0,
    Scale2 = 1,
    Scale4 = 2,
    DivideBy2 = 3,
}

impl TevScale {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            0 => TevScale::Scale1,
            1 => TevScale::Scale2,
            2 => TevScale::Scale4,
            _ => TevScale::DivideBy2,
        }
    }
}

/// Destination register for a TEV stage output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TevRegId {
    /// The implicit "previous" register passed between stages.
    #[default]
    Prev = 0,
    Reg0 = 1,
    Reg1 = 2,
    Reg2 = 3,
}

impl TevRegId {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            0 => TevRegId::Prev,
            1 => TevRegId::Reg0,
            2 => TevRegId::Reg1,
            _ => TevRegId::Reg2,
        }
    }
}

/// Rasterized color channel feeding a stage's RASC/RASA inputs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RasColorChan {
    Color0 = 0,
    Color1 = 1,
    Reserved2 = 2,
    Reserved3 = 3,
    Reserved4 = 4,
    /// Alpha taken from the indirect bump sample.
    AlphaBump = 5,
    /// Bump alpha rescaled from 0..248 to 0..255.
    AlphaBumpNormalized = 6,
    #[default]
    Zero = 7,
}

impl RasColorChan {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x7 {
            0 => RasColorChan::Color0,
            1 => RasColorChan::Color1,
            2 => RasColorChan::Reserved2,
            3 => RasColorChan::Reserved3,
            4 => RasColorChan::Reserved4,
            5 => RasColorChan::AlphaBump,
            6 => RasColorChan::AlphaBumpNormalized,
            _ => RasColorChan::Zero,
        }
    }

    /// Reserved channel codes read as zero, same as `Zero`.
    pub fn canonical(self) -> Self {
        match self {
            RasColorChan::Reserved2 | RasColorChan::Reserved3 | RasColorChan::Reserved4 => {
                RasColorChan::Zero
            }
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Konst selectors
// ---------------------------------------------------------------------------

/// Fixed konst fractions 1, 7/8, 3/4 ... 1/8 in 8-bit units.
pub const KONST_FRACTIONS: [u8; 8] = [255, 223, 191, 159, 128, 96, 64, 32];

/// Channel of a konst register read by a konst selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KonstChannel {
    Rgb,
    R,
    G,
    B,
    A,
}

/// What a konst selector resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KonstSource {
    /// A fixed 8-bit constant, broadcast to every channel.
    Fixed(u8),
    /// Konst register `index` (0..3), read through `channel`.
    Register { index: u8, channel: KonstChannel },
}

impl KonstSource {
    pub fn is_register(self) -> bool {
        matches!(self, KonstSource::Register { .. })
    }
}

/// Konst color selector (KCSEL, 5 bits).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KonstColorSel(pub u8);

impl KonstColorSel {
    pub const ONE: KonstColorSel = KonstColorSel(0x00);
    pub const HALF: KonstColorSel = KonstColorSel(0x04);
    pub const K0: KonstColorSel = KonstColorSel(0x0C);

    pub fn source(self) -> KonstSource {
        let sel = self.0 & 0x1F;
        let index = sel & 0x3;
        match sel {
            0x00..=0x07 => KonstSource::Fixed(KONST_FRACTIONS[sel as usize]),
            0x08..=0x0B => KonstSource::Fixed(0),
            0x0C..=0x0F => KonstSource::Register { index, channel: KonstChannel::Rgb },
            0x10..=0x13 => KonstSource::Register { index, channel: KonstChannel::R },
            0x14..=0x17 => KonstSource::Register { index, channel: KonstChannel::G },
            0x18..=0x1B => KonstSource::Register { index, channel: KonstChannel::B },
            _ => KonstSource::Register { index, channel: KonstChannel::A },
        }
    }
}

/// Konst alpha selector (KASEL, 5 bits).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KonstAlphaSel(pub u8);

impl KonstAlphaSel {
    pub const ONE: KonstAlphaSel = KonstAlphaSel(0x00);
    pub const HALF: KonstAlphaSel = KonstAlphaSel(0x04);

    pub fn source(self) -> KonstSource {
        let sel = self.0 & 0x1F;
        let index = sel & 0x3;
        match sel {
            0x00..=0x07 => KonstSource::Fixed(KONST_FRACTIONS[sel as usize]),
            0x08..=0x0F => KonstSource::Fixed(0),
            0x10..=0x13 => KonstSource::Register { index, channel: KonstChannel::R },
            0x14..=0x17 => KonstSource::Register { index, channel: KonstChannel::G },
            0x18..=0x1B => KonstSource::Register { index, channel: KonstChannel::B },
            _ => KonstSource::Register { index, channel: KonstChannel::A },
        }
    }
}

/// Per-stage konst selection (TEV_KSEL).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KonstSel {
    pub color: KonstColorSel,
    pub alpha: KonstAlphaSel,
}

// ---------------------------------------------------------------------------
// Swap table
// ---------------------------------------------------------------------------

/// Source component picked by one lane of a swap-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ColorComponent {
    Red = 0,
    Green = 1,
    Blue = 2,
    Alpha = 3,
}

impl ColorComponent {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            0 => ColorComponent::Red,
            1 => ColorComponent::Green,
            2 => ColorComponent::Blue,
            _ => ColorComponent::Alpha,
        }
    }

    pub fn swizzle_char(self) -> char {
        match self {
            ColorComponent::Red => 'r',
            ColorComponent::Green => 'g',
            ColorComponent::Blue => 'b',
            ColorComponent::Alpha => 'a',
        }
    }
}

/// One swap-table entry: which component feeds each of r, g, b, a.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwapMode {
    pub r: ColorComponent,
    pub g: ColorComponent,
    pub b: ColorComponent,
    pub a: ColorComponent,
}

impl SwapMode {
    pub const IDENTITY: SwapMode = SwapMode {
        r: ColorComponent::Red,
        g: ColorComponent::Green,
        b: ColorComponent::Blue,
        a: ColorComponent::Alpha,
    };

    pub fn lanes(&self) -> [ColorComponent; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for SwapMode {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// TEV stage configuration
// ---------------------------------------------------------------------------

/// Color half of a TEV stage (TEV_COLOR_ENV).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorCombiner {
    pub a: TevColorArg,
    pub b: TevColorArg,
    pub c: TevColorArg,
    pub d: TevColorArg,
    pub bias: TevBias,
    pub op: TevOp,
    /// Clamp the result to 0..255 instead of the -1024..1023 guard band.
    pub clamp: bool,
    pub scale: TevScale,
    pub dest: TevRegId,
}

impl ColorCombiner {
    pub fn inputs(&self) -> [TevColorArg; 4] {
        [self.a, self.b, self.c, self.d]
    }

    pub fn uses(&self, arg: TevColorArg) -> bool {
        self.inputs().contains(&arg)
    }
}

impl Default for ColorCombiner {
    /// Pass-through: d = CPREV with a/b/c = ZERO.
    fn default() -> Self {
        Self {
            a: TevColorArg::Zero,
            b: TevColorArg::Zero,
            c: TevColorArg::Zero,
            d: TevColorArg::Cprev,
            bias: TevBias::Zero,
            op: TevOp::Add,
            clamp: true,
            scale: TevScale::Scale1,
            dest: TevRegId::Prev,
        }
    }
}

/// Alpha half of a TEV stage (TEV_ALPHA_ENV), including the swap selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlphaCombiner {
    pub a: TevAlphaArg,
    pub b: TevAlphaArg,
    pub c: TevAlphaArg,
    pub d: TevAlphaArg,
    pub bias: TevBias,
    pub op: TevOp,
    pub clamp: bool,
    pub scale: TevScale,
    pub dest: TevRegId,
    /// Swap-table entry used when reading the rasterized color.
    pub ras_swap: u8,
    /// Swap-table entry used when reading the texture.
    pub tex_swap: u8,
}

impl AlphaCombiner {
    pub fn inputs(&self) -> [TevAlphaArg; 4] {
        [self.a, self.b, self.c, self.d]
    }

    pub fn uses(&self, arg: TevAlphaArg) -> bool {
        self.inputs().contains(&arg)
    }
}

impl Default for AlphaCombiner {
    fn default() -> Self {
        Self {
            a: TevAlphaArg::Zero,
            b: TevAlphaArg::Zero,
            c: TevAlphaArg::Zero,
            d: TevAlphaArg::Aprev,
            bias: TevBias::Zero,
            op: TevOp::Add,
            clamp: true,
            scale: TevScale::Scale1,
            dest: TevRegId::Prev,
            ras_swap: 0,
            tex_swap: 0,
        }
    }
}

/// Texture/rasterizer routing for a stage (TEV_ORDER).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TevOrder {
    pub tex_map: u8,
    pub tex_coord: u8,
    /// Texture lookup enabled. A disabled stage reads opaque white.
    pub enable: bool,
    pub color_chan: RasColorChan,
}

/// Complete configuration for a single TEV stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TevStage {
    pub color: ColorCombiner,
    pub alpha: AlphaCombiner,
    pub order: TevOrder,
    pub konst: KonstSel,
    pub indirect: super::indirect::IndirectStage,
}

impl TevStage {
    pub fn uses_ras(&self) -> bool {
        self.color.uses(TevColorArg::RasC)
            || self.color.uses(TevColorArg::RasA)
            || self.alpha.uses(TevAlphaArg::RasA)
    }

    pub fn uses_konst(&self) -> bool {
        self.color.uses(TevColorArg::Konst) || self.alpha.uses(TevAlphaArg::Konst)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
