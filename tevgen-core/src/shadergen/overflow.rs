// Overflow tracker: which TEV sources may hold values outside 0..255.
//
// A forward dataflow pass over the stage sequence. Each stage reads the
// state left by every earlier stage, wraps the inputs that may have
// overflowed, and then records whether its own destination is clamped.

use crate::gx::tev::{TevAlphaArg, TevColorArg, TevRegId};

/// Named TEV source registers, indexed like the color argument encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TevSource {
    Cprev = 0,
    Aprev = 1,
    C0 = 2,
    A0 = 3,
    C1 = 4,
    A1 = 5,
    C2 = 6,
    A2 = 7,
    TexC = 8,
    TexA = 9,
    RasC = 10,
    RasA = 11,
    One = 12,
    Half = 13,
    Konst = 14,
    Zero = 15,
}

impl TevSource {
    pub const COUNT: usize = 16;

    pub fn color_dest(dest: TevRegId) -> Self {
        match dest {
            TevRegId::Prev => TevSource::Cprev,
            TevRegId::Reg0 => TevSource::C0,
            TevRegId::Reg1 => TevSource::C1,
            TevRegId::Reg2 => TevSource::C2,
        }
    }

    pub fn alpha_dest(dest: TevRegId) -> Self {
        match dest {
            TevRegId::Prev => TevSource::Aprev,
            TevRegId::Reg0 => TevSource::A0,
            TevRegId::Reg1 => TevSource::A1,
            TevRegId::Reg2 => TevSource::A2,
        }
    }
}

impl From<TevColorArg> for TevSource {
    fn from(arg: TevColorArg) -> Self {
        match arg {
            TevColorArg::Cprev => TevSource::Cprev,
            TevColorArg::Aprev => TevSource::Aprev,
            TevColorArg::C0 => TevSource::C0,
            TevColorArg::A0 => TevSource::A0,
            TevColorArg::C1 => TevSource::C1,
            TevColorArg::A1 => TevSource::A1,
            TevColorArg::C2 => TevSource::C2,
            TevColorArg::A2 => TevSource::A2,
            TevColorArg::TexC => TevSource::TexC,
            TevColorArg::TexA => TevSource::TexA,
            TevColorArg::RasC => TevSource::RasC,
            TevColorArg::RasA => TevSource::RasA,
            TevColorArg::One => TevSource::One,
            TevColorArg::Half => TevSource::Half,
            TevColorArg::Konst => TevSource::Konst,
            TevColorArg::Zero => TevSource::Zero,
        }
    }
}

impl From<TevAlphaArg> for TevSource {
    fn from(arg: TevAlphaArg) -> Self {
        match arg {
            TevAlphaArg::Aprev => TevSource::Aprev,
            TevAlphaArg::A0 => TevSource::A0,
            TevAlphaArg::A1 => TevSource::A1,
            TevAlphaArg::A2 => TevSource::A2,
            TevAlphaArg::TexA => TevSource::TexA,
            TevAlphaArg::RasA => TevSource::RasA,
            TevAlphaArg::Konst => TevSource::Konst,
            TevAlphaArg::Zero => TevSource::Zero,
        }
    }
}

/// Per-call overflow state. `true` means the source may need `CHK_O_U8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowTracker {
    may_overflow: [bool; TevSource::COUNT],
}

impl OverflowTracker {
    /// Registers, raster and konst start unknown; texture reads and the
    /// fixed constants are always in range.
    pub fn new() -> Self {
        let mut may_overflow = [true; TevSource::COUNT];
        for src in [TevSource::TexC, TevSource::TexA, TevSource::One, TevSource::Half, TevSource::Zero] {
            may_overflow[src as usize] = false;
        }
        Self { may_overflow }
    }

    pub fn get(&self, src: TevSource) -> bool {
        self.may_overflow[src as usize]
    }

    pub fn set(&mut self, src: TevSource, may_overflow: bool) {
        self.may_overflow[src as usize] = may_overflow;
    }

    pub fn is_bounded(&self, src: TevSource) -> bool {
        !self.get(src)
    }

    /// An input vector needs wrapping if either half may overflow.
    pub fn needs_wrap(&self, color: TevColorArg, alpha: TevAlphaArg) -> bool {
        self.get(color.into()) || self.get(alpha.into())
    }

    /// Vertex colors can exceed the range; bump alpha and zero cannot.
    pub fn set_raster(&mut self, from_vertex_color: bool) {
        self.set(TevSource::RasC, from_vertex_color);
        self.set(TevSource::RasA, from_vertex_color);
    }

    /// Konst registers are unchecked uniforms; fixed fractions are in range.
    pub fn set_konst(&mut self, from_register: bool) {
        self.set(TevSource::Konst, from_register);
    }

    /// A clamped stage leaves its destination bounded, an unclamped one does not.
    pub fn record_stage(&mut self, color_dest: TevRegId, color_clamp: bool, alpha_dest: TevRegId, alpha_clamp: bool) {
        self.set(TevSource::color_dest(color_dest), !color_clamp);
        self.set(TevSource::alpha_dest(alpha_dest), !alpha_clamp);
    }
}

impl Default for OverflowTracker {
    fn default() -> Self {
        Self::new()
    }
}
