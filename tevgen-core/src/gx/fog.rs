// Fog registers.

use serde::{Deserialize, Serialize};

/// Fog response curve (`fsel`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FogFunction {
    #[default]
    Off = 0,
    Reserved1 = 1,
    Linear = 2,
    Reserved3 = 3,
    Exp = 4,
    Exp2 = 5,
    BackwardsExp = 6,
    BackwardsExp2 = 7,
}

impl FogFunction {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x7 {
            0 => FogFunction::Off,
            1 => FogFunction::Reserved1,
            2 => FogFunction::Linear,
            3 => FogFunction::Reserved3,
            4 => FogFunction::Exp,
            5 => FogFunction::Exp2,
            6 => FogFunction::BackwardsExp,
            _ => FogFunction::BackwardsExp2,
        }
    }

    /// The reserved codes run the linear curve.
    pub fn canonical(self) -> Self {
        match self {
            FogFunction::Reserved1 | FogFunction::Reserved3 => FogFunction::Linear,
            other => other,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FogProjection {
    #[default]
    Perspective = 0,
    Orthographic = 1,
}

/// Fog configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FogParams {
    pub fsel: FogFunction,
    pub proj: FogProjection,
    /// Screen-x dependent range adjustment (FOG_RANGE base enable).
    pub range_adjust: bool,
}

impl FogParams {
    pub fn enabled(&self) -> bool {
        self.fsel != FogFunction::Off
    }
}
