// Depth-related registers: z-texture, z mode and z compare location.

use serde::{Deserialize, Serialize};

/// Z-texture operation (ZTEX2).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ZTexOp {
    #[default]
    Disable = 0,
    Add = 1,
    Replace = 2,
}

impl ZTexOp {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            1 => ZTexOp::Add,
            2 => ZTexOp::Replace,
            _ => ZTexOp::Disable,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZTexture {
    pub op: ZTexOp,
}

/// Depth test state (ZMODE plus the ZCOMPARE location bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepthMode {
    pub test_enable: bool,
    pub update_enable: bool,
    /// Depth test runs before texturing.
    pub early_ztest: bool,
}

impl DepthMode {
    pub fn uses_early_test(&self) -> bool {
        self.early_ztest && self.test_enable
    }

    pub fn uses_late_test(&self) -> bool {
        !self.early_ztest && self.test_enable
    }
}

impl Default for DepthMode {
    fn default() -> Self {
        Self {
            test_enable: true,
            update_enable: true,
            early_ztest: false,
        }
    }
}
