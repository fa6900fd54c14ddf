// Swap table: per swap set, the component order used when reading the
// texture or the rasterized color.

use std::fmt;

use crate::gx::tev::SwapMode;

/// The four swap sets resolved once per generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapTable {
    sets: [SwapMode; 4],
}

impl SwapTable {
    pub fn build(modes: &[SwapMode; 4]) -> Self {
        Self { sets: *modes }
    }

    /// Swap set `index` (masked to 0..3).
    pub fn resolve(&self, index: u8) -> SwapMode {
        self.sets[(index & 3) as usize]
    }
}

/// Swizzle suffix for a swap mode, e.g. `rgba` or `bgra`.
#[derive(Debug, Clone, Copy)]
pub struct Swizzle(pub SwapMode);

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for lane in self.0.lanes() {
            fmt::Write::write_char(f, lane.swizzle_char())?;
        }
        Ok(())
    }
}
