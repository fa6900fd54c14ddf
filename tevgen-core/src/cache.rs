//! Shader cache: generated pixel shader text keyed by UID.
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::HostConfig;
use crate::error::Result;
use crate::gx::state::PixelPipelineState;
use crate::shadergen::{self, PixelShaderUid, RenderMode, ShaderTarget};

/// In-memory map from UID to shader text.
///
/// Lookups compute the UID without formatting any text; the shader is only
/// generated on a miss. Not synchronized; wrap it in a lock to share it.
#[derive(Debug, Default)]
pub struct ShaderCache {
    cache: HashMap<PixelShaderUid, Arc<str>>,
    hits: u64,
    misses: u64,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached text for the snapshot, generating it on a miss.
    pub fn get_or_generate(
        &mut self,
        state: &PixelPipelineState,
        host: &HostConfig,
        target: ShaderTarget,
        render_mode: RenderMode,
    ) -> Result<(PixelShaderUid, Arc<str>)> {
        let uid = shadergen::pixel_shader_uid(state, host, target, render_mode)?;
        if let Some(code) = self.cache.get(&uid) {
            self.hits += 1;
            return Ok((uid, Arc::clone(code)));
        }

        let shader = shadergen::generate_pixel_shader(state, host, target, render_mode)?;
        let code: Arc<str> = Arc::from(shader.code.unwrap_or_default());
        self.misses += 1;
        log::debug!("Cached pixel shader {} ({} entries)", shader.uid, self.cache.len() + 1);
        self.cache.insert(shader.uid.clone(), Arc::clone(&code));
        Ok((shader.uid, code))
    }

    pub fn get(&self, uid: &PixelShaderUid) -> Option<Arc<str>> {
        self.cache.get(uid).cloned()
    }

    pub fn contains(&self, uid: &PixelShaderUid) -> bool {
        self.cache.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gx::tev::{KonstColorSel, TevColorArg};
    use crate::shadergen::{ApiType, NumericMode};

    fn target() -> ShaderTarget {
        ShaderTarget::new(ApiType::Vulkan, NumericMode::Float).unwrap()
    }

    #[test]
    fn equivalent_snapshots_share_an_entry() {
        let mut cache = ShaderCache::new();
        let host = HostConfig::default();

        let mut a = PixelPipelineState::default();
        a.stages[0].color.a = TevColorArg::Konst;
        a.stages[0].konst.color = KonstColorSel(0x08);
        // Different reserved zero selector and an unused stage: same shader.
        let mut b = a.clone();
        b.stages[0].konst.color = KonstColorSel(0x0A);
        b.stages[7].color.b = TevColorArg::TexC;

        let (uid_a, code_a) = cache.get_or_generate(&a, &host, target(), RenderMode::Default).unwrap();
        let (uid_b, code_b) = cache.get_or_generate(&b, &host, target(), RenderMode::Default).unwrap();
        assert_eq!(uid_a, uid_b);
        assert!(Arc::ptr_eq(&code_a, &code_b));
        assert_eq!(cache.len(), 1);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn different_shaders_get_separate_entries() {
        let mut cache = ShaderCache::new();
        let host = HostConfig::default();
        let a = PixelPipelineState::default();
        let mut b = PixelPipelineState::default();
        b.stages[0].order.enable = true;

        let (uid_a, _) = cache.get_or_generate(&a, &host, target(), RenderMode::Default).unwrap();
        let (uid_b, code_b) = cache.get_or_generate(&b, &host, target(), RenderMode::Default).unwrap();
        assert_ne!(uid_a, uid_b);
        assert!(code_b.contains("texture(samp0, "));
        assert!(cache.contains(&uid_a));
        assert_eq!(cache.get(&uid_b).as_deref(), Some(&*code_b));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 0);
    }
}
