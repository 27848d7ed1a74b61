//! Mapping from the host's original resources to their shadow twins.
//!
//! Textures are kept in two lock-stepped sequences: the shadow of the
//! original at position `n` is the shadow at position `n`. Entries are
//! append-only for the lifetime of the device; everything is dropped together
//! on invalidation.

use std::collections::HashMap;

use thiserror::Error;

use crate::gpu::{Object, RenderTargetView, ShaderResourceView, Texture2d, TextureDesc};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("texture {0:?} has no shadow; views can only be registered for tracked textures")]
    UntrackedTexture(Texture2d),

    #[error("shadow view {0:?} was never registered")]
    UnknownShadowView(ShaderResourceView),
}

/// One compositor job: upscale `source` into `target`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UpscalePair {
    /// Original-resolution sampling view the host created.
    pub source: ShaderResourceView,
    /// Sampling view over the shadow texture.
    pub shadow_view: ShaderResourceView,
    /// Render target over the same shadow texture.
    pub target: RenderTargetView,
}

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    originals: Vec<Texture2d>,
    shadows: Vec<Texture2d>,

    // Latest original view per tracked texture, in registration order.
    sources: Vec<(Texture2d, ShaderResourceView)>,
    views: HashMap<ShaderResourceView, ShaderResourceView>,
    targets: HashMap<ShaderResourceView, RenderTargetView>,

    cached_desc: Option<TextureDesc>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tracked texture and its shadow, refreshing the cached descriptor.
    pub fn register_shadow_texture(&mut self, original: Texture2d, shadow: Texture2d, shadow_desc: TextureDesc) {
        self.originals.push(original);
        self.shadows.push(shadow);
        self.cached_desc = Some(shadow_desc);
    }

    pub fn lookup_shadow_texture(&self, original: Texture2d) -> Option<Texture2d> {
        let index = self.originals.iter().position(|&t| t == original)?;
        self.shadows.get(index).copied()
    }

    #[inline]
    pub fn is_tracked(&self, texture: Texture2d) -> bool {
        self.originals.contains(&texture)
    }

    /// Records `shadow_view` as the substitute for `original_view`, a view over
    /// the tracked `original_texture`.
    ///
    /// `original_view` also becomes the texture's upscale source, replacing
    /// any earlier view of the same texture.
    pub fn register_shadow_view(
        &mut self,
        original_texture: Texture2d,
        original_view: ShaderResourceView,
        shadow_view: ShaderResourceView,
    ) -> Result<(), RegistryError> {
        if !self.is_tracked(original_texture) {
            return Err(RegistryError::UntrackedTexture(original_texture));
        }

        match self.sources.iter_mut().find(|(t, _)| *t == original_texture) {
            Some(entry) => entry.1 = original_view,
            None => self.sources.push((original_texture, original_view)),
        }
        self.views.insert(original_view, shadow_view);
        Ok(())
    }

    pub fn lookup_shadow_view(&self, original_view: ShaderResourceView) -> Option<ShaderResourceView> {
        self.views.get(&original_view).copied()
    }

    pub fn register_shadow_target(
        &mut self,
        shadow_view: ShaderResourceView,
        target: RenderTargetView,
    ) -> Result<(), RegistryError> {
        if !self.views.values().any(|&v| v == shadow_view) {
            return Err(RegistryError::UnknownShadowView(shadow_view));
        }
        self.targets.insert(shadow_view, target);
        Ok(())
    }

    pub fn lookup_shadow_target(&self, shadow_view: ShaderResourceView) -> Option<RenderTargetView> {
        self.targets.get(&shadow_view).copied()
    }

    /// Descriptor of the most recently created shadow texture.
    #[inline]
    pub fn cached_desc(&self) -> Option<TextureDesc> {
        self.cached_desc
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// `(original, shadow)` pairs in registration order.
    pub fn shadow_textures(&self) -> impl Iterator<Item = (Texture2d, Texture2d)> + '_ {
        self.originals.iter().copied().zip(self.shadows.iter().copied())
    }

    /// Compositor jobs for every source whose shadow view has a target.
    pub fn upscale_pairs(&self) -> Vec<UpscalePair> {
        self.sources
            .iter()
            .filter_map(|&(_, source)| {
                let shadow_view = self.lookup_shadow_view(source)?;
                let target = self.lookup_shadow_target(shadow_view)?;
                Some(UpscalePair { source, shadow_view, target })
            })
            .collect()
    }

    /// Empties the registry, returning every reference it owned.
    ///
    /// That is each shadow texture, each shadow view and target, and the
    /// extra reference taken on each original view.
    pub fn drain(&mut self) -> Vec<Object> {
        let mut owned: Vec<Object> = Vec::new();
        owned.extend(self.targets.drain().map(|(_, rtv)| Object::from(rtv)));
        for (original_view, shadow_view) in self.views.drain() {
            owned.push(shadow_view.into());
            owned.push(original_view.into());
        }
        owned.extend(self.shadows.drain(..).map(Object::from));
        self.originals.clear();
        self.sources.clear();
        self.cached_desc = None;
        owned
    }
}
