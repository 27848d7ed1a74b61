//! Handle tables backing the wgpu device.
//!
//! Every object the device hands out is a small integer handle mapped to the
//! wgpu object behind it plus an API-level reference count. The entry is
//! dropped when the count reaches zero.

use std::collections::HashMap;
use std::hash::Hash;

use shadowfb_engine::gpu::{
    Buffer, DepthStencilView, InputLayout, Object, PixelShader, RenderTargetView, SamplerState,
    ShaderResourceView, Texture2d, TextureDesc, VertexShader,
};

struct Slot<T> {
    refs: u32,
    value: T,
}

pub(crate) struct Table<H, T> {
    slots: HashMap<H, Slot<T>>,
}

impl<H, T> Default for Table<H, T> {
    fn default() -> Self {
        Self { slots: HashMap::new() }
    }
}

impl<H: Copy + Eq + Hash, T> Table<H, T> {
    pub(crate) fn insert(&mut self, handle: H, value: T) {
        self.slots.insert(handle, Slot { refs: 1, value });
    }

    pub(crate) fn get(&self, handle: H) -> Option<&T> {
        self.slots.get(&handle).map(|slot| &slot.value)
    }

    pub(crate) fn add_ref(&mut self, handle: H) -> bool {
        match self.slots.get_mut(&handle) {
            Some(slot) => {
                slot.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drops one reference; returns the remaining count, `None` if unknown.
    pub(crate) fn release(&mut self, handle: H) -> Option<u32> {
        let slot = self.slots.get_mut(&handle)?;
        slot.refs -= 1;
        let remaining = slot.refs;
        if remaining == 0 {
            self.slots.remove(&handle);
        }
        Some(remaining)
    }

    pub(crate) fn refs(&self, handle: H) -> Option<u32> {
        self.slots.get(&handle).map(|slot| slot.refs)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

pub(crate) struct TextureEntry {
    pub texture: wgpu::Texture,
    pub desc: TextureDesc,
    pub format: wgpu::TextureFormat,
}

pub(crate) struct ViewEntry {
    pub view: wgpu::TextureView,
    pub texture: Texture2d,
    pub format: wgpu::TextureFormat,
    /// Size of the viewed mip level.
    pub width: u32,
    pub height: u32,
}

pub(crate) struct ShaderEntry {
    pub module: wgpu::ShaderModule,
    pub entry_point: &'static str,
}

#[derive(Default)]
pub(crate) struct Objects {
    next_raw: u64,
    pub textures: Table<Texture2d, TextureEntry>,
    pub buffers: Table<Buffer, wgpu::Buffer>,
    pub shader_views: Table<ShaderResourceView, ViewEntry>,
    pub render_targets: Table<RenderTargetView, ViewEntry>,
    pub depth_stencils: Table<DepthStencilView, ViewEntry>,
    pub samplers: Table<SamplerState, wgpu::Sampler>,
    pub vertex_shaders: Table<VertexShader, ShaderEntry>,
    pub pixel_shaders: Table<PixelShader, ShaderEntry>,
    /// Input layouts are host-owned; only references handed out by getters are counted.
    lent_layouts: HashMap<InputLayout, u32>,
}

impl Objects {
    /// Handles are never reused within one device.
    pub(crate) fn next_raw(&mut self) -> u64 {
        self.next_raw += 1;
        self.next_raw
    }

    pub(crate) fn add_ref(&mut self, object: Object) {
        let known = match object {
            Object::Texture2d(h) => self.textures.add_ref(h),
            Object::Buffer(h) => self.buffers.add_ref(h),
            Object::ShaderResourceView(h) => self.shader_views.add_ref(h),
            Object::RenderTargetView(h) => self.render_targets.add_ref(h),
            Object::DepthStencilView(h) => self.depth_stencils.add_ref(h),
            Object::SamplerState(h) => self.samplers.add_ref(h),
            Object::VertexShader(h) => self.vertex_shaders.add_ref(h),
            Object::PixelShader(h) => self.pixel_shaders.add_ref(h),
            Object::InputLayout(h) => {
                *self.lent_layouts.entry(h).or_insert(0) += 1;
                true
            }
        };
        if !known {
            log::warn!("add_ref on unknown object {object:?}");
        }
    }

    /// Returns whether the object was destroyed.
    pub(crate) fn release(&mut self, object: Object) -> bool {
        let remaining = match object {
            Object::Texture2d(h) => self.textures.release(h),
            Object::Buffer(h) => self.buffers.release(h),
            Object::ShaderResourceView(h) => self.shader_views.release(h),
            Object::RenderTargetView(h) => self.render_targets.release(h),
            Object::DepthStencilView(h) => self.depth_stencils.release(h),
            Object::SamplerState(h) => self.samplers.release(h),
            Object::VertexShader(h) => self.vertex_shaders.release(h),
            Object::PixelShader(h) => self.pixel_shaders.release(h),
            Object::InputLayout(h) => {
                if let Some(count) = self.lent_layouts.get_mut(&h) {
                    *count -= 1;
                    if *count == 0 {
                        self.lent_layouts.remove(&h);
                    }
                }
                return false;
            }
        };
        match remaining {
            Some(0) => {
                log::trace!("destroyed {object:?}");
                true
            }
            Some(_) => false,
            None => {
                log::warn!("release on unknown object {object:?}");
                false
            }
        }
    }

    pub(crate) fn ref_count(&self, object: Object) -> Option<u32> {
        match object {
            Object::Texture2d(h) => self.textures.refs(h),
            Object::Buffer(h) => self.buffers.refs(h),
            Object::ShaderResourceView(h) => self.shader_views.refs(h),
            Object::RenderTargetView(h) => self.render_targets.refs(h),
            Object::DepthStencilView(h) => self.depth_stencils.refs(h),
            Object::SamplerState(h) => self.samplers.refs(h),
            Object::VertexShader(h) => self.vertex_shaders.refs(h),
            Object::PixelShader(h) => self.pixel_shaders.refs(h),
            Object::InputLayout(h) => self.lent_layouts.get(&h).copied(),
        }
    }

    /// Number of live objects across all tables.
    pub(crate) fn live(&self) -> usize {
        self.textures.len()
            + self.buffers.len()
            + self.shader_views.len()
            + self.render_targets.len()
            + self.depth_stencils.len()
            + self.samplers.len()
            + self.vertex_shaders.len()
            + self.pixel_shaders.len()
    }
}
