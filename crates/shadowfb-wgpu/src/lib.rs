//! wgpu backend for the shadowfb layer.
//!
//! Implements the engine's [`Device`](shadowfb_engine::gpu::Device) and
//! [`DeviceContext`](shadowfb_engine::gpu::DeviceContext) seams over a
//! headless wgpu device, so the layer and its upscale pass can run against a
//! real GPU without a host application.

use std::cell::RefCell;
use std::rc::Rc;

use shadowfb_engine::gpu::Object;

mod context;
mod convert;
mod device;
mod gpu;
mod objects;
mod pipeline;

pub use context::WgpuContext;
pub use device::WgpuDevice;
pub use gpu::{GpuInit, HeadlessGpu};

use objects::Objects;
use pipeline::PipelineCache;

/// State shared between a device and its context.
pub(crate) struct Shared {
    device: wgpu::Device,
    queue: wgpu::Queue,
    objects: Objects,
    pipelines: PipelineCache,
}

pub(crate) type SharedRef = Rc<RefCell<Shared>>;

impl Shared {
    fn release(&mut self, object: Object) {
        if !self.objects.release(object) {
            return;
        }
        match object {
            Object::VertexShader(shader) => self.pipelines.evict_vertex(shader),
            Object::PixelShader(shader) => self.pipelines.evict_pixel(shader),
            _ => {}
        }
    }
}

/// Creates a device and its immediate context over `gpu`.
pub fn create_device(gpu: HeadlessGpu) -> (WgpuDevice, WgpuContext) {
    let (device, queue) = gpu.into_parts();
    let shared = Rc::new(RefCell::new(Shared {
        device,
        queue,
        objects: Objects::default(),
        pipelines: PipelineCache::default(),
    }));
    (WgpuDevice::new(Rc::clone(&shared)), WgpuContext::new(shared))
}
