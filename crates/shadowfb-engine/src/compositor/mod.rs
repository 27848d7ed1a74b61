//! The injected upscale pass.
//!
//! The compositor compiles its two shaders once, creates the matching device
//! objects when the first device is bound, and on each trigger draws every
//! registered source view into its shadow render target.

mod pass;
mod shaders;
mod snapshot;

pub use pass::PassStats;
pub(crate) use pass::{run_upscale, PassObjects};
pub use shaders::{compile_shader, EmbeddedShaders, ShaderError, ShaderResource, ShaderSources};
pub(crate) use shaders::compile_upscalers;
pub use snapshot::PipelineSnapshot;

use crate::gpu::{
    CompiledShader, Device, GpuError, Object, PixelShader, SamplerDesc, SamplerState, VertexShader,
};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompositorState {
    #[default]
    Uninitialized,
    Ready,
    /// Initialization failed; terminal for the process.
    Disabled,
}

#[derive(Debug, Default)]
pub struct Compositor {
    state: CompositorState,
    vertex_source: Option<CompiledShader>,
    pixel_source: Option<CompiledShader>,
    vertex_shader: Option<VertexShader>,
    pixel_shader: Option<PixelShader>,
    sampler: Option<SamplerState>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> CompositorState {
        self.state
    }

    /// Compiles both shaders. Runs once; later calls report the settled state.
    pub fn initialize(&mut self, sources: &dyn ShaderSources) -> Result<(), ShaderError> {
        if self.state != CompositorState::Uninitialized {
            return Ok(());
        }
        match compile_upscalers(sources) {
            Ok((vs, ps)) => {
                self.vertex_source = Some(vs);
                self.pixel_source = Some(ps);
                self.state = CompositorState::Ready;
                log::debug!("upscale shaders compiled");
                Ok(())
            }
            Err(err) => {
                self.state = CompositorState::Disabled;
                Err(err)
            }
        }
    }

    /// Creates the stage objects and the sampler on a freshly bound device.
    ///
    /// A shader object failure disables the compositor; a sampler failure only
    /// leaves the sampler for a later [`Compositor::ensure_sampler`].
    pub fn create_device_objects(&mut self, device: &mut dyn Device) -> Result<(), GpuError> {
        let (Some(vs_src), Some(ps_src)) = (&self.vertex_source, &self.pixel_source) else {
            return Ok(());
        };
        if self.state != CompositorState::Ready {
            return Ok(());
        }

        let vs = match device.create_vertex_shader(vs_src) {
            Ok(vs) => vs,
            Err(err) => {
                self.state = CompositorState::Disabled;
                return Err(err);
            }
        };
        let ps = match device.create_pixel_shader(ps_src) {
            Ok(ps) => ps,
            Err(err) => {
                device.release(vs.into());
                self.state = CompositorState::Disabled;
                return Err(err);
            }
        };
        self.vertex_shader = Some(vs);
        self.pixel_shader = Some(ps);
        self.ensure_sampler(device);
        Ok(())
    }

    /// Creates the point/clamp sampler if it does not exist yet.
    pub fn ensure_sampler(&mut self, device: &mut dyn Device) {
        if self.sampler.is_some() || self.state != CompositorState::Ready {
            return;
        }
        match device.create_sampler_state(&SamplerDesc::point_clamp()) {
            Ok(sampler) => self.sampler = Some(sampler),
            Err(err) => log::warn!("upscale sampler creation failed: {err}"),
        }
    }

    /// Objects the pass binds, once the stage objects exist.
    pub(crate) fn pass_objects(&self) -> Option<PassObjects> {
        if self.state != CompositorState::Ready {
            return None;
        }
        Some(PassObjects {
            vertex_shader: self.vertex_shader?,
            pixel_shader: self.pixel_shader?,
            sampler: self.sampler,
        })
    }

    /// Gives up the device objects, returning the references to release.
    pub fn take_device_objects(&mut self) -> Vec<Object> {
        let mut owned = Vec::new();
        owned.extend(self.vertex_shader.take().map(Object::from));
        owned.extend(self.pixel_shader.take().map(Object::from));
        owned.extend(self.sampler.take().map(Object::from));
        owned
    }
}
