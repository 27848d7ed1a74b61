use std::rc::Rc;

use crate::config::RendererLevel;
use crate::gpu::{
    Buffer, BufferDesc, CompiledShader, DeferredContextFactory, DepthStencilView, Device, GpuError,
    Object, PixelShader, RenderTargetView, RenderTargetViewDesc, Resource, SamplerDesc,
    SamplerState, ShaderResourceView, ShaderResourceViewDesc, Texture2d, TextureDesc, VertexShader,
};
use crate::interceptor;
use crate::layer::Layer;
use crate::logging::trace_call;

use super::context::HookedContext;

/// Device wrapper that creates and registers shadow resources.
pub struct HookedDevice<D> {
    layer: Rc<Layer>,
    inner: D,
}

impl<D: Device> HookedDevice<D> {
    pub fn new(layer: Rc<Layer>, inner: D) -> Self {
        Self { layer, inner }
    }

    #[inline]
    pub fn layer(&self) -> &Rc<Layer> {
        &self.layer
    }

    #[inline]
    pub fn inner(&self) -> &D {
        &self.inner
    }

    #[inline]
    pub fn inner_mut(&mut self) -> &mut D {
        &mut self.inner
    }

    /// Releases every object the layer created and returns the wrapped device.
    pub fn teardown(mut self) -> D {
        self.layer.release_owned(&mut self.inner);
        self.inner
    }

    fn create_shadow_texture(&mut self, original: Texture2d, desc: &TextureDesc) {
        let geometry = self.layer.geometry();
        let internal_height = self.layer.config().internal_height;
        let Some(pattern) = interceptor::match_texture(desc, internal_height, &geometry) else {
            return;
        };

        let shadow_desc = interceptor::shadow_desc(desc, pattern, internal_height, &geometry);
        match self.inner.create_texture_2d(&shadow_desc, None) {
            Ok(shadow) => {
                self.layer.registry_mut().register_shadow_texture(original, shadow, shadow_desc);
                trace_call!(
                    self.layer,
                    RendererLevel::Resources,
                    "{pattern:?}: {}x{} texture {original:?} shadowed by {shadow:?} at {}x{}",
                    desc.width,
                    desc.height,
                    shadow_desc.width,
                    shadow_desc.height
                );
            }
            Err(err) => log::warn!("shadow texture for {original:?} not created: {err}"),
        }
    }

    fn create_shadow_views(&mut self, texture: Texture2d, shadow: Texture2d, view: ShaderResourceView) {
        let shadow_view = match self.inner.create_shader_resource_view(Resource::Texture2d(shadow), None) {
            Ok(v) => v,
            Err(err) => {
                log::warn!("shadow view for {view:?} not created: {err}");
                return;
            }
        };

        // A shadow nothing draws into must never be substituted for the host's view.
        let target = match self.inner.create_render_target_view(Resource::Texture2d(shadow), None) {
            Ok(target) => target,
            Err(err) => {
                log::warn!("upscale target for {view:?} not created, view left unshadowed: {err}");
                self.inner.release(shadow_view.into());
                return;
            }
        };

        self.inner.add_ref(view.into());
        let registered = {
            let mut registry = self.layer.registry_mut();
            registry
                .register_shadow_view(texture, view, shadow_view)
                .and_then(|()| registry.register_shadow_target(shadow_view, target))
        };
        if let Err(err) = registered {
            log::error!("{err}");
            self.inner.release(target.into());
            self.inner.release(view.into());
            self.inner.release(shadow_view.into());
            return;
        }

        self.layer.ensure_sampler(&mut self.inner);
        trace_call!(
            self.layer,
            RendererLevel::Resources,
            "view {view:?} on {texture:?} shadowed by {shadow_view:?}"
        );
    }
}

impl<D: Device> Device for HookedDevice<D> {
    fn create_texture_2d(&mut self, desc: &TextureDesc, initial_data: Option<&[u8]>) -> Result<Texture2d, GpuError> {
        let texture = self.inner.create_texture_2d(desc, initial_data)?;
        trace_call!(
            self.layer,
            RendererLevel::Verbose,
            "create_texture_2d {}x{} {:?} {:?} -> {texture:?}",
            desc.width,
            desc.height,
            desc.format,
            desc.usage
        );
        if self.layer.gates().virtualization() {
            self.create_shadow_texture(texture, desc);
        }
        Ok(texture)
    }

    fn create_buffer(&mut self, desc: &BufferDesc, initial_data: Option<&[u8]>) -> Result<Buffer, GpuError> {
        trace_call!(self.layer, RendererLevel::Verbose, "create_buffer {} bytes", desc.byte_width);
        self.inner.create_buffer(desc, initial_data)
    }

    fn create_shader_resource_view(
        &mut self,
        resource: Resource,
        desc: Option<&ShaderResourceViewDesc>,
    ) -> Result<ShaderResourceView, GpuError> {
        let view = self.inner.create_shader_resource_view(resource, desc)?;
        trace_call!(self.layer, RendererLevel::Verbose, "create_shader_resource_view {resource:?} -> {view:?}");

        if !self.layer.gates().virtualization() {
            return Ok(view);
        }
        let Some(texture) = resource.as_texture() else { return Ok(view) };
        let shadow = self.layer.registry().lookup_shadow_texture(texture);
        if let Some(shadow) = shadow {
            self.create_shadow_views(texture, shadow, view);
        }
        Ok(view)
    }

    fn create_render_target_view(
        &mut self,
        resource: Resource,
        desc: Option<&RenderTargetViewDesc>,
    ) -> Result<RenderTargetView, GpuError> {
        trace_call!(self.layer, RendererLevel::Verbose, "create_render_target_view {resource:?}");
        self.inner.create_render_target_view(resource, desc)
    }

    fn create_depth_stencil_view(&mut self, resource: Resource) -> Result<DepthStencilView, GpuError> {
        trace_call!(self.layer, RendererLevel::Verbose, "create_depth_stencil_view {resource:?}");
        self.inner.create_depth_stencil_view(resource)
    }

    fn create_sampler_state(&mut self, desc: &SamplerDesc) -> Result<SamplerState, GpuError> {
        trace_call!(self.layer, RendererLevel::Verbose, "create_sampler_state {:?}", desc.filter);
        self.inner.create_sampler_state(desc)
    }

    fn create_vertex_shader(&mut self, shader: &CompiledShader) -> Result<VertexShader, GpuError> {
        trace_call!(self.layer, RendererLevel::Verbose, "create_vertex_shader {}", shader.entry_point());
        self.inner.create_vertex_shader(shader)
    }

    fn create_pixel_shader(&mut self, shader: &CompiledShader) -> Result<PixelShader, GpuError> {
        trace_call!(self.layer, RendererLevel::Verbose, "create_pixel_shader {}", shader.entry_point());
        self.inner.create_pixel_shader(shader)
    }

    fn add_ref(&mut self, object: Object) {
        self.inner.add_ref(object);
    }

    fn release(&mut self, object: Object) {
        self.inner.release(object);
    }
}

impl<D: DeferredContextFactory> DeferredContextFactory for HookedDevice<D> {
    type Context = HookedContext<D::Context>;

    fn create_deferred_context(&mut self) -> Result<Self::Context, GpuError> {
        let ctx = self.inner.create_deferred_context()?;
        trace_call!(self.layer, RendererLevel::Resources, "deferred context hooked");
        Ok(HookedContext::new(Rc::clone(&self.layer), ctx))
    }
}
