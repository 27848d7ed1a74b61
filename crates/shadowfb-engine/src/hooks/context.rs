use std::rc::Rc;

use crate::config::RendererLevel;
use crate::geometry::ScaleMode;
use crate::gpu::{
    Buffer, ContextKind, CopyRegion, DepthStencilClear, DepthStencilView, DeviceContext,
    IndexBufferBinding, InputLayout, Object, PixelShader, PrimitiveTopology, RenderTargetView,
    SamplerState, ScissorRect, ShaderResourceView, ShaderStage, VertexBufferBinding, VertexShader,
    Viewport, MAX_RENDER_TARGETS,
};
use crate::layer::Layer;
use crate::logging::trace_call;
use crate::rewriter;

/// Context wrapper that rewrites copies and pixel-stage binds and triggers
/// the upscale pass.
///
/// Immediate and deferred contexts are wrapped the same way and share the
/// device's [`Layer`].
pub struct HookedContext<C> {
    layer: Rc<Layer>,
    inner: C,
}

impl<C: DeviceContext> HookedContext<C> {
    pub fn new(layer: Rc<Layer>, inner: C) -> Self {
        Self { layer, inner }
    }

    #[inline]
    pub fn layer(&self) -> &Rc<Layer> {
        &self.layer
    }

    #[inline]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    #[inline]
    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: DeviceContext> DeviceContext for HookedContext<C> {
    fn kind(&self) -> ContextKind {
        self.inner.kind()
    }

    fn om_set_render_targets(&mut self, targets: &[Option<RenderTargetView>], depth_stencil: Option<DepthStencilView>) {
        trace_call!(self.layer, RendererLevel::Calls, "om_set_render_targets {targets:?} {depth_stencil:?}");
        self.inner.om_set_render_targets(targets, depth_stencil);
    }

    fn om_get_render_targets(&mut self) -> ([Option<RenderTargetView>; MAX_RENDER_TARGETS], Option<DepthStencilView>) {
        self.inner.om_get_render_targets()
    }

    fn rs_set_viewports(&mut self, viewports: &[Viewport]) {
        trace_call!(self.layer, RendererLevel::Calls, "rs_set_viewports {viewports:?}");
        self.inner.rs_set_viewports(viewports);
    }

    fn rs_get_viewports(&mut self) -> Vec<Viewport> {
        self.inner.rs_get_viewports()
    }

    fn rs_set_scissor_rects(&mut self, rects: &[ScissorRect]) {
        trace_call!(self.layer, RendererLevel::Calls, "rs_set_scissor_rects {rects:?}");
        self.inner.rs_set_scissor_rects(rects);
    }

    fn rs_get_scissor_rects(&mut self) -> Vec<ScissorRect> {
        self.inner.rs_get_scissor_rects()
    }

    fn ia_set_input_layout(&mut self, layout: Option<InputLayout>) {
        trace_call!(self.layer, RendererLevel::Verbose, "ia_set_input_layout {layout:?}");
        self.inner.ia_set_input_layout(layout);
    }

    fn ia_get_input_layout(&mut self) -> Option<InputLayout> {
        self.inner.ia_get_input_layout()
    }

    fn ia_set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        trace_call!(self.layer, RendererLevel::Verbose, "ia_set_primitive_topology {topology:?}");
        self.inner.ia_set_primitive_topology(topology);
    }

    fn ia_get_primitive_topology(&mut self) -> PrimitiveTopology {
        self.inner.ia_get_primitive_topology()
    }

    fn ia_set_vertex_buffers(&mut self, start_slot: u32, buffers: &[VertexBufferBinding]) {
        trace_call!(self.layer, RendererLevel::Verbose, "ia_set_vertex_buffers {start_slot} {buffers:?}");
        self.inner.ia_set_vertex_buffers(start_slot, buffers);
    }

    fn ia_get_vertex_buffers(&mut self, start_slot: u32, count: u32) -> Vec<VertexBufferBinding> {
        self.inner.ia_get_vertex_buffers(start_slot, count)
    }

    fn ia_set_index_buffer(&mut self, binding: IndexBufferBinding) {
        trace_call!(self.layer, RendererLevel::Verbose, "ia_set_index_buffer {binding:?}");
        self.inner.ia_set_index_buffer(binding);
    }

    fn ia_get_index_buffer(&mut self) -> IndexBufferBinding {
        self.inner.ia_get_index_buffer()
    }

    fn vs_set_shader(&mut self, shader: Option<VertexShader>) {
        trace_call!(self.layer, RendererLevel::Verbose, "vs_set_shader {shader:?}");
        self.inner.vs_set_shader(shader);
    }

    fn vs_get_shader(&mut self) -> Option<VertexShader> {
        self.inner.vs_get_shader()
    }

    fn ps_set_shader(&mut self, shader: Option<PixelShader>) {
        trace_call!(self.layer, RendererLevel::Verbose, "ps_set_shader {shader:?}");
        self.inner.ps_set_shader(shader);
    }

    fn ps_get_shader(&mut self) -> Option<PixelShader> {
        self.inner.ps_get_shader()
    }

    fn set_samplers(&mut self, stage: ShaderStage, start_slot: u32, samplers: &[Option<SamplerState>]) {
        trace_call!(self.layer, RendererLevel::Verbose, "set_samplers {stage:?} {start_slot} {samplers:?}");
        self.inner.set_samplers(stage, start_slot, samplers);
    }

    fn get_samplers(&mut self, stage: ShaderStage, start_slot: u32, count: u32) -> Vec<Option<SamplerState>> {
        self.inner.get_samplers(stage, start_slot, count)
    }

    fn set_shader_resources(&mut self, stage: ShaderStage, start_slot: u32, views: &[Option<ShaderResourceView>]) {
        if stage == ShaderStage::Pixel && self.layer.rewrites_active() {
            let substituted = rewriter::substitute_views(views, &self.layer.registry());
            if let Some(shadowed) = substituted {
                trace_call!(self.layer, RendererLevel::Verbose, "set_shader_resources {views:?} -> {shadowed:?}");
                self.inner.set_shader_resources(stage, start_slot, &shadowed);
                return;
            }
        }
        trace_call!(self.layer, RendererLevel::Verbose, "set_shader_resources {stage:?} {start_slot} {views:?}");
        self.inner.set_shader_resources(stage, start_slot, views);
    }

    fn get_shader_resources(&mut self, stage: ShaderStage, start_slot: u32, count: u32) -> Vec<Option<ShaderResourceView>> {
        self.inner.get_shader_resources(stage, start_slot, count)
    }

    fn set_constant_buffers(&mut self, stage: ShaderStage, start_slot: u32, buffers: &[Option<Buffer>]) {
        trace_call!(self.layer, RendererLevel::Verbose, "set_constant_buffers {stage:?} {start_slot} {buffers:?}");
        self.inner.set_constant_buffers(stage, start_slot, buffers);
    }

    fn get_constant_buffers(&mut self, stage: ShaderStage, start_slot: u32, count: u32) -> Vec<Option<Buffer>> {
        self.inner.get_constant_buffers(stage, start_slot, count)
    }

    fn clear_render_target_view(&mut self, target: RenderTargetView, color: [f32; 4]) {
        trace_call!(self.layer, RendererLevel::Calls, "clear_render_target_view {target:?} {color:?}");
        self.inner.clear_render_target_view(target, color);
    }

    fn clear_depth_stencil_view(&mut self, view: DepthStencilView, clear: DepthStencilClear, depth: f32, stencil: u8) {
        let layer = Rc::clone(&self.layer);
        if layer.scale_mode() == ScaleMode::Downscale {
            trace_call!(layer, RendererLevel::Calls, "clear_depth_stencil_view {view:?}: upscale trigger");
            layer.upscale(self);
        }
        self.inner.clear_depth_stencil_view(view, clear, depth, stencil);
    }

    fn copy_subresource_region(&mut self, region: &CopyRegion) {
        let layer = Rc::clone(&self.layer);
        let mode = layer.scale_mode();

        let mut effective = *region;
        if layer.rewrites_active() {
            let rewrite = rewriter::rewrite_copy(
                region,
                &layer.registry(),
                mode,
                &layer.geometry(),
                layer.config().copy_rescale,
            );
            if rewrite.is_rewritten() {
                trace_call!(layer, RendererLevel::Calls, "copy_subresource_region {region:?} -> {:?}", rewrite.region);
            }
            effective = rewrite.region;
        }

        if mode == ScaleMode::Upscale {
            layer.upscale(self);
        }
        trace_call!(layer, RendererLevel::Verbose, "copy_subresource_region {effective:?}");
        self.inner.copy_subresource_region(&effective);
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        trace_call!(self.layer, RendererLevel::Verbose, "draw {vertex_count} {start_vertex}");
        self.inner.draw(vertex_count, start_vertex);
    }

    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) {
        self.inner.draw_indexed(index_count, start_index, base_vertex);
        trace_call!(self.layer, RendererLevel::Verbose, "draw_indexed {index_count} {start_index} {base_vertex}");
        let layer = Rc::clone(&self.layer);
        layer.render_overlay(self);
    }

    fn add_ref(&mut self, object: Object) {
        self.inner.add_ref(object);
    }

    fn release(&mut self, object: Object) {
        self.inner.release(object);
    }
}
