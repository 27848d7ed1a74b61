use super::error::GpuError;
use super::handle::{
    Buffer, DepthStencilView, InputLayout, Object, PixelShader, RenderTargetView, Resource,
    SamplerState, ShaderResourceView, Texture2d, VertexShader,
};
use super::shader::CompiledShader;
use super::types::{
    BufferDesc, ContextKind, CopyRegion, DepthStencilClear, IndexBufferBinding, PrimitiveTopology,
    RenderTargetViewDesc, SamplerDesc, ScissorRect, ShaderResourceViewDesc, ShaderStage,
    TextureDesc, VertexBufferBinding, Viewport, MAX_RENDER_TARGETS,
};

/// Object-creation half of the graphics API.
///
/// Every successful `create_*` hands the caller one reference, returned
/// through [`Device::release`].
pub trait Device {
    fn create_texture_2d(
        &mut self,
        desc: &TextureDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<Texture2d, GpuError>;

    fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<Buffer, GpuError>;

    /// `desc == None` views the whole resource in its own format.
    fn create_shader_resource_view(
        &mut self,
        resource: Resource,
        desc: Option<&ShaderResourceViewDesc>,
    ) -> Result<ShaderResourceView, GpuError>;

    fn create_render_target_view(
        &mut self,
        resource: Resource,
        desc: Option<&RenderTargetViewDesc>,
    ) -> Result<RenderTargetView, GpuError>;

    fn create_depth_stencil_view(&mut self, resource: Resource) -> Result<DepthStencilView, GpuError>;

    fn create_sampler_state(&mut self, desc: &SamplerDesc) -> Result<SamplerState, GpuError>;

    fn create_vertex_shader(&mut self, shader: &CompiledShader) -> Result<VertexShader, GpuError>;

    fn create_pixel_shader(&mut self, shader: &CompiledShader) -> Result<PixelShader, GpuError>;

    fn add_ref(&mut self, object: Object);

    fn release(&mut self, object: Object);
}

/// Devices that can create deferred (command-recording) contexts.
pub trait DeferredContextFactory: Device {
    type Context: DeviceContext;

    fn create_deferred_context(&mut self) -> Result<Self::Context, GpuError>;
}

/// State-setting and command half of the graphics API.
///
/// Every `get_*`/`*_get_*` call adds one reference to each handle it returns;
/// the caller gives them back through [`DeviceContext::release`].
pub trait DeviceContext {
    fn kind(&self) -> ContextKind;

    // ── output merger ──

    fn om_set_render_targets(
        &mut self,
        targets: &[Option<RenderTargetView>],
        depth_stencil: Option<DepthStencilView>,
    );

    fn om_get_render_targets(
        &mut self,
    ) -> ([Option<RenderTargetView>; MAX_RENDER_TARGETS], Option<DepthStencilView>);

    // ── rasterizer ──

    fn rs_set_viewports(&mut self, viewports: &[Viewport]);
    fn rs_get_viewports(&mut self) -> Vec<Viewport>;
    fn rs_set_scissor_rects(&mut self, rects: &[ScissorRect]);
    fn rs_get_scissor_rects(&mut self) -> Vec<ScissorRect>;

    // ── input assembler ──

    fn ia_set_input_layout(&mut self, layout: Option<InputLayout>);
    fn ia_get_input_layout(&mut self) -> Option<InputLayout>;
    fn ia_set_primitive_topology(&mut self, topology: PrimitiveTopology);
    fn ia_get_primitive_topology(&mut self) -> PrimitiveTopology;
    fn ia_set_vertex_buffers(&mut self, start_slot: u32, buffers: &[VertexBufferBinding]);
    fn ia_get_vertex_buffers(&mut self, start_slot: u32, count: u32) -> Vec<VertexBufferBinding>;
    fn ia_set_index_buffer(&mut self, binding: IndexBufferBinding);
    fn ia_get_index_buffer(&mut self) -> IndexBufferBinding;

    // ── shader stages ──

    fn vs_set_shader(&mut self, shader: Option<VertexShader>);
    fn vs_get_shader(&mut self) -> Option<VertexShader>;
    fn ps_set_shader(&mut self, shader: Option<PixelShader>);
    fn ps_get_shader(&mut self) -> Option<PixelShader>;

    fn set_samplers(&mut self, stage: ShaderStage, start_slot: u32, samplers: &[Option<SamplerState>]);
    fn get_samplers(&mut self, stage: ShaderStage, start_slot: u32, count: u32) -> Vec<Option<SamplerState>>;

    fn set_shader_resources(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        views: &[Option<ShaderResourceView>],
    );
    fn get_shader_resources(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        count: u32,
    ) -> Vec<Option<ShaderResourceView>>;

    fn set_constant_buffers(&mut self, stage: ShaderStage, start_slot: u32, buffers: &[Option<Buffer>]);
    fn get_constant_buffers(&mut self, stage: ShaderStage, start_slot: u32, count: u32) -> Vec<Option<Buffer>>;

    // ── commands ──

    fn clear_render_target_view(&mut self, target: RenderTargetView, color: [f32; 4]);

    fn clear_depth_stencil_view(
        &mut self,
        view: DepthStencilView,
        clear: DepthStencilClear,
        depth: f32,
        stencil: u8,
    );

    fn copy_subresource_region(&mut self, region: &CopyRegion);

    fn draw(&mut self, vertex_count: u32, start_vertex: u32);

    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32);

    fn add_ref(&mut self, object: Object);

    fn release(&mut self, object: Object);
}
