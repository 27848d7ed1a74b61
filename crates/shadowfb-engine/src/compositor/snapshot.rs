use crate::gpu::{
    Buffer, DepthStencilView, DeviceContext, IndexBufferBinding, InputLayout, Object, PixelShader,
    PrimitiveTopology, RenderTargetView, SamplerState, ScissorRect, ShaderResourceView,
    ShaderStage, VertexBufferBinding, VertexShader, Viewport, MAX_RENDER_TARGETS,
};

/// Shader plus slot 0 of its sampler, resource and constant-buffer tables.
#[derive(Debug, Clone, PartialEq)]
struct StageSlots<S> {
    shader: Option<S>,
    sampler: Option<SamplerState>,
    resource: Option<ShaderResourceView>,
    constant_buffer: Option<Buffer>,
}

impl<S: Copy + Into<Object>> StageSlots<S> {
    fn capture(ctx: &mut dyn DeviceContext, stage: ShaderStage, shader: Option<S>) -> Self {
        Self {
            shader,
            sampler: first(ctx.get_samplers(stage, 0, 1)),
            resource: first(ctx.get_shader_resources(stage, 0, 1)),
            constant_buffer: first(ctx.get_constant_buffers(stage, 0, 1)),
        }
    }

    fn restore_slots(&self, ctx: &mut dyn DeviceContext, stage: ShaderStage) {
        ctx.set_samplers(stage, 0, &[self.sampler]);
        ctx.set_shader_resources(stage, 0, &[self.resource]);
        ctx.set_constant_buffers(stage, 0, &[self.constant_buffer]);
    }

    fn references(&self, out: &mut Vec<Object>) {
        out.extend(self.shader.map(Into::into));
        out.extend(self.sampler.map(Object::from));
        out.extend(self.resource.map(Object::from));
        out.extend(self.constant_buffer.map(Object::from));
    }
}

fn first<T>(slots: Vec<Option<T>>) -> Option<T> {
    slots.into_iter().next().flatten()
}

/// Pipeline state captured around the compositor's injected draw.
///
/// Capturing takes one reference per bound object; [`PipelineSnapshot::restore`]
/// rebinds everything and gives each of those references back exactly once.
#[must_use = "a snapshot holds references until it is restored"]
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSnapshot {
    render_targets: [Option<RenderTargetView>; MAX_RENDER_TARGETS],
    depth_stencil: Option<DepthStencilView>,
    viewports: Vec<Viewport>,
    scissors: Vec<ScissorRect>,
    input_layout: Option<InputLayout>,
    topology: PrimitiveTopology,
    vertex_buffer: VertexBufferBinding,
    index_buffer: IndexBufferBinding,
    vertex: StageSlots<VertexShader>,
    pixel: StageSlots<PixelShader>,
}

impl PipelineSnapshot {
    pub fn capture(ctx: &mut dyn DeviceContext) -> Self {
        let (render_targets, depth_stencil) = ctx.om_get_render_targets();
        let viewports = ctx.rs_get_viewports();
        let scissors = ctx.rs_get_scissor_rects();
        let input_layout = ctx.ia_get_input_layout();
        let topology = ctx.ia_get_primitive_topology();
        let vertex_buffer = ctx.ia_get_vertex_buffers(0, 1).into_iter().next().unwrap_or_default();
        let index_buffer = ctx.ia_get_index_buffer();

        let vs = ctx.vs_get_shader();
        let vertex = StageSlots::capture(ctx, ShaderStage::Vertex, vs);
        let ps = ctx.ps_get_shader();
        let pixel = StageSlots::capture(ctx, ShaderStage::Pixel, ps);

        Self {
            render_targets,
            depth_stencil,
            viewports,
            scissors,
            input_layout,
            topology,
            vertex_buffer,
            index_buffer,
            vertex,
            pixel,
        }
    }

    /// Rebinds the captured state, then releases the captured references.
    pub fn restore(self, ctx: &mut dyn DeviceContext) {
        ctx.om_set_render_targets(&self.render_targets, self.depth_stencil);
        ctx.rs_set_viewports(&self.viewports);
        ctx.rs_set_scissor_rects(&self.scissors);
        ctx.ia_set_input_layout(self.input_layout);
        ctx.ia_set_primitive_topology(self.topology);
        ctx.ia_set_vertex_buffers(0, &[self.vertex_buffer]);
        ctx.ia_set_index_buffer(self.index_buffer);

        ctx.vs_set_shader(self.vertex.shader);
        self.vertex.restore_slots(ctx, ShaderStage::Vertex);
        ctx.ps_set_shader(self.pixel.shader);
        self.pixel.restore_slots(ctx, ShaderStage::Pixel);

        for object in self.references() {
            ctx.release(object);
        }
    }

    fn references(&self) -> Vec<Object> {
        let mut out = Vec::new();
        out.extend(self.render_targets.iter().flatten().copied().map(Object::from));
        out.extend(self.depth_stencil.map(Object::from));
        out.extend(self.input_layout.map(Object::from));
        out.extend(self.vertex_buffer.buffer.map(Object::from));
        out.extend(self.index_buffer.buffer.map(Object::from));
        self.vertex.references(&mut out);
        self.pixel.references(&mut out);
        out
    }
}
