//! Recording backend for unit tests.
//!
//! Tracks reference counts, per-context bound state and a log of the calls
//! that matter to the layer. Object creation can be made to fail on demand.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::gpu::{
    Buffer, BufferDesc, CompiledShader, ContextKind, CopyRegion, DeferredContextFactory,
    DepthStencilClear, DepthStencilView, Device, DeviceContext, GpuError, IndexBufferBinding,
    InputLayout, Object, PixelShader, PrimitiveTopology, RenderTargetView, RenderTargetViewDesc,
    Resource, SamplerDesc, SamplerState, ScissorRect, ShaderResourceView, ShaderResourceViewDesc,
    ShaderStage, Texture2d, TextureDesc, VertexBufferBinding, VertexShader, Viewport,
    MAX_RENDER_TARGETS,
};

const SLOTS: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FailKind {
    Texture,
    ShaderResourceView,
    RenderTargetView,
    Sampler,
    VertexShader,
    PixelShader,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateTexture { desc: TextureDesc, initial_data: bool, texture: Texture2d },
    CreateShaderResourceView { resource: Resource, desc: Option<ShaderResourceViewDesc>, view: ShaderResourceView },
    CreateRenderTargetView { resource: Resource, view: RenderTargetView },
    CreateSampler(SamplerDesc),
    SetShaderResources { context: usize, stage: ShaderStage, start_slot: u32, views: Vec<Option<ShaderResourceView>> },
    ClearRenderTarget { context: usize, target: RenderTargetView, color: [f32; 4] },
    ClearDepthStencil { context: usize, view: DepthStencilView },
    Copy { context: usize, region: CopyRegion },
    Draw { context: usize, vertex_count: u32, start_vertex: u32 },
    DrawIndexed { context: usize, index_count: u32 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTables {
    pub shader: Option<u64>,
    pub samplers: [Option<SamplerState>; SLOTS],
    pub resources: [Option<ShaderResourceView>; SLOTS],
    pub constant_buffers: [Option<Buffer>; SLOTS],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundState {
    pub render_targets: [Option<RenderTargetView>; MAX_RENDER_TARGETS],
    pub depth_stencil: Option<DepthStencilView>,
    pub viewports: Vec<Viewport>,
    pub scissors: Vec<ScissorRect>,
    pub input_layout: Option<InputLayout>,
    pub topology: PrimitiveTopology,
    pub vertex_buffers: [VertexBufferBinding; SLOTS],
    pub index_buffer: IndexBufferBinding,
    pub vertex: StageTables,
    pub pixel: StageTables,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    refs: HashMap<Object, i64>,
    textures: HashMap<Texture2d, TextureDesc>,
    views: HashMap<ShaderResourceView, Resource>,
    targets: HashMap<RenderTargetView, Resource>,
    contexts: Vec<BoundState>,
    calls: Vec<Call>,
    // Remaining successes before a kind starts failing.
    failures: HashMap<FailKind, u32>,
}

impl State {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn create<H: Into<Object> + Copy>(&mut self, make: fn(u64) -> H) -> H {
        let handle = make(self.next());
        self.refs.insert(handle.into(), 1);
        handle
    }

    fn check(&mut self, kind: FailKind) -> Result<(), GpuError> {
        match self.failures.get_mut(&kind) {
            Some(0) => Err(GpuError::OutOfMemory),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn add_ref(&mut self, object: Object) {
        *self.refs.entry(object).or_insert(0) += 1;
    }

    fn add_refs<T: Into<Object> + Copy>(&mut self, handles: impl IntoIterator<Item = Option<T>>) {
        for handle in handles.into_iter().flatten() {
            self.add_ref(handle.into());
        }
    }

    fn release(&mut self, object: Object) {
        *self.refs.entry(object).or_insert(0) -= 1;
    }
}

/// Shared handle to the recording backend.
#[derive(Debug, Clone)]
pub struct Recorder {
    state: Rc<RefCell<State>>,
}

impl Recorder {
    pub fn new() -> Self {
        let state = State { contexts: vec![BoundState::default()], ..Default::default() };
        Self { state: Rc::new(RefCell::new(state)) }
    }

    pub fn device(&self) -> RecordingDevice {
        RecordingDevice { state: Rc::clone(&self.state) }
    }

    /// The immediate context.
    pub fn context(&self) -> RecordingContext {
        RecordingContext { state: Rc::clone(&self.state), index: 0, kind: ContextKind::Immediate }
    }

    /// Lets `kind` succeed `after` more times, then fail.
    pub fn fail(&self, kind: FailKind, after: u32) {
        self.state.borrow_mut().failures.insert(kind, after);
    }

    pub fn heal(&self, kind: FailKind) {
        self.state.borrow_mut().failures.remove(&kind);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn draws(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::Draw { .. })).count()
    }

    pub fn bound_state(&self) -> BoundState {
        self.bound_state_of(0)
    }

    pub fn bound_state_of(&self, context: usize) -> BoundState {
        self.state.borrow().contexts[context].clone()
    }

    pub fn ref_counts(&self) -> HashMap<Object, i64> {
        self.state.borrow().refs.clone()
    }

    pub fn ref_count(&self, object: impl Into<Object>) -> i64 {
        self.state.borrow().refs.get(&object.into()).copied().unwrap_or(0)
    }

    pub fn texture_desc(&self, texture: Texture2d) -> Option<TextureDesc> {
        self.state.borrow().textures.get(&texture).copied()
    }

    pub fn view_resource(&self, view: ShaderResourceView) -> Option<Resource> {
        self.state.borrow().views.get(&view).copied()
    }

    pub fn target_resource(&self, target: RenderTargetView) -> Option<Resource> {
        self.state.borrow().targets.get(&target).copied()
    }

    pub fn textures_created(&self) -> usize {
        self.state.borrow().textures.len()
    }

    // ── direct object creation for state setup ──

    pub fn new_render_target_view(&self) -> RenderTargetView {
        self.state.borrow_mut().create(RenderTargetView::from_raw)
    }

    pub fn new_depth_stencil_view(&self) -> DepthStencilView {
        self.state.borrow_mut().create(DepthStencilView::from_raw)
    }

    pub fn new_shader_resource_view(&self) -> ShaderResourceView {
        self.state.borrow_mut().create(ShaderResourceView::from_raw)
    }

    pub fn new_buffer(&self) -> Buffer {
        self.state.borrow_mut().create(Buffer::from_raw)
    }

    pub fn new_vertex_shader(&self) -> VertexShader {
        self.state.borrow_mut().create(VertexShader::from_raw)
    }

    pub fn new_pixel_shader(&self) -> PixelShader {
        self.state.borrow_mut().create(PixelShader::from_raw)
    }

    pub fn new_sampler(&self) -> SamplerState {
        self.state.borrow_mut().create(SamplerState::from_raw)
    }

    pub fn new_input_layout(&self) -> InputLayout {
        self.state.borrow_mut().create(InputLayout::from_raw)
    }
}

#[derive(Debug)]
pub struct RecordingDevice {
    state: Rc<RefCell<State>>,
}

impl Device for RecordingDevice {
    fn create_texture_2d(&mut self, desc: &TextureDesc, initial_data: Option<&[u8]>) -> Result<Texture2d, GpuError> {
        let mut s = self.state.borrow_mut();
        s.check(FailKind::Texture)?;
        let texture = s.create(Texture2d::from_raw);
        s.textures.insert(texture, *desc);
        s.calls.push(Call::CreateTexture { desc: *desc, initial_data: initial_data.is_some(), texture });
        Ok(texture)
    }

    fn create_buffer(&mut self, _desc: &BufferDesc, _initial_data: Option<&[u8]>) -> Result<Buffer, GpuError> {
        Ok(self.state.borrow_mut().create(Buffer::from_raw))
    }

    fn create_shader_resource_view(
        &mut self,
        resource: Resource,
        desc: Option<&ShaderResourceViewDesc>,
    ) -> Result<ShaderResourceView, GpuError> {
        let mut s = self.state.borrow_mut();
        s.check(FailKind::ShaderResourceView)?;
        let view = s.create(ShaderResourceView::from_raw);
        s.views.insert(view, resource);
        s.calls.push(Call::CreateShaderResourceView { resource, desc: desc.copied(), view });
        Ok(view)
    }

    fn create_render_target_view(
        &mut self,
        resource: Resource,
        _desc: Option<&RenderTargetViewDesc>,
    ) -> Result<RenderTargetView, GpuError> {
        let mut s = self.state.borrow_mut();
        s.check(FailKind::RenderTargetView)?;
        let view = s.create(RenderTargetView::from_raw);
        s.targets.insert(view, resource);
        s.calls.push(Call::CreateRenderTargetView { resource, view });
        Ok(view)
    }

    fn create_depth_stencil_view(&mut self, _resource: Resource) -> Result<DepthStencilView, GpuError> {
        Ok(self.state.borrow_mut().create(DepthStencilView::from_raw))
    }

    fn create_sampler_state(&mut self, desc: &SamplerDesc) -> Result<SamplerState, GpuError> {
        let mut s = self.state.borrow_mut();
        s.check(FailKind::Sampler)?;
        s.calls.push(Call::CreateSampler(*desc));
        Ok(s.create(SamplerState::from_raw))
    }

    fn create_vertex_shader(&mut self, _shader: &CompiledShader) -> Result<VertexShader, GpuError> {
        let mut s = self.state.borrow_mut();
        s.check(FailKind::VertexShader)?;
        Ok(s.create(VertexShader::from_raw))
    }

    fn create_pixel_shader(&mut self, _shader: &CompiledShader) -> Result<PixelShader, GpuError> {
        let mut s = self.state.borrow_mut();
        s.check(FailKind::PixelShader)?;
        Ok(s.create(PixelShader::from_raw))
    }

    fn add_ref(&mut self, object: Object) {
        self.state.borrow_mut().add_ref(object);
    }

    fn release(&mut self, object: Object) {
        self.state.borrow_mut().release(object);
    }
}

impl DeferredContextFactory for RecordingDevice {
    type Context = RecordingContext;

    fn create_deferred_context(&mut self) -> Result<RecordingContext, GpuError> {
        let mut s = self.state.borrow_mut();
        s.contexts.push(BoundState::default());
        let index = s.contexts.len() - 1;
        Ok(RecordingContext { state: Rc::clone(&self.state), index, kind: ContextKind::Deferred })
    }
}

#[derive(Debug)]
pub struct RecordingContext {
    state: Rc<RefCell<State>>,
    index: usize,
    kind: ContextKind,
}

impl RecordingContext {
    fn with<R>(&mut self, f: impl FnOnce(&mut State, usize) -> R) -> R {
        let mut s = self.state.borrow_mut();
        f(&mut s, self.index)
    }

    fn tables(bound: &mut BoundState, stage: ShaderStage) -> &mut StageTables {
        match stage {
            ShaderStage::Vertex => &mut bound.vertex,
            ShaderStage::Pixel => &mut bound.pixel,
        }
    }
}

fn write_slots<T: Copy>(table: &mut [T], start: u32, values: &[T]) {
    for (slot, value) in table.iter_mut().skip(start as usize).zip(values) {
        *slot = *value;
    }
}

fn read_slots<T: Copy>(table: &[T], start: u32, count: u32) -> Vec<T> {
    table.iter().skip(start as usize).take(count as usize).copied().collect()
}

impl DeviceContext for RecordingContext {
    fn kind(&self) -> ContextKind {
        self.kind
    }

    fn om_set_render_targets(&mut self, targets: &[Option<RenderTargetView>], depth_stencil: Option<DepthStencilView>) {
        self.with(|s, i| {
            let bound = &mut s.contexts[i];
            bound.render_targets = [None; MAX_RENDER_TARGETS];
            write_slots(&mut bound.render_targets, 0, targets);
            bound.depth_stencil = depth_stencil;
        });
    }

    fn om_get_render_targets(&mut self) -> ([Option<RenderTargetView>; MAX_RENDER_TARGETS], Option<DepthStencilView>) {
        self.with(|s, i| {
            let targets = s.contexts[i].render_targets;
            let depth = s.contexts[i].depth_stencil;
            s.add_refs(targets);
            s.add_refs([depth]);
            (targets, depth)
        })
    }

    fn rs_set_viewports(&mut self, viewports: &[Viewport]) {
        self.with(|s, i| s.contexts[i].viewports = viewports.to_vec());
    }

    fn rs_get_viewports(&mut self) -> Vec<Viewport> {
        self.with(|s, i| s.contexts[i].viewports.clone())
    }

    fn rs_set_scissor_rects(&mut self, rects: &[ScissorRect]) {
        self.with(|s, i| s.contexts[i].scissors = rects.to_vec());
    }

    fn rs_get_scissor_rects(&mut self) -> Vec<ScissorRect> {
        self.with(|s, i| s.contexts[i].scissors.clone())
    }

    fn ia_set_input_layout(&mut self, layout: Option<InputLayout>) {
        self.with(|s, i| s.contexts[i].input_layout = layout);
    }

    fn ia_get_input_layout(&mut self) -> Option<InputLayout> {
        self.with(|s, i| {
            let layout = s.contexts[i].input_layout;
            s.add_refs([layout]);
            layout
        })
    }

    fn ia_set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.with(|s, i| s.contexts[i].topology = topology);
    }

    fn ia_get_primitive_topology(&mut self) -> PrimitiveTopology {
        self.with(|s, i| s.contexts[i].topology)
    }

    fn ia_set_vertex_buffers(&mut self, start_slot: u32, buffers: &[VertexBufferBinding]) {
        self.with(|s, i| write_slots(&mut s.contexts[i].vertex_buffers, start_slot, buffers));
    }

    fn ia_get_vertex_buffers(&mut self, start_slot: u32, count: u32) -> Vec<VertexBufferBinding> {
        self.with(|s, i| {
            let out = read_slots(&s.contexts[i].vertex_buffers, start_slot, count);
            s.add_refs(out.iter().map(|b| b.buffer));
            out
        })
    }

    fn ia_set_index_buffer(&mut self, binding: IndexBufferBinding) {
        self.with(|s, i| s.contexts[i].index_buffer = binding);
    }

    fn ia_get_index_buffer(&mut self) -> IndexBufferBinding {
        self.with(|s, i| {
            let binding = s.contexts[i].index_buffer;
            s.add_refs([binding.buffer]);
            binding
        })
    }

    fn vs_set_shader(&mut self, shader: Option<VertexShader>) {
        self.with(|s, i| s.contexts[i].vertex.shader = shader.map(VertexShader::raw));
    }

    fn vs_get_shader(&mut self) -> Option<VertexShader> {
        self.with(|s, i| {
            let shader = s.contexts[i].vertex.shader.map(VertexShader::from_raw);
            s.add_refs([shader]);
            shader
        })
    }

    fn ps_set_shader(&mut self, shader: Option<PixelShader>) {
        self.with(|s, i| s.contexts[i].pixel.shader = shader.map(PixelShader::raw));
    }

    fn ps_get_shader(&mut self) -> Option<PixelShader> {
        self.with(|s, i| {
            let shader = s.contexts[i].pixel.shader.map(PixelShader::from_raw);
            s.add_refs([shader]);
            shader
        })
    }

    fn set_samplers(&mut self, stage: ShaderStage, start_slot: u32, samplers: &[Option<SamplerState>]) {
        self.with(|s, i| {
            write_slots(&mut Self::tables(&mut s.contexts[i], stage).samplers, start_slot, samplers)
        });
    }

    fn get_samplers(&mut self, stage: ShaderStage, start_slot: u32, count: u32) -> Vec<Option<SamplerState>> {
        self.with(|s, i| {
            let out = read_slots(&Self::tables(&mut s.contexts[i], stage).samplers, start_slot, count);
            s.add_refs(out.iter().copied());
            out
        })
    }

    fn set_shader_resources(&mut self, stage: ShaderStage, start_slot: u32, views: &[Option<ShaderResourceView>]) {
        self.with(|s, i| {
            write_slots(&mut Self::tables(&mut s.contexts[i], stage).resources, start_slot, views);
            s.calls.push(Call::SetShaderResources { context: i, stage, start_slot, views: views.to_vec() });
        });
    }

    fn get_shader_resources(&mut self, stage: ShaderStage, start_slot: u32, count: u32) -> Vec<Option<ShaderResourceView>> {
        self.with(|s, i| {
            let out = read_slots(&Self::tables(&mut s.contexts[i], stage).resources, start_slot, count);
            s.add_refs(out.iter().copied());
            out
        })
    }

    fn set_constant_buffers(&mut self, stage: ShaderStage, start_slot: u32, buffers: &[Option<Buffer>]) {
        self.with(|s, i| {
            write_slots(&mut Self::tables(&mut s.contexts[i], stage).constant_buffers, start_slot, buffers)
        });
    }

    fn get_constant_buffers(&mut self, stage: ShaderStage, start_slot: u32, count: u32) -> Vec<Option<Buffer>> {
        self.with(|s, i| {
            let out = read_slots(&Self::tables(&mut s.contexts[i], stage).constant_buffers, start_slot, count);
            s.add_refs(out.iter().copied());
            out
        })
    }

    fn clear_render_target_view(&mut self, target: RenderTargetView, color: [f32; 4]) {
        self.with(|s, i| s.calls.push(Call::ClearRenderTarget { context: i, target, color }));
    }

    fn clear_depth_stencil_view(&mut self, view: DepthStencilView, _clear: DepthStencilClear, _depth: f32, _stencil: u8) {
        self.with(|s, i| s.calls.push(Call::ClearDepthStencil { context: i, view }));
    }

    fn copy_subresource_region(&mut self, region: &CopyRegion) {
        self.with(|s, i| s.calls.push(Call::Copy { context: i, region: *region }));
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        self.with(|s, i| s.calls.push(Call::Draw { context: i, vertex_count, start_vertex }));
    }

    fn draw_indexed(&mut self, index_count: u32, _start_index: u32, _base_vertex: i32) {
        self.with(|s, i| s.calls.push(Call::DrawIndexed { context: i, index_count }));
    }

    fn add_ref(&mut self, object: Object) {
        self.state.borrow_mut().add_ref(object);
    }

    fn release(&mut self, object: Object) {
        self.state.borrow_mut().release(object);
    }
}
