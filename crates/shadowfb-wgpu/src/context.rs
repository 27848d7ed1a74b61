use std::ops::Range;

use shadowfb_engine::gpu::{
    Buffer, ContextKind, CopyRegion, DepthStencilClear, DepthStencilView, DeviceContext,
    IndexBufferBinding, InputLayout, Object, PixelShader, PrimitiveTopology, RenderTargetView,
    SamplerState, ScissorRect, ShaderResourceView, ShaderStage, VertexBufferBinding, VertexShader,
    Viewport, MAX_RENDER_TARGETS,
};

use crate::convert;
use crate::pipeline::PipelineKey;
use crate::{Shared, SharedRef};

/// Slots per shader stage and vertex buffer slots.
const SLOTS: usize = 16;

#[derive(Default)]
struct StageSlots {
    samplers: [Option<SamplerState>; SLOTS],
    resources: [Option<ShaderResourceView>; SLOTS],
    constant_buffers: [Option<Buffer>; SLOTS],
}

#[derive(Default)]
struct BoundState {
    render_targets: [Option<RenderTargetView>; MAX_RENDER_TARGETS],
    depth_stencil: Option<DepthStencilView>,
    viewports: Vec<Viewport>,
    scissors: Vec<ScissorRect>,
    input_layout: Option<InputLayout>,
    topology: PrimitiveTopology,
    vertex_buffers: [VertexBufferBinding; SLOTS],
    index_buffer: IndexBufferBinding,
    vertex_shader: Option<VertexShader>,
    pixel_shader: Option<PixelShader>,
    vertex_stage: StageSlots,
    pixel_stage: StageSlots,
}

impl BoundState {
    fn stage(&mut self, stage: ShaderStage) -> &mut StageSlots {
        match stage {
            ShaderStage::Vertex => &mut self.vertex_stage,
            ShaderStage::Pixel => &mut self.pixel_stage,
        }
    }
}

fn write_slots<T: Copy>(slots: &mut [T], start: u32, values: &[T]) {
    let start = (start as usize).min(slots.len());
    let end = (start + values.len()).min(slots.len());
    slots[start..end].copy_from_slice(&values[..end - start]);
}

/// Vertices `start..start + count`, `None` if the range leaves `u32`.
fn vertex_range(start: u32, count: u32) -> Option<Range<u32>> {
    Some(start..start.checked_add(count)?)
}

fn read_slots<T: Copy>(slots: &[T], start: u32, count: u32) -> Vec<T> {
    let start = (start as usize).min(slots.len());
    let end = start.saturating_add(count as usize).min(slots.len());
    slots[start..end].to_vec()
}

/// Immediate [`DeviceContext`] over a wgpu queue.
///
/// Bound state is tracked on the CPU. Each command is encoded and submitted
/// on its own. Draws execute when they match what the backend can express:
/// vertex and pixel shader bound, render target 0 bound, a color view and a
/// sampler in pixel slot 0, no vertex buffers. Anything else is logged and
/// dropped.
pub struct WgpuContext {
    shared: SharedRef,
    bound: BoundState,
}

impl WgpuContext {
    pub(crate) fn new(shared: SharedRef) -> Self {
        Self { shared, bound: BoundState::default() }
    }

    fn retain<T: Into<Object> + Copy>(&self, handles: impl IntoIterator<Item = Option<T>>) {
        let mut shared = self.shared.borrow_mut();
        for handle in handles.into_iter().flatten() {
            shared.objects.add_ref(handle.into());
        }
    }

    fn draw_sampled(&self, vertex_count: u32, start_vertex: u32) -> Result<(), &'static str> {
        let bound = &self.bound;
        let vertex = bound.vertex_shader.ok_or("no vertex shader bound")?;
        let pixel = bound.pixel_shader.ok_or("no pixel shader bound")?;
        let target = bound.render_targets[0].ok_or("no render target bound")?;
        let view = bound.pixel_stage.resources[0].ok_or("no shader resource in pixel slot 0")?;
        let sampler = bound.pixel_stage.samplers[0].ok_or("no sampler in pixel slot 0")?;
        let topology = convert::topology(bound.topology).ok_or("undefined primitive topology")?;
        let vertices = vertex_range(start_vertex, vertex_count).ok_or("vertex range overflows")?;

        let mut shared = self.shared.borrow_mut();
        let Shared { device, queue, objects, pipelines } = &mut *shared;

        let target = objects.render_targets.get(target).ok_or("unknown render target")?;
        let view = objects.shader_views.get(view).ok_or("unknown shader resource view")?;
        let sampler = objects.samplers.get(sampler).ok_or("unknown sampler")?;
        let vertex_entry = objects.vertex_shaders.get(vertex).ok_or("unknown vertex shader")?;
        let pixel_entry = objects.pixel_shaders.get(pixel).ok_or("unknown pixel shader")?;

        if view.texture == target.texture {
            return Err("texture bound as both source and target");
        }
        if !convert::is_filterable_color(view.format) {
            return Err("source view is not a filterable color format");
        }

        let key = PipelineKey { vertex, pixel, format: target.format, topology };
        let (layout, pipeline) = pipelines.prepare(device, key, vertex_entry, pixel_entry);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadowfb sampled texture bg"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let (width, height) = (target.width as f32, target.height as f32);
        let viewport = match bound.viewports.first() {
            Some(vp) => {
                let x = vp.top_left_x.clamp(0.0, width);
                let y = vp.top_left_y.clamp(0.0, height);
                let min_depth = vp.min_depth.clamp(0.0, 1.0);
                (
                    x,
                    y,
                    vp.width.min(width - x),
                    vp.height.min(height - y),
                    min_depth,
                    vp.max_depth.clamp(min_depth, 1.0),
                )
            }
            None => (0.0, 0.0, width, height, 0.0, 1.0),
        };
        if viewport.2 <= 0.0 || viewport.3 <= 0.0 {
            return Err("empty viewport");
        }

        let scissor = bound.scissors.first().map(|rect| {
            let left = rect.left.clamp(0, target.width as i32) as u32;
            let top = rect.top.clamp(0, target.height as i32) as u32;
            let right = (rect.right.max(0) as u32).clamp(left, target.width);
            let bottom = (rect.bottom.max(0) as u32).clamp(top, target.height);
            (left, top, right - left, bottom - top)
        });
        if let Some((_, _, w, h)) = scissor {
            if w == 0 || h == 0 {
                return Err("empty scissor rectangle");
            }
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("shadowfb draw encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadowfb draw pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let (x, y, w, h, min_depth, max_depth) = viewport;
            pass.set_viewport(x, y, w, h, min_depth, max_depth);
            if let Some((x, y, w, h)) = scissor {
                pass.set_scissor_rect(x, y, w, h);
            }
            pass.draw(vertices, 0..1);
        }
        queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn copy_textures(&self, region: &CopyRegion) -> Result<(), &'static str> {
        let dst = region.dst.as_texture().ok_or("buffer copies are not supported")?;
        let src = region.src.as_texture().ok_or("buffer copies are not supported")?;

        let shared = self.shared.borrow();
        let dst_entry = shared.objects.textures.get(dst).ok_or("unknown destination texture")?;
        let src_entry = shared.objects.textures.get(src).ok_or("unknown source texture")?;

        if dst_entry.format.remove_srgb_suffix() != src_entry.format.remove_srgb_suffix() {
            return Err("formats are not copy-compatible");
        }
        if src_entry.format.has_depth_aspect() {
            return Err("depth copies are not supported");
        }

        let subresource = |index: u32, mips: u32| (index % mips, index / mips);
        let (src_mip, src_layer) = subresource(region.src_subresource, src_entry.desc.mip_levels);
        let (dst_mip, dst_layer) = subresource(region.dst_subresource, dst_entry.desc.mip_levels);
        if src_layer >= src_entry.desc.array_size.max(1) || dst_layer >= dst_entry.desc.array_size.max(1) {
            return Err("subresource out of range");
        }
        if src == dst && src_mip == dst_mip && src_layer == dst_layer {
            return Err("copy within one subresource");
        }

        let mip_size = |width: u32, height: u32, mip: u32| ((width >> mip).max(1), (height >> mip).max(1));
        let (src_w, src_h) = mip_size(src_entry.desc.width, src_entry.desc.height, src_mip);
        let (dst_w, dst_h) = mip_size(dst_entry.desc.width, dst_entry.desc.height, dst_mip);

        let (left, top, right, bottom) = match region.src_box {
            Some(b) => (b.left, b.top, b.right.min(src_w), b.bottom.min(src_h)),
            None => (0, 0, src_w, src_h),
        };
        let width = right.saturating_sub(left).min(dst_w.saturating_sub(region.dst_x));
        let height = bottom.saturating_sub(top).min(dst_h.saturating_sub(region.dst_y));
        if width == 0 || height == 0 {
            return Err("empty copy region");
        }

        let mut encoder = shared.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("shadowfb copy encoder"),
        });
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &src_entry.texture,
                mip_level: src_mip,
                origin: wgpu::Origin3d { x: left, y: top, z: src_layer },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: &dst_entry.texture,
                mip_level: dst_mip,
                origin: wgpu::Origin3d { x: region.dst_x, y: region.dst_y, z: dst_layer },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        shared.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}

impl DeviceContext for WgpuContext {
    fn kind(&self) -> ContextKind {
        ContextKind::Immediate
    }

    // ── output merger ──

    fn om_set_render_targets(
        &mut self,
        targets: &[Option<RenderTargetView>],
        depth_stencil: Option<DepthStencilView>,
    ) {
        self.bound.render_targets = Default::default();
        write_slots(&mut self.bound.render_targets, 0, targets);
        self.bound.depth_stencil = depth_stencil;
    }

    fn om_get_render_targets(
        &mut self,
    ) -> ([Option<RenderTargetView>; MAX_RENDER_TARGETS], Option<DepthStencilView>) {
        let targets = self.bound.render_targets;
        let depth_stencil = self.bound.depth_stencil;
        self.retain(targets);
        self.retain([depth_stencil]);
        (targets, depth_stencil)
    }

    // ── rasterizer ──

    fn rs_set_viewports(&mut self, viewports: &[Viewport]) {
        self.bound.viewports = viewports.to_vec();
    }

    fn rs_get_viewports(&mut self) -> Vec<Viewport> {
        self.bound.viewports.clone()
    }

    fn rs_set_scissor_rects(&mut self, rects: &[ScissorRect]) {
        self.bound.scissors = rects.to_vec();
    }

    fn rs_get_scissor_rects(&mut self) -> Vec<ScissorRect> {
        self.bound.scissors.clone()
    }

    // ── input assembler ──

    fn ia_set_input_layout(&mut self, layout: Option<InputLayout>) {
        self.bound.input_layout = layout;
    }

    fn ia_get_input_layout(&mut self) -> Option<InputLayout> {
        let layout = self.bound.input_layout;
        self.retain([layout]);
        layout
    }

    fn ia_set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.bound.topology = topology;
    }

    fn ia_get_primitive_topology(&mut self) -> PrimitiveTopology {
        self.bound.topology
    }

    fn ia_set_vertex_buffers(&mut self, start_slot: u32, buffers: &[VertexBufferBinding]) {
        write_slots(&mut self.bound.vertex_buffers, start_slot, buffers);
    }

    fn ia_get_vertex_buffers(&mut self, start_slot: u32, count: u32) -> Vec<VertexBufferBinding> {
        let bindings = read_slots(&self.bound.vertex_buffers, start_slot, count);
        self.retain(bindings.iter().map(|binding| binding.buffer));
        bindings
    }

    fn ia_set_index_buffer(&mut self, binding: IndexBufferBinding) {
        self.bound.index_buffer = binding;
    }

    fn ia_get_index_buffer(&mut self) -> IndexBufferBinding {
        let binding = self.bound.index_buffer;
        self.retain([binding.buffer]);
        binding
    }

    // ── shader stages ──

    fn vs_set_shader(&mut self, shader: Option<VertexShader>) {
        self.bound.vertex_shader = shader;
    }

    fn vs_get_shader(&mut self) -> Option<VertexShader> {
        let shader = self.bound.vertex_shader;
        self.retain([shader]);
        shader
    }

    fn ps_set_shader(&mut self, shader: Option<PixelShader>) {
        self.bound.pixel_shader = shader;
    }

    fn ps_get_shader(&mut self) -> Option<PixelShader> {
        let shader = self.bound.pixel_shader;
        self.retain([shader]);
        shader
    }

    fn set_samplers(&mut self, stage: ShaderStage, start_slot: u32, samplers: &[Option<SamplerState>]) {
        write_slots(&mut self.bound.stage(stage).samplers, start_slot, samplers);
    }

    fn get_samplers(&mut self, stage: ShaderStage, start_slot: u32, count: u32) -> Vec<Option<SamplerState>> {
        let samplers = read_slots(&self.bound.stage(stage).samplers, start_slot, count);
        self.retain(samplers.iter().copied());
        samplers
    }

    fn set_shader_resources(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        views: &[Option<ShaderResourceView>],
    ) {
        write_slots(&mut self.bound.stage(stage).resources, start_slot, views);
    }

    fn get_shader_resources(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        count: u32,
    ) -> Vec<Option<ShaderResourceView>> {
        let views = read_slots(&self.bound.stage(stage).resources, start_slot, count);
        self.retain(views.iter().copied());
        views
    }

    fn set_constant_buffers(&mut self, stage: ShaderStage, start_slot: u32, buffers: &[Option<Buffer>]) {
        write_slots(&mut self.bound.stage(stage).constant_buffers, start_slot, buffers);
    }

    fn get_constant_buffers(&mut self, stage: ShaderStage, start_slot: u32, count: u32) -> Vec<Option<Buffer>> {
        let buffers = read_slots(&self.bound.stage(stage).constant_buffers, start_slot, count);
        self.retain(buffers.iter().copied());
        buffers
    }

    // ── commands ──

    fn clear_render_target_view(&mut self, target: RenderTargetView, color: [f32; 4]) {
        let shared = self.shared.borrow();
        let Some(entry) = shared.objects.render_targets.get(target) else {
            log::warn!("clear of unknown render target {target:?}");
            return;
        };

        let [r, g, b, a] = color.map(f64::from);
        let mut encoder = shared.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("shadowfb clear encoder"),
        });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadowfb clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &entry.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        shared.queue.submit(Some(encoder.finish()));
    }

    fn clear_depth_stencil_view(
        &mut self,
        view: DepthStencilView,
        clear: DepthStencilClear,
        depth: f32,
        stencil: u8,
    ) {
        let shared = self.shared.borrow();
        let Some(entry) = shared.objects.depth_stencils.get(view) else {
            log::warn!("clear of unknown depth-stencil view {view:?}");
            return;
        };

        let clears_depth = matches!(clear, DepthStencilClear::Depth | DepthStencilClear::DepthStencil);
        let clears_stencil = matches!(clear, DepthStencilClear::Stencil | DepthStencilClear::DepthStencil);

        let depth_ops = wgpu::Operations {
            load: if clears_depth { wgpu::LoadOp::Clear(depth.clamp(0.0, 1.0)) } else { wgpu::LoadOp::Load },
            store: wgpu::StoreOp::Store,
        };
        let stencil_ops = entry.format.has_stencil_aspect().then(|| wgpu::Operations {
            load: if clears_stencil { wgpu::LoadOp::Clear(u32::from(stencil)) } else { wgpu::LoadOp::Load },
            store: wgpu::StoreOp::Store,
        });

        let mut encoder = shared.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("shadowfb depth clear encoder"),
        });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadowfb depth clear pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &entry.view,
                    depth_ops: Some(depth_ops),
                    stencil_ops,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        shared.queue.submit(Some(encoder.finish()));
    }

    fn copy_subresource_region(&mut self, region: &CopyRegion) {
        if let Err(reason) = self.copy_textures(region) {
            log::warn!("copy {:?} -> {:?} dropped: {reason}", region.src, region.dst);
        }
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        if self.bound.vertex_buffers.iter().any(|binding| binding.buffer.is_some()) {
            log::warn!("draw with vertex buffers bound is not supported; dropped");
            return;
        }
        if let Err(reason) = self.draw_sampled(vertex_count, start_vertex) {
            log::warn!("draw of {vertex_count} vertices dropped: {reason}");
        }
    }

    fn draw_indexed(&mut self, index_count: u32, _start_index: u32, _base_vertex: i32) {
        log::debug!("indexed draw of {index_count} indices is not executed by this backend");
    }

    fn add_ref(&mut self, object: Object) {
        self.shared.borrow_mut().objects.add_ref(object);
    }

    fn release(&mut self, object: Object) {
        self.shared.borrow_mut().release(object);
    }
}
