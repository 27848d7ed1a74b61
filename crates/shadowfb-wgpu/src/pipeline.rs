use std::collections::HashMap;

use shadowfb_engine::gpu::{PixelShader, VertexShader};

use crate::objects::ShaderEntry;

/// Identifies one fixed-function configuration of a textured draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub vertex: VertexShader,
    pub pixel: PixelShader,
    pub format: wgpu::TextureFormat,
    pub topology: wgpu::PrimitiveTopology,
}

/// Render pipelines for draws that sample one texture through one sampler.
///
/// Bind group layout: binding 0 is a filterable 2D float texture, binding 1
/// a filtering sampler. Vertices are generated in the vertex stage.
#[derive(Default)]
pub(crate) struct PipelineCache {
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub(crate) fn prepare(
        &mut self,
        device: &wgpu::Device,
        key: PipelineKey,
        vertex: &ShaderEntry,
        pixel: &ShaderEntry,
    ) -> (&wgpu::BindGroupLayout, &wgpu::RenderPipeline) {
        let layout = &*self
            .bind_group_layout
            .get_or_insert_with(|| create_bind_group_layout(device));

        let pipeline = self.pipelines.entry(key).or_insert_with(|| {
            log::debug!("building pipeline for {key:?}");
            create_pipeline(device, layout, &key, vertex, pixel)
        });

        (layout, &*pipeline)
    }

    pub(crate) fn evict_vertex(&mut self, shader: VertexShader) {
        self.pipelines.retain(|key, _| key.vertex != shader);
    }

    pub(crate) fn evict_pixel(&mut self, shader: PixelShader) {
        self.pipelines.retain(|key, _| key.pixel != shader);
    }

    pub(crate) fn len(&self) -> usize {
        self.pipelines.len()
    }
}

fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("shadowfb sampled texture bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    key: &PipelineKey,
    vertex: &ShaderEntry,
    pixel: &ShaderEntry,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("shadowfb pipeline layout"),
        bind_group_layouts: &[bind_group_layout],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("shadowfb textured pipeline"),
        layout: Some(&pipeline_layout),

        vertex: wgpu::VertexState {
            module: &vertex.module,
            entry_point: Some(vertex.entry_point),
            compilation_options: Default::default(),
            buffers: &[],
        },

        fragment: Some(wgpu::FragmentState {
            module: &pixel.module,
            entry_point: Some(pixel.entry_point),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: key.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
