use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};

use shadowfb_engine::gpu::{
    BindFlags, Buffer, BufferDesc, CompiledShader, DepthStencilView, Device, GpuError, Object,
    PixelShader, RenderTargetView, RenderTargetViewDesc, Resource, SamplerDesc, SamplerState,
    ShaderResourceView, ShaderResourceViewDesc, ShaderStage, Texture2d, TextureDesc, VertexShader,
};

use crate::convert;
use crate::objects::{ShaderEntry, TextureEntry, ViewEntry};
use crate::SharedRef;

/// [`Device`] implementation over a wgpu device.
pub struct WgpuDevice {
    shared: SharedRef,
}

impl WgpuDevice {
    pub(crate) fn new(shared: SharedRef) -> Self {
        Self { shared }
    }

    /// Number of objects with at least one outstanding reference.
    pub fn live_objects(&self) -> usize {
        self.shared.borrow().objects.live()
    }

    /// `None` once the object has been destroyed.
    pub fn ref_count(&self, object: impl Into<Object>) -> Option<u32> {
        self.shared.borrow().objects.ref_count(object.into())
    }

    pub fn cached_pipelines(&self) -> usize {
        self.shared.borrow().pipelines.len()
    }

    /// Copies mip 0 of a color texture back to the CPU, rows tightly packed.
    pub fn read_texture(&self, texture: Texture2d) -> anyhow::Result<Vec<u8>> {
        const MAX_POLLS: u32 = 5_000;

        let shared = self.shared.borrow();
        let entry = shared
            .objects
            .textures
            .get(texture)
            .ok_or_else(|| anyhow!("unknown texture {texture:?}"))?;
        let texel_bytes = entry
            .format
            .block_copy_size(None)
            .ok_or_else(|| anyhow!("{:?} cannot be read back", entry.format))?;

        let (width, height) = (entry.desc.width, entry.desc.height);
        let row_bytes = width * texel_bytes;
        let padded_row = row_bytes.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let buffer = shared.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shadowfb readback"),
            size: u64::from(padded_row) * u64::from(height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = shared.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("shadowfb readback"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &entry.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        shared.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            drop(sender.send(result));
        });
        let mut polls = 0;
        loop {
            let _ = shared.device.poll(wgpu::PollType::Poll);
            if let Ok(result) = receiver.try_recv() {
                result.context("readback buffer failed to map")?;
                break;
            }
            polls += 1;
            if polls == MAX_POLLS {
                bail!("readback of {texture:?} did not complete");
            }
            thread::sleep(Duration::from_millis(1));
        }

        let mapped = slice.get_mapped_range();
        let pixels = mapped
            .chunks(padded_row as usize)
            .flat_map(|row| &row[..row_bytes as usize])
            .copied()
            .collect();
        drop(mapped);
        buffer.unmap();
        Ok(pixels)
    }

    fn texture_view(
        &mut self,
        resource: Resource,
        required: BindFlags,
        base_mip_level: u32,
        mip_level_count: Option<u32>,
        format: Option<wgpu::TextureFormat>,
    ) -> Result<ViewEntry, GpuError> {
        let Some(texture) = resource.as_texture() else {
            return Err(GpuError::Unsupported("views over buffers".into()));
        };

        let shared = self.shared.borrow();
        let entry = shared
            .objects
            .textures
            .get(texture)
            .ok_or(GpuError::UnknownHandle { kind: "texture", raw: texture.raw() })?;

        if !entry.desc.bind_flags.contains(required) {
            return Err(GpuError::InvalidArgument(format!(
                "texture {texture:?} lacks bind flags {:#x}",
                required.bits()
            )));
        }
        let last_mip = base_mip_level.saturating_add(mip_level_count.unwrap_or(1));
        if last_mip > entry.texture.mip_level_count() || mip_level_count == Some(0) {
            return Err(GpuError::InvalidArgument(format!(
                "mips {base_mip_level}..{last_mip} out of range for {texture:?}"
            )));
        }
        if let Some(format) = format {
            if format != entry.format {
                return Err(GpuError::Unsupported(format!(
                    "view format {format:?} over a {:?} texture",
                    entry.format
                )));
            }
        }

        let view = entry.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadowfb view"),
            base_mip_level,
            mip_level_count,
            ..Default::default()
        });

        Ok(ViewEntry {
            view,
            texture,
            format: entry.format,
            width: (entry.desc.width >> base_mip_level).max(1),
            height: (entry.desc.height >> base_mip_level).max(1),
        })
    }

    fn shader_module(
        &mut self,
        shader: &CompiledShader,
        stage: ShaderStage,
    ) -> Result<ShaderEntry, GpuError> {
        if shader.stage() != stage {
            return Err(GpuError::ShaderRejected {
                stage,
                message: format!("bytecode is for the {:?} stage", shader.stage()),
            });
        }

        let shared = self.shared.borrow();
        let module = shared.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadowfb shader"),
            source: wgpu::ShaderSource::Wgsl(shader.source().into()),
        });
        Ok(ShaderEntry { module, entry_point: shader.entry_point() })
    }
}

fn map_format(format: shadowfb_engine::gpu::Format) -> Result<wgpu::TextureFormat, GpuError> {
    convert::texture_format(format)
        .ok_or_else(|| GpuError::Unsupported(format!("texture format {format:?}")))
}

/// Number of mip levels a full chain of a `width`x`height` texture has.
fn full_mip_chain(width: u32, height: u32) -> u32 {
    32 - width.max(height).leading_zeros()
}

impl Device for WgpuDevice {
    fn create_texture_2d(
        &mut self,
        desc: &TextureDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<Texture2d, GpuError> {
        let format = map_format(desc.format)?;
        let mut shared = self.shared.borrow_mut();

        let max_dimension = shared.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 {
            return Err(GpuError::InvalidArgument("zero-sized texture".into()));
        }
        if desc.width > max_dimension || desc.height > max_dimension {
            return Err(GpuError::InvalidArgument(format!(
                "{}x{} exceeds the {max_dimension} texel limit",
                desc.width, desc.height
            )));
        }
        if desc.sample_count > 1 {
            return Err(GpuError::Unsupported("multisampled textures".into()));
        }
        let mip_level_count = desc.mip_levels.clamp(1, full_mip_chain(desc.width, desc.height));

        let bytes_per_row = desc.format.bytes_per_texel().unwrap_or(0) * desc.width;
        let upload_len = bytes_per_row as usize * desc.height as usize;
        if let Some(data) = initial_data {
            if format.has_depth_aspect() {
                return Err(GpuError::Unsupported("initial data for depth textures".into()));
            }
            if data.len() < upload_len {
                return Err(GpuError::InvalidArgument(format!(
                    "initial data holds {} bytes, {upload_len} needed",
                    data.len()
                )));
            }
        }

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: desc.array_size.max(1),
        };
        let texture = shared.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadowfb texture"),
            size,
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: convert::texture_usage(desc.bind_flags, format),
            view_formats: &[],
        });

        if let Some(data) = initial_data {
            shared.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &data[..upload_len],
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(desc.height),
                },
                wgpu::Extent3d { width: desc.width, height: desc.height, depth_or_array_layers: 1 },
            );
        }

        let handle = Texture2d::from_raw(shared.objects.next_raw());
        let mut desc = *desc;
        desc.mip_levels = mip_level_count;
        shared.objects.textures.insert(handle, TextureEntry { texture, desc, format });
        log::trace!("created {handle:?} {}x{} {format:?}", desc.width, desc.height);
        Ok(handle)
    }

    fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<Buffer, GpuError> {
        if desc.byte_width == 0 {
            return Err(GpuError::InvalidArgument("zero-sized buffer".into()));
        }
        let size = u64::from(desc.byte_width).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

        let mut shared = self.shared.borrow_mut();
        let buffer = shared.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shadowfb buffer"),
            size,
            usage: convert::buffer_usage(desc.bind_flags),
            mapped_at_creation: false,
        });

        if let Some(data) = initial_data {
            let len = data.len().min(desc.byte_width as usize);
            let mut padded = data[..len].to_vec();
            padded.resize(len.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize), 0);
            shared.queue.write_buffer(&buffer, 0, &padded);
        }

        let handle = Buffer::from_raw(shared.objects.next_raw());
        shared.objects.buffers.insert(handle, buffer);
        Ok(handle)
    }

    fn create_shader_resource_view(
        &mut self,
        resource: Resource,
        desc: Option<&ShaderResourceViewDesc>,
    ) -> Result<ShaderResourceView, GpuError> {
        let desc = desc.copied().unwrap_or_default();
        let format = desc.format.map(map_format).transpose()?;
        let entry = self.texture_view(
            resource,
            BindFlags::SHADER_RESOURCE,
            desc.most_detailed_mip,
            desc.mip_levels,
            format,
        )?;

        let mut shared = self.shared.borrow_mut();
        let handle = ShaderResourceView::from_raw(shared.objects.next_raw());
        shared.objects.shader_views.insert(handle, entry);
        Ok(handle)
    }

    fn create_render_target_view(
        &mut self,
        resource: Resource,
        desc: Option<&RenderTargetViewDesc>,
    ) -> Result<RenderTargetView, GpuError> {
        let desc = desc.copied().unwrap_or_default();
        let format = desc.format.map(map_format).transpose()?;
        let entry =
            self.texture_view(resource, BindFlags::RENDER_TARGET, desc.mip_slice, Some(1), format)?;

        let mut shared = self.shared.borrow_mut();
        let handle = RenderTargetView::from_raw(shared.objects.next_raw());
        shared.objects.render_targets.insert(handle, entry);
        Ok(handle)
    }

    fn create_depth_stencil_view(&mut self, resource: Resource) -> Result<DepthStencilView, GpuError> {
        let entry = self.texture_view(resource, BindFlags::DEPTH_STENCIL, 0, Some(1), None)?;
        if !entry.format.has_depth_aspect() {
            return Err(GpuError::InvalidArgument(format!(
                "{:?} is not a depth format",
                entry.format
            )));
        }

        let mut shared = self.shared.borrow_mut();
        let handle = DepthStencilView::from_raw(shared.objects.next_raw());
        shared.objects.depth_stencils.insert(handle, entry);
        Ok(handle)
    }

    fn create_sampler_state(&mut self, desc: &SamplerDesc) -> Result<SamplerState, GpuError> {
        let mut shared = self.shared.borrow_mut();
        let sampler = shared.device.create_sampler(&convert::sampler_descriptor(desc));
        let handle = SamplerState::from_raw(shared.objects.next_raw());
        shared.objects.samplers.insert(handle, sampler);
        Ok(handle)
    }

    fn create_vertex_shader(&mut self, shader: &CompiledShader) -> Result<VertexShader, GpuError> {
        let entry = self.shader_module(shader, ShaderStage::Vertex)?;
        let mut shared = self.shared.borrow_mut();
        let handle = VertexShader::from_raw(shared.objects.next_raw());
        shared.objects.vertex_shaders.insert(handle, entry);
        Ok(handle)
    }

    fn create_pixel_shader(&mut self, shader: &CompiledShader) -> Result<PixelShader, GpuError> {
        let entry = self.shader_module(shader, ShaderStage::Pixel)?;
        let mut shared = self.shared.borrow_mut();
        let handle = PixelShader::from_raw(shared.objects.next_raw());
        shared.objects.pixel_shaders.insert(handle, entry);
        Ok(handle)
    }

    fn add_ref(&mut self, object: Object) {
        self.shared.borrow_mut().objects.add_ref(object);
    }

    fn release(&mut self, object: Object) {
        self.shared.borrow_mut().release(object);
    }
}
