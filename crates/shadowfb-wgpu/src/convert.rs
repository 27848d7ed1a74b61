//! Mapping of engine descriptors onto wgpu ones.

use shadowfb_engine::gpu::{AddressMode, BindFlags, Filter, Format, PrimitiveTopology, SamplerDesc};

pub(crate) fn texture_format(format: Format) -> Option<wgpu::TextureFormat> {
    Some(match format {
        Format::R8G8B8A8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        Format::R8G8B8A8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        Format::B8G8R8A8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        Format::R32Float => wgpu::TextureFormat::R32Float,
        Format::R16Uint => wgpu::TextureFormat::R16Uint,
        Format::R32Uint => wgpu::TextureFormat::R32Uint,
        Format::D24UnormS8Uint => wgpu::TextureFormat::Depth24PlusStencil8,
        Format::D32Float => wgpu::TextureFormat::Depth32Float,
        Format::Unknown => return None,
    })
}

/// Whether the upscale pipeline's filterable float binding accepts `format`.
pub(crate) fn is_filterable_color(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Rgba8Unorm
            | wgpu::TextureFormat::Rgba8UnormSrgb
            | wgpu::TextureFormat::Bgra8Unorm
    )
}

pub(crate) fn texture_usage(bind_flags: BindFlags, format: wgpu::TextureFormat) -> wgpu::TextureUsages {
    let mut usage = wgpu::TextureUsages::empty();
    // Depth24Plus formats have no defined texel layout to copy.
    if !matches!(
        format,
        wgpu::TextureFormat::Depth24Plus | wgpu::TextureFormat::Depth24PlusStencil8
    ) {
        usage |= wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
    }
    if bind_flags.contains(BindFlags::SHADER_RESOURCE) {
        usage |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if bind_flags.contains(BindFlags::RENDER_TARGET) || bind_flags.contains(BindFlags::DEPTH_STENCIL) {
        usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    usage
}

pub(crate) fn buffer_usage(bind_flags: BindFlags) -> wgpu::BufferUsages {
    let mut usage = wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;
    if bind_flags.contains(BindFlags::VERTEX_BUFFER) {
        usage |= wgpu::BufferUsages::VERTEX;
    }
    if bind_flags.contains(BindFlags::INDEX_BUFFER) {
        usage |= wgpu::BufferUsages::INDEX;
    }
    if bind_flags.contains(BindFlags::CONSTANT_BUFFER) {
        usage |= wgpu::BufferUsages::UNIFORM;
    }
    usage
}

fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::Wrap => wgpu::AddressMode::Repeat,
        AddressMode::Mirror => wgpu::AddressMode::MirrorRepeat,
        // Border color needs a device feature; clamping is the closest portable match.
        AddressMode::Clamp | AddressMode::Border => wgpu::AddressMode::ClampToEdge,
    }
}

pub(crate) fn sampler_descriptor(desc: &SamplerDesc) -> wgpu::SamplerDescriptor<'static> {
    let (filter, mipmap_filter, anisotropy_clamp) = match desc.filter {
        Filter::MinMagMipPoint => (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Nearest, 1),
        Filter::MinMagMipLinear => (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Linear, 1),
        Filter::Anisotropic => (
            wgpu::FilterMode::Linear,
            wgpu::MipmapFilterMode::Linear,
            desc.max_anisotropy.clamp(1, 16) as u16,
        ),
    };
    let lod_min_clamp = desc.min_lod.clamp(0.0, 32.0);

    wgpu::SamplerDescriptor {
        label: Some("shadowfb sampler"),
        address_mode_u: address_mode(desc.address_u),
        address_mode_v: address_mode(desc.address_v),
        address_mode_w: address_mode(desc.address_w),
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter,
        lod_min_clamp,
        lod_max_clamp: desc.max_lod.clamp(lod_min_clamp, 32.0),
        compare: None,
        anisotropy_clamp,
        border_color: None,
    }
}

pub(crate) fn topology(topology: PrimitiveTopology) -> Option<wgpu::PrimitiveTopology> {
    Some(match topology {
        PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
        PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
        PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        PrimitiveTopology::Undefined => return None,
    })
}
