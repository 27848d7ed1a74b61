use std::ops::{BitOr, BitOrAssign};

use super::handle::{Buffer, Resource};

/// Number of simultaneously bindable render targets.
pub const MAX_RENDER_TARGETS: usize = 8;

/// Pixel formats the layer needs to tell apart.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Format {
    #[default]
    Unknown,
    R8G8B8A8Unorm,
    R8G8B8A8UnormSrgb,
    B8G8R8A8Unorm,
    R32Float,
    R16Uint,
    R32Uint,
    D24UnormS8Uint,
    D32Float,
}

impl Format {
    /// Bytes per texel, or `None` for formats the layer never sizes.
    pub const fn bytes_per_texel(self) -> Option<u32> {
        match self {
            Format::R8G8B8A8Unorm
            | Format::R8G8B8A8UnormSrgb
            | Format::B8G8R8A8Unorm
            | Format::R32Float
            | Format::R32Uint
            | Format::D24UnormS8Uint
            | Format::D32Float => Some(4),
            Format::R16Uint => Some(2),
            Format::Unknown => None,
        }
    }
}

/// Expected CPU/GPU access pattern of a resource.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Usage {
    #[default]
    Default,
    Immutable,
    Dynamic,
    Staging,
}

/// Pipeline stages a resource may be bound to.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindFlags(u32);

impl BindFlags {
    pub const VERTEX_BUFFER: Self = Self(0x1);
    pub const INDEX_BUFFER: Self = Self(0x2);
    pub const CONSTANT_BUFFER: Self = Self(0x4);
    pub const SHADER_RESOURCE: Self = Self(0x8);
    pub const RENDER_TARGET: Self = Self(0x20);
    pub const DEPTH_STENCIL: Self = Self(0x40);

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for BindFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for BindFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Creation parameters of a 2D texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub array_size: u32,
    pub format: Format,
    pub sample_count: u32,
    pub usage: Usage,
    pub bind_flags: BindFlags,
}

impl TextureDesc {
    /// Single-mip, single-sample texture.
    pub const fn new(width: u32, height: u32, format: Format, usage: Usage, bind_flags: BindFlags) -> Self {
        Self {
            width,
            height,
            mip_levels: 1,
            array_size: 1,
            format,
            sample_count: 1,
            usage,
            bind_flags,
        }
    }
}

/// Creation parameters of a buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    pub byte_width: u32,
    pub usage: Usage,
    pub bind_flags: BindFlags,
}

/// Optional format override for a sampling view. `None` fields inherit from the resource.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShaderResourceViewDesc {
    pub format: Option<Format>,
    pub most_detailed_mip: u32,
    pub mip_levels: Option<u32>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct RenderTargetViewDesc {
    pub format: Option<Format>,
    pub mip_slice: u32,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    #[default]
    MinMagMipPoint,
    MinMagMipLinear,
    Anisotropic,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Wrap,
    Mirror,
    #[default]
    Clamp,
    Border,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ComparisonFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    #[default]
    Always,
}

/// Sampler creation parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SamplerDesc {
    pub filter: Filter,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub mip_lod_bias: f32,
    pub max_anisotropy: u32,
    pub comparison: ComparisonFunc,
    pub border_color: [f32; 4],
    pub min_lod: f32,
    pub max_lod: f32,
}

impl SamplerDesc {
    /// Nearest-neighbour sampling, clamped on every axis, full LOD range.
    pub const fn point_clamp() -> Self {
        Self {
            filter: Filter::MinMagMipPoint,
            address_u: AddressMode::Clamp,
            address_v: AddressMode::Clamp,
            address_w: AddressMode::Clamp,
            mip_lod_bias: 0.0,
            max_anisotropy: 0,
            comparison: ComparisonFunc::Always,
            border_color: [0.0; 4],
            min_lod: 0.0,
            max_lod: f32::MAX,
        }
    }
}

/// Rasterizer viewport in render-target pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub top_left_x: f32,
    pub top_left_y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Origin-anchored viewport with a `0..1` depth range.
    #[inline]
    pub const fn sized(width: f32, height: f32) -> Self {
        Self {
            top_left_x: 0.0,
            top_left_y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ScissorRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Source region of a copy. `right`/`bottom`/`back` are exclusive.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct CopyBox {
    pub left: u32,
    pub top: u32,
    pub front: u32,
    pub right: u32,
    pub bottom: u32,
    pub back: u32,
}

/// Arguments of a region copy between two resources.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CopyRegion {
    pub dst: Resource,
    pub dst_subresource: u32,
    pub dst_x: u32,
    pub dst_y: u32,
    pub dst_z: u32,
    pub src: Resource,
    pub src_subresource: u32,
    /// `None` copies the whole source subresource.
    pub src_box: Option<CopyBox>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    #[default]
    Undefined,
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

/// One input-assembler vertex buffer slot.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexBufferBinding {
    pub buffer: Option<Buffer>,
    pub stride: u32,
    pub offset: u32,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct IndexBufferBinding {
    pub buffer: Option<Buffer>,
    pub format: Format,
    pub offset: u32,
}

/// Programmable stages the layer touches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// Which planes a depth-stencil clear writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DepthStencilClear {
    Depth,
    Stencil,
    DepthStencil,
}

/// Recording mode of a device context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Immediate,
    Deferred,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── BindFlags ──

    #[test]
    fn bind_flags_union_and_contains() {
        let mut flags = BindFlags::SHADER_RESOURCE;
        flags |= BindFlags::RENDER_TARGET;
        assert!(flags.contains(BindFlags::SHADER_RESOURCE));
        assert!(flags.contains(BindFlags::RENDER_TARGET | BindFlags::SHADER_RESOURCE));
        assert!(!flags.contains(BindFlags::DEPTH_STENCIL));
        assert_eq!(flags.bits(), 0x28);
    }

    #[test]
    fn empty_contains_nothing_but_empty() {
        assert!(BindFlags::empty().contains(BindFlags::empty()));
        assert!(!BindFlags::empty().contains(BindFlags::VERTEX_BUFFER));
    }

    // ── SamplerDesc ──

    #[test]
    fn point_clamp_spans_full_lod_range() {
        let s = SamplerDesc::point_clamp();
        assert_eq!(s.filter, Filter::MinMagMipPoint);
        assert_eq!(s.comparison, ComparisonFunc::Always);
        assert_eq!(s.min_lod, 0.0);
        assert_eq!(s.max_lod, f32::MAX);
        assert_eq!(
            [s.address_u, s.address_v, s.address_w],
            [AddressMode::Clamp; 3]
        );
    }
}
