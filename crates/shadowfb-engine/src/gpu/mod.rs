//! Graphics API seam.
//!
//! The layer sits between a host and a D3D11-shaped device. Both sides are
//! expressed through the [`Device`] and [`DeviceContext`] traits: the host
//! calls a hooked implementation, which forwards to the next handler in the
//! chain (a real backend or another hook).

mod error;
mod handle;
mod shader;
mod traits;
mod types;

pub use error::GpuError;
pub use handle::{
    Buffer, DepthStencilView, InputLayout, Object, PixelShader, RenderTargetView, Resource,
    SamplerState, ShaderResourceView, Texture2d, VertexShader,
};
pub use shader::CompiledShader;
pub use traits::{DeferredContextFactory, Device, DeviceContext};
pub use types::{
    AddressMode, BindFlags, BufferDesc, ComparisonFunc, ContextKind, CopyBox, CopyRegion,
    DepthStencilClear, Filter, Format, IndexBufferBinding, PrimitiveTopology,
    RenderTargetViewDesc, SamplerDesc, ScissorRect, ShaderResourceViewDesc, ShaderStage,
    TextureDesc, Usage, VertexBufferBinding, Viewport, MAX_RENDER_TARGETS,
};
