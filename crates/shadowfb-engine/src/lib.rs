//! Render-target virtualization and upscale compositing.
//!
//! The layer sits between a host application and its graphics device. It
//! recognizes the host's framebuffer-family textures, keeps shadow twins of
//! them at a different resolution, redirects copies and sampling binds to
//! those twins, and injects a state-preserving pass that upscales the
//! original contents into the shadows.
//!
//! Hosts construct a [`Layer`] once, hand their device and immediate context
//! to [`Layer::hook_device`] and use the returned wrappers in place of the
//! originals.

pub mod logging;

pub mod compositor;
pub mod config;
pub mod gates;
pub mod geometry;
pub mod gpu;
pub mod hooks;
pub mod interceptor;
pub mod layer;
pub mod overlay;
pub mod registry;
pub mod rewriter;

#[cfg(test)]
mod testing;

pub use config::{CopyRescale, RendererLevel, UpscaleConfig};
pub use geometry::{Extent, FixedGeometry, GeometryProvider, RenderGeometry, ScaleMode};
pub use hooks::{HookedContext, HookedDevice};
pub use layer::{DeviceHook, Layer, LayerError};
pub use overlay::Overlay;
