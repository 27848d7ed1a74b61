//! Diagnostic overlay contract.
//!
//! The overlay itself lives in the host. The layer only calls it after each
//! indexed draw and keeps virtualization out of its way while it renders.

use crate::gpu::{Device, DeviceContext};

pub trait Overlay {
    /// One-time setup on the bound device. Failure keeps the overlay off.
    fn init(&mut self, device: &mut dyn Device) -> anyhow::Result<()>;

    /// Draws the overlay. Calls made here bypass every rewrite.
    fn render(&mut self, ctx: &mut dyn DeviceContext);
}
