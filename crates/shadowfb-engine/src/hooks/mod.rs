//! Hooked wrappers around the next handler in the call chain.
//!
//! [`HookedDevice`] and [`HookedContext`] implement the same traits as the
//! objects they wrap. Each method applies its rewrite, if any, and forwards
//! to the wrapped implementation.

mod context;
mod device;

pub use context::HookedContext;
pub use device::HookedDevice;
