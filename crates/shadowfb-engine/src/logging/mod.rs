//! Logging setup and per-call trace gating.
//!
//! The layer only talks to the `log` facade. `init_logging` is a convenience
//! for hosts and tools that do not bring their own backend. How much of the
//! intercepted traffic is traced is decided by [`RendererLevel`](crate::config::RendererLevel)
//! through the crate-local `trace_call!` macro.

mod init;

pub use init::{init_logging, LoggingConfig};

/// Logs an intercepted call when the layer's renderer level reaches `$level`.
macro_rules! trace_call {
    ($layer:expr, $level:expr, $($arg:tt)+) => {{
        let level: $crate::config::RendererLevel = $level;
        if $layer.config().renderer_level.traces(level) {
            log::log!(level.log_level(), $($arg)+);
        }
    }};
}

pub(crate) use trace_call;
