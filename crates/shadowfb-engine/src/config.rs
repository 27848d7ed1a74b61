//! Startup configuration for the virtualization layer.
//!
//! Loading the values from disk is the host's business; the layer only
//! receives an [`UpscaleConfig`] once and never reloads it.

/// How much of the intercepted traffic is logged.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RendererLevel {
    /// Nothing beyond warnings.
    #[default]
    Off,
    /// Shadow resource creation and registration.
    Resources,
    /// Rewritten calls and state changes.
    Calls,
    /// Every intercepted call, including plain passthrough.
    Verbose,
}

impl RendererLevel {
    /// Maps a raw verbosity integer, clamping to `0..=3`.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            i32::MIN..=0 => Self::Off,
            1 => Self::Resources,
            2 => Self::Calls,
            _ => Self::Verbose,
        }
    }

    #[inline]
    pub fn traces(self, level: RendererLevel) -> bool {
        level != Self::Off && self >= level
    }

    /// `log` level used for messages gated at this verbosity.
    pub fn log_level(self) -> log::Level {
        match self {
            Self::Off | Self::Resources => log::Level::Info,
            Self::Calls => log::Level::Debug,
            Self::Verbose => log::Level::Trace,
        }
    }
}

/// Which extents scale a redirected copy destination.
///
/// The destination rewrite multiplies the cached shadow size by a ratio. Which
/// pair of extents forms that ratio depends on the surface layout of the title
/// being hosted, so it is left configurable.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CopyRescale {
    /// `shadow * game_world / framebuffer`.
    #[default]
    GameWorldOverFramebuffer,
    /// `shadow * internal / game_world`.
    InternalOverGameWorld,
}

/// Layer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleConfig {
    /// Enables render-target virtualization.
    ///
    /// Even when set, virtualization stays off until shader compilation succeeds.
    pub enabled: bool,

    /// Height the host renders its game world at.
    ///
    /// Zero means "same as the output height"; see [`UpscaleConfig::resolve`].
    pub internal_height: u32,

    /// Per-call trace verbosity.
    pub renderer_level: RendererLevel,

    /// Enables the diagnostic overlay hook.
    pub overlay: bool,

    /// Rescale basis for redirected copy destinations.
    pub copy_rescale: CopyRescale,
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            internal_height: 0,
            renderer_level: RendererLevel::Off,
            overlay: false,
            copy_rescale: CopyRescale::default(),
        }
    }
}

impl UpscaleConfig {
    /// Returns a copy with a concrete internal height.
    ///
    /// An unset internal height falls back to `output_height`.
    pub fn resolve(&self, output_height: u32) -> Self {
        let mut resolved = self.clone();
        if resolved.internal_height == 0 {
            resolved.internal_height = output_height;
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── RendererLevel ──

    #[test]
    fn raw_levels_clamp() {
        assert_eq!(RendererLevel::from_raw(-4), RendererLevel::Off);
        assert_eq!(RendererLevel::from_raw(0), RendererLevel::Off);
        assert_eq!(RendererLevel::from_raw(2), RendererLevel::Calls);
        assert_eq!(RendererLevel::from_raw(9), RendererLevel::Verbose);
    }

    #[test]
    fn level_gating_is_cumulative() {
        let level = RendererLevel::Calls;
        assert!(level.traces(RendererLevel::Resources));
        assert!(level.traces(RendererLevel::Calls));
        assert!(!level.traces(RendererLevel::Verbose));
        assert!(!RendererLevel::Verbose.traces(RendererLevel::Off));
    }

    // ── resolve ──

    #[test]
    fn zero_internal_height_uses_output_height() {
        let config = UpscaleConfig::default().resolve(720);
        assert_eq!(config.internal_height, 720);
    }

    #[test]
    fn explicit_internal_height_is_kept() {
        let config = UpscaleConfig { internal_height: 128, ..Default::default() }.resolve(720);
        assert_eq!(config.internal_height, 128);
    }
}
