//! Render geometry reported by the host.

use std::cell::Cell;

/// Width and height in pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// The three extents every resolution-sensitive decision depends on.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RenderGeometry {
    /// Size the title's game world is laid out at.
    pub game_world: Extent,
    /// Native output framebuffer of the title.
    pub framebuffer: Extent,
    /// Size the host actually renders at.
    pub internal: Extent,
}

/// Relation between the internal render height and the native framebuffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScaleMode {
    /// Internal height is below the framebuffer; shadows are framebuffer-sized
    /// and the compositor fills them from the small originals.
    Upscale,
    /// Internal height is above the framebuffer; shadows hold rescaled
    /// game-world-sized sources.
    Downscale,
    Native,
}

impl ScaleMode {
    pub fn between(internal_height: u32, framebuffer_height: u32) -> Self {
        match internal_height.cmp(&framebuffer_height) {
            std::cmp::Ordering::Less => ScaleMode::Upscale,
            std::cmp::Ordering::Greater => ScaleMode::Downscale,
            std::cmp::Ordering::Equal => ScaleMode::Native,
        }
    }
}

/// Host collaborator that reports the current render geometry.
///
/// Queried before every resolution-sensitive decision, so implementations
/// should be cheap.
pub trait GeometryProvider {
    fn render_geometry(&self) -> RenderGeometry;

    /// Whether the current frame is intentionally blank.
    ///
    /// The compositor asks once per registered pair, so implementations that
    /// count calls observe one query per pair per pass.
    fn is_blank(&self) -> bool;
}

/// Geometry provider with fixed extents and a settable blank flag.
#[derive(Debug, Default)]
pub struct FixedGeometry {
    geometry: RenderGeometry,
    blank: Cell<bool>,
}

impl FixedGeometry {
    pub fn new(geometry: RenderGeometry) -> Self {
        Self { geometry, blank: Cell::new(false) }
    }

    pub fn set_blank(&self, blank: bool) {
        self.blank.set(blank);
    }
}

impl GeometryProvider for FixedGeometry {
    fn render_geometry(&self) -> RenderGeometry {
        self.geometry
    }

    fn is_blank(&self) -> bool {
        self.blank.get()
    }
}

impl<G: GeometryProvider + ?Sized> GeometryProvider for std::rc::Rc<G> {
    fn render_geometry(&self) -> RenderGeometry {
        (**self).render_geometry()
    }

    fn is_blank(&self) -> bool {
        (**self).is_blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_mode_follows_height_order() {
        assert_eq!(ScaleMode::between(128, 256), ScaleMode::Upscale);
        assert_eq!(ScaleMode::between(480, 256), ScaleMode::Downscale);
        assert_eq!(ScaleMode::between(256, 256), ScaleMode::Native);
    }

    #[test]
    fn fixed_geometry_blank_flag_toggles() {
        let g = FixedGeometry::new(RenderGeometry::default());
        assert!(!g.is_blank());
        g.set_blank(true);
        assert!(g.is_blank());
    }
}
