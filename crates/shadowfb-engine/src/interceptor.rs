//! Recognition of the framebuffer texture family and shadow sizing.

use crate::geometry::{RenderGeometry, ScaleMode};
use crate::gpu::{BindFlags, Format, TextureDesc, Usage};

/// Format of the textures the layer virtualizes.
pub const RECOGNIZED_FORMAT: Format = Format::R8G8B8A8Unorm;
/// Usage of the textures the layer virtualizes.
pub const RECOGNIZED_USAGE: Usage = Usage::Default;

/// Which creation pattern a texture request matched.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TexturePattern {
    /// Internal-height render target that is expanded to the framebuffer size.
    Expand,
    /// Game-world-sized source that is rescaled by `internal / framebuffer`.
    Shrink,
}

/// Classifies a texture request. `None` means plain passthrough.
pub fn match_texture(desc: &TextureDesc, internal_height: u32, geometry: &RenderGeometry) -> Option<TexturePattern> {
    if desc.format != RECOGNIZED_FORMAT || desc.usage != RECOGNIZED_USAGE {
        return None;
    }

    match ScaleMode::between(internal_height, geometry.framebuffer.height) {
        ScaleMode::Upscale if desc.height == internal_height => Some(TexturePattern::Expand),
        ScaleMode::Downscale
            if desc.width == geometry.game_world.width && desc.height == geometry.game_world.height =>
        {
            Some(TexturePattern::Shrink)
        }
        _ => None,
    }
}

/// Descriptor used to create the shadow twin of a matched request.
pub fn shadow_desc(
    desc: &TextureDesc,
    pattern: TexturePattern,
    internal_height: u32,
    geometry: &RenderGeometry,
) -> TextureDesc {
    let fb = geometry.framebuffer;
    let (width, height) = match pattern {
        TexturePattern::Expand => (fb.width, fb.height),
        TexturePattern::Shrink => (
            scale_dimension(desc.width, internal_height, fb.height),
            scale_dimension(desc.height, internal_height, fb.height),
        ),
    };

    TextureDesc {
        width,
        height,
        bind_flags: desc.bind_flags | BindFlags::SHADER_RESOURCE | BindFlags::RENDER_TARGET,
        ..*desc
    }
}

/// `value * numerator / denominator` with truncation.
///
/// A zero denominator leaves the value unchanged.
pub fn scale_dimension(value: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return value;
    }
    let scaled = u64::from(value) * u64::from(numerator) / u64::from(denominator);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}
