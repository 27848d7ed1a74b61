//! Rewrites of region copies and pixel-stage sampling binds.

use crate::config::CopyRescale;
use crate::geometry::{RenderGeometry, ScaleMode};
use crate::gpu::{CopyRegion, Resource, ShaderResourceView, Texture2d};
use crate::interceptor::scale_dimension;
use crate::registry::ResourceRegistry;

/// Outcome of [`rewrite_copy`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CopyRewrite {
    pub region: CopyRegion,
    pub source_redirected: bool,
    pub destination_redirected: bool,
}

impl CopyRewrite {
    #[inline]
    pub fn is_rewritten(&self) -> bool {
        self.source_redirected || self.destination_redirected
    }
}

/// Redirects a copy to shadow textures according to the scale mode.
///
/// In upscale mode a tracked source is swapped for its shadow. In downscale
/// mode a tracked destination is swapped and the destination origin and
/// source box are rescaled to the shadow's extents.
pub fn rewrite_copy(
    region: &CopyRegion,
    registry: &ResourceRegistry,
    mode: ScaleMode,
    geometry: &RenderGeometry,
    rescale: CopyRescale,
) -> CopyRewrite {
    let mut out = CopyRewrite {
        region: *region,
        source_redirected: false,
        destination_redirected: false,
    };

    if mode == ScaleMode::Upscale {
        if let Some(shadow) = shadow_of(region.src, registry) {
            out.region.src = Resource::Texture2d(shadow);
            out.source_redirected = true;
        }
        return out;
    }

    if mode != ScaleMode::Downscale {
        return out;
    }
    let Some(shadow) = shadow_of(region.dst, registry) else { return out };
    let Some(cached) = registry.cached_desc() else { return out };

    let (width, height) = match rescale {
        CopyRescale::GameWorldOverFramebuffer => (
            scale_dimension(cached.width, geometry.game_world.width, geometry.framebuffer.width),
            scale_dimension(cached.height, geometry.game_world.height, geometry.framebuffer.height),
        ),
        CopyRescale::InternalOverGameWorld => (
            scale_dimension(cached.width, geometry.internal.width, geometry.game_world.width),
            scale_dimension(cached.height, geometry.internal.height, geometry.game_world.height),
        ),
    };

    out.region.dst = Resource::Texture2d(shadow);
    // A non-zero origin addresses the second half of a paired surface.
    out.region.dst_x = if region.dst_x != 0 { width } else { 0 };
    if let Some(src_box) = out.region.src_box.as_mut() {
        src_box.right = width;
        src_box.bottom = height;
    }
    out.destination_redirected = true;
    out
}

fn shadow_of(resource: Resource, registry: &ResourceRegistry) -> Option<Texture2d> {
    registry.lookup_shadow_texture(resource.as_texture()?)
}

/// Replaces every view that has a shadow counterpart.
///
/// Returns `None` when nothing was substituted.
pub fn substitute_views(
    views: &[Option<ShaderResourceView>],
    registry: &ResourceRegistry,
) -> Option<Vec<Option<ShaderResourceView>>> {
    let mut hit = false;
    let rewritten = views
        .iter()
        .map(|view| {
            let view = (*view)?;
            match registry.lookup_shadow_view(view) {
                Some(shadow) => {
                    hit = true;
                    Some(shadow)
                }
                None => Some(view),
            }
        })
        .collect();
    hit.then_some(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Extent;
    use crate::gpu::{BindFlags, CopyBox, Format, TextureDesc, Usage};

    fn tex(n: u64) -> Texture2d {
        Texture2d::from_raw(n)
    }

    fn srv(n: u64) -> ShaderResourceView {
        ShaderResourceView::from_raw(n)
    }

    fn geometry() -> RenderGeometry {
        RenderGeometry {
            game_world: Extent::new(320, 240),
            framebuffer: Extent::new(640, 480),
            internal: Extent::new(1280, 960),
        }
    }

    fn region(dst: u64, src: u64, dst_x: u32) -> CopyRegion {
        CopyRegion {
            dst: Resource::Texture2d(tex(dst)),
            dst_subresource: 0,
            dst_x,
            dst_y: 0,
            dst_z: 0,
            src: Resource::Texture2d(tex(src)),
            src_subresource: 0,
            src_box: Some(CopyBox { left: 0, top: 0, front: 0, right: 320, bottom: 240, back: 1 }),
        }
    }

    fn registry_with(original: u64, shadow: u64, w: u32, h: u32) -> ResourceRegistry {
        let mut r = ResourceRegistry::new();
        let desc = TextureDesc::new(w, h, Format::R8G8B8A8Unorm, Usage::Default, BindFlags::RENDER_TARGET);
        r.register_shadow_texture(tex(original), tex(shadow), desc);
        r
    }

    // ── source redirect ──

    #[test]
    fn upscale_redirects_tracked_source_only() {
        let r = registry_with(1, 2, 640, 480);
        let out = rewrite_copy(&region(9, 1, 0), &r, ScaleMode::Upscale, &geometry(), CopyRescale::default());
        assert!(out.source_redirected);
        assert_eq!(out.region.src, Resource::Texture2d(tex(2)));
        assert_eq!(out.region.src_box, region(9, 1, 0).src_box);
        assert_eq!(out.region.dst, Resource::Texture2d(tex(9)));
    }

    #[test]
    fn untracked_copy_is_verbatim() {
        let r = registry_with(1, 2, 640, 480);
        for mode in [ScaleMode::Upscale, ScaleMode::Downscale, ScaleMode::Native] {
            let input = region(7, 8, 5);
            let out = rewrite_copy(&input, &r, mode, &geometry(), CopyRescale::default());
            assert!(!out.is_rewritten());
            assert_eq!(out.region, input);
        }
    }

    #[test]
    fn native_mode_never_redirects() {
        let r = registry_with(1, 2, 640, 480);
        let out = rewrite_copy(&region(1, 1, 0), &r, ScaleMode::Native, &geometry(), CopyRescale::default());
        assert!(!out.is_rewritten());
    }

    // ── destination redirect ──

    #[test]
    fn downscale_redirects_destination_and_rescales() {
        let r = registry_with(1, 2, 600, 450);
        let out = rewrite_copy(&region(1, 5, 0), &r, ScaleMode::Downscale, &geometry(), CopyRescale::GameWorldOverFramebuffer);
        assert!(out.destination_redirected);
        assert_eq!(out.region.dst, Resource::Texture2d(tex(2)));
        assert_eq!(out.region.dst_x, 0);
        // 600 * 320 / 640 = 300, 450 * 240 / 480 = 225
        let b = out.region.src_box.unwrap();
        assert_eq!((b.right, b.bottom), (300, 225));
        assert_eq!((b.left, b.top), (0, 0));
    }

    #[test]
    fn nonzero_destination_x_becomes_scaled_width() {
        let r = registry_with(1, 2, 600, 450);
        let out = rewrite_copy(&region(1, 5, 1), &r, ScaleMode::Downscale, &geometry(), CopyRescale::GameWorldOverFramebuffer);
        assert_eq!(out.region.dst_x, 300);
    }

    #[test]
    fn internal_over_game_world_basis() {
        let r = registry_with(1, 2, 600, 450);
        let out = rewrite_copy(&region(1, 5, 3), &r, ScaleMode::Downscale, &geometry(), CopyRescale::InternalOverGameWorld);
        // 600 * 1280 / 320 = 2400, 450 * 960 / 240 = 1800
        assert_eq!(out.region.dst_x, 2400);
        let b = out.region.src_box.unwrap();
        assert_eq!((b.right, b.bottom), (2400, 1800));
    }

    #[test]
    fn whole_resource_copy_keeps_no_box() {
        let r = registry_with(1, 2, 600, 450);
        let mut input = region(1, 5, 0);
        input.src_box = None;
        let out = rewrite_copy(&input, &r, ScaleMode::Downscale, &geometry(), CopyRescale::default());
        assert!(out.destination_redirected);
        assert_eq!(out.region.src_box, None);
    }

    #[test]
    fn upscale_mode_ignores_tracked_destination() {
        let r = registry_with(1, 2, 640, 480);
        let out = rewrite_copy(&region(1, 5, 4), &r, ScaleMode::Upscale, &geometry(), CopyRescale::default());
        assert!(!out.is_rewritten());
    }

    // ── views ──

    #[test]
    fn substitutes_only_known_views() {
        let mut r = registry_with(1, 2, 640, 480);
        r.register_shadow_view(tex(1), srv(10), srv(11)).unwrap();

        let out = substitute_views(&[Some(srv(3)), None, Some(srv(10))], &r).unwrap();
        assert_eq!(out, vec![Some(srv(3)), None, Some(srv(11))]);
        assert_eq!(substitute_views(&[Some(srv(3)), None], &r), None);
    }
}
