use crate::gates::ReentrancyFlag;
use crate::geometry::{Extent, GeometryProvider};
use crate::gpu::{
    DeviceContext, IndexBufferBinding, PixelShader, PrimitiveTopology, SamplerState, ScissorRect,
    ShaderStage, VertexBufferBinding, VertexShader, Viewport,
};
use crate::registry::UpscalePair;

use super::snapshot::PipelineSnapshot;

const TRANSPARENT: [f32; 4] = [0.0; 4];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct PassObjects {
    pub vertex_shader: VertexShader,
    pub pixel_shader: PixelShader,
    pub sampler: Option<SamplerState>,
}

/// What one upscale pass did.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    pub drawn: usize,
    pub blanked: usize,
    pub skipped: usize,
}

/// Draws every pair's source into its target, leaving the host's pipeline
/// state as it found it.
///
/// `ctx` is expected to be the hooked context, so the source bind goes through
/// the rewriter; `guard` keeps it from being redirected.
pub(crate) fn run_upscale(
    ctx: &mut dyn DeviceContext,
    pairs: &[UpscalePair],
    objects: PassObjects,
    extent: Extent,
    geometry: &dyn GeometryProvider,
    guard: &ReentrancyFlag,
) -> PassStats {
    let mut stats = PassStats::default();

    for pair in pairs {
        if geometry.is_blank() {
            ctx.clear_render_target_view(pair.target, TRANSPARENT);
            stats.blanked += 1;
            continue;
        }

        let Some(sampler) = objects.sampler else {
            log::debug!("upscale: no sampler, skipping {:?}", pair.source);
            stats.skipped += 1;
            continue;
        };

        let snapshot = PipelineSnapshot::capture(ctx);

        ctx.om_set_render_targets(&[Some(pair.target)], None);
        ctx.rs_set_viewports(&[Viewport::sized(extent.width as f32, extent.height as f32)]);
        ctx.rs_set_scissor_rects(&[ScissorRect {
            left: 0,
            top: 0,
            right: i32::try_from(extent.width).unwrap_or(i32::MAX),
            bottom: i32::try_from(extent.height).unwrap_or(i32::MAX),
        }]);
        ctx.clear_render_target_view(pair.target, TRANSPARENT);

        ctx.ia_set_input_layout(None);
        ctx.ia_set_primitive_topology(PrimitiveTopology::TriangleList);
        ctx.ia_set_vertex_buffers(0, &[VertexBufferBinding::default()]);
        ctx.ia_set_index_buffer(IndexBufferBinding::default());

        ctx.vs_set_shader(Some(objects.vertex_shader));
        ctx.ps_set_shader(Some(objects.pixel_shader));

        {
            let _scope = guard.hold();
            ctx.set_shader_resources(ShaderStage::Pixel, 0, &[Some(pair.source)]);
            ctx.set_samplers(ShaderStage::Pixel, 0, &[Some(sampler)]);
        }

        ctx.draw(3, 0);

        // The captured pixel view may already be a shadow view; rebinding it
        // must not be substituted a second time.
        let _scope = guard.hold();
        snapshot.restore(ctx);
        stats.drawn += 1;
    }

    stats
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::geometry::RenderGeometry;
    use crate::gpu::{RenderTargetView, ShaderResourceView};
    use crate::testing::{Call, Recorder};

    struct CountingGeometry {
        blank: bool,
        queries: Cell<usize>,
    }

    impl GeometryProvider for CountingGeometry {
        fn render_geometry(&self) -> RenderGeometry {
            RenderGeometry::default()
        }

        fn is_blank(&self) -> bool {
            self.queries.set(self.queries.get() + 1);
            self.blank
        }
    }

    fn geometry(blank: bool) -> CountingGeometry {
        CountingGeometry { blank, queries: Cell::new(0) }
    }

    fn objects(rec: &Recorder, sampler: bool) -> PassObjects {
        PassObjects {
            vertex_shader: rec.new_vertex_shader(),
            pixel_shader: rec.new_pixel_shader(),
            sampler: sampler.then(|| rec.new_sampler()),
        }
    }

    fn pair(rec: &Recorder) -> UpscalePair {
        UpscalePair {
            source: rec.new_shader_resource_view(),
            shadow_view: rec.new_shader_resource_view(),
            target: rec.new_render_target_view(),
        }
    }

    fn draws_of(calls: &[Call]) -> Vec<(u32, u32)> {
        calls
            .iter()
            .filter_map(|c| match c {
                Call::Draw { vertex_count, start_vertex, .. } => Some((*vertex_count, *start_vertex)),
                _ => None,
            })
            .collect()
    }

    // ── drawing ──

    #[test]
    fn draws_one_triangle_per_pair() {
        let rec = Recorder::new();
        let mut ctx = rec.context();
        let pairs = [pair(&rec), pair(&rec)];
        let g = geometry(false);

        let stats = run_upscale(&mut ctx, &pairs, objects(&rec, true), Extent::new(640, 480), &g, &ReentrancyFlag::default());

        assert_eq!(stats, PassStats { drawn: 2, blanked: 0, skipped: 0 });
        assert_eq!(draws_of(&rec.calls()), vec![(3, 0), (3, 0)]);
        assert_eq!(g.queries.get(), 2);
    }

    #[test]
    fn binds_original_view_and_clears_target_first() {
        let rec = Recorder::new();
        let mut ctx = rec.context();
        let p = pair(&rec);

        run_upscale(&mut ctx, &[p], objects(&rec, true), Extent::new(640, 480), &geometry(false), &ReentrancyFlag::default());

        let calls = rec.calls();
        let clear = calls
            .iter()
            .position(|c| matches!(c, Call::ClearRenderTarget { target, color, .. } if *target == p.target && *color == TRANSPARENT))
            .unwrap();
        let bind = calls
            .iter()
            .position(|c| matches!(c, Call::SetShaderResources { stage: ShaderStage::Pixel, views, .. } if views == &vec![Some(p.source)]))
            .unwrap();
        let draw = calls.iter().position(|c| matches!(c, Call::Draw { .. })).unwrap();
        assert!(clear < bind && bind < draw);
    }

    #[test]
    fn host_state_survives_pass() {
        let rec = Recorder::new();
        let mut ctx = rec.context();
        let host_rtv: RenderTargetView = rec.new_render_target_view();
        let host_srv: ShaderResourceView = rec.new_shader_resource_view();
        ctx.om_set_render_targets(&[Some(host_rtv)], None);
        ctx.rs_set_viewports(&[Viewport::sized(320.0, 240.0)]);
        ctx.set_shader_resources(ShaderStage::Pixel, 0, &[Some(host_srv)]);
        ctx.ia_set_primitive_topology(PrimitiveTopology::TriangleStrip);

        let objects = objects(&rec, true);
        let pairs = [pair(&rec)];
        let before = rec.bound_state();
        let counts = rec.ref_counts();

        run_upscale(&mut ctx, &pairs, objects, Extent::new(640, 480), &geometry(false), &ReentrancyFlag::default());

        assert_eq!(rec.bound_state(), before);
        assert_eq!(rec.ref_counts(), counts);
    }

    // ── shortcuts ──

    #[test]
    fn blank_frame_clears_without_drawing() {
        let rec = Recorder::new();
        let mut ctx = rec.context();
        let p = pair(&rec);

        let stats = run_upscale(&mut ctx, &[p], objects(&rec, true), Extent::new(640, 480), &geometry(true), &ReentrancyFlag::default());

        assert_eq!(stats.blanked, 1);
        assert_eq!(rec.draws(), 0);
        assert!(rec
            .calls()
            .contains(&Call::ClearRenderTarget { context: 0, target: p.target, color: TRANSPARENT }));
    }

    #[test]
    fn missing_sampler_skips_pair() {
        let rec = Recorder::new();
        let mut ctx = rec.context();
        let pairs = [pair(&rec)];
        let before = rec.bound_state();

        let stats = run_upscale(&mut ctx, &pairs, objects(&rec, false), Extent::new(640, 480), &geometry(false), &ReentrancyFlag::default());

        assert_eq!(stats.skipped, 1);
        assert_eq!(rec.draws(), 0);
        assert_eq!(rec.bound_state(), before);
    }

    #[test]
    fn guard_is_released_after_pass() {
        let rec = Recorder::new();
        let mut ctx = rec.context();
        let guard = ReentrancyFlag::default();
        let pairs = [pair(&rec)];
        run_upscale(&mut ctx, &pairs, objects(&rec, true), Extent::new(64, 64), &geometry(false), &guard);
        assert!(!guard.is_held());
    }
}
