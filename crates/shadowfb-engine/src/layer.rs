//! Owned state shared by every hook of one device.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use thiserror::Error;

use crate::compositor::{
    run_upscale, Compositor, CompositorState, PassStats, ShaderSources,
};
use crate::config::{RendererLevel, UpscaleConfig};
use crate::gates::{FeatureGates, ReentrancyFlag};
use crate::geometry::{Extent, GeometryProvider, RenderGeometry, ScaleMode};
use crate::gpu::{Device, DeviceContext};
use crate::hooks::{HookedContext, HookedDevice};
use crate::logging::trace_call;
use crate::overlay::Overlay;
use crate::registry::ResourceRegistry;

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("a device is already bound to this layer")]
    DeviceAlreadyBound,

    #[error("the overlay is disabled by configuration")]
    OverlayDisabled,

    #[error("overlay initialization failed: {0:#}")]
    OverlayInit(anyhow::Error),
}

/// Result of [`Layer::hook_device`].
pub enum DeviceHook<D, C> {
    Hooked(HookedDevice<D>, HookedContext<C>),
    /// The layer already serves another device; use these unwrapped.
    Passthrough(D, C),
}

/// Virtualization state for one graphics device.
///
/// Shared through `Rc` by the hooked device and all of its contexts. The
/// type is deliberately `!Send`: every access happens on the render thread.
pub struct Layer {
    config: UpscaleConfig,
    gates: FeatureGates,
    guard: ReentrancyFlag,
    registry: RefCell<ResourceRegistry>,
    compositor: RefCell<Compositor>,
    geometry: Box<dyn GeometryProvider>,
    overlay: RefCell<Option<Box<dyn Overlay>>>,
    device_bound: Cell<bool>,
}

impl Layer {
    /// Builds the layer and compiles the upscale shaders.
    ///
    /// A compile failure leaves virtualization off for the process lifetime;
    /// everything is passed through unchanged.
    pub fn load(
        config: UpscaleConfig,
        geometry: Box<dyn GeometryProvider>,
        sources: &dyn ShaderSources,
    ) -> Rc<Self> {
        let config = config.resolve(geometry.render_geometry().internal.height);
        let layer = Self {
            config,
            gates: FeatureGates::default(),
            guard: ReentrancyFlag::default(),
            registry: RefCell::new(ResourceRegistry::new()),
            compositor: RefCell::new(Compositor::new()),
            geometry,
            overlay: RefCell::new(None),
            device_bound: Cell::new(false),
        };

        if layer.config.enabled {
            let compiled = layer.compositor.borrow_mut().initialize(sources);
            match compiled {
                Ok(()) => {
                    layer.gates.set_virtualization(true);
                    log::info!(
                        "render-target virtualization enabled (internal height {})",
                        layer.config.internal_height
                    );
                }
                Err(err) => log::warn!("upscaler disabled: {err}"),
            }
        } else {
            log::info!("render-target virtualization disabled by configuration");
        }

        Rc::new(layer)
    }

    /// Binds `device` and wraps it and its immediate context.
    ///
    /// Only the first device is hooked; any later one is handed back as is.
    pub fn hook_device<D: Device, C: DeviceContext>(
        self: &Rc<Self>,
        mut device: D,
        immediate: C,
    ) -> DeviceHook<D, C> {
        match self.bind_device(&mut device) {
            Ok(()) => DeviceHook::Hooked(
                HookedDevice::new(Rc::clone(self), device),
                HookedContext::new(Rc::clone(self), immediate),
            ),
            Err(err) => {
                log::info!("{err}; leaving device unhooked");
                DeviceHook::Passthrough(device, immediate)
            }
        }
    }

    /// Claims the layer for `device` and creates the compositor's objects on it.
    pub fn bind_device(&self, device: &mut dyn Device) -> Result<(), LayerError> {
        if self.device_bound.replace(true) {
            return Err(LayerError::DeviceAlreadyBound);
        }
        if !self.gates.virtualization() {
            return Ok(());
        }

        let created = self.compositor.borrow_mut().create_device_objects(device);
        if let Err(err) = created {
            log::warn!("upscaler disabled, shader objects could not be created: {err}");
            self.gates.set_virtualization(false);
        }
        Ok(())
    }

    /// Runs the overlay's one-time setup and turns its gate on.
    pub fn attach_overlay(
        &self,
        device: &mut dyn Device,
        mut overlay: Box<dyn Overlay>,
    ) -> Result<(), LayerError> {
        if !self.config.overlay {
            return Err(LayerError::OverlayDisabled);
        }
        if let Err(err) = overlay.init(device) {
            self.gates.set_overlay(false);
            log::warn!("overlay disabled: {err:#}");
            return Err(LayerError::OverlayInit(err));
        }
        *self.overlay.borrow_mut() = Some(overlay);
        self.gates.set_overlay(true);
        Ok(())
    }

    /// Forgets every registry entry and device object after device loss.
    ///
    /// Nothing is released; the objects died with the device. A new device
    /// may be bound afterwards.
    pub fn invalidate(&self) {
        let dropped = self.registry.borrow_mut().drain().len();
        self.compositor.borrow_mut().take_device_objects();
        self.device_bound.set(false);
        log::debug!("layer invalidated, {dropped} references dropped");
    }

    /// Releases everything the layer created on `device`, then invalidates.
    pub(crate) fn release_owned(&self, device: &mut dyn Device) {
        let mut owned = self.registry.borrow_mut().drain();
        owned.extend(self.compositor.borrow_mut().take_device_objects());
        trace_call!(self, RendererLevel::Resources, "releasing {} layer objects", owned.len());
        for object in owned {
            device.release(object);
        }
        self.invalidate();
    }

    /// Runs the upscale pass on `ctx` if anything is registered.
    ///
    /// Does nothing while the reentrancy flag is held or virtualization is off.
    pub fn upscale(&self, ctx: &mut dyn DeviceContext) -> PassStats {
        if self.guard.is_held() || !self.gates.virtualization() {
            return PassStats::default();
        }
        let Some(objects) = self.compositor.borrow().pass_objects() else {
            return PassStats::default();
        };
        let (pairs, cached) = {
            let registry = self.registry.borrow();
            (registry.upscale_pairs(), registry.cached_desc())
        };
        let Some(cached) = cached else {
            return PassStats::default();
        };
        if pairs.is_empty() {
            return PassStats::default();
        }

        let extent = Extent::new(cached.width, cached.height);
        let stats = run_upscale(ctx, &pairs, objects, extent, self.geometry.as_ref(), &self.guard);
        trace_call!(
            self,
            RendererLevel::Calls,
            "upscale: {} drawn, {} blank, {} skipped",
            stats.drawn,
            stats.blanked,
            stats.skipped
        );
        stats
    }

    /// Lets the overlay draw after a host draw call.
    pub(crate) fn render_overlay(&self, ctx: &mut dyn DeviceContext) {
        if !self.gates.overlay() || self.guard.is_held() {
            return;
        }
        let Some(mut overlay) = self.overlay.borrow_mut().take() else { return };
        {
            let _scope = self.guard.hold();
            overlay.render(ctx);
        }
        *self.overlay.borrow_mut() = Some(overlay);
    }

    pub(crate) fn ensure_sampler(&self, device: &mut dyn Device) {
        self.compositor.borrow_mut().ensure_sampler(device);
    }

    /// Whether host calls are currently subject to rewriting.
    #[inline]
    pub(crate) fn rewrites_active(&self) -> bool {
        self.gates.virtualization() && !self.guard.is_held()
    }

    #[inline]
    pub fn config(&self) -> &UpscaleConfig {
        &self.config
    }

    #[inline]
    pub fn gates(&self) -> &FeatureGates {
        &self.gates
    }

    #[inline]
    pub fn guard(&self) -> &ReentrancyFlag {
        &self.guard
    }

    pub fn registry(&self) -> Ref<'_, ResourceRegistry> {
        self.registry.borrow()
    }

    pub(crate) fn registry_mut(&self) -> RefMut<'_, ResourceRegistry> {
        self.registry.borrow_mut()
    }

    pub fn compositor_state(&self) -> CompositorState {
        self.compositor.borrow().state()
    }

    pub fn geometry(&self) -> RenderGeometry {
        self.geometry.render_geometry()
    }

    pub fn scale_mode(&self) -> ScaleMode {
        ScaleMode::between(self.config.internal_height, self.geometry().framebuffer.height)
    }
}
