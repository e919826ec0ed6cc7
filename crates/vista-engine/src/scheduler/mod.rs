//! Shared-context frame scheduler.
//!
//! One GPU context serves every mounted viewer. Each frame the scheduler
//! picks how pixels reach the screen (one widget showing the shared surface,
//! or every widget fed by copy-back), keeps the shared buffer sized to the
//! largest widget, trades resolution for frame time, and draws every dirty
//! widget in a fixed order.

mod backend;
mod config;
mod frame;
mod multiplex;
mod notify;
mod registry;
mod scale;
mod size;
mod widget;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{CopyMode, DrawParams, HostEnvironment, OutputSurface, RenderBackend, RendererState};
pub use config::SchedulerConfig;
pub use frame::{viewport_for, FrameReport, FrameSkip};
pub use multiplex::{DisplayMode, Multiplexer, Transition};
pub use notify::{ContextLossNotifier, ObserverId};
pub use registry::{FrameLoop, LoopSwitch, SchedulerHandle};
pub use scale::ScaleController;
pub use size::SizeNegotiator;
pub use widget::{
    ContextLost, DisplaySurface, HostId, LossReason, ViewerEvent, ViewerScene, ViewerWidget,
    WidgetRef,
};

use anyhow::{Context, Result};

use crate::coords::{PhysicalSize, PixelRect};
use crate::time::FrameClock;

use backend::{sanitize_dpr, sanitize_exposure};
use frame::frame_order;
use registry::SurfaceLayout;
use widget::same_widget;

/// Owns the shared rendering context and drives every registered viewer.
pub struct Scheduler<B: RenderBackend> {
    config: SchedulerConfig,
    renderer: RendererState<B>,
    env: Box<dyn HostEnvironment>,
    registry: SchedulerHandle<B::Output>,
    clock: FrameClock,
    scale: ScaleController,
    size: SizeNegotiator,
    multiplex: Multiplexer,
    notifier: ContextLossNotifier,
    /// An immersive session owned the surface on the previous frame.
    presenting: bool,
}

impl<B: RenderBackend> Scheduler<B> {
    /// Creates the scheduler around `backend`.
    ///
    /// A backend that failed to initialize is not an error: the scheduler
    /// starts without a renderer, accepts registrations and never draws.
    pub fn new(
        config: SchedulerConfig,
        env: impl HostEnvironment + 'static,
        frame_loop: impl FrameLoop + 'static,
        backend: Result<B>,
    ) -> Result<Self> {
        config.validate().context("invalid scheduler configuration")?;

        let renderer = match backend {
            Ok(backend) => RendererState::Ready(backend),
            Err(err) => {
                log::warn!("GPU context unavailable; viewers will not render: {err:#}");
                RendererState::Uninitialized
            }
        };
        let dpr = sanitize_dpr(env.device_pixel_ratio());
        let registry = SchedulerHandle::new(Box::new(frame_loop), renderer.is_ready());

        Ok(Self {
            clock: Self::fresh_clock(&config),
            scale: ScaleController::new(&config),
            size: SizeNegotiator::new(dpr),
            multiplex: Multiplexer::default(),
            notifier: ContextLossNotifier::default(),
            presenting: false,
            renderer,
            env: Box::new(env),
            registry,
            config,
        })
    }

    fn fresh_clock(config: &SchedulerConfig) -> FrameClock {
        FrameClock::new(
            config.neutral_frame_ms(),
            config.decay,
            config.max_average_step_ms,
        )
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Clonable registration handle, usable from inside widget ticks.
    pub fn handle(&self) -> SchedulerHandle<B::Output> {
        self.registry.clone()
    }

    pub fn register_widget(&self, widget: WidgetRef<B::Output>) -> bool {
        self.registry.register(widget)
    }

    /// Removes `widget`. When it hosts the shared surface the surface is
    /// detached (or moved to the remaining visible widget) right away.
    pub fn unregister_widget(&mut self, widget: &WidgetRef<B::Output>) -> bool {
        let host = widget.try_borrow().ok().map(|w| w.host());
        if !self.registry.unregister(widget) {
            return false;
        }
        if host.is_some() && host == self.multiplex.shared_host() {
            if let Some(backend) = self.renderer.ready_mut() {
                let widgets = self.registry.snapshot();
                let force_private = self.env.requires_private_surfaces();
                self.multiplex.select(backend, &widgets, force_private);
            }
        }
        true
    }

    pub fn renderer(&self) -> &RendererState<B> {
        &self.renderer
    }

    pub fn backend(&self) -> Option<&B> {
        self.renderer.ready()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.renderer.ready_mut()
    }

    /// Current global resolution scale in `[min_scale, 1]`.
    pub fn scale(&self) -> f64 {
        self.scale.scale()
    }

    pub fn average_frame_ms(&self) -> f64 {
        self.clock.average()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.multiplex.mode()
    }

    /// Which surface `widget` is showing this frame.
    pub fn display_surface_for(&self, widget: &WidgetRef<B::Output>) -> DisplaySurface {
        match widget.try_borrow() {
            Ok(w) => self.multiplex.surface_for(w.host()),
            Err(_) => DisplaySurface::Private,
        }
    }

    /// Top-left anchored region of the shared buffer holding `widget`'s pixels.
    pub fn copy_region_for(&self, widget: &WidgetRef<B::Output>) -> PixelRect {
        let buffer = self.buffer_size();
        let Ok(w) = widget.try_borrow() else {
            return PixelRect::default();
        };
        let ratio = self.size.dpr() * self.scale.scale();
        viewport_for(w.scene().size(), ratio, buffer).flipped(buffer.height)
    }

    fn buffer_size(&self) -> PhysicalSize<u32> {
        match self.renderer.ready() {
            Some(backend) => backend.shared_size(),
            None => self.registry.layout().buffer,
        }
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&ViewerEvent) + 'static) -> ObserverId {
        self.notifier.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Marks the context lost and tells every widget and observer.
    ///
    /// Rendering stops until [`Scheduler::reset`] installs a new backend.
    pub fn notify_context_lost(&mut self, cause: ContextLost) {
        self.renderer = match std::mem::replace(&mut self.renderer, RendererState::Uninitialized) {
            RendererState::Ready(backend) => RendererState::Lost(backend),
            other => other,
        };
        self.registry.set_can_render(false);
        let widgets = self.registry.snapshot();
        self.notifier.dispatch(cause, &widgets);
    }

    fn poll_context_lost(&mut self) {
        let cause = self
            .renderer
            .ready_mut()
            .and_then(|backend| backend.poll_context_lost());
        if let Some(cause) = cause {
            self.notify_context_lost(cause);
        }
    }

    /// Releases the GPU context and forgets every widget.
    pub fn dispose(&mut self) {
        match std::mem::replace(&mut self.renderer, RendererState::Uninitialized) {
            RendererState::Ready(mut backend) | RendererState::Lost(mut backend) => {
                backend.dispose();
                log::info!("shared GPU context released");
            }
            RendererState::Uninitialized => {}
        }
        self.registry.set_can_render(false);
        self.registry.clear();
        self.registry.set_layout(SurfaceLayout::default());
        self.multiplex = Multiplexer::default();
    }

    /// Disposes the current context and starts over with `backend`.
    ///
    /// Widgets must register again afterwards.
    pub fn reset(&mut self, backend: Result<B>) {
        self.dispose();

        self.renderer = match backend {
            Ok(backend) => RendererState::Ready(backend),
            Err(err) => {
                log::warn!("GPU context could not be recreated: {err:#}");
                RendererState::Uninitialized
            }
        };
        self.clock = Self::fresh_clock(&self.config);
        self.scale = ScaleController::new(&self.config);
        self.size = SizeNegotiator::new(sanitize_dpr(self.env.device_pixel_ratio()));
        self.presenting = false;
        self.registry.set_can_render(self.renderer.is_ready());
        log::info!("scheduler reset (renderer ready: {})", self.renderer.is_ready());
    }

    /// Runs one frame at host timestamp `t` (milliseconds).
    pub fn render(&mut self, t: f64) -> FrameReport {
        let time = self.clock.tick(t);
        let mut report = FrameReport::new(time);

        self.poll_context_lost();

        let Self {
            config,
            renderer,
            env,
            registry,
            clock,
            scale,
            size,
            multiplex,
            presenting,
            ..
        } = self;

        let backend = match renderer {
            RendererState::Ready(backend) => backend,
            RendererState::Lost(_) => return report.skipped(FrameSkip::ContextLost),
            RendererState::Uninitialized => return report.skipped(FrameSkip::NoRenderer),
        };

        if env.is_presenting() {
            if !*presenting {
                log::debug!("immersive session active; inline viewers paused");
                *presenting = true;
            }
            return report.skipped(FrameSkip::Presenting);
        }
        if std::mem::take(presenting) {
            // The session resized the surface behind our back.
            size.invalidate();
        }

        let widgets = registry.snapshot();
        let force_private = env.requires_private_surfaces();

        multiplex.select(backend, &widgets, force_private);

        let dpr = sanitize_dpr(env.device_pixel_ratio());
        if size.negotiate(dpr, &widgets) {
            size.apply(scale.scale(), backend, registry, &widgets);
        }

        if let Some(new_scale) = scale.adjust(clock.average()) {
            log::info!(
                "resolution scale -> {new_scale:.3} (avg frame {:.1} ms)",
                clock.average()
            );
            clock.reset_average(config.neutral_frame_ms());
            rescale(new_scale, size, backend, registry, &widgets);
        }

        let ratio = size.dpr() * scale.scale();
        let buffer = backend.shared_size();
        let mode = multiplex.mode();
        let copy_mode = if force_private {
            CopyMode::Transfer
        } else {
            CopyMode::Blit
        };
        let shared_host = multiplex.shared_host().and_then(|host| {
            widgets
                .iter()
                .find(|w| w.try_borrow().is_ok_and(|w| w.host() == host))
                .cloned()
        });

        backend.begin_frame();

        for widget in frame_order(&widgets) {
            if !registry.is_registered(&widget) {
                continue;
            }
            let Ok(mut w) = widget.try_borrow_mut() else {
                log::warn!("viewer busy during frame; skipped");
                continue;
            };
            if !w.is_ready() {
                continue;
            }

            w.tick(time.t, time.delta);
            if !registry.is_registered(&widget) || !w.scene().is_dirty() {
                continue;
            }
            w.scene_mut().set_dirty(false);

            // A hidden widget drawing into the shared surface clobbers what the
            // visible host shows, so the host has to draw again after it.
            if mode == DisplayMode::Shared && !w.is_visible() {
                if let Some(host_widget) = shared_host.as_ref() {
                    if !same_widget(host_widget, &widget) {
                        if let Ok(mut hw) = host_widget.try_borrow_mut() {
                            hw.request_redraw();
                        }
                    }
                }
            }

            let scene = w.scene();
            let params = DrawParams {
                host: w.host(),
                viewport: viewport_for(scene.size(), ratio, buffer),
                camera: scene.camera(),
                exposure: sanitize_exposure(scene.exposure()),
            };
            if let Err(err) = backend.draw(w.scene_mut(), params) {
                log::warn!("draw failed for {}: {err:#}", params.host);
                continue;
            }
            report.widgets_drawn += 1;

            if mode == DisplayMode::Private {
                let region = params.viewport.flipped(buffer.height);
                let output = w.output_mut();
                if !output.has_context() {
                    if let Err(err) = backend.create_output_context(output) {
                        log::warn!("no drawing context for {}: {err:#}", params.host);
                        continue;
                    }
                }
                match backend.copy_to_output(region, output, copy_mode) {
                    Ok(()) => report.surfaces_copied += 1,
                    Err(err) => log::warn!("copy-back failed for {}: {err:#}", params.host),
                }
            }
        }

        backend.end_frame();
        report
    }
}

impl<B: RenderBackend> Drop for Scheduler<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Applies a new resolution scale: display boxes grow, buffers stay.
fn rescale<B: RenderBackend>(
    scale: f64,
    size: &SizeNegotiator,
    backend: &mut B,
    registry: &SchedulerHandle<B::Output>,
    widgets: &[WidgetRef<B::Output>],
) {
    let display = size.display_size(scale);
    backend.set_shared_display_size(display);
    registry.set_layout(SurfaceLayout {
        buffer: registry.layout().buffer,
        display,
    });
    for widget in widgets {
        let Ok(mut w) = widget.try_borrow_mut() else { continue };
        w.output_mut().set_display_size(display);
        w.request_redraw();
    }
}
