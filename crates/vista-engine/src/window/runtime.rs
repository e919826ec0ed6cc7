use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::PixelRect;
use crate::core::{AppControl, Page, PageCtx, Placement};
use crate::device::{Composite, CompositeSource, Gpu, GpuInit, SurfaceErrorAction};
use crate::scheduler::{
    DisplaySurface, HostEnvironment, LoopSwitch, Scheduler, SchedulerConfig, ViewerWidget,
};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub gpu: GpuInit,
    pub scheduler: SchedulerConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "vista".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            gpu: GpuInit::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the page window and drives `page` until it exits.
    pub fn run<P>(config: RuntimeConfig, page: P) -> Result<()>
    where
        P: Page + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = PageState::new(config, page);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Pixel ratio of the page window as the scheduler sees it.
struct WindowEnvironment {
    scale_factor: Rc<Cell<f64>>,
}

impl HostEnvironment for WindowEnvironment {
    fn device_pixel_ratio(&self) -> f64 {
        self.scale_factor.get()
    }
}

struct ActivePage {
    window: Arc<Window>,
    scheduler: Scheduler<Gpu>,
    frame_loop: LoopSwitch,
    scale_factor: Rc<Cell<f64>>,
    started: Instant,
}

impl ActivePage {
    fn ctx(&mut self) -> PageCtx<'_> {
        PageCtx {
            window: &self.window,
            scheduler: &mut self.scheduler,
        }
    }
}

struct PageState<P> {
    config: RuntimeConfig,
    page: P,
    active: Option<ActivePage>,
    exit_requested: bool,
    error: Option<anyhow::Error>,
}

impl<P> PageState<P>
where
    P: Page + 'static,
{
    fn new(config: RuntimeConfig, page: P) -> Self {
        Self {
            config,
            page,
            active: None,
            exit_requested: false,
            error: None,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        // A missing GPU is not fatal: the scheduler runs without a renderer.
        let gpu = pollster::block_on(Gpu::for_window(Arc::clone(&window), self.config.gpu.clone()));

        let scale_factor = Rc::new(Cell::new(window.scale_factor()));
        let frame_loop = LoopSwitch::new();
        let scheduler = Scheduler::new(
            self.config.scheduler.clone(),
            WindowEnvironment {
                scale_factor: Rc::clone(&scale_factor),
            },
            frame_loop.clone(),
            gpu,
        )?;

        let mut active = ActivePage {
            window,
            scheduler,
            frame_loop,
            scale_factor,
            started: Instant::now(),
        };
        self.page.mount(&mut active.ctx());
        active.window.request_redraw();
        self.active = Some(active);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.scheduler.dispose();
        }
        self.request_exit();
    }

    fn redraw(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let t = active.started.elapsed().as_secs_f64() * 1000.0;
        let report = active.scheduler.render(t);

        let placements = self.page.placements();
        match present(active, &placements) {
            Ok(()) | Err(SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame) => {}
            Err(SurfaceErrorAction::Fatal) => {
                log::error!("page surface is out of memory; shutting down");
                self.close();
                return;
            }
        }

        if self.page.on_frame(&report, &mut active.ctx()) == AppControl::Exit {
            self.close();
        }
    }
}

/// Composites every visible placement onto the page and presents it.
fn present(active: &mut ActivePage, placements: &[Placement]) -> Result<(), SurfaceErrorAction> {
    let scale_factor = active.window.scale_factor();
    let scheduler = &mut active.scheduler;

    // Widget borrows are held until the page has been presented.
    let shown: Vec<_> = placements
        .iter()
        .filter_map(|placement| {
            let widget = placement.widget.try_borrow().ok()?;
            if !widget.is_visible() {
                return None;
            }
            let surface = scheduler.display_surface_for(&placement.widget);
            let region = scheduler.copy_region_for(&placement.widget);
            let dest = placement.physical_rect(widget.scene().size(), scale_factor);
            Some((widget, surface, region, dest))
        })
        .collect();

    let composites: Vec<Composite<'_>> = shown
        .iter()
        .map(|(widget, surface, region, dest)| Composite {
            source: match surface {
                DisplaySurface::Shared => CompositeSource::Shared(*region),
                DisplaySurface::Private => CompositeSource::Output {
                    target: widget.output(),
                    region: PixelRect::new(0, 0, region.width, region.height),
                },
            },
            dest: *dest,
        })
        .collect();

    match scheduler.backend_mut() {
        Some(gpu) => gpu.present(&composites),
        None => Ok(()),
    }
}

impl<P> ApplicationHandler for PageState<P>
where
    P: Page + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.active.is_some() {
            return;
        }

        if let Err(e) = self.open(event_loop) {
            log::error!("failed to open page: {e:#}");
            self.error = Some(e);
            self.request_exit();
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Frames are requested only while the scheduler wants a callback.
        if let Some(active) = self.active.as_ref() {
            if active.frame_loop.is_installed() {
                active.window.request_redraw();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.window.id() != window_id {
            return;
        }

        if self.page.on_window_event(&event, &mut active.ctx()) == AppControl::Exit {
            self.close();
            event_loop.exit();
            return;
        }

        match &event {
            WindowEvent::CloseRequested => self.close(),

            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = active.scheduler.backend_mut() {
                    gpu.resize_page(*new_size);
                }
                active.window.request_redraw();
            }

            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::debug!("page scale factor -> {scale_factor}");
                active.scale_factor.set(*scale_factor);
                let new_size = active.window.inner_size();
                if let Some(gpu) = active.scheduler.backend_mut() {
                    gpu.resize_page(new_size);
                }
                active.window.request_redraw();
            }

            WindowEvent::RedrawRequested => self.redraw(),

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}
