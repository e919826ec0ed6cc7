use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use vista_engine::coords::{LogicalPosition, LogicalSize};
use vista_engine::core::{AppControl, Page, PageCtx, Placement};
use vista_engine::device::OutputTarget;
use vista_engine::scheduler::{FrameReport, HostId, ViewerEvent, ViewerWidget, WidgetRef};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};

use crate::turntable::TurntableWidget;

const GUTTER: f64 = 16.0;

/// Synthetic per-frame CPU cost toggled with `L`.
const SYNTHETIC_LOAD: Duration = Duration::from_millis(45);

struct Slot {
    widget: Rc<RefCell<TurntableWidget>>,
    shared: WidgetRef<OutputTarget>,
    box_size: Rc<Cell<LogicalSize<f64>>>,
    origin: LogicalPosition<f64>,
    mounted: bool,
}

/// A row of turntable viewers sharing one GPU context.
///
/// Keys:
/// - `1`..`3` toggle a viewer's visibility
/// - `R` unmounts or remounts the last viewer
/// - `E` cycles the first viewer's exposure
/// - `L` toggles a synthetic per-frame load to exercise down-scaling
/// - `Esc` exits
pub struct StudioPage {
    slots: Vec<Slot>,
    synthetic_load: bool,
    frames: u64,
}

impl StudioPage {
    pub fn new() -> Self {
        let viewers: [(&'static str, f32, [f32; 4], Duration); 3] = [
            ("amber", 0.9, [0.95, 0.62, 0.2, 1.0], Duration::ZERO),
            ("teal", -0.6, [0.2, 0.75, 0.7, 1.0], Duration::from_millis(500)),
            ("violet", 1.4, [0.6, 0.45, 0.95, 1.0], Duration::from_millis(1500)),
        ];

        let slots = viewers
            .into_iter()
            .enumerate()
            .map(|(i, (label, spin, color, load_time))| {
                let box_size = Rc::new(Cell::new(LogicalSize::new(320.0, 240.0)));
                let widget = TurntableWidget::new(
                    HostId(i as u64 + 1),
                    label,
                    Rc::clone(&box_size),
                    spin,
                    color,
                    load_time,
                );
                let (widget, shared) = widget.into_shared();
                Slot {
                    widget,
                    shared,
                    box_size,
                    origin: LogicalPosition::new(0.0, 0.0),
                    mounted: false,
                }
            })
            .collect();

        Self {
            slots,
            synthetic_load: false,
            frames: 0,
        }
    }

    /// Splits the page into equal boxes in one row.
    fn layout(&mut self, page: LogicalSize<f64>) {
        let n = self.slots.len().max(1) as f64;
        let width = ((page.width - GUTTER * (n + 1.0)) / n).max(1.0);
        let height = (page.height - GUTTER * 2.0).max(1.0);

        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.origin = LogicalPosition::new(GUTTER + i as f64 * (width + GUTTER), GUTTER);
            slot.box_size.set(LogicalSize::new(width, height));
            if let Ok(mut widget) = slot.widget.try_borrow_mut() {
                widget.recompute_size();
            }
        }
    }

    fn toggle_visible(&mut self, index: usize) {
        let Some(slot) = self.slots.get(index) else {
            return;
        };
        let mut widget = slot.widget.borrow_mut();
        let visible = !widget.is_visible();
        widget.set_visible(visible);
        log::info!("{} visible: {visible}", widget.label());
    }

    fn toggle_mounted(&mut self, index: usize, ctx: &mut PageCtx<'_>) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        if slot.mounted {
            ctx.scheduler.unregister_widget(&slot.shared);
        } else {
            ctx.scheduler.register_widget(Rc::clone(&slot.shared));
        }
        slot.mounted = !slot.mounted;
        log::info!("{} mounted: {}", slot.widget.borrow().label(), slot.mounted);
    }

    fn cycle_exposure(&mut self) {
        let Some(slot) = self.slots.first() else {
            return;
        };
        let mut widget = slot.widget.borrow_mut();
        let scene = widget.turntable_mut();
        let next = if scene.exposure() >= 2.0 { 0.5 } else { scene.exposure() * 2.0 };
        scene.set_exposure(next);
        log::info!("exposure: {next}");
    }
}

impl Default for StudioPage {
    fn default() -> Self {
        Self::new()
    }
}

impl Page for StudioPage {
    fn mount(&mut self, ctx: &mut PageCtx<'_>) {
        self.layout(ctx.logical_size());

        if let Some(gpu) = ctx.scheduler.backend() {
            let info = gpu.adapter_info();
            log::info!(
                "studio on {} ({:?}), page format {:?}",
                info.name,
                info.backend,
                gpu.surface_format()
            );
        }
        let config = ctx.scheduler.config();
        log::info!(
            "target frame time {}-{} ms, scale floor {}",
            config.low_frame_ms,
            config.high_frame_ms,
            config.min_scale
        );

        for slot in &mut self.slots {
            ctx.scheduler.register_widget(Rc::clone(&slot.shared));
            slot.mounted = true;
        }

        ctx.scheduler.subscribe(|event: &ViewerEvent| {
            let ViewerEvent::Error { kind, cause } = event;
            log::error!("viewer context event {kind}: {:?} {}", cause.reason, cause.message);
        });
    }

    fn on_window_event(&mut self, event: &WindowEvent, ctx: &mut PageCtx<'_>) -> AppControl {
        match event {
            WindowEvent::Resized(size) => {
                self.layout(size.to_logical(ctx.scale_factor()));
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.layout(ctx.window.inner_size().to_logical(*scale_factor));
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.logical_key.as_ref() {
                    Key::Named(NamedKey::Escape) => return AppControl::Exit,
                    Key::Character("1") => self.toggle_visible(0),
                    Key::Character("2") => self.toggle_visible(1),
                    Key::Character("3") => self.toggle_visible(2),
                    Key::Character("r" | "R") => {
                        let last = self.slots.len().saturating_sub(1);
                        self.toggle_mounted(last, ctx);
                    }
                    Key::Character("e" | "E") => self.cycle_exposure(),
                    Key::Character("l" | "L") => {
                        self.synthetic_load = !self.synthetic_load;
                        log::info!("synthetic load: {}", self.synthetic_load);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        AppControl::Continue
    }

    fn placements(&self) -> Vec<Placement> {
        self.slots
            .iter()
            .filter(|slot| slot.mounted)
            .map(|slot| Placement::new(Rc::clone(&slot.shared), slot.origin))
            .collect()
    }

    fn on_frame(&mut self, report: &FrameReport, ctx: &mut PageCtx<'_>) -> AppControl {
        self.frames += 1;
        if self.synthetic_load {
            std::thread::sleep(SYNTHETIC_LOAD);
        }

        if let Some(reason) = report.skipped {
            log::trace!("frame skipped: {reason:?}");
        }

        if self.frames % 30 == 0 {
            let lost = self.slots.iter().any(|slot| slot.widget.borrow().context_lost());
            let shared_in = ctx
                .scheduler
                .backend()
                .and_then(|gpu| gpu.shared_host())
                .map_or_else(|| "-".to_string(), |host| host.to_string());
            let title = format!(
                "vista studio  scale {:.2}  {:?} ({shared_in})  {:.1} ms  drew {}{}",
                ctx.scheduler.scale(),
                ctx.scheduler.display_mode(),
                ctx.scheduler.average_frame_ms(),
                report.widgets_drawn,
                if lost { "  (context lost)" } else { "" },
            );
            ctx.set_title(&title);
        }

        AppControl::Continue
    }
}
