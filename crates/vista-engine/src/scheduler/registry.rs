use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::coords::{LogicalSize, PhysicalSize};

use super::backend::OutputSurface;
use super::widget::{same_widget, WidgetRef};

/// Installs and removes the single per-frame callback of the page.
pub trait FrameLoop {
    fn install(&mut self);
    fn uninstall(&mut self);
}

/// Stock [`FrameLoop`]: a shared flag the event loop polls.
///
/// Clones observe the same state, so the runtime keeps one clone and hands
/// the other to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct LoopSwitch {
    installed: Rc<Cell<bool>>,
    installs: Rc<Cell<u64>>,
}

impl LoopSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self) -> bool {
        self.installed.get()
    }

    /// Number of times the callback has been installed so far.
    pub fn install_count(&self) -> u64 {
        self.installs.get()
    }
}

impl FrameLoop for LoopSwitch {
    fn install(&mut self) {
        self.installed.set(true);
        self.installs.set(self.installs.get() + 1);
    }

    fn uninstall(&mut self) {
        self.installed.set(false);
    }
}

/// Surface geometry every registered widget's private surface follows.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct SurfaceLayout {
    pub buffer: PhysicalSize<u32>,
    pub display: LogicalSize<f64>,
}

impl Default for SurfaceLayout {
    fn default() -> Self {
        Self {
            buffer: PhysicalSize::new(0, 0),
            display: LogicalSize::new(0.0, 0.0),
        }
    }
}

pub(crate) struct Registry<O> {
    widgets: Vec<WidgetRef<O>>,
    frame_loop: Box<dyn FrameLoop>,
    loop_installed: bool,
    /// Only a working renderer gets a frame callback.
    can_render: bool,
    layout: SurfaceLayout,
}

impl<O: OutputSurface + 'static> Registry<O> {
    fn contains(&self, widget: &WidgetRef<O>) -> bool {
        self.widgets.iter().any(|w| same_widget(w, widget))
    }

    fn sync_loop(&mut self) {
        let wanted = self.can_render && !self.widgets.is_empty();
        if wanted && !self.loop_installed {
            self.frame_loop.install();
            self.loop_installed = true;
            log::debug!("frame callback installed");
        } else if !wanted && self.loop_installed {
            self.frame_loop.uninstall();
            self.loop_installed = false;
            log::debug!("frame callback removed");
        }
    }
}

/// Clonable handle to the widget set.
///
/// Registration is synchronous and safe to call from inside a widget's
/// `tick`: the frame in progress skips widgets unregistered mid-frame.
pub struct SchedulerHandle<O> {
    inner: Rc<RefCell<Registry<O>>>,
}

impl<O> Clone for SchedulerHandle<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<O: OutputSurface + 'static> SchedulerHandle<O> {
    pub(crate) fn new(frame_loop: Box<dyn FrameLoop>, can_render: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                widgets: Vec::new(),
                frame_loop,
                loop_installed: false,
                can_render,
                layout: SurfaceLayout::default(),
            })),
        }
    }

    /// Adds `widget` to the set. Returns `false` if it was already registered.
    ///
    /// The widget's private surface is sized to the current shared geometry
    /// and the widget is marked dirty. The frame callback is installed on the
    /// first registration.
    pub fn register(&self, widget: WidgetRef<O>) -> bool {
        let layout = {
            let mut registry = self.inner.borrow_mut();
            if registry.contains(&widget) {
                return false;
            }
            registry.widgets.push(Rc::clone(&widget));
            registry.sync_loop();
            registry.layout
        };

        match widget.try_borrow_mut() {
            Ok(mut w) => {
                let output = w.output_mut();
                output.set_size(layout.buffer);
                output.set_display_size(layout.display);
                w.request_redraw();
                log::debug!("registered viewer on {}", w.host());
            }
            Err(_) => log::warn!("viewer registered while borrowed; sizing deferred to next resize"),
        }
        true
    }

    /// Removes `widget`. Returns `false` if it was not registered.
    ///
    /// The frame callback is removed with the last widget.
    pub fn unregister(&self, widget: &WidgetRef<O>) -> bool {
        let mut registry = self.inner.borrow_mut();
        let before = registry.widgets.len();
        registry.widgets.retain(|w| !same_widget(w, widget));
        let removed = registry.widgets.len() != before;
        if removed {
            registry.sync_loop();
        }
        removed
    }

    pub fn is_registered(&self, widget: &WidgetRef<O>) -> bool {
        self.inner.borrow().contains(widget)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().widgets.is_empty()
    }

    /// Registration-ordered copy of the widget set.
    pub(crate) fn snapshot(&self) -> Vec<WidgetRef<O>> {
        self.inner.borrow().widgets.clone()
    }

    pub(crate) fn layout(&self) -> SurfaceLayout {
        self.inner.borrow().layout
    }

    pub(crate) fn set_layout(&self, layout: SurfaceLayout) {
        self.inner.borrow_mut().layout = layout;
    }

    pub(crate) fn set_can_render(&self, can_render: bool) {
        let mut registry = self.inner.borrow_mut();
        registry.can_render = can_render;
        registry.sync_loop();
    }

    /// Drops every widget and removes the frame callback.
    pub(crate) fn clear(&self) {
        let mut registry = self.inner.borrow_mut();
        registry.widgets.clear();
        registry.sync_loop();
    }
}
