use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::coords::LogicalSize;
use crate::render::{Camera, SceneFrame};

use super::backend::OutputSurface;

/// Identity of the container a widget is mounted in.
///
/// The shared surface is attached to (shown inside) at most one host at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(pub u64);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

/// Which surface a widget currently shows to the user.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DisplaySurface {
    /// The shared GPU surface, attached directly inside the widget's host.
    Shared,
    /// The widget's own output surface, fed by copy-back.
    Private,
}

/// Why the shared context went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LossReason {
    /// The platform destroyed the context (driver reset, GPU removed, ...).
    Unknown,
    /// The context was destroyed on purpose.
    Destroyed,
}

/// Platform signal describing a lost GPU context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLost {
    pub reason: LossReason,
    pub message: String,
}

/// Notification delivered to widgets and host observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    /// Non-fatal error. `kind` is a stable type tag; `cause` is the original
    /// platform signal.
    Error { kind: &'static str, cause: ContextLost },
}

impl ViewerEvent {
    pub const CONTEXT_LOST: &'static str = "contextlost";

    pub fn context_lost(cause: ContextLost) -> Self {
        ViewerEvent::Error {
            kind: Self::CONTEXT_LOST,
            cause,
        }
    }
}

/// Scene owned by a widget. Construction, assets and materials live outside
/// the scheduler; it only needs sizing, dirtiness, a camera and a way to record.
pub trait ViewerScene {
    /// Logical (density-independent) size of the scene's viewport.
    fn size(&self) -> LogicalSize<f64>;

    fn is_dirty(&self) -> bool;

    fn set_dirty(&mut self, dirty: bool);

    fn camera(&self) -> Camera;

    /// Tone-mapping exposure for the next draw.
    fn exposure(&self) -> f32 {
        1.0
    }

    /// Records the scene's GPU commands into the open pass.
    fn record(&mut self, frame: &mut SceneFrame<'_, '_>) {
        let _ = frame;
    }
}

/// A mounted viewer widget as seen by the scheduler.
///
/// The host owns widgets; the scheduler keeps shared references while they
/// are registered and never outlives that registration with side effects.
pub trait ViewerWidget {
    /// Private output surface type of the backend in use.
    type Output: OutputSurface;

    fn host(&self) -> HostId;

    fn is_visible(&self) -> bool;

    /// Whether the model is loaded and the scene can be drawn.
    fn is_ready(&self) -> bool;

    fn scene(&self) -> &dyn ViewerScene;

    fn scene_mut(&mut self) -> &mut dyn ViewerScene;

    /// Advances animations. Called once per frame for ready widgets, before
    /// the dirty check.
    fn tick(&mut self, t: f64, delta: f64);

    /// Forces a redraw on the next frame.
    fn request_redraw(&mut self) {
        self.scene_mut().set_dirty(true);
    }

    /// Re-measures the widget's box and updates its scene size.
    ///
    /// Called when the device pixel ratio changes, because zoom does not
    /// reliably produce a resize notification for percentage-sized hosts.
    fn recompute_size(&mut self);

    fn output(&self) -> &Self::Output;

    fn output_mut(&mut self) -> &mut Self::Output;

    /// Shows `surface` inside the widget's host and hides the other one.
    fn show_surface(&mut self, surface: DisplaySurface);

    fn on_event(&mut self, event: &ViewerEvent) {
        let _ = event;
    }
}

/// Shared reference to a registered widget.
pub type WidgetRef<O> = Rc<RefCell<dyn ViewerWidget<Output = O>>>;

/// Identity comparison (allocation address, ignoring vtables).
pub(crate) fn same_widget<O: 'static>(a: &WidgetRef<O>, b: &WidgetRef<O>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}
