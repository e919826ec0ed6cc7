use winit::event::WindowEvent;

use crate::scheduler::FrameReport;

use super::ctx::{PageCtx, Placement};

/// Control directive returned by page callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Host page contract implemented by applications.
///
/// The page owns its viewer widgets and decides where they sit; the runtime
/// owns the window, the GPU context and the scheduler.
pub trait Page {
    /// Called once, after the scheduler exists. Register widgets here.
    fn mount(&mut self, ctx: &mut PageCtx<'_>);

    /// Called for window events before the runtime handles them.
    fn on_window_event(&mut self, event: &WindowEvent, ctx: &mut PageCtx<'_>) -> AppControl {
        let _ = (event, ctx);
        AppControl::Continue
    }

    /// Widgets to composite this frame, in paint order.
    fn placements(&self) -> Vec<Placement>;

    /// Called after every rendered frame.
    fn on_frame(&mut self, report: &FrameReport, ctx: &mut PageCtx<'_>) -> AppControl {
        let _ = (report, ctx);
        AppControl::Continue
    }
}
