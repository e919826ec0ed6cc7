//! Test doubles for the scheduler's collaborators.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{bail, Result};

use crate::coords::{LogicalSize, PhysicalSize, PixelRect};
use crate::render::Camera;

use super::backend::{CopyMode, DrawParams, HostEnvironment, OutputSurface, RenderBackend};
use super::widget::{
    ContextLost, DisplaySurface, HostId, ViewerEvent, ViewerScene, ViewerWidget, WidgetRef,
};

// ── backend ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ResizeShared(PhysicalSize<u32>),
    SharedDisplay(LogicalSize<f64>),
    Attach(Option<HostId>),
    BeginFrame,
    Draw { host: HostId, viewport: PixelRect, exposure: f32 },
    CreateContext,
    Copy { region: PixelRect, mode: CopyMode },
    EndFrame,
    Dispose,
}

/// Shared view into what a [`FakeBackend`] was asked to do.
#[derive(Clone, Default)]
pub(crate) struct BackendProbe {
    pub calls: Rc<RefCell<Vec<Call>>>,
    pub pending_loss: Rc<RefCell<Option<ContextLost>>>,
}

impl BackendProbe {
    pub fn draws(&self) -> Vec<HostId> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Draw { host, .. } => Some(*host),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

pub(crate) struct FakeBackend {
    probe: BackendProbe,
    shared: PhysicalSize<u32>,
}

impl FakeBackend {
    pub fn new() -> (Self, BackendProbe) {
        let probe = BackendProbe::default();
        (
            Self {
                probe: probe.clone(),
                shared: PhysicalSize::new(1, 1),
            },
            probe,
        )
    }

    fn record(&self, call: Call) {
        self.probe.calls.borrow_mut().push(call);
    }
}

impl RenderBackend for FakeBackend {
    type Output = FakeOutput;

    fn resize_shared(&mut self, size: PhysicalSize<u32>) {
        self.shared = PhysicalSize::new(size.width.max(1), size.height.max(1));
        self.record(Call::ResizeShared(size));
    }

    fn shared_size(&self) -> PhysicalSize<u32> {
        self.shared
    }

    fn set_shared_display_size(&mut self, size: LogicalSize<f64>) {
        self.record(Call::SharedDisplay(size));
    }

    fn attach_shared(&mut self, host: Option<HostId>) {
        self.record(Call::Attach(host));
    }

    fn begin_frame(&mut self) {
        self.record(Call::BeginFrame);
    }

    fn draw(&mut self, _scene: &mut dyn ViewerScene, params: DrawParams) -> Result<()> {
        self.record(Call::Draw {
            host: params.host,
            viewport: params.viewport,
            exposure: params.exposure,
        });
        Ok(())
    }

    fn create_output_context(&mut self, output: &mut FakeOutput) -> Result<()> {
        if output.refuse_context {
            bail!("context creation refused");
        }
        output.context = true;
        self.record(Call::CreateContext);
        Ok(())
    }

    fn copy_to_output(
        &mut self,
        region: PixelRect,
        output: &mut FakeOutput,
        mode: CopyMode,
    ) -> Result<()> {
        output.copies += 1;
        self.record(Call::Copy { region, mode });
        Ok(())
    }

    fn end_frame(&mut self) {
        self.record(Call::EndFrame);
    }

    fn poll_context_lost(&mut self) -> Option<ContextLost> {
        self.probe.pending_loss.borrow_mut().take()
    }

    fn dispose(&mut self) {
        self.record(Call::Dispose);
    }
}

// ── output surface ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(crate) struct FakeOutput {
    pub size: PhysicalSize<u32>,
    pub display: LogicalSize<f64>,
    pub context: bool,
    pub refuse_context: bool,
    pub copies: usize,
}

impl Default for FakeOutput {
    fn default() -> Self {
        Self {
            size: PhysicalSize::new(0, 0),
            display: LogicalSize::new(0.0, 0.0),
            context: false,
            refuse_context: false,
            copies: 0,
        }
    }
}

impl OutputSurface for FakeOutput {
    fn set_size(&mut self, size: PhysicalSize<u32>) {
        if size != self.size {
            self.size = size;
            self.context = false;
        }
    }

    fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn set_display_size(&mut self, size: LogicalSize<f64>) {
        self.display = size;
    }

    fn display_size(&self) -> LogicalSize<f64> {
        self.display
    }

    fn has_context(&self) -> bool {
        self.context
    }
}

// ── widget ────────────────────────────────────────────────────────────────

pub(crate) struct TestScene {
    pub size: LogicalSize<f64>,
    pub dirty: bool,
    pub exposure: f32,
}

impl ViewerScene for TestScene {
    fn size(&self) -> LogicalSize<f64> {
        self.size
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    fn camera(&self) -> Camera {
        Camera::IDENTITY
    }

    fn exposure(&self) -> f32 {
        self.exposure
    }
}

pub(crate) struct TestWidget {
    pub host: HostId,
    pub visible: bool,
    pub ready: bool,
    pub scene: TestScene,
    pub output: FakeOutput,
    pub showing: Option<DisplaySurface>,
    pub ticks: Vec<(f64, f64)>,
    pub recompute_calls: usize,
    pub events: Vec<ViewerEvent>,
    /// Runs at the end of every tick.
    pub on_tick: Option<Box<dyn FnMut()>>,
}

impl TestWidget {
    pub fn new(host: u64, width: f64, height: f64) -> Self {
        Self {
            host: HostId(host),
            visible: true,
            ready: true,
            scene: TestScene {
                size: LogicalSize::new(width, height),
                dirty: false,
                exposure: 1.0,
            },
            output: FakeOutput::default(),
            showing: None,
            ticks: Vec::new(),
            recompute_calls: 0,
            events: Vec::new(),
            on_tick: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Returns the scheduler-facing reference and a typed handle for asserts.
    pub fn into_ref(self) -> (WidgetRef<FakeOutput>, Rc<RefCell<TestWidget>>) {
        let typed = Rc::new(RefCell::new(self));
        let erased: WidgetRef<FakeOutput> = typed.clone();
        (erased, typed)
    }
}

impl ViewerWidget for TestWidget {
    type Output = FakeOutput;

    fn host(&self) -> HostId {
        self.host
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn scene(&self) -> &dyn ViewerScene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut dyn ViewerScene {
        &mut self.scene
    }

    fn tick(&mut self, t: f64, delta: f64) {
        self.ticks.push((t, delta));
        if let Some(hook) = self.on_tick.as_mut() {
            hook();
        }
    }

    fn recompute_size(&mut self) {
        self.recompute_calls += 1;
    }

    fn output(&self) -> &FakeOutput {
        &self.output
    }

    fn output_mut(&mut self) -> &mut FakeOutput {
        &mut self.output
    }

    fn show_surface(&mut self, surface: DisplaySurface) {
        self.showing = Some(surface);
    }

    fn on_event(&mut self, event: &ViewerEvent) {
        self.events.push(event.clone());
    }
}

// ── environment ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub(crate) struct TestEnv {
    pub dpr: Rc<Cell<f64>>,
    pub force_private: Rc<Cell<bool>>,
    pub presenting: Rc<Cell<bool>>,
}

impl TestEnv {
    pub fn new(dpr: f64) -> Self {
        Self {
            dpr: Rc::new(Cell::new(dpr)),
            force_private: Rc::new(Cell::new(false)),
            presenting: Rc::new(Cell::new(false)),
        }
    }
}

impl HostEnvironment for TestEnv {
    fn device_pixel_ratio(&self) -> f64 {
        self.dpr.get()
    }

    fn requires_private_surfaces(&self) -> bool {
        self.force_private.get()
    }

    fn is_presenting(&self) -> bool {
        self.presenting.get()
    }
}
