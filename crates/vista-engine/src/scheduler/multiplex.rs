use super::backend::{OutputSurface, RenderBackend};
use super::widget::{DisplaySurface, HostId, WidgetRef};

/// How rendered pixels reach the screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DisplayMode {
    /// One widget shows the shared surface directly; no copy-back.
    Shared,
    /// Every widget shows its own surface, fed by copy-back.
    Private,
}

/// Mode change chosen for this frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    ToPrivate,
    /// Switch to (or stay in) shared mode with the surface inside `host`.
    /// `None` means no widget is visible to host it.
    ToShared(Option<HostId>),
}

/// Decides and applies the display mode, once per frame.
#[derive(Debug, Clone)]
pub struct Multiplexer {
    mode: DisplayMode,
    shared_host: Option<HostId>,
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Shared,
            shared_host: None,
        }
    }
}

impl Multiplexer {
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Host currently showing the shared surface.
    pub fn shared_host(&self) -> Option<HostId> {
        self.shared_host
    }

    pub fn surface_for(&self, host: HostId) -> DisplaySurface {
        if self.mode == DisplayMode::Shared && self.shared_host == Some(host) {
            DisplaySurface::Shared
        } else {
            DisplaySurface::Private
        }
    }

    /// Pure decision: `visible` lists the hosts of visible widgets,
    /// `registered` the hosts of every registered widget.
    ///
    /// Returns `None` when nothing has to change. A shared host that is no
    /// longer registered always forces a change, so an unmounted host never
    /// keeps the surface.
    pub fn decide(
        &self,
        visible: &[HostId],
        registered: &[HostId],
        force_private: bool,
    ) -> Option<Transition> {
        if visible.len() > 1 || force_private {
            return match self.mode {
                DisplayMode::Private => None,
                DisplayMode::Shared => Some(Transition::ToPrivate),
            };
        }

        let host = visible.first().copied();
        let stale = self.shared_host.is_some_and(|h| !registered.contains(&h));
        match self.mode {
            DisplayMode::Shared if host == self.shared_host => None,
            DisplayMode::Shared if host.is_none() && !stale => None,
            _ => Some(Transition::ToShared(host)),
        }
    }

    /// Applies `transition` to the backend and to every widget.
    ///
    /// This is the only place that changes what widgets display. A transition
    /// moves the shared surface at most once.
    pub(crate) fn apply<B: RenderBackend>(
        &mut self,
        transition: Transition,
        backend: &mut B,
        widgets: &[WidgetRef<B::Output>],
    ) {
        match transition {
            Transition::ToPrivate => {
                log::debug!("display mode -> private surfaces ({} widgets)", widgets.len());
                self.mode = DisplayMode::Private;
                self.shared_host = None;
                backend.attach_shared(None);
                for widget in widgets {
                    let Ok(mut w) = widget.try_borrow_mut() else { continue };
                    w.show_surface(DisplaySurface::Private);
                    w.request_redraw();
                }
            }
            Transition::ToShared(host) => {
                log::debug!(
                    "display mode -> shared surface in {}",
                    host.map_or_else(|| "no host".to_string(), |h| h.to_string())
                );
                self.mode = DisplayMode::Shared;
                self.shared_host = host;
                let Some(host) = host else {
                    backend.attach_shared(None);
                    return;
                };
                backend.attach_shared(Some(host));
                for widget in widgets {
                    let Ok(mut w) = widget.try_borrow_mut() else { continue };
                    if w.host() == host {
                        w.show_surface(DisplaySurface::Shared);
                        w.request_redraw();
                    } else {
                        w.show_surface(DisplaySurface::Private);
                    }
                }
            }
        }
    }

    /// Runs one frame's selection. Returns `true` when the mode or host changed.
    pub(crate) fn select<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        widgets: &[WidgetRef<B::Output>],
        force_private: bool,
    ) -> bool {
        let (visible, registered) = hosts(widgets);
        match self.decide(&visible, &registered, force_private) {
            Some(transition) => {
                self.apply(transition, backend, widgets);
                true
            }
            None => false,
        }
    }
}

/// Hosts of the visible widgets and of all widgets, in registration order.
fn hosts<O: OutputSurface + 'static>(widgets: &[WidgetRef<O>]) -> (Vec<HostId>, Vec<HostId>) {
    let mut visible = Vec::new();
    let mut registered = Vec::with_capacity(widgets.len());
    for widget in widgets {
        let Ok(w) = widget.try_borrow() else { continue };
        registered.push(w.host());
        if w.is_visible() {
            visible.push(w.host());
        }
    }
    (visible, registered)
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: HostId = HostId(1);
    const B: HostId = HostId(2);

    fn in_mode(mode: DisplayMode, shared_host: Option<HostId>) -> Multiplexer {
        Multiplexer { mode, shared_host }
    }

    #[test]
    fn single_visible_widget_hosts_shared_surface() {
        let m = Multiplexer::default();
        assert_eq!(m.decide(&[A], &[A, B], false), Some(Transition::ToShared(Some(A))));
    }

    #[test]
    fn same_host_is_a_no_op() {
        let m = in_mode(DisplayMode::Shared, Some(A));
        assert_eq!(m.decide(&[A], &[A, B], false), None);
    }

    #[test]
    fn host_change_reparents() {
        let m = in_mode(DisplayMode::Shared, Some(A));
        assert_eq!(m.decide(&[B], &[A, B], false), Some(Transition::ToShared(Some(B))));
    }

    #[test]
    fn two_visible_widgets_require_private_surfaces() {
        let m = in_mode(DisplayMode::Shared, Some(A));
        assert_eq!(m.decide(&[A, B], &[A, B], false), Some(Transition::ToPrivate));
        let m = in_mode(DisplayMode::Private, None);
        assert_eq!(m.decide(&[A, B], &[A, B], false), None);
    }

    #[test]
    fn environment_can_force_private_surfaces() {
        let m = Multiplexer::default();
        assert_eq!(m.decide(&[A], &[A, B], true), Some(Transition::ToPrivate));
        assert_eq!(m.decide(&[], &[A, B], true), Some(Transition::ToPrivate));
    }

    #[test]
    fn nothing_visible_in_shared_mode_is_a_no_op() {
        let m = in_mode(DisplayMode::Shared, Some(A));
        assert_eq!(m.decide(&[], &[A, B], false), None);
    }

    #[test]
    fn unregistered_shared_host_releases_the_surface() {
        let m = in_mode(DisplayMode::Shared, Some(A));
        assert_eq!(m.decide(&[], &[B], false), Some(Transition::ToShared(None)));
        assert_eq!(m.decide(&[B], &[B], false), Some(Transition::ToShared(Some(B))));
        assert_eq!(m.decide(&[], &[], false), Some(Transition::ToShared(None)));
        let m = Multiplexer::default();
        assert_eq!(m.decide(&[], &[], false), None);
    }

    #[test]
    fn leaving_private_mode_without_visible_widgets() {
        let m = in_mode(DisplayMode::Private, None);
        assert_eq!(m.decide(&[], &[A, B], false), Some(Transition::ToShared(None)));
    }

    #[test]
    fn surface_for_reports_only_the_host() {
        let m = in_mode(DisplayMode::Shared, Some(A));
        assert_eq!(m.surface_for(A), DisplaySurface::Shared);
        assert_eq!(m.surface_for(B), DisplaySurface::Private);
        let m = in_mode(DisplayMode::Private, None);
        assert_eq!(m.surface_for(A), DisplaySurface::Private);
    }
}
