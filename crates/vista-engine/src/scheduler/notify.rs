use super::backend::OutputSurface;
use super::widget::{ContextLost, ViewerEvent, WidgetRef};

/// Handle returned by [`ContextLossNotifier::subscribe`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&ViewerEvent)>;

/// Fans a context-loss signal out to widgets and host observers.
///
/// Delivery is synchronous, in registration order. The notifier does not try
/// to restore anything.
#[derive(Default)]
pub struct ContextLossNotifier {
    observers: Vec<(ObserverId, Observer)>,
    next_id: u64,
}

impl ContextLossNotifier {
    pub fn subscribe(&mut self, observer: impl FnMut(&ViewerEvent) + 'static) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _)| *observer != id);
        self.observers.len() != before
    }

    /// Delivers the signal to every widget, then to every observer.
    pub(crate) fn dispatch<O: OutputSurface + 'static>(
        &mut self,
        cause: ContextLost,
        widgets: &[WidgetRef<O>],
    ) {
        log::warn!(
            "GPU context lost ({:?}: {}); notifying {} viewers",
            cause.reason,
            cause.message,
            widgets.len()
        );
        let event = ViewerEvent::context_lost(cause);

        for widget in widgets {
            match widget.try_borrow_mut() {
                Ok(mut w) => w.on_event(&event),
                Err(_) => log::warn!("viewer busy; context-loss event not delivered"),
            }
        }
        for (_, observer) in &mut self.observers {
            observer(&event);
        }
    }
}

impl std::fmt::Debug for ContextLossNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLossNotifier")
            .field("observers", &self.observers.len())
            .finish()
    }
}
