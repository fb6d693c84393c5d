use std::sync::Arc;

use basketwatch::adapter::notifier::{Event, Notifier};
use parking_lot::Mutex;

/// Thread-safe event collector for notification assertions in tests.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn alerts(&self) -> usize {
        self.count(|e| matches!(e, Event::CandidateAlert(_)))
    }

    pub fn executions(&self) -> usize {
        self.count(|e| matches!(e, Event::ExecutionCompleted(_)))
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().push(event);
    }
}
