//! Session events and listener registration.

use super::progress::ProgressUpdate;
use crate::models::AnalysisRecord;
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

/// Something observable happened in the session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Progress(ProgressUpdate),
    AnalysisStarted,
    /// A new document list replaced the previous one.
    DocumentsLoaded { count: usize },
    /// A complete record was committed as the active result.
    ActiveRecordChanged {
        index: usize,
        record: Arc<AnalysisRecord>,
    },
    Failed {
        operation: &'static str,
        message: String,
    },
    ReportsExported { paths: Vec<PathBuf> },
}

pub trait SessionListener {
    fn on_event(&self, event: &SessionEvent);
}

impl<F: Fn(&SessionEvent)> SessionListener for F {
    fn on_event(&self, event: &SessionEvent) {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(SubscriptionId, Rc<dyn SessionListener>)>>,
}

impl Listeners {
    pub fn subscribe(&self, listener: Rc<dyn SessionListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, listener));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    pub fn emit(&self, event: &SessionEvent) {
        // Snapshot so listeners may (un)subscribe while handling the event.
        let listeners: Vec<_> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener.on_event(event);
        }
    }
}
