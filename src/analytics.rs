//! Fire-and-forget side effect sinks.
//!
//! Analytics events and the onboarding redirect are side effects of the
//! signing pipeline, injected so the core never depends on a UI shell.
//! Emission happens off the critical path and can never fail the
//! caller-visible result.

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// A transfer was broadcast successfully.
    TransactionSent,
    /// The native path exhausted the fallback gateway and gave up.
    TransactionIncomplete,
    /// The fallback gateway was used for a broadcast.
    Fallback,
}

pub trait EventSink: Send + Sync {
    fn track(&self, event: EventType);
}

/// Surface the UI registers to receive the one-time onboarding redirect when
/// no wallet is configured.
pub trait NavigationSink: Send + Sync {
    fn open_onboarding(&self);
}

/// Default sink: events go to the log and nowhere else.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn track(&self, event: EventType) {
        tracing::info!(?event, "analytics event");
    }
}

impl NavigationSink for TracingSink {
    fn open_onboarding(&self) {
        tracing::info!("no wallets configured, opening onboarding surface");
    }
}

/// Emits an event without joining the critical path. When called inside a
/// runtime the sink runs on a detached task; the caller never waits on it.
pub fn emit(sink: &Arc<dyn EventSink>, event: EventType) {
    let sink = sink.clone();
    if tokio::runtime::Handle::try_current().is_ok() {
        tokio::spawn(async move { sink.track(event) });
    } else {
        sink.track(event);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<EventType>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<EventType> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingSink {
        fn track(&self, event: EventType) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[derive(Default)]
    pub struct RecordingNavigation {
        opened: AtomicUsize,
    }

    impl RecordingNavigation {
        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }
    }

    impl NavigationSink for RecordingNavigation {
        fn open_onboarding(&self) {
            self.opened.fetch_add(1, Ordering::SeqCst);
        }
    }
}
