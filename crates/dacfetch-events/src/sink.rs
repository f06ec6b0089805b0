use std::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex, MutexGuard, PoisonError,
};

use crate::FetchEvent;

/// Receives the events of a fetch run.
///
/// The pipeline emits from both the async runtime and blocking download
/// threads, hence `Send + Sync`.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: FetchEvent);
}

/// Forwards events to a receiver drained by the terminal renderer.
///
/// Emitting after the receiver is gone is silently ignored; a cancelled run
/// may still report from a blocking thread after the renderer stopped.
pub struct ChannelSink {
    sender: Sender<FetchEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<FetchEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender,
            },
            receiver,
        )
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: FetchEvent) {
        let _ = self.sender.send(event);
    }
}

/// Drops every event, for callers that only want the run report.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: FetchEvent) {}
}

/// Keeps every event in emission order so tests can assert on the transcript
/// of a run.
#[derive(Default)]
pub struct CollectorSink {
    events: Mutex<Vec<FetchEvent>>,
}

impl CollectorSink {
    fn lock(&self) -> MutexGuard<'_, Vec<FetchEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<FetchEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: FetchEvent) {
        self.lock().push(event);
    }
}
