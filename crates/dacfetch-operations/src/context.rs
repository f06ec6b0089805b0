use dacfetch_core::paths::OutputDirectory;
use dacfetch_events::{EventSinkHandle, FetchEvent};
use dacfetch_registry::FeedHandle;

use crate::CancellationToken;

/// Everything one pipeline run needs.
///
/// Feeds hold the run's registry client; it is released when the context
/// is dropped.
pub struct FetchContext {
    events: EventSinkHandle,
    feeds: Vec<FeedHandle>,
    output: OutputDirectory,
    cancel: CancellationToken,
}

impl FetchContext {
    pub fn new(
        events: EventSinkHandle,
        feeds: Vec<FeedHandle>,
        output: OutputDirectory,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            events,
            feeds,
            output,
            cancel,
        }
    }

    pub fn events(&self) -> &EventSinkHandle {
        &self.events
    }

    pub fn emit(&self, event: FetchEvent) {
        self.events.emit(event);
    }

    pub fn feeds(&self) -> &[FeedHandle] {
        &self.feeds
    }

    pub fn output(&self) -> &OutputDirectory {
        &self.output
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
