use std::sync::Arc;

use dacfetch_events::{EventSinkHandle, FetchEvent};
use dacfetch_registry::{Progress, ProgressCallback};

/// Creates a registry progress callback that bridges to [`FetchEvent`] emissions.
pub fn create_progress_bridge(
    events: EventSinkHandle,
    id: String,
    version: String,
    source: String,
) -> ProgressCallback {
    Arc::new(move |progress| {
        let event = match progress {
            Progress::Starting {
                total,
            } => {
                FetchEvent::DownloadStarting {
                    id: id.clone(),
                    version: version.clone(),
                    source: source.clone(),
                    total,
                }
            }
            Progress::Chunk {
                current,
                total,
            } => {
                FetchEvent::DownloadProgress {
                    id: id.clone(),
                    version: version.clone(),
                    current,
                    total,
                }
            }
            Progress::Complete {
                total,
            } => {
                FetchEvent::DownloadComplete {
                    id: id.clone(),
                    version: version.clone(),
                    total,
                }
            }
        };
        events.emit(event);
    })
}

#[cfg(test)]
mod tests {
    use dacfetch_events::CollectorSink;

    use super::*;

    #[test]
    fn test_progress_bridge_emits_events() {
        let collector = Arc::new(CollectorSink::default());
        let events: EventSinkHandle = collector.clone();
        let bridge = create_progress_bridge(
            events,
            "Contoso.Db".into(),
            "1.0.0".into(),
            "https://feed/index.json".into(),
        );

        bridge(Progress::Starting {
            total: 1000,
        });
        bridge(Progress::Chunk {
            current: 500,
            total: 1000,
        });
        bridge(Progress::Complete {
            total: 1000,
        });

        let events = collector.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            FetchEvent::DownloadStarting { total: 1000, source, .. } if source == "https://feed/index.json"
        ));
        assert!(matches!(
            &events[1],
            FetchEvent::DownloadProgress {
                current: 500,
                total: 1000,
                ..
            }
        ));
        assert!(matches!(
            &events[2],
            FetchEvent::DownloadComplete { id, total: 1000, .. } if id == "Contoso.Db"
        ));
    }
}
