use std::{
    collections::HashMap,
    sync::{mpsc::Receiver, LazyLock},
    thread::JoinHandle,
    time::Duration,
};

use dacfetch_events::{FetchEvent, MissingPackage};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nu_ansi_term::Color::{Cyan, Green, Yellow};
use tracing::info;

use crate::utils::{progress_enabled, Colored};

/// Shared MultiProgress instance for suspend/stop from other modules.
static MULTI: LazyLock<MultiProgress> = LazyLock::new(MultiProgress::new);

/// Pause progress display, run the closure, then resume.
pub fn suspend<F: FnOnce()>(f: F) {
    MULTI.suspend(f);
}

/// Stop and clear all progress bars.
pub fn stop() {
    MULTI.clear().ok();
}

/// Owns the background thread started by [`spawn_event_handler`].
pub struct ProgressGuard {
    handle: Option<JoinHandle<()>>,
}

impl ProgressGuard {
    /// Waits for the handler to drain the remaining events.
    ///
    /// Every sender of the channel must be gone first, otherwise this
    /// blocks forever.
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn download_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} {prefix}  {wide_bar:.cyan/dim}  {bytes}/{total_bytes}  {bytes_per_sec}  {eta}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("━━─")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix}  {bytes}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn package_key(id: &str, version: &str) -> String {
    format!("{id}.{version}")
}

fn create_download_job(prefix: String, total: u64) -> ProgressBar {
    let pb = if !progress_enabled() {
        ProgressBar::hidden()
    } else if total == 0 {
        let pb = MULTI.add(ProgressBar::new_spinner());
        pb.set_style(spinner_style());
        pb
    } else {
        let pb = MULTI.add(ProgressBar::new(total));
        pb.set_style(download_style());
        pb
    };
    pb.set_prefix(prefix);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn missing_summary(missing: &[MissingPackage]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn render(event: FetchEvent, jobs: &mut HashMap<String, ProgressBar>) {
    match event {
        FetchEvent::NothingToDo => info!("No package references found. Exiting."),
        FetchEvent::RunStarting {
            references,
            sources,
        } => {
            info!("Found {references} package references to process");
            info!("Using {sources} package sources");
        }
        FetchEvent::ReferenceStarting {
            index,
            total,
            ..
        } => info!("Processing package {index} of {total}..."),
        FetchEvent::SourceMiss {
            id,
            version,
            source,
        } => info!("Package {id} {version} not found in {source}"),

        FetchEvent::DownloadStarting {
            id,
            version,
            total,
            ..
        } => {
            let key = package_key(&id, &version);
            let pb = create_download_job(Colored(Cyan, &key).to_string(), total);
            if let Some(old) = jobs.insert(key, pb) {
                old.finish_and_clear();
            }
        }
        FetchEvent::DownloadProgress {
            id,
            version,
            current,
            ..
        } => {
            if let Some(pb) = jobs.get(&package_key(&id, &version)) {
                pb.set_position(current);
            }
        }
        FetchEvent::DownloadComplete {
            id,
            version,
            ..
        } => {
            if let Some(pb) = jobs.remove(&package_key(&id, &version)) {
                pb.finish_and_clear();
            }
        }

        FetchEvent::ArtifactExtracted {
            file_name,
            ..
        } => info!("Downloaded {}", Colored(Cyan, file_name)),
        FetchEvent::ReferenceComplete {
            id,
            version,
            extracted,
            ..
        } => {
            if extracted == 0 {
                info!("No DACPAC files found in package {id}.{version}");
            } else {
                info!("Extracted {extracted} DACPAC files from {id}.{version}");
            }
        }
        FetchEvent::RunComplete {
            missing,
        } => {
            if missing.is_empty() {
                info!("{}", Colored(Green, "All packages downloaded successfully"));
            } else {
                info!(
                    "{}",
                    Colored(
                        Yellow,
                        format!(
                            "The following packages were not downloaded: {}",
                            missing_summary(&missing)
                        )
                    )
                );
            }
        }
    }
}

/// Spawns a background thread that turns [`FetchEvent`]s into console
/// lines and download progress bars.
pub fn spawn_event_handler(receiver: Receiver<FetchEvent>) -> ProgressGuard {
    let handle = std::thread::spawn(move || {
        let mut jobs: HashMap<String, ProgressBar> = HashMap::new();

        while let Ok(event) = receiver.recv() {
            render(event, &mut jobs);
        }

        for (_, pb) in jobs {
            pb.finish_and_clear();
        }
    });

    ProgressGuard {
        handle: Some(handle),
    }
}
