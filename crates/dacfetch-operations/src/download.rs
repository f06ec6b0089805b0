//! The fetch-and-extract pipeline.
//!
//! References are processed one at a time, in order. For each reference the
//! feeds are asked in priority order; the first feed that has the exact
//! version wins and later feeds are never asked. A feed that does not have
//! the package is not an error. Any other feed failure ends the run.

use std::{path::Path, sync::Arc};

use dacfetch_core::{
    descriptor::read_items,
    error::{DacfetchError, ErrorContext},
    project_root::{find_project_root, load_sources, SourceSelection},
    references::extract_references,
    DacfetchResult,
};
use dacfetch_events::{EventSinkHandle, FetchEvent, MissingPackage};
use dacfetch_package::{PackageArchive, PackageReference};
use dacfetch_registry::{create_feeds, FeedHandle, FetchOutcome, RegistryClient};
use tracing::debug;

use crate::{
    progress::create_progress_bridge, CancellationToken, FetchContext, FetchOptions, RunReport,
};

/// Outcome of asking one feed for one reference.
#[derive(Debug)]
enum AttemptOutcome {
    /// The feed had the package; `extracted` artifacts were written.
    Matched { extracted: usize },
    /// The feed does not have this version; try the next one.
    NotFound,
    /// The run must stop.
    Fatal(DacfetchError),
}

/// Runs the whole flow for a project: read its references, resolve the
/// package sources and fetch everything into the output directory.
pub async fn run(
    options: FetchOptions,
    events: EventSinkHandle,
    cancel: CancellationToken,
) -> DacfetchResult<RunReport> {
    let items = read_items(options.project.path())?;
    let references = extract_references(&items, &options.includes, options.filter)?;

    if references.is_empty() {
        events.emit(FetchEvent::NothingToDo);
        return Ok(RunReport::default());
    }

    let sources = match &options.sources {
        SourceSelection::Discover => {
            let root = find_project_root(&options.project)?;
            load_sources(&root, &options.sources, &root)?
        }
        selection => {
            let cwd = std::env::current_dir()
                .with_context(|| "reading the current directory".to_string())?;
            load_sources(&cwd, selection, &cwd)?
        }
    };

    let client = RegistryClient::new(&options.client);
    let feeds = create_feeds(&sources, &client);
    let ctx = FetchContext::new(events, feeds, options.output, cancel);

    download_dacpacs(&ctx, &references).await
}

/// Fetches every reference and extracts its artifacts.
///
/// Returns a report of which references were processed and which no feed
/// could provide. Missing references are reported, not treated as errors.
pub async fn download_dacpacs(
    ctx: &FetchContext,
    references: &[PackageReference],
) -> DacfetchResult<RunReport> {
    if references.is_empty() {
        ctx.emit(FetchEvent::NothingToDo);
        return Ok(RunReport::default());
    }

    ctx.emit(FetchEvent::RunStarting {
        references: references.len(),
        sources: ctx.feeds().len(),
    });

    ctx.output().ensure_exists()?;

    let mut report = RunReport {
        expected: references.to_vec(),
        ..Default::default()
    };
    let total = references.len();

    for (idx, reference) in references.iter().enumerate() {
        ctx.emit(FetchEvent::ReferenceStarting {
            index: idx + 1,
            total,
            id: reference.id().to_string(),
            version: reference.version().to_string(),
        });

        for feed in ctx.feeds() {
            match attempt(ctx, feed, reference).await {
                AttemptOutcome::Matched {
                    extracted,
                } => {
                    report.processed.push(reference.clone());
                    report.extracted += extracted;
                    break;
                }
                AttemptOutcome::NotFound => {
                    ctx.emit(FetchEvent::SourceMiss {
                        id: reference.id().to_string(),
                        version: reference.version().to_string(),
                        source: feed.location().to_string(),
                    });
                }
                AttemptOutcome::Fatal(err) => return Err(err),
            }
        }
    }

    report.missing = report
        .expected
        .iter()
        .filter(|reference| !report.processed.contains(reference))
        .cloned()
        .collect();

    ctx.emit(FetchEvent::RunComplete {
        missing: report
            .missing
            .iter()
            .map(|reference| {
                MissingPackage {
                    id: reference.id().to_string(),
                    version: reference.version().to_string(),
                }
            })
            .collect(),
    });

    Ok(report)
}

async fn attempt(
    ctx: &FetchContext,
    feed: &FeedHandle,
    reference: &PackageReference,
) -> AttemptOutcome {
    let bytes = match fetch_package(ctx, feed, reference).await {
        Ok(FetchOutcome::Found(bytes)) => bytes,
        Ok(FetchOutcome::NotFound) => return AttemptOutcome::NotFound,
        Err(err) => return AttemptOutcome::Fatal(err),
    };

    match extract_artifacts(ctx, reference, bytes).await {
        Ok(extracted) => {
            ctx.emit(FetchEvent::ReferenceComplete {
                id: reference.id().to_string(),
                version: reference.version().to_string(),
                source: feed.location().to_string(),
                extracted,
            });
            AttemptOutcome::Matched {
                extracted,
            }
        }
        Err(err) => AttemptOutcome::Fatal(err),
    }
}

async fn fetch_package(
    ctx: &FetchContext,
    feed: &FeedHandle,
    reference: &PackageReference,
) -> DacfetchResult<FetchOutcome> {
    let cancel = ctx.cancel_token();
    if cancel.is_cancelled() {
        return Err(DacfetchError::Cancelled);
    }

    debug!("requesting {} from {}", reference, feed.location());

    let on_progress = create_progress_bridge(
        ctx.events().clone(),
        reference.id().to_string(),
        reference.version().to_string(),
        feed.location().to_string(),
    );
    let task_feed = Arc::clone(feed);
    let task_reference = reference.clone();
    let task = tokio::task::spawn_blocking(move || {
        task_feed.fetch(&task_reference, Some(&on_progress))
    });

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DacfetchError::Cancelled),
        joined = task => {
            let outcome = joined.map_err(|err| DacfetchError::TaskFailed(err.to_string()))??;
            Ok(outcome)
        }
    }
}

async fn extract_artifacts(
    ctx: &FetchContext,
    reference: &PackageReference,
    bytes: Vec<u8>,
) -> DacfetchResult<usize> {
    let output = ctx.output().path().to_path_buf();
    let events = ctx.events().clone();
    let cancel = ctx.cancel_token().clone();
    let reference = reference.clone();

    tokio::task::spawn_blocking(move || {
        extract_into(&output, &reference, bytes, &events, &cancel)
    })
    .await
    .map_err(|err| DacfetchError::TaskFailed(err.to_string()))?
}

fn extract_into(
    output: &Path,
    reference: &PackageReference,
    bytes: Vec<u8>,
    events: &EventSinkHandle,
    cancel: &CancellationToken,
) -> DacfetchResult<usize> {
    let mut archive = PackageArchive::from_bytes(bytes)?;
    let entries = archive.artifact_entries()?;

    for entry in &entries {
        if cancel.is_cancelled() {
            return Err(DacfetchError::Cancelled);
        }

        let path = archive.extract_entry(entry, output)?;
        debug!("extracted {} to {}", entry.path(), path.display());

        events.emit(FetchEvent::ArtifactExtracted {
            id: reference.id().to_string(),
            version: reference.version().to_string(),
            file_name: entry.file_name().to_string(),
        });
    }

    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{Cursor, Write},
        sync::Mutex,
    };

    use dacfetch_core::{
        paths::{OutputDirectory, SqlProjectFile},
        references::ReferenceFilter,
    };
    use dacfetch_events::CollectorSink;
    use dacfetch_registry::{
        ClientConfig, PackageFeed, Progress, ProgressCallback, RegistryError,
    };
    use tempfile::tempdir;
    use zip::{write::SimpleFileOptions, ZipWriter};

    use super::*;

    fn build_package(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn reference(input: &str) -> PackageReference {
        PackageReference::parse(input).unwrap()
    }

    type CallLog = Arc<Mutex<Vec<String>>>;

    struct FakeFeed {
        name: String,
        packages: Vec<(PackageReference, Vec<u8>)>,
        calls: CallLog,
        fail: bool,
    }

    impl FakeFeed {
        fn new(name: &str, calls: &CallLog) -> Self {
            Self {
                name: name.to_string(),
                packages: Vec::new(),
                calls: calls.clone(),
                fail: false,
            }
        }

        fn with_package(mut self, input: &str, files: &[(&str, &str)]) -> Self {
            self.packages.push((reference(input), build_package(files)));
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn handle(self) -> FeedHandle {
            Arc::new(self)
        }
    }

    impl PackageFeed for FakeFeed {
        fn name(&self) -> &str {
            &self.name
        }

        fn location(&self) -> &str {
            &self.name
        }

        fn fetch(
            &self,
            reference: &PackageReference,
            on_progress: Option<&ProgressCallback>,
        ) -> dacfetch_registry::Result<FetchOutcome> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{} {}", self.name, reference));

            if self.fail {
                return Err(RegistryError::HttpError {
                    status: 500,
                    url: self.name.clone(),
                });
            }

            match self.packages.iter().find(|(r, _)| r == reference) {
                Some((_, bytes)) => {
                    if let Some(cb) = on_progress {
                        cb(Progress::Complete {
                            total: bytes.len() as u64,
                        });
                    }
                    Ok(FetchOutcome::Found(bytes.clone()))
                }
                None => Ok(FetchOutcome::NotFound),
            }
        }
    }

    fn context(
        feeds: Vec<FeedHandle>,
        output: &Path,
        cancel: CancellationToken,
    ) -> (FetchContext, Arc<CollectorSink>) {
        let collector = Arc::new(CollectorSink::default());
        let events: EventSinkHandle = collector.clone();
        let ctx = FetchContext::new(
            events,
            feeds,
            OutputDirectory::new(output).unwrap(),
            cancel,
        );
        (ctx, collector)
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_single_source_has_everything() {
        let dir = tempdir().unwrap();
        let calls = CallLog::default();
        let feed = FakeFeed::new("feed", &calls)
            .with_package("A:1.0.0", &[("tools/A.dacpac", "a")])
            .with_package("B:2.0.0", &[("tools/B.dacpac", "b")])
            .handle();
        let (ctx, collector) = context(vec![feed], dir.path(), CancellationToken::new());

        let report = download_dacpacs(&ctx, &[reference("A:1.0.0"), reference("B:2.0.0")])
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.extracted, 2);
        assert_eq!(files_in(dir.path()), vec!["A.dacpac", "B.dacpac"]);
        assert!(matches!(
            collector.events().last(),
            Some(FetchEvent::RunComplete { missing }) if missing.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_fallback_stops_at_first_match() {
        let dir = tempdir().unwrap();
        let calls = CallLog::default();
        let feeds = vec![
            FakeFeed::new("first", &calls).handle(),
            FakeFeed::new("second", &calls)
                .with_package("A:1.0.0", &[("tools/A.dacpac", "a")])
                .handle(),
            FakeFeed::new("third", &calls)
                .with_package("A:1.0.0", &[("tools/A.dacpac", "other")])
                .handle(),
        ];
        let (ctx, collector) = context(feeds, dir.path(), CancellationToken::new());

        download_dacpacs(&ctx, &[reference("A:1.0.0")]).await.unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["first A.1.0.0", "second A.1.0.0"]
        );
        assert_eq!(fs::read(dir.path().join("A.dacpac")).unwrap(), b"a");

        let misses = collector
            .events()
            .into_iter()
            .filter_map(|event| {
                match event {
                    FetchEvent::SourceMiss {
                        source,
                        ..
                    } => Some(source),
                    _ => None,
                }
            })
            .collect::<Vec<_>>();
        assert_eq!(misses, vec!["first"]);
    }

    #[tokio::test]
    async fn test_missing_references_are_reported() {
        let dir = tempdir().unwrap();
        let calls = CallLog::default();
        let feeds = vec![
            FakeFeed::new("one", &calls)
                .with_package("A:1.0.0", &[("tools/A.dacpac", "a")])
                .handle(),
            FakeFeed::new("two", &calls)
                .with_package("C:3.0.0", &[("tools/C.dacpac", "c")])
                .handle(),
        ];
        let (ctx, collector) = context(feeds, dir.path(), CancellationToken::new());

        let report = download_dacpacs(
            &ctx,
            &[
                reference("A:1.0.0"),
                reference("B:2.0.0"),
                reference("C:3.0.0"),
                reference("D:4.0.0"),
            ],
        )
        .await
        .unwrap();

        let missing = report.missing.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(missing, vec!["B.2.0.0", "D.4.0.0"]);

        match collector.events().last() {
            Some(FetchEvent::RunComplete {
                missing,
            }) => {
                let names = missing.iter().map(ToString::to_string).collect::<Vec<_>>();
                assert_eq!(names, vec!["B.2.0.0", "D.4.0.0"]);
            }
            other => panic!("unexpected last event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nothing_found_anywhere() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out");
        let calls = CallLog::default();
        let (ctx, _) = context(
            vec![FakeFeed::new("empty", &calls).handle()],
            &output,
            CancellationToken::new(),
        );

        let report = download_dacpacs(&ctx, &[reference("A:1.0.0")]).await.unwrap();

        assert_eq!(report.missing, vec![reference("A:1.0.0")]);
        assert!(files_in(&output).is_empty());
    }

    #[tokio::test]
    async fn test_package_without_artifacts_counts_as_processed() {
        let dir = tempdir().unwrap();
        let calls = CallLog::default();
        let feed = FakeFeed::new("feed", &calls)
            .with_package("A:1.0.0", &[("lib/A.dll", "dll"), ("tools/readme.md", "")])
            .handle();
        let (ctx, collector) = context(vec![feed], dir.path(), CancellationToken::new());

        let report = download_dacpacs(&ctx, &[reference("A:1.0.0")]).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.extracted, 0);
        assert!(collector.events().iter().any(|event| matches!(
            event,
            FetchEvent::ReferenceComplete {
                extracted: 0,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_extraction_filters_and_flattens() {
        let dir = tempdir().unwrap();
        let calls = CallLog::default();
        let feed = FakeFeed::new("feed", &calls)
            .with_package(
                "A:1.0.0",
                &[
                    ("tools/nested/deep/A.dacpac", "a"),
                    ("tools/A.xml", "x"),
                    ("content/Other.dacpac", "o"),
                ],
            )
            .handle();
        let (ctx, _) = context(vec![feed], dir.path(), CancellationToken::new());

        download_dacpacs(&ctx, &[reference("A:1.0.0")]).await.unwrap();

        assert_eq!(files_in(dir.path()), vec!["A.dacpac"]);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let dir = tempdir().unwrap();
        let calls = CallLog::default();
        let feed = FakeFeed::new("feed", &calls)
            .with_package("A:1.0.0", &[("tools/A.dacpac", "a")])
            .handle();
        let (ctx, _) = context(vec![feed], dir.path(), CancellationToken::new());
        let references = [reference("A:1.0.0")];

        let first = download_dacpacs(&ctx, &references).await.unwrap();
        let second = download_dacpacs(&ctx, &references).await.unwrap();

        assert!(first.is_complete() && second.is_complete());
        assert_eq!(files_in(dir.path()), vec!["A.dacpac"]);
        assert_eq!(fs::read(dir.path().join("A.dacpac")).unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_fatal_error_stops_run() {
        let dir = tempdir().unwrap();
        let calls = CallLog::default();
        let feeds = vec![
            FakeFeed::new("broken", &calls).failing().handle(),
            FakeFeed::new("good", &calls)
                .with_package("A:1.0.0", &[("tools/A.dacpac", "a")])
                .handle(),
        ];
        let (ctx, collector) = context(feeds, dir.path(), CancellationToken::new());

        let err = download_dacpacs(&ctx, &[reference("A:1.0.0"), reference("B:1.0.0")])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DacfetchError::Registry(RegistryError::HttpError { status: 500, .. })
        ));
        assert_eq!(*calls.lock().unwrap(), vec!["broken A.1.0.0"]);
        assert!(!collector
            .events()
            .iter()
            .any(|event| matches!(event, FetchEvent::RunComplete { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch() {
        let dir = tempdir().unwrap();
        let calls = CallLog::default();
        let feed = FakeFeed::new("feed", &calls)
            .with_package("A:1.0.0", &[("tools/A.dacpac", "a")])
            .handle();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (ctx, _) = context(vec![feed], dir.path(), cancel);

        let err = download_dacpacs(&ctx, &[reference("A:1.0.0")]).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(calls.lock().unwrap().is_empty());
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn test_extract_into_stops_when_cancelled() {
        let dir = tempdir().unwrap();
        let collector = Arc::new(CollectorSink::default());
        let events: EventSinkHandle = collector.clone();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let bytes = build_package(&[("tools/A.dacpac", "a")]);
        let err = extract_into(dir.path(), &reference("A:1.0.0"), bytes, &events, &cancel)
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(files_in(dir.path()).is_empty());
        assert!(collector.is_empty());
    }

    #[tokio::test]
    async fn test_empty_reference_list() {
        let dir = tempdir().unwrap();
        let (ctx, collector) = context(Vec::new(), dir.path(), CancellationToken::new());

        let report = download_dacpacs(&ctx, &[]).await.unwrap();

        assert!(report.expected.is_empty());
        assert!(matches!(
            collector.events().as_slice(),
            [FetchEvent::NothingToDo]
        ));
    }

    #[tokio::test]
    async fn test_events_follow_processing_order() {
        let dir = tempdir().unwrap();
        let calls = CallLog::default();
        let feed = FakeFeed::new("feed", &calls)
            .with_package("A:1.0.0", &[("tools/A.dacpac", "a")])
            .handle();
        let (ctx, collector) = context(vec![feed], dir.path(), CancellationToken::new());

        download_dacpacs(&ctx, &[reference("A:1.0.0")]).await.unwrap();

        let events = collector.events();
        assert!(matches!(
            events[0],
            FetchEvent::RunStarting {
                references: 1,
                sources: 1
            }
        ));
        assert!(matches!(
            events[1],
            FetchEvent::ReferenceStarting {
                index: 1,
                total: 1,
                ..
            }
        ));
        assert!(matches!(events[2], FetchEvent::DownloadComplete { .. }));
        assert!(matches!(
            &events[3],
            FetchEvent::ArtifactExtracted { file_name, .. } if file_name == "A.dacpac"
        ));
        assert!(matches!(
            events[4],
            FetchEvent::ReferenceComplete {
                extracted: 1,
                ..
            }
        ));
        assert!(matches!(events[5], FetchEvent::RunComplete { .. }));
    }

    const PROJECT: &str = r#"<Project Sdk="MSBuild.Sdk.SqlProj/3.0.0">
  <ItemGroup>
    <PackageReference Include="Contoso.Db" Version="1.0" DatabaseVariableLiteralValue="Contoso" />
    <PackageReference Include="Newtonsoft.Json" Version="13.0.3" />
  </ItemGroup>
</Project>"#;

    fn write_nupkg(dir: &Path, file_name: &str, files: &[(&str, &str)]) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(file_name), build_package(files)).unwrap();
    }

    #[tokio::test]
    async fn test_run_with_explicit_local_source() {
        let dir = tempdir().unwrap();
        let project_path = dir.path().join("Db.sqlproj");
        fs::write(&project_path, PROJECT).unwrap();

        let feed_dir = dir.path().join("feed");
        write_nupkg(
            &feed_dir,
            "contoso.db.1.0.0.nupkg",
            &[("tools/Contoso.dacpac", "contoso")],
        );
        write_nupkg(&feed_dir, "extra.2.0.0.nupkg", &[("tools/Extra.dacpac", "extra")]);

        let output = dir.path().join("out");
        let options = FetchOptions {
            project: SqlProjectFile::new(&project_path).unwrap(),
            output: OutputDirectory::new(&output).unwrap(),
            includes: vec![reference("Extra:2.0.0"), reference("Contoso.Db:1.0.0")],
            filter: ReferenceFilter::DatabaseScoped,
            sources: SourceSelection::Explicit(vec![feed_dir.display().to_string()]),
            client: ClientConfig::default(),
        };
        let collector = Arc::new(CollectorSink::default());

        let report = run(options, collector.clone(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.expected.len(), 2);
        assert!(report.is_complete());
        assert_eq!(files_in(&output), vec!["Contoso.dacpac", "Extra.dacpac"]);
    }

    #[tokio::test]
    async fn test_run_nothing_to_do_skips_source_resolution() {
        let dir = tempdir().unwrap();
        let project_path = dir.path().join("Db.sqlproj");
        fs::write(&project_path, "<Project><ItemGroup /></Project>").unwrap();

        let output = dir.path().join("out");
        let options = FetchOptions {
            project: SqlProjectFile::new(&project_path).unwrap(),
            output: OutputDirectory::new(&output).unwrap(),
            includes: Vec::new(),
            filter: ReferenceFilter::DatabaseScoped,
            sources: SourceSelection::Discover,
            client: ClientConfig::default(),
        };
        let collector = Arc::new(CollectorSink::default());

        let report = run(options, collector.clone(), CancellationToken::new())
            .await
            .unwrap();

        assert!(report.expected.is_empty());
        assert!(!output.exists());
        assert!(matches!(
            collector.events().as_slice(),
            [FetchEvent::NothingToDo]
        ));
    }

    #[tokio::test]
    async fn test_run_with_config_file() {
        let dir = tempdir().unwrap();
        let project_path = dir.path().join("Db.sqlproj");
        fs::write(&project_path, PROJECT).unwrap();
        write_nupkg(
            &dir.path().join("packages"),
            "Contoso.Db.1.0.0.nupkg",
            &[("tools/Contoso.dacpac", "contoso")],
        );

        let config_path = dir.path().join("custom.config");
        fs::write(
            &config_path,
            r#"<configuration>
                 <packageSources>
                   <clear />
                   <add key="local" value="packages" />
                 </packageSources>
               </configuration>"#,
        )
        .unwrap();

        let output = dir.path().join("out");
        let options = FetchOptions {
            project: SqlProjectFile::new(&project_path).unwrap(),
            output: OutputDirectory::new(&output).unwrap(),
            includes: Vec::new(),
            filter: ReferenceFilter::DatabaseScoped,
            sources: SourceSelection::ConfigFile(config_path),
            client: ClientConfig::default(),
        };

        let report = run(options, Arc::new(CollectorSink::default()), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.processed.len(), 1);
        assert_eq!(fs::read(output.join("Contoso.dacpac")).unwrap(), b"contoso");
    }
}
