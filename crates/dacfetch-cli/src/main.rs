use std::{env, process, sync::Arc, time::Duration};

use clap::Parser;
use cli::Args;
use dacfetch_core::{
    error::ErrorContext, project_root::SourceSelection, references::ReferenceFilter,
    DacfetchResult,
};
use dacfetch_events::{ChannelSink, EventSinkHandle};
use dacfetch_operations::{CancellationToken, FetchOptions, RunReport};
use dacfetch_registry::ClientConfig;
use logging::setup_logging;
use progress::spawn_event_handler;
use tracing::debug;
use ureq::Proxy;

mod cli;
mod logging;
mod progress;
mod utils;

const EXIT_CANCELLED: i32 = 1;
const EXIT_FAILURE: i32 = 3;

fn fetch_options(args: Args) -> DacfetchResult<FetchOptions> {
    let sources = if let Some(path) = args.config_file {
        let path = if path.is_absolute() {
            path
        } else {
            env::current_dir()
                .with_context(|| "retrieving current directory".into())?
                .join(path)
        };
        SourceSelection::ConfigFile(path)
    } else if !args.source.is_empty() {
        SourceSelection::Explicit(args.source)
    } else {
        SourceSelection::Discover
    };

    let filter = if args.all_package_references {
        ReferenceFilter::AllPackageReferences
    } else {
        ReferenceFilter::DatabaseScoped
    };

    let mut client = ClientConfig::default();
    // Already validated while parsing arguments.
    client.proxy = args.proxy.as_deref().and_then(|proxy| Proxy::new(proxy).ok());
    if let Some(user_agent) = args.user_agent {
        client.user_agent = Some(user_agent);
    }
    client.timeout = args.timeout.map(Duration::from_secs);

    Ok(FetchOptions {
        project: args.project,
        output: args.output_directory,
        includes: args.include,
        filter,
        sources,
        client,
    })
}

async fn handle_cli(args: Args, cancel: CancellationToken) -> DacfetchResult<RunReport> {
    let options = fetch_options(args)?;

    let (sink, receiver) = ChannelSink::new();
    let events: EventSinkHandle = Arc::new(sink);
    let guard = spawn_event_handler(receiver);

    let result = dacfetch_operations::run(options, events, cancel).await;

    // A cancelled fetch may still hold a sender on a blocking thread; the
    // renderer is left behind in that case instead of joined.
    if !matches!(&result, Err(err) if err.is_cancelled()) {
        guard.finish();
    }
    progress::stop();

    result
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logging(&args);
    utils::set_color(!args.no_color);
    utils::set_progress(!(args.no_progress || args.quiet || args.json));

    let color = !args.no_color;
    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .color(color)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling");
            signal_token.cancel();
        }
    });

    let code = match handle_cli(args, cancel).await {
        Ok(report) => {
            debug!(
                "processed {} of {} references, {} files extracted",
                report.processed.len(),
                report.expected.len(),
                report.extracted
            );
            0
        }
        Err(err) if err.is_cancelled() => {
            println!("Cancelled");
            EXIT_CANCELLED
        }
        Err(err) => {
            let summary = err.to_string();
            eprintln!("{:?}", miette::Report::new(err));
            println!("{summary}");
            EXIT_FAILURE
        }
    };

    process::exit(code);
}
