use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cli::{FulfillArgs, PathsArgs};
use opds_fulfill::acquisition::{Acquisition, Linearizer};
use opds_fulfill::config::Config;
use opds_fulfill::formats::FormatSupport;
use opds_fulfill::fulfillment::{Account, Fulfiller, FulfillmentRequest};
use opds_fulfill::observability::Metrics;
use opds_fulfill::subtasks::SubtaskDirectory;
use opds_fulfill::worker::{HttpConfig, HttpFetcher, spawn_fulfillment};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Deserialize)]
#[serde(untagged)]
enum AcquisitionFile {
    Many(Vec<Acquisition>),
    One(Acquisition),
}

fn read_acquisitions(path: &Path) -> Result<Vec<Acquisition>, AnyError> {
    let raw = std::fs::read(path)?;
    let parsed: AcquisitionFile = serde_json::from_slice(&raw)?;
    Ok(match parsed {
        AcquisitionFile::Many(all) => all,
        AcquisitionFile::One(one) => vec![one],
    })
}

pub fn paths(config: &Config, args: PathsArgs) -> Result<(), AnyError> {
    let acquisitions = read_acquisitions(&args.file)?;
    let support = FormatSupport::new(config.capabilities);
    let linearizer = Linearizer::new(config.linearizer.max_depth);

    for (index, path) in linearizer.linearize_all(&acquisitions)?.iter().enumerate() {
        let verdict = if !path.source().relation.is_fulfillable() {
            format!("skipped: relation {:?}", path.source().relation)
        } else {
            match support.check_path(&path.content_types()) {
                Ok(()) => "accepted".to_string(),
                Err(rejection) => format!("rejected: {}", rejection),
            }
        };
        println!("{:>3}  {}  ({})", index, path, verdict);
    }

    Ok(())
}

pub async fn fulfill(config: &Config, args: FulfillArgs) -> Result<(), AnyError> {
    let acquisitions = read_acquisitions(&args.file)?;

    let fetcher = HttpFetcher::new(HttpConfig::from(&config.http))?;
    let directory = SubtaskDirectory::with_defaults(Arc::new(fetcher));
    let fulfiller = Arc::new(Fulfiller::from_config(
        config,
        directory,
        Arc::new(Metrics::new()),
    ));

    let work_dir = args
        .work_dir
        .unwrap_or_else(|| config.fulfillment.work_dir.clone());
    let request = FulfillmentRequest::new(args.book_id, Account::anonymous(args.account), work_dir);

    let cancellation = request.cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling fulfillment");
            cancellation.cancel();
        }
    });

    let fulfillment = spawn_fulfillment(fulfiller.clone(), acquisitions, request).await??;
    let report = &fulfillment.report;

    println!("attempt {}  {}", report.attempt_id, report.path);
    for step in &report.steps {
        println!(
            "  step {} {:<16} {:<14} {:?}  {}",
            step.index, step.subtask, step.outcome, step.elapsed, step.content_type
        );
    }
    if let Some(file) = &fulfillment.context.downloaded_file {
        println!("  delivered {}", file.display());
    }
    println!("outcome: {}", report.outcome);
    info!(metrics = ?fulfiller.metrics().snapshot(), "Fulfillment finished");

    if report.outcome.is_error() {
        return Err(report.outcome.to_string().into());
    }
    Ok(())
}
