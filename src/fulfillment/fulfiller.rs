use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::context::{Account, CancellationFlag, FulfillmentContext};
use super::engine::{FulfillmentReport, SubtaskExecutor};
use crate::acquisition::{Acquisition, AcquisitionPath, LinearizeError, Linearizer, PathSelector};
use crate::config::Config;
use crate::formats::FormatSupport;
use crate::observability::Metrics;
use crate::subtasks::SubtaskDirectory;

#[derive(Debug, Error)]
pub enum FulfillError {
    #[error(transparent)]
    Linearize(#[from] LinearizeError),

    #[error("no acceptable acquisition path ({rejected} rejected by format support)")]
    NoAcceptablePath { rejected: usize },
}

/// Who and where a book is fulfilled for. Every attempt gets a fresh
/// context built from it.
#[derive(Debug, Clone)]
pub struct FulfillmentRequest {
    pub book_id: String,
    pub account: Account,
    pub work_dir: PathBuf,
    pub cancellation: CancellationFlag,
}

impl FulfillmentRequest {
    pub fn new(book_id: impl Into<String>, account: Account, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            book_id: book_id.into(),
            account,
            work_dir: work_dir.into(),
            cancellation: CancellationFlag::new(),
        }
    }

    fn new_context(&self) -> FulfillmentContext {
        FulfillmentContext::new(
            self.book_id.clone(),
            self.account.clone(),
            self.work_dir.clone(),
            self.cancellation.clone(),
        )
    }
}

/// The report of the deciding attempt and the context it left behind.
#[derive(Debug)]
pub struct Fulfillment {
    pub report: FulfillmentReport,
    pub context: FulfillmentContext,
}

/// Walks the candidate paths of a book until one attempt decides the result.
pub struct Fulfiller {
    selector: PathSelector,
    directory: Arc<SubtaskDirectory>,
    executor: SubtaskExecutor,
    fallback_on_failure: bool,
}

impl Fulfiller {
    pub fn new(
        selector: PathSelector,
        directory: Arc<SubtaskDirectory>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            selector,
            directory,
            executor: SubtaskExecutor::new(metrics),
            fallback_on_failure: false,
        }
    }

    pub fn from_config(
        config: &Config,
        directory: SubtaskDirectory,
        metrics: Arc<Metrics>,
    ) -> Self {
        let selector = PathSelector::new(
            Linearizer::new(config.linearizer.max_depth),
            FormatSupport::new(config.capabilities),
        );
        let directory = directory.strict(config.resolution.strict);
        Self::new(selector, Arc::new(directory), metrics)
            .fallback_on_failure(config.fulfillment.fallback_on_failure)
    }

    /// Also try the next candidate after a subtask failure, not only after
    /// resolution failures.
    pub fn fallback_on_failure(mut self, enabled: bool) -> Self {
        self.fallback_on_failure = enabled;
        self
    }

    pub fn directory(&self) -> &SubtaskDirectory {
        &self.directory
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        self.executor.metrics()
    }

    pub fn candidates(
        &self,
        acquisitions: &[Acquisition],
    ) -> Result<Vec<AcquisitionPath>, FulfillError> {
        let (candidates, rejected) = self.selector.candidates(acquisitions)?;
        self.metrics().paths_rejected(rejected);
        if candidates.is_empty() {
            return Err(FulfillError::NoAcceptablePath { rejected });
        }
        Ok(candidates)
    }

    pub async fn fulfill(
        &self,
        acquisitions: &[Acquisition],
        request: &FulfillmentRequest,
    ) -> Result<Fulfillment, FulfillError> {
        let candidates = self.candidates(acquisitions)?;
        let total = candidates.len();
        let mut last = None;

        for (position, path) in candidates.iter().enumerate() {
            let mut context = request.new_context();
            let report = self
                .executor
                .attempt(path, &self.directory, &mut context)
                .await;

            let try_next = report.outcome.is_resolution_failure()
                || (self.fallback_on_failure && report.outcome.is_error());
            if !try_next {
                return Ok(Fulfillment { report, context });
            }

            if position + 1 < total {
                info!(
                    book_id = %request.book_id,
                    candidate = position + 1,
                    total,
                    outcome = %report.outcome,
                    "Trying next acquisition path"
                );
            }
            last = Some(Fulfillment { report, context });
        }

        last.ok_or(FulfillError::NoAcceptablePath { rejected: 0 })
    }
}

impl std::fmt::Debug for Fulfiller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fulfiller")
            .field("selector", &self.selector)
            .field("directory", &self.directory)
            .field("fallback_on_failure", &self.fallback_on_failure)
            .finish()
    }
}
