use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::context::FulfillmentContext;
use crate::acquisition::AcquisitionPath;
use crate::formats::ContentType;
use crate::observability::Metrics;
use crate::subtasks::{
    FulfillmentError, ResolutionError, ResolvedStep, SubtaskDirectory, SubtaskOutcome,
};

/// Lifecycle of one attempt. The last four states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Running { index: usize },
    Succeeded,
    SucceededEarly,
    Failed,
    Cancelled,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AttemptState::Pending | AttemptState::Running { .. })
    }
}

#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error("could not resolve subtasks: {0}")]
    Resolution(#[from] ResolutionError),
    #[error("step {step} ({subtask}) failed: {error}")]
    Subtask {
        step: usize,
        subtask: String,
        #[source]
        error: FulfillmentError,
    },
}

/// Terminal result of one attempt
#[derive(Debug)]
pub enum FulfillmentOutcome {
    Succeeded,
    /// A subtask decided the remaining steps were unnecessary
    SucceededEarly { step: usize },
    /// Deliberate stop; must not be reported as a fulfillment error
    Cancelled { step: usize },
    Failed(AttemptFailure),
}

impl FulfillmentOutcome {
    pub fn state(&self) -> AttemptState {
        match self {
            FulfillmentOutcome::Succeeded => AttemptState::Succeeded,
            FulfillmentOutcome::SucceededEarly { .. } => AttemptState::SucceededEarly,
            FulfillmentOutcome::Cancelled { .. } => AttemptState::Cancelled,
            FulfillmentOutcome::Failed(_) => AttemptState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            FulfillmentOutcome::Succeeded | FulfillmentOutcome::SucceededEarly { .. }
        )
    }

    /// Only failures are surfaced to users; cancellation is not an error.
    pub fn is_error(&self) -> bool {
        matches!(self, FulfillmentOutcome::Failed(_))
    }

    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            FulfillmentOutcome::Failed(AttemptFailure::Resolution(_))
        )
    }
}

impl std::fmt::Display for FulfillmentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentOutcome::Succeeded => f.write_str("succeeded"),
            FulfillmentOutcome::SucceededEarly { step } => {
                write!(f, "succeeded early at step {}", step)
            }
            FulfillmentOutcome::Cancelled { step } => write!(f, "cancelled at step {}", step),
            FulfillmentOutcome::Failed(failure) => write!(f, "failed: {}", failure),
        }
    }
}

/// What one subtask did
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub index: usize,
    pub content_type: ContentType,
    pub subtask: String,
    pub outcome: &'static str,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct FulfillmentReport {
    pub attempt_id: Uuid,
    pub path: String,
    pub outcome: FulfillmentOutcome,
    pub steps: Vec<StepRecord>,
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
}

/// Runs resolved subtask chains strictly in order.
#[derive(Debug, Clone, Default)]
pub struct SubtaskExecutor {
    metrics: Arc<Metrics>,
}

impl SubtaskExecutor {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Resolve `path` against `directory` and run it. A step without a
    /// subtask fails the attempt before any subtask runs.
    pub async fn attempt(
        &self,
        path: &AcquisitionPath,
        directory: &SubtaskDirectory,
        ctx: &mut FulfillmentContext,
    ) -> FulfillmentReport {
        let started_at = OffsetDateTime::now_utc();
        info!(attempt_id = %ctx.attempt_id(), book_id = ctx.book_id(), path = %path, "Starting fulfillment attempt");

        match directory.resolve(path, Some(ctx.account())) {
            Ok(chain) => self.run(path.to_string(), chain, ctx, started_at).await,
            Err(err) => {
                self.metrics.resolution_failed();
                warn!(attempt_id = %ctx.attempt_id(), error = %err, "Path could not be resolved");
                FulfillmentReport {
                    attempt_id: ctx.attempt_id(),
                    path: path.to_string(),
                    outcome: FulfillmentOutcome::Failed(err.into()),
                    steps: Vec::new(),
                    started_at,
                    finished_at: OffsetDateTime::now_utc(),
                }
            }
        }
    }

    /// Run an already resolved chain against `ctx`.
    pub async fn execute(
        &self,
        chain: Vec<ResolvedStep>,
        ctx: &mut FulfillmentContext,
    ) -> FulfillmentReport {
        let path = chain
            .iter()
            .map(|s| format!("[{}]", s.element.content_type))
            .collect::<Vec<_>>()
            .join(" -> ");
        self.run(path, chain, ctx, OffsetDateTime::now_utc()).await
    }

    async fn run(
        &self,
        path: String,
        chain: Vec<ResolvedStep>,
        ctx: &mut FulfillmentContext,
        started_at: OffsetDateTime,
    ) -> FulfillmentReport {
        self.metrics.attempt_started();

        let mut steps = Vec::with_capacity(chain.len());
        let mut outcome = FulfillmentOutcome::Succeeded;

        for (index, resolved) in chain.into_iter().enumerate() {
            let state = AttemptState::Running { index };
            debug!(
                attempt_id = %ctx.attempt_id(),
                step = index,
                subtask = %resolved.factory,
                content_type = %resolved.element.content_type,
                state = ?state,
                "Running subtask"
            );

            let ResolvedStep {
                element,
                factory,
                subtask,
            } = resolved;

            let clock = Instant::now();
            let result = subtask.execute(&element, ctx).await;
            steps.push(StepRecord {
                index,
                content_type: element.content_type.clone(),
                subtask: factory.clone(),
                outcome: result.label(),
                elapsed: clock.elapsed(),
            });

            match result {
                SubtaskOutcome::Continue => continue,
                SubtaskOutcome::Cancelled => {
                    outcome = FulfillmentOutcome::Cancelled { step: index };
                    break;
                }
                SubtaskOutcome::HaltedEarly => {
                    outcome = FulfillmentOutcome::SucceededEarly { step: index };
                    break;
                }
                SubtaskOutcome::Failed(error) => {
                    outcome = FulfillmentOutcome::Failed(AttemptFailure::Subtask {
                        step: index,
                        subtask: factory,
                        error,
                    });
                    break;
                }
            }
        }

        self.record(&outcome, ctx, outcome.state());

        FulfillmentReport {
            attempt_id: ctx.attempt_id(),
            path,
            outcome,
            steps,
            started_at,
            finished_at: OffsetDateTime::now_utc(),
        }
    }

    fn record(&self, outcome: &FulfillmentOutcome, ctx: &FulfillmentContext, state: AttemptState) {
        match outcome {
            FulfillmentOutcome::Succeeded => {
                self.metrics.attempt_succeeded();
                info!(attempt_id = %ctx.attempt_id(), state = ?state, "Fulfillment completed");
            }
            FulfillmentOutcome::SucceededEarly { step } => {
                self.metrics.attempt_succeeded_early();
                info!(attempt_id = %ctx.attempt_id(), step, state = ?state, "Fulfillment completed early");
            }
            FulfillmentOutcome::Cancelled { step } => {
                self.metrics.attempt_cancelled();
                info!(attempt_id = %ctx.attempt_id(), step, state = ?state, "Fulfillment cancelled");
            }
            FulfillmentOutcome::Failed(failure) => {
                self.metrics.attempt_failed();
                warn!(attempt_id = %ctx.attempt_id(), error = %failure, state = ?state, "Fulfillment failed");
            }
        }
    }
}
