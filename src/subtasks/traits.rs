use async_trait::async_trait;
use thiserror::Error;

use crate::acquisition::PathElement;
use crate::formats::ContentType;
use crate::fulfillment::{Account, FulfillmentContext};

/// Why a subtask could not complete its step
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("invalid content: {0}")]
    InvalidContent(String),
    #[error("DRM rejected: {0}")]
    Drm(String),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("content too large: {actual} bytes (limit {limit})")]
    TooLarge { actual: u64, limit: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of running one subtask
#[derive(Debug)]
pub enum SubtaskOutcome {
    /// Step done; run the next one
    Continue,
    /// Caller or environment asked to stop. Not an error.
    Cancelled,
    /// Remaining steps are unnecessary; the attempt succeeded.
    HaltedEarly,
    Failed(FulfillmentError),
}

impl SubtaskOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SubtaskOutcome::Continue => "continue",
            SubtaskOutcome::Cancelled => "cancelled",
            SubtaskOutcome::HaltedEarly => "halted-early",
            SubtaskOutcome::Failed(_) => "failed",
        }
    }
}

impl<E> From<Result<SubtaskOutcome, E>> for SubtaskOutcome
where
    E: Into<FulfillmentError>,
{
    fn from(result: Result<SubtaskOutcome, E>) -> Self {
        match result {
            Ok(outcome) => outcome,
            Err(e) => SubtaskOutcome::Failed(e.into()),
        }
    }
}

/// Single-use unit of work performing one step of a fulfillment.
///
/// Execution consumes the subtask, so an instance can never run twice.
#[async_trait]
pub trait Subtask: Send {
    async fn execute(
        self: Box<Self>,
        step: &PathElement,
        ctx: &mut FulfillmentContext,
    ) -> SubtaskOutcome;
}

/// Reusable constructor of subtasks for the steps it claims.
pub trait SubtaskFactory: Send + Sync {
    fn name(&self) -> &str;

    fn is_applicable_for(
        &self,
        content_type: &ContentType,
        target_uri: Option<&str>,
        account: Option<&Account>,
    ) -> bool;

    fn create_subtask(&self) -> Box<dyn Subtask>;
}
