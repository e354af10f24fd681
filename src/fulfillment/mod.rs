//! Running acquisition paths
//!
//! A [`FulfillmentContext`] carries the state of one attempt. The
//! [`SubtaskExecutor`] runs a resolved chain against it and reports one of
//! four terminal outcomes. The [`Fulfiller`] linearizes and filters a book's
//! acquisitions and attempts the candidates in order.

mod context;
mod engine;
mod fulfiller;

pub use context::{Account, CancellationFlag, Credentials, FulfillmentContext};
pub use engine::{
    AttemptFailure, AttemptState, FulfillmentOutcome, FulfillmentReport, StepRecord,
    SubtaskExecutor,
};
pub use fulfiller::{FulfillError, Fulfiller, Fulfillment, FulfillmentRequest};
