//! Subtasks: the plugin boundary of the fulfillment core
//!
//! Each step of an acquisition path is performed by a single-use
//! [`Subtask`] created by a [`SubtaskFactory`]. Factories are kept in an
//! ordered [`SubtaskDirectory`]; the first applicable one handles a step.
//!
//! ## Key Components
//!
//! - [`Subtask`] / [`SubtaskFactory`] - traits implemented per fulfillment technology
//! - [`SubtaskOutcome`] - continue, cancel, halt early, or fail
//! - [`SubtaskDirectory`] - ordered registry and chain resolution
//! - [`BearerTokenFactory`] / [`DirectDownloadFactory`] - built-in subtasks
//!
//! ## Example
//!
//! ```rust,ignore
//! use opds_fulfill::subtasks::SubtaskDirectory;
//!
//! let directory = SubtaskDirectory::with_defaults(fetcher);
//! let chain = directory.resolve(&path, Some(&account))?;
//! ```

mod bearer;
mod directory;
mod download;
mod traits;

pub use bearer::{BEARER_TOKEN_SUBTASK, BearerTokenDocument, BearerTokenFactory};
pub use directory::{ResolutionError, ResolvedStep, SubtaskDirectory};
pub use download::{DIRECT_DOWNLOAD_SUBTASK, DirectDownloadFactory};
pub use traits::{FulfillmentError, Subtask, SubtaskFactory, SubtaskOutcome};
