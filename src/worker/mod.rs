//! Fulfillment workers
//!
//! [`runner`] puts every fulfillment on its own tokio task; [`http`] is the
//! network boundary the built-in subtasks fetch through.

pub mod http;
pub mod runner;

pub use http::{
    FetchError, FetchRequest, Fetcher, HttpConfig, HttpFetcher, fetch_until_cancelled,
};
pub use runner::spawn_fulfillment;
