pub mod acquisition;
pub mod config;
pub mod formats;
pub mod fulfillment;
pub mod humanize;
pub mod observability;
pub mod subtasks;
pub mod worker;
