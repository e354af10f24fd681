//! Content types and format support
//!
//! - [`ContentType`] - structural media type identifier
//! - [`catalog`] - the known content types and type sets
//! - [`FormatSupport`] - decides which final types and paths a build accepts

pub mod catalog;
mod content_type;
mod support;

pub use content_type::{ContentType, ContentTypeError};
pub use support::{AudioSupport, Capabilities, FormatSupport, PathRejection};
