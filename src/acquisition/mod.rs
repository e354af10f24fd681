//! Acquisitions and their linearized paths
//!
//! An [`Acquisition`] may wrap its content in a tree of
//! [`IndirectAcquisition`]s. The [`Linearizer`] flattens that tree into one
//! [`AcquisitionPath`] per leaf, and the [`PathSelector`] keeps the paths a
//! build can actually fulfill.

mod model;
mod paths;

pub use model::{
    Acquisition, AcquisitionPath, AcquisitionRelation, IndirectAcquisition, PathElement,
};
pub use paths::{DEFAULT_MAX_DEPTH, LinearizeError, Linearizer, PathSelector};
