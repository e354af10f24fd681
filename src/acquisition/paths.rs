use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::model::{Acquisition, AcquisitionPath, IndirectAcquisition, PathElement};
use crate::formats::FormatSupport;

pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinearizeError {
    #[error("indirect acquisition tree for {target_uri} is deeper than {max_depth} levels")]
    DepthExceeded { target_uri: String, max_depth: usize },
}

/// Turns an acquisition's indirection forest into every root-to-leaf path.
#[derive(Debug, Clone, Copy)]
pub struct Linearizer {
    max_depth: usize,
}

impl Default for Linearizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Linearizer {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// One path per leaf of the indirection forest, in declaration order.
    /// An acquisition without indirections yields a single one-step path.
    pub fn linearize(
        &self,
        acquisition: &Acquisition,
    ) -> Result<Vec<AcquisitionPath>, LinearizeError> {
        let source = Arc::new(acquisition.clone());
        let root = PathElement::new(
            acquisition.content_type.clone(),
            Some(acquisition.target_uri.clone()),
        );

        let mut prefix = vec![root];
        let mut leaves: Vec<Vec<PathElement>> = Vec::new();

        if acquisition.indirect.is_empty() {
            leaves.push(prefix);
        } else {
            for node in &acquisition.indirect {
                self.descend(acquisition, node, 1, &mut prefix, &mut leaves)?;
            }
        }

        Ok(leaves
            .into_iter()
            .filter_map(|steps| AcquisitionPath::new(source.clone(), steps))
            .collect())
    }

    /// Linearize each acquisition in turn and concatenate the results.
    pub fn linearize_all(
        &self,
        acquisitions: &[Acquisition],
    ) -> Result<Vec<AcquisitionPath>, LinearizeError> {
        let mut paths = Vec::new();
        for acquisition in acquisitions {
            paths.extend(self.linearize(acquisition)?);
        }
        Ok(paths)
    }

    fn descend(
        &self,
        acquisition: &Acquisition,
        node: &IndirectAcquisition,
        depth: usize,
        prefix: &mut Vec<PathElement>,
        leaves: &mut Vec<Vec<PathElement>>,
    ) -> Result<(), LinearizeError> {
        if depth > self.max_depth {
            return Err(LinearizeError::DepthExceeded {
                target_uri: acquisition.target_uri.clone(),
                max_depth: self.max_depth,
            });
        }

        prefix.push(PathElement::new(node.content_type.clone(), None));
        if node.children.is_empty() {
            leaves.push(prefix.clone());
        } else {
            for child in &node.children {
                self.descend(acquisition, child, depth + 1, prefix, leaves)?;
            }
        }
        prefix.pop();
        Ok(())
    }
}

/// Picks the candidate paths worth attempting, in preference order.
#[derive(Debug, Clone)]
pub struct PathSelector {
    linearizer: Linearizer,
    support: FormatSupport,
}

impl PathSelector {
    pub fn new(linearizer: Linearizer, support: FormatSupport) -> Self {
        Self {
            linearizer,
            support,
        }
    }

    pub fn support(&self) -> &FormatSupport {
        &self.support
    }

    /// Acceptable paths from fulfillable relations, in declaration order.
    /// Also returns how many linearized paths were rejected by the format filter.
    pub fn candidates(
        &self,
        acquisitions: &[Acquisition],
    ) -> Result<(Vec<AcquisitionPath>, usize), LinearizeError> {
        let eligible: Vec<Acquisition> = acquisitions
            .iter()
            .filter(|a| {
                let keep = a.relation.is_fulfillable();
                if !keep {
                    debug!(relation = ?a.relation, uri = %a.target_uri, "Skipping acquisition relation");
                }
                keep
            })
            .cloned()
            .collect();

        let mut rejected = 0;
        let candidates = self
            .linearizer
            .linearize_all(&eligible)?
            .into_iter()
            .filter(|path| {
                let accepted = self.support.is_acceptable_path(&path.content_types());
                if !accepted {
                    rejected += 1;
                    debug!(path = %path, "Discarding unsupported acquisition path");
                }
                accepted
            })
            .collect();

        Ok((candidates, rejected))
    }
}
