use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::bearer::BearerTokenFactory;
use super::download::DirectDownloadFactory;
use super::traits::{Subtask, SubtaskFactory};
use crate::acquisition::{AcquisitionPath, PathElement};
use crate::formats::ContentType;
use crate::fulfillment::Account;
use crate::worker::http::Fetcher;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no subtask can handle step {index} ({content_type})")]
    NoSubtask {
        index: usize,
        content_type: ContentType,
    },
    #[error("step {index} ({content_type}) is claimed by several subtasks: {}", candidates.join(", "))]
    Ambiguous {
        index: usize,
        content_type: ContentType,
        candidates: Vec<String>,
    },
}

/// A path step paired with the fresh subtask that will perform it.
pub struct ResolvedStep {
    pub element: PathElement,
    pub factory: String,
    pub subtask: Box<dyn Subtask>,
}

impl std::fmt::Debug for ResolvedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedStep")
            .field("element", &self.element)
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}

/// Ordered registry of subtask factories.
///
/// Lookup is first-registered, first-matched, so the order in which
/// factories are registered decides which one handles overlapping types.
#[derive(Clone, Default)]
pub struct SubtaskDirectory {
    factories: Vec<Arc<dyn SubtaskFactory>>,
    strict: bool,
}

impl SubtaskDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report overlapping factories as resolution errors instead of picking the first.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn register(&mut self, factory: Arc<dyn SubtaskFactory>) -> &mut Self {
        debug!(
            subtask = factory.name(),
            position = self.factories.len(),
            "Registered subtask factory"
        );
        self.factories.push(factory);
        self
    }

    /// Directory with the built-in subtasks, registered in this order:
    /// `bearer-token`, then `direct-download`.
    pub fn with_defaults(fetcher: Arc<dyn Fetcher>) -> Self {
        let mut directory = Self::new();
        directory
            .register(Arc::new(BearerTokenFactory::new(fetcher.clone())))
            .register(Arc::new(DirectDownloadFactory::new(fetcher)));
        directory
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// First registered factory applicable to `element`, if any.
    pub fn find_subtask_for(
        &self,
        element: &PathElement,
        account: Option<&Account>,
    ) -> Option<Arc<dyn SubtaskFactory>> {
        self.factories
            .iter()
            .find(|f| applies(f, element, account))
            .cloned()
    }

    /// Every applicable factory, in registration order.
    pub fn find_all_for(
        &self,
        element: &PathElement,
        account: Option<&Account>,
    ) -> Vec<Arc<dyn SubtaskFactory>> {
        self.factories
            .iter()
            .filter(|f| applies(f, element, account))
            .cloned()
            .collect()
    }

    /// Resolve every step of `path` to a fresh subtask. Either the whole
    /// chain resolves or nothing is created.
    pub fn resolve(
        &self,
        path: &AcquisitionPath,
        account: Option<&Account>,
    ) -> Result<Vec<ResolvedStep>, ResolutionError> {
        let mut chosen = Vec::with_capacity(path.len());

        for (index, element) in path.steps().iter().enumerate() {
            let matches = self.find_all_for(element, account);
            let Some(first) = matches.first() else {
                return Err(ResolutionError::NoSubtask {
                    index,
                    content_type: element.content_type.clone(),
                });
            };

            if matches.len() > 1 {
                let candidates: Vec<String> =
                    matches.iter().map(|f| f.name().to_string()).collect();
                if self.strict {
                    return Err(ResolutionError::Ambiguous {
                        index,
                        content_type: element.content_type.clone(),
                        candidates,
                    });
                }
                warn!(
                    step = index,
                    content_type = %element.content_type,
                    chosen = first.name(),
                    candidates = ?candidates,
                    "Several subtasks claim this step, using the first registered"
                );
            }

            chosen.push((element, first.clone()));
        }

        Ok(chosen
            .into_iter()
            .map(|(element, factory)| ResolvedStep {
                element: element.clone(),
                factory: factory.name().to_string(),
                subtask: factory.create_subtask(),
            })
            .collect())
    }
}

fn applies(
    factory: &Arc<dyn SubtaskFactory>,
    element: &PathElement,
    account: Option<&Account>,
) -> bool {
    factory.is_applicable_for(
        &element.content_type,
        element.target_uri.as_deref(),
        account,
    )
}

impl std::fmt::Debug for SubtaskDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtaskDirectory")
            .field("factories", &self.names())
            .field("strict", &self.strict)
            .finish()
    }
}
