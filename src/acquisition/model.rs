use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::formats::ContentType;

/// OPDS acquisition link relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionRelation {
    Acquire,
    Borrow,
    Buy,
    OpenAccess,
    Sample,
    Subscribe,
}

impl AcquisitionRelation {
    /// Relations that lead to content without a purchase or preview flow
    pub fn is_fulfillable(self) -> bool {
        matches!(
            self,
            AcquisitionRelation::Acquire
                | AcquisitionRelation::Borrow
                | AcquisitionRelation::OpenAccess
        )
    }
}

/// Content declared as `content_type` that can be unwrapped into any of `children`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndirectAcquisition {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default)]
    pub children: Vec<IndirectAcquisition>,
}

impl IndirectAcquisition {
    pub fn leaf(content_type: ContentType) -> Self {
        Self {
            content_type,
            children: Vec::new(),
        }
    }

    pub fn with_children(content_type: ContentType, children: Vec<IndirectAcquisition>) -> Self {
        Self {
            content_type,
            children,
        }
    }
}

/// An offer to obtain content from a network location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Acquisition {
    pub relation: AcquisitionRelation,
    pub target_uri: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default)]
    pub indirect: Vec<IndirectAcquisition>,
}

/// One step of a linearized path. Only the first step carries a target URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathElement {
    pub content_type: ContentType,
    pub target_uri: Option<String>,
}

impl PathElement {
    pub fn new(content_type: ContentType, target_uri: Option<String>) -> Self {
        Self {
            content_type,
            target_uri,
        }
    }
}

/// A non-empty, immutable sequence of steps derived from one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionPath {
    source: Arc<Acquisition>,
    steps: Vec<PathElement>,
}

impl AcquisitionPath {
    /// Returns `None` when `steps` is empty.
    pub fn new(source: Arc<Acquisition>, steps: Vec<PathElement>) -> Option<Self> {
        if steps.is_empty() {
            return None;
        }
        Some(Self { source, steps })
    }

    pub fn source(&self) -> &Acquisition {
        &self.source
    }

    pub fn steps(&self) -> &[PathElement] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Paths are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> &PathElement {
        &self.steps[0]
    }

    pub fn last(&self) -> &PathElement {
        &self.steps[self.steps.len() - 1]
    }

    pub fn content_types(&self) -> Vec<ContentType> {
        self.steps.iter().map(|s| s.content_type.clone()).collect()
    }
}

impl std::fmt::Display for AcquisitionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "[{}]", step.content_type)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::catalog::{ADOBE_ACSM, GENERIC_EPUB};

    #[test]
    fn test_path_requires_steps() {
        let source = Arc::new(Acquisition {
            relation: AcquisitionRelation::Borrow,
            target_uri: "https://example.com/borrow".to_string(),
            content_type: GENERIC_EPUB.clone(),
            indirect: vec![],
        });
        assert!(AcquisitionPath::new(source, vec![]).is_none());
    }

    #[test]
    fn test_acquisition_from_json() {
        let json = r#"{
            "relation": "open-access",
            "target_uri": "https://example.com/book.acsm",
            "type": "application/vnd.adobe.adept+xml",
            "indirect": [{ "type": "application/epub+zip" }]
        }"#;
        let acquisition: Acquisition = serde_json::from_str(json).unwrap();
        assert_eq!(acquisition.relation, AcquisitionRelation::OpenAccess);
        assert_eq!(acquisition.content_type, *ADOBE_ACSM);
        assert_eq!(acquisition.indirect.len(), 1);
        assert!(acquisition.indirect[0].children.is_empty());
    }

    #[test]
    fn test_fulfillable_relations() {
        assert!(AcquisitionRelation::Borrow.is_fulfillable());
        assert!(AcquisitionRelation::OpenAccess.is_fulfillable());
        assert!(!AcquisitionRelation::Buy.is_fulfillable());
        assert!(!AcquisitionRelation::Sample.is_fulfillable());
    }
}
