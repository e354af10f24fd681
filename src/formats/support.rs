use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

use super::ContentType;
use super::catalog;

/// Audio-book providers the build can play
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AudioSupport {
    #[serde(default)]
    pub findaway: bool,
    #[serde(default)]
    pub overdrive: bool,
    #[serde(default)]
    pub feedbooks: bool,
    #[serde(default)]
    pub lcp: bool,
}

/// What the running build can deliver. Absent `audio` means no audio support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Capabilities {
    #[serde(default)]
    pub pdf: bool,
    #[serde(default)]
    pub adobe_drm: bool,
    #[serde(default)]
    pub lcp: bool,
    #[serde(default)]
    pub axis_now: bool,
    #[serde(default)]
    pub audio: Option<AudioSupport>,
}

/// Why a path was refused
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathRejection {
    #[error("empty acquisition path")]
    Empty,
    #[error("unsupported content type in path: {0}")]
    UnknownType(ContentType),
    #[error("final content type is not deliverable: {0}")]
    UnsupportedFinalType(ContentType),
    #[error("Adobe-encrypted PDF is not supported")]
    AdobeEncryptedPdf,
}

/// Decides which content types and paths the current build can service.
#[derive(Debug, Clone)]
pub struct FormatSupport {
    capabilities: Capabilities,
    final_types: BTreeSet<ContentType>,
    known_types: BTreeSet<ContentType>,
}

impl FormatSupport {
    pub fn new(capabilities: Capabilities) -> Self {
        let final_types = final_types_for(&capabilities);
        let known_types = known_types_for(&capabilities, &final_types);
        Self {
            capabilities,
            final_types,
            known_types,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn final_types(&self) -> &BTreeSet<ContentType> {
        &self.final_types
    }

    pub fn is_known(&self, content_type: &ContentType) -> bool {
        self.known_types.contains(content_type)
    }

    /// Whether `content_type` can be stored as the end product of a fulfillment.
    pub fn is_acceptable_final(&self, content_type: &ContentType) -> bool {
        self.final_types.contains(content_type)
    }

    /// Check a whole path, reporting the first violation found.
    pub fn check_path(&self, steps: &[ContentType]) -> Result<(), PathRejection> {
        let Some(last) = steps.last() else {
            return Err(PathRejection::Empty);
        };

        if let Some(unknown) = steps.iter().find(|t| !self.is_known(t)) {
            return Err(PathRejection::UnknownType(unknown.clone()));
        }

        if !self.is_acceptable_final(last) {
            return Err(PathRejection::UnsupportedFinalType(last.clone()));
        }

        let has_pdf = steps.contains(&catalog::GENERIC_PDF);
        let has_adobe = steps.contains(&catalog::ADOBE_ACSM);
        if has_pdf && has_adobe {
            return Err(PathRejection::AdobeEncryptedPdf);
        }

        Ok(())
    }

    pub fn is_acceptable_path(&self, steps: &[ContentType]) -> bool {
        match self.check_path(steps) {
            Ok(()) => true,
            Err(rejection) => {
                debug!(reason = %rejection, "Rejected acquisition path");
                false
            }
        }
    }
}

fn final_types_for(capabilities: &Capabilities) -> BTreeSet<ContentType> {
    let mut types = BTreeSet::new();
    types.insert(catalog::GENERIC_EPUB.clone());

    if capabilities.pdf {
        types.insert(catalog::GENERIC_PDF.clone());
    }

    if let Some(audio) = capabilities.audio {
        types.insert(catalog::AUDIOBOOK_MANIFEST.clone());
        if audio.findaway {
            types.insert(catalog::FINDAWAY_AUDIOBOOK.clone());
        }
        if audio.overdrive {
            types.insert(catalog::OVERDRIVE_AUDIOBOOK.clone());
        }
        if audio.feedbooks {
            types.insert(catalog::FEEDBOOKS_AUDIOBOOK.clone());
        }
        if audio.lcp {
            types.insert(catalog::AUDIOBOOK_LCP.clone());
        }
    }

    types
}

fn known_types_for(
    capabilities: &Capabilities,
    final_types: &BTreeSet<ContentType>,
) -> BTreeSet<ContentType> {
    let mut types = final_types.clone();
    types.extend(catalog::OPDS_FEED_TYPES.iter().cloned());
    types.insert(catalog::BEARER_TOKEN.clone());

    if capabilities.adobe_drm {
        types.insert(catalog::ADOBE_ACSM.clone());
    }
    if capabilities.lcp {
        types.insert(catalog::LCP_LICENSE.clone());
    }
    if capabilities.axis_now {
        types.insert(catalog::AXIS_NOW.clone());
    }

    types
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::catalog::*;

    fn everything() -> Capabilities {
        Capabilities {
            pdf: true,
            adobe_drm: true,
            lcp: true,
            axis_now: true,
            audio: Some(AudioSupport {
                findaway: true,
                overdrive: true,
                feedbooks: true,
                lcp: true,
            }),
        }
    }

    #[test]
    fn test_epub_always_final() {
        let support = FormatSupport::new(Capabilities::default());
        assert!(support.is_acceptable_final(&GENERIC_EPUB));
        assert!(!support.is_acceptable_final(&GENERIC_PDF));
        assert!(!support.is_acceptable_final(&AUDIOBOOK_MANIFEST));
    }

    #[test]
    fn test_audio_narrowed_by_provider() {
        let support = FormatSupport::new(Capabilities {
            audio: Some(AudioSupport {
                overdrive: true,
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(support.is_acceptable_final(&AUDIOBOOK_MANIFEST));
        assert!(support.is_acceptable_final(&OVERDRIVE_AUDIOBOOK));
        assert!(!support.is_acceptable_final(&FINDAWAY_AUDIOBOOK));
        assert!(!support.is_acceptable_final(&FEEDBOOKS_AUDIOBOOK));
    }

    #[test]
    fn test_rejects_empty_path() {
        let support = FormatSupport::new(everything());
        assert_eq!(support.check_path(&[]), Err(PathRejection::Empty));
        assert!(!support.is_acceptable_path(&[]));
    }

    #[test]
    fn test_rejects_unknown_type() {
        let support = FormatSupport::new(everything());
        let odd = ContentType::new("application/x-mobipocket-ebook");
        assert_eq!(
            support.check_path(&[odd.clone(), GENERIC_EPUB.clone()]),
            Err(PathRejection::UnknownType(odd))
        );
    }

    #[test]
    fn test_adobe_unknown_without_drm_support() {
        let support = FormatSupport::new(Capabilities::default());
        let path = [ADOBE_ACSM.clone(), GENERIC_EPUB.clone()];
        assert_eq!(
            support.check_path(&path),
            Err(PathRejection::UnknownType(ADOBE_ACSM.clone()))
        );
    }

    #[test]
    fn test_rejects_non_final_last_step() {
        let support = FormatSupport::new(everything());
        let path = [GENERIC_EPUB.clone(), BEARER_TOKEN.clone()];
        assert_eq!(
            support.check_path(&path),
            Err(PathRejection::UnsupportedFinalType(BEARER_TOKEN.clone()))
        );
    }

    #[test]
    fn test_rejects_adobe_pdf_in_any_order() {
        let support = FormatSupport::new(everything());
        let wrapped = [ADOBE_ACSM.clone(), GENERIC_PDF.clone()];
        assert_eq!(
            support.check_path(&wrapped),
            Err(PathRejection::AdobeEncryptedPdf)
        );

        // Adobe after the PDF still disqualifies the path
        let reversed = [
            GENERIC_PDF.clone(),
            ADOBE_ACSM.clone(),
            GENERIC_EPUB.clone(),
        ];
        assert!(!support.is_acceptable_path(&reversed));
    }

    #[test]
    fn test_accepts_bearer_token_into_epub() {
        let support = FormatSupport::new(Capabilities::default());
        assert!(support.is_acceptable_path(&[BEARER_TOKEN.clone(), GENERIC_EPUB.clone()]));
    }

    #[test]
    fn test_accepts_opds_entry_then_lcp_audio() {
        let support = FormatSupport::new(everything());
        let path = [
            OPDS_ENTRY.clone(),
            LCP_LICENSE.clone(),
            AUDIOBOOK_LCP.clone(),
        ];
        assert!(support.is_acceptable_path(&path));
    }
}
