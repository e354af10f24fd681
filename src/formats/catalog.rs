//! Catalog of content types the fulfillment core recognizes.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::ContentType;

pub static GENERIC_EPUB: LazyLock<ContentType> =
    LazyLock::new(|| ContentType::new("application/epub+zip"));

pub static GENERIC_PDF: LazyLock<ContentType> =
    LazyLock::new(|| ContentType::new("application/pdf"));

/// Adobe ACSM wrapper, unwrapped through Adobe DRM
pub static ADOBE_ACSM: LazyLock<ContentType> =
    LazyLock::new(|| ContentType::new("application/vnd.adobe.adept+xml"));

/// Indirection through a short-lived bearer token document
pub static BEARER_TOKEN: LazyLock<ContentType> = LazyLock::new(|| {
    ContentType::new("application/vnd.librarysimplified.bearer-token+json")
});

pub static LCP_LICENSE: LazyLock<ContentType> =
    LazyLock::new(|| ContentType::new("application/vnd.readium.lcp.license.v1.0+json"));

pub static AXIS_NOW: LazyLock<ContentType> =
    LazyLock::new(|| ContentType::new("application/vnd.librarysimplified.axisnow+json"));

pub static AUDIOBOOK_MANIFEST: LazyLock<ContentType> =
    LazyLock::new(|| ContentType::new("application/audiobook+json"));

pub static AUDIOBOOK_LCP: LazyLock<ContentType> =
    LazyLock::new(|| ContentType::new("application/audiobook+lcp"));

pub static FINDAWAY_AUDIOBOOK: LazyLock<ContentType> = LazyLock::new(|| {
    ContentType::new("application/vnd.librarysimplified.findaway.license+json")
});

pub static OVERDRIVE_AUDIOBOOK: LazyLock<ContentType> = LazyLock::new(|| {
    ContentType::with_params(
        "application/vnd.overdrive.circulation.api+json",
        &[("profile", "audiobook")],
    )
});

pub static FEEDBOOKS_AUDIOBOOK: LazyLock<ContentType> = LazyLock::new(|| {
    ContentType::with_params(
        "application/audiobook+json",
        &[(
            "profile",
            "http://www.feedbooks.com/audiobooks/access-restriction",
        )],
    )
});

pub static OPDS_ENTRY: LazyLock<ContentType> = LazyLock::new(|| {
    ContentType::with_params(
        "application/atom+xml",
        &[
            ("type", "entry"),
            ("profile", "opds-catalog"),
            ("relation", "entry"),
        ],
    )
});

pub static OPDS_ACQUISITION_FEED: LazyLock<ContentType> = LazyLock::new(|| {
    ContentType::with_params(
        "application/atom+xml",
        &[("profile", "opds-catalog"), ("kind", "acquisition")],
    )
});

/// Every audio-book type, regardless of provider
pub static AUDIO_BOOK_TYPES: LazyLock<BTreeSet<ContentType>> = LazyLock::new(|| {
    [
        &*AUDIOBOOK_MANIFEST,
        &*AUDIOBOOK_LCP,
        &*FINDAWAY_AUDIOBOOK,
        &*OVERDRIVE_AUDIOBOOK,
        &*FEEDBOOKS_AUDIOBOOK,
    ]
    .into_iter()
    .cloned()
    .collect()
});

pub static OPDS_FEED_TYPES: LazyLock<BTreeSet<ContentType>> = LazyLock::new(|| {
    [&*OPDS_ENTRY, &*OPDS_ACQUISITION_FEED]
        .into_iter()
        .cloned()
        .collect()
});

pub fn is_audio_book(content_type: &ContentType) -> bool {
    AUDIO_BOOK_TYPES.contains(content_type)
}

pub fn is_opds_feed(content_type: &ContentType) -> bool {
    OPDS_FEED_TYPES.contains(content_type)
}
