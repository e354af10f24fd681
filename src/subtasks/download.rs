use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::traits::{FulfillmentError, Subtask, SubtaskFactory, SubtaskOutcome};
use crate::acquisition::PathElement;
use crate::formats::{ContentType, catalog};
use crate::fulfillment::{Account, Credentials, FulfillmentContext};
use crate::worker::http::{FetchRequest, Fetcher, fetch_until_cancelled};

pub const DIRECT_DOWNLOAD_SUBTASK: &str = "direct-download";

/// Fetches plain, unencrypted content into the attempt's working directory.
pub struct DirectDownloadFactory {
    fetcher: Arc<dyn Fetcher>,
}

impl DirectDownloadFactory {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

fn extension_for(content_type: &ContentType) -> &'static str {
    if *content_type == *catalog::GENERIC_EPUB {
        "epub"
    } else if *content_type == *catalog::GENERIC_PDF {
        "pdf"
    } else if *content_type == *catalog::AUDIOBOOK_MANIFEST {
        "json"
    } else {
        "bin"
    }
}

impl SubtaskFactory for DirectDownloadFactory {
    fn name(&self) -> &str {
        DIRECT_DOWNLOAD_SUBTASK
    }

    fn is_applicable_for(
        &self,
        content_type: &ContentType,
        _target_uri: Option<&str>,
        _account: Option<&Account>,
    ) -> bool {
        *content_type == *catalog::GENERIC_EPUB
            || *content_type == *catalog::GENERIC_PDF
            || *content_type == *catalog::AUDIOBOOK_MANIFEST
    }

    fn create_subtask(&self) -> Box<dyn Subtask> {
        Box::new(DirectDownload {
            fetcher: self.fetcher.clone(),
        })
    }
}

struct DirectDownload {
    fetcher: Arc<dyn Fetcher>,
}

impl DirectDownload {
    async fn run(
        &self,
        step: &PathElement,
        ctx: &mut FulfillmentContext,
    ) -> Result<SubtaskOutcome, FulfillmentError> {
        let url = step
            .target_uri
            .clone()
            .or_else(|| ctx.current_uri.clone())
            .ok_or_else(|| FulfillmentError::MissingInput("download URI".to_string()))?;

        // A token obtained earlier in the chain wins over account credentials
        let auth = match &ctx.bearer_token {
            Some(token) => Some(Credentials::Bearer(token.clone())),
            None => ctx.account().credentials.clone(),
        };

        let request = FetchRequest::get(&url)
            .accept(step.content_type.to_string())
            .with_auth(auth);
        let cancellation = ctx.cancellation().clone();
        let Some(body) =
            fetch_until_cancelled(self.fetcher.as_ref(), request, &cancellation).await
        else {
            info!(attempt_id = %ctx.attempt_id(), "Cancelled while fetching");
            return Ok(SubtaskOutcome::Cancelled);
        };
        let body = body?;
        // Cancellation that lands as the response completes still wins
        if cancellation.is_cancelled() {
            return Ok(SubtaskOutcome::Cancelled);
        }

        let file = ctx.temporary_file(extension_for(&step.content_type));
        tokio::fs::create_dir_all(ctx.work_dir()).await?;
        tokio::fs::write(&file, &body).await?;

        info!(
            attempt_id = %ctx.attempt_id(),
            book_id = ctx.book_id(),
            url = %url,
            size = body.len(),
            file = %file.display(),
            "Downloaded content"
        );

        ctx.downloaded_file = Some(file);
        ctx.delivered_type = Some(step.content_type.clone());
        Ok(SubtaskOutcome::Continue)
    }
}

#[async_trait]
impl Subtask for DirectDownload {
    async fn execute(
        self: Box<Self>,
        step: &PathElement,
        ctx: &mut FulfillmentContext,
    ) -> SubtaskOutcome {
        if ctx.is_cancelled() {
            return SubtaskOutcome::Cancelled;
        }
        self.run(step, ctx).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fulfillment::CancellationFlag;
    use crate::worker::http::FetchError;
    use bytes::Bytes;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingFetcher {
        requests: Mutex<Vec<FetchRequest>>,
    }

    #[async_trait]
    impl Fetcher for RecordingFetcher {
        async fn fetch(&self, request: FetchRequest) -> Result<Bytes, FetchError> {
            self.requests.lock().unwrap().push(request);
            Ok(Bytes::from_static(b"PK\x03\x04epub"))
        }
    }

    fn context(dir: &TempDir) -> FulfillmentContext {
        FulfillmentContext::new(
            "book-1",
            Account::anonymous("reader"),
            dir.path().join("downloads"),
            CancellationFlag::new(),
        )
    }

    #[tokio::test]
    async fn test_downloads_from_step_uri() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(RecordingFetcher::default());
        let factory = DirectDownloadFactory::new(fetcher.clone());
        let mut ctx = context(&dir);
        let step = PathElement::new(
            catalog::GENERIC_EPUB.clone(),
            Some("https://example.com/book.epub".to_string()),
        );

        let outcome = factory.create_subtask().execute(&step, &mut ctx).await;

        assert!(matches!(outcome, SubtaskOutcome::Continue));
        let file = ctx.downloaded_file.clone().unwrap();
        assert_eq!(std::fs::read(&file).unwrap(), b"PK\x03\x04epub");
        assert_eq!(ctx.delivered_type, Some(catalog::GENERIC_EPUB.clone()));
        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests[0].url, "https://example.com/book.epub");
        assert!(requests[0].auth.is_none());
    }

    #[tokio::test]
    async fn test_uses_location_and_token_from_context() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(RecordingFetcher::default());
        let factory = DirectDownloadFactory::new(fetcher.clone());
        let mut ctx = context(&dir);
        ctx.current_uri = Some("https://cdn.example/signed.epub".to_string());
        ctx.bearer_token = Some("tok".to_string());

        let step = PathElement::new(catalog::GENERIC_EPUB.clone(), None);
        let outcome = factory.create_subtask().execute(&step, &mut ctx).await;

        assert!(matches!(outcome, SubtaskOutcome::Continue));
        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests[0].url, "https://cdn.example/signed.epub");
        assert_eq!(requests[0].auth, Some(Credentials::Bearer("tok".to_string())));
    }

    #[tokio::test]
    async fn test_missing_uri_fails() {
        let dir = TempDir::new().unwrap();
        let factory = DirectDownloadFactory::new(Arc::new(RecordingFetcher::default()));
        let mut ctx = context(&dir);

        let step = PathElement::new(catalog::GENERIC_PDF.clone(), None);
        let outcome = factory.create_subtask().execute(&step, &mut ctx).await;

        assert!(matches!(
            outcome,
            SubtaskOutcome::Failed(FulfillmentError::MissingInput(_))
        ));
    }

    #[test]
    fn test_does_not_claim_wrapped_types() {
        let factory = DirectDownloadFactory::new(Arc::new(RecordingFetcher::default()));
        assert!(!factory.is_applicable_for(&catalog::ADOBE_ACSM, Some("https://x"), None));
        assert!(!factory.is_applicable_for(&catalog::BEARER_TOKEN, Some("https://x"), None));
        assert!(factory.is_applicable_for(&catalog::GENERIC_PDF, None, None));
    }

    /// Simulates an interrupt arriving while the response is in flight.
    struct CancellingFetcher(CancellationFlag);

    #[async_trait]
    impl Fetcher for CancellingFetcher {
        async fn fetch(&self, _request: FetchRequest) -> Result<Bytes, FetchError> {
            self.0.cancel();
            Ok(Bytes::from_static(b"PK\x03\x04epub"))
        }
    }

    struct StalledFetcher;

    #[async_trait]
    impl Fetcher for StalledFetcher {
        async fn fetch(&self, _request: FetchRequest) -> Result<Bytes, FetchError> {
            std::future::pending().await
        }
    }

    fn epub_step() -> PathElement {
        PathElement::new(
            catalog::GENERIC_EPUB.clone(),
            Some("https://example.com/book.epub".to_string()),
        )
    }

    #[tokio::test]
    async fn test_cancel_during_fetch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let fetcher = Arc::new(CancellingFetcher(ctx.cancellation().clone()));
        let factory = DirectDownloadFactory::new(fetcher);

        let outcome = factory.create_subtask().execute(&epub_step(), &mut ctx).await;

        assert!(matches!(outcome, SubtaskOutcome::Cancelled));
        assert!(ctx.downloaded_file.is_none());
        assert!(ctx.delivered_type.is_none());
        assert!(!dir.path().join("downloads").exists());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_stalled_fetch() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let flag = ctx.cancellation().clone();
        let factory = DirectDownloadFactory::new(Arc::new(StalledFetcher));

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            flag.cancel();
        });

        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            factory.create_subtask().execute(&epub_step(), &mut ctx),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, SubtaskOutcome::Cancelled));
        assert!(ctx.downloaded_file.is_none());
    }
}
