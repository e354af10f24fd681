//! Runs each fulfillment on its own worker task

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, info_span};

use crate::acquisition::Acquisition;
use crate::fulfillment::{FulfillError, Fulfiller, Fulfillment, FulfillmentRequest};

/// Spawn a fulfillment onto a dedicated tokio task. Steps inside it still run
/// one after another; separate books run concurrently.
pub fn spawn_fulfillment(
    fulfiller: Arc<Fulfiller>,
    acquisitions: Vec<Acquisition>,
    request: FulfillmentRequest,
) -> JoinHandle<Result<Fulfillment, FulfillError>> {
    let span = info_span!("fulfillment", book_id = %request.book_id);
    tokio::spawn(
        async move { fulfiller.fulfill(&acquisitions, &request).await }.instrument(span),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{AcquisitionRelation, Linearizer, PathElement, PathSelector};
    use crate::formats::{Capabilities, ContentType, FormatSupport, catalog};
    use crate::fulfillment::{Account, FulfillmentContext, FulfillmentOutcome};
    use crate::observability::Metrics;
    use crate::subtasks::{Subtask, SubtaskDirectory, SubtaskFactory, SubtaskOutcome};
    use async_trait::async_trait;

    struct Stamp;

    #[async_trait]
    impl Subtask for Stamp {
        async fn execute(
            self: Box<Self>,
            step: &PathElement,
            ctx: &mut FulfillmentContext,
        ) -> SubtaskOutcome {
            tokio::task::yield_now().await;
            ctx.delivered_type = Some(step.content_type.clone());
            let book = ctx.book_id().to_string();
            ctx.extras.insert("book".to_string(), book);
            SubtaskOutcome::Continue
        }
    }

    struct StampFactory;

    impl SubtaskFactory for StampFactory {
        fn name(&self) -> &str {
            "stamp"
        }

        fn is_applicable_for(
            &self,
            _content_type: &ContentType,
            _target_uri: Option<&str>,
            _account: Option<&Account>,
        ) -> bool {
            true
        }

        fn create_subtask(&self) -> Box<dyn Subtask> {
            Box::new(Stamp)
        }
    }

    #[tokio::test]
    async fn test_concurrent_books_keep_separate_contexts() {
        let mut directory = SubtaskDirectory::new();
        directory.register(Arc::new(StampFactory));
        let fulfiller = Arc::new(Fulfiller::new(
            PathSelector::new(Linearizer::default(), FormatSupport::new(Capabilities::default())),
            Arc::new(directory),
            Arc::new(Metrics::new()),
        ));

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let acquisition = Acquisition {
                    relation: AcquisitionRelation::OpenAccess,
                    target_uri: format!("https://example.com/{}.epub", n),
                    content_type: catalog::GENERIC_EPUB.clone(),
                    indirect: vec![],
                };
                let request = FulfillmentRequest::new(
                    format!("book-{}", n),
                    Account::anonymous("reader"),
                    "/tmp/opds-fulfill",
                );
                spawn_fulfillment(fulfiller.clone(), vec![acquisition], request)
            })
            .collect();

        for (n, handle) in handles.into_iter().enumerate() {
            let fulfillment = handle.await.unwrap().unwrap();
            assert!(matches!(fulfillment.report.outcome, FulfillmentOutcome::Succeeded));
            assert_eq!(fulfillment.context.extras["book"], format!("book-{}", n));
        }
        assert_eq!(fulfiller.metrics().snapshot().succeeded, 4);
    }
}
