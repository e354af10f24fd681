use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::traits::{FulfillmentError, Subtask, SubtaskFactory, SubtaskOutcome};
use crate::acquisition::PathElement;
use crate::formats::{ContentType, catalog};
use crate::fulfillment::{Account, FulfillmentContext};
use crate::worker::http::{FetchRequest, Fetcher, fetch_until_cancelled};

pub const BEARER_TOKEN_SUBTASK: &str = "bearer-token";

/// Short-lived token document served in place of the content itself
#[derive(Debug, Clone, Deserialize)]
pub struct BearerTokenDocument {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub location: String,
}

/// Exchanges a bearer-token indirection for the real content location.
pub struct BearerTokenFactory {
    fetcher: Arc<dyn Fetcher>,
}

impl BearerTokenFactory {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

impl SubtaskFactory for BearerTokenFactory {
    fn name(&self) -> &str {
        BEARER_TOKEN_SUBTASK
    }

    fn is_applicable_for(
        &self,
        content_type: &ContentType,
        target_uri: Option<&str>,
        _account: Option<&Account>,
    ) -> bool {
        *content_type == *catalog::BEARER_TOKEN && target_uri.is_some()
    }

    fn create_subtask(&self) -> Box<dyn Subtask> {
        Box::new(BearerTokenExchange {
            fetcher: self.fetcher.clone(),
        })
    }
}

struct BearerTokenExchange {
    fetcher: Arc<dyn Fetcher>,
}

impl BearerTokenExchange {
    async fn run(
        &self,
        step: &PathElement,
        ctx: &mut FulfillmentContext,
    ) -> Result<SubtaskOutcome, FulfillmentError> {
        let url = step
            .target_uri
            .as_deref()
            .ok_or_else(|| FulfillmentError::MissingInput("bearer token URI".to_string()))?;

        let request = FetchRequest::get(url)
            .accept(step.content_type.to_string())
            .with_auth(ctx.account().credentials.clone());
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

        let document: BearerTokenDocument = serde_json::from_slice(&body)
            .map_err(|e| FulfillmentError::InvalidContent(format!("bearer token: {}", e)))?;

        if let Some(token_type) = &document.token_type {
            if !token_type.eq_ignore_ascii_case("bearer") {
                return Err(FulfillmentError::InvalidContent(format!(
                    "unexpected token type: {}",
                    token_type
                )));
            }
        }

        debug!(
            attempt_id = %ctx.attempt_id(),
            expires_in = ?document.expires_in,
            "Obtained bearer token"
        );
        info!(attempt_id = %ctx.attempt_id(), location = %document.location, "Following bearer token");

        ctx.bearer_token = Some(document.access_token);
        ctx.current_uri = Some(document.location);
        Ok(SubtaskOutcome::Continue)
    }
}

#[async_trait]
impl Subtask for BearerTokenExchange {
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
