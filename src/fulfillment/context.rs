use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::formats::ContentType;

/// Credentials carried with an account
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
    Bearer(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// Account on whose behalf a book is fulfilled. Passed through untouched
/// to subtask factories and subtasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub provider: Option<String>,
    pub credentials: Option<Credentials>,
}

impl Account {
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: None,
            credentials: None,
        }
    }
}

/// Cooperative cancellation signal shared between a caller and one attempt.
#[derive(Debug, Clone)]
pub struct CancellationFlag(Arc<watch::Sender<bool>>);

impl Default for CancellationFlag {
    fn default() -> Self {
        let (sender, _) = watch::channel(false);
        Self(Arc::new(sender))
    }
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once `cancel` has been called, immediately if it already was.
    pub async fn cancelled(&self) {
        let mut receiver = self.0.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

/// State shared by the subtasks of a single fulfillment attempt.
///
/// Owned by exactly one running attempt; subtasks borrow it mutably one at a
/// time, so later steps read what earlier steps left behind.
#[derive(Debug)]
pub struct FulfillmentContext {
    attempt_id: Uuid,
    book_id: String,
    account: Account,
    work_dir: PathBuf,
    cancellation: CancellationFlag,
    temp_files: u32,
    /// Where the next step should fetch from when its path element has no URI
    pub current_uri: Option<String>,
    pub bearer_token: Option<String>,
    pub downloaded_file: Option<PathBuf>,
    pub delivered_type: Option<ContentType>,
    /// DRM tokens and other partial results keyed by subtask-defined names
    pub extras: BTreeMap<String, String>,
}

impl FulfillmentContext {
    pub fn new(
        book_id: impl Into<String>,
        account: Account,
        work_dir: impl Into<PathBuf>,
        cancellation: CancellationFlag,
    ) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            book_id: book_id.into(),
            account,
            work_dir: work_dir.into(),
            cancellation,
            temp_files: 0,
            current_uri: None,
            bearer_token: None,
            downloaded_file: None,
            delivered_type: None,
            extras: BTreeMap::new(),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    /// A fresh, attempt-unique file path inside the working directory.
    pub fn temporary_file(&mut self, extension: &str) -> PathBuf {
        self.temp_files += 1;
        self.work_dir.join(format!(
            "{}-{}.{}",
            self.attempt_id, self.temp_files, extension
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_files_are_unique() {
        let mut ctx = FulfillmentContext::new(
            "urn:isbn:9780000000001",
            Account::anonymous("reader"),
            "/tmp/books",
            CancellationFlag::new(),
        );
        let first = ctx.temporary_file("epub");
        let second = ctx.temporary_file("epub");

        assert_ne!(first, second);
        assert!(first.starts_with("/tmp/books"));
        assert!(first.to_string_lossy().ends_with(".epub"));
    }

    #[test]
    fn test_cancellation_is_shared() {
        let flag = CancellationFlag::new();
        let ctx = FulfillmentContext::new(
            "book",
            Account::anonymous("reader"),
            "/tmp",
            flag.clone(),
        );
        assert!(!ctx.is_cancelled());
        flag.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let basic = Credentials::Basic {
            username: "patron".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", basic);
        assert!(rendered.contains("patron"));
        assert!(!rendered.contains("hunter2"));
        assert!(!format!("{:?}", Credentials::Bearer("s3cret".into())).contains("s3cret"));
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let flag = CancellationFlag::new();
        let waiter = tokio::spawn({
            let flag = flag.clone();
            async move { flag.cancelled().await }
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        flag.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        // Already cancelled: resolves without waiting
        flag.cancelled().await;
    }
}
