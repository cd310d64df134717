use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::models::Message;
use crate::core::Subscription;

pub type SnapshotCallback = Arc<dyn Fn(Vec<Message>) + Send + Sync>;

/// Durable, append-only transcript storage keyed by an application
/// namespace and a user ID.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Watch the transcript for `user_id`. The callback receives the
    /// complete transcript in ascending server-timestamp order, once
    /// shortly after subscribing and again after every change.
    fn subscribe(&self, namespace: &str, user_id: &str, callback: SnapshotCallback)
    -> Subscription;

    /// Append a copy of `message`. The store assigns its own ID and
    /// timestamp.
    async fn append(&self, namespace: &str, user_id: &str, message: &Message) -> Result<()>;
}
