use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use super::models::{Message, Role, Source};
use super::store::{SnapshotCallback, TranscriptStore};
use crate::core::{Listeners, Subscription};

type OwnerKey = (String, String);

pub async fn insert_transcript_message(
    db: &Connection,
    namespace: &str,
    user_id: &str,
    msg: &Message,
) -> Result<Message, Error> {
    // The stored copy gets the server's ID and clock, not the client's
    let stored = Message {
        id: Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        ..msg.clone()
    };
    let ns = namespace.to_owned();
    let uid = user_id.to_owned();
    let id = stored.id.clone();
    let role = stored.role.as_str().to_string();
    let text = stored.text.clone();
    let sources = serde_json::to_string(&stored.sources)?;
    let created_at = stored.timestamp.timestamp_micros();

    db.call(move |conn| {
        let mut stmt = conn.prepare(
            "INSERT INTO transcript_message (id, namespace, user_id, role, text, sources, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        stmt.execute(rusqlite::params![id, ns, uid, role, text, sources, created_at])?;
        Ok(())
    })
    .await?;

    Ok(stored)
}

pub async fn find_transcript(
    db: &Connection,
    namespace: &str,
    user_id: &str,
) -> Result<Vec<Message>, Error> {
    let ns = namespace.to_owned();
    let uid = user_id.to_owned();
    let rows = db
        .call(move |conn| {
            // rowid breaks ties between writes within the same microsecond
            let mut stmt = conn.prepare(
                "SELECT id, role, text, sources, created_at FROM transcript_message
                 WHERE namespace = ?1 AND user_id = ?2
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([ns, uid], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?;

    let messages = rows
        .into_iter()
        .filter_map(|(id, role, text, sources, created_at)| {
            let Some(role) = Role::parse(&role) else {
                tracing::warn!("Skipping transcript message {} with unknown role {}", id, role);
                return None;
            };
            let sources: Vec<Source> = serde_json::from_str(&sources).unwrap_or_default();
            let timestamp = DateTime::from_timestamp_micros(created_at).unwrap_or_default();
            Some(Message {
                id,
                role,
                text,
                sources,
                timestamp,
            })
        })
        .collect();

    Ok(messages)
}

/// Transcript storage in SQLite with live snapshots for subscribers.
#[derive(Clone)]
pub struct SqliteTranscriptStore {
    db: Connection,
    listeners: Arc<Mutex<HashMap<OwnerKey, Listeners<Vec<Message>>>>>,
}

impl SqliteTranscriptStore {
    pub fn new(db: &Connection) -> Self {
        Self {
            db: db.clone(),
            listeners: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn listeners_for(&self, key: &OwnerKey) -> Option<Listeners<Vec<Message>>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    fn subscribe(
        &self,
        namespace: &str,
        user_id: &str,
        callback: SnapshotCallback,
    ) -> Subscription {
        let key = (namespace.to_string(), user_id.to_string());
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();
        let (id, subscription) = listeners.add(callback);

        // Deliver the current transcript to the new subscriber only
        let db = self.db.clone();
        tokio::spawn(async move {
            match find_transcript(&db, &key.0, &key.1).await {
                Ok(snapshot) => {
                    if !listeners.notify_one(id, snapshot) {
                        tracing::debug!("Subscriber left before its first snapshot");
                    }
                }
                Err(e) => tracing::error!("Failed to load transcript for {}: {}", key.1, e),
            }
        });

        subscription
    }

    async fn append(&self, namespace: &str, user_id: &str, message: &Message) -> Result<()> {
        insert_transcript_message(&self.db, namespace, user_id, message).await?;

        let key = (namespace.to_string(), user_id.to_string());
        if let Some(listeners) = self.listeners_for(&key)
            && !listeners.is_empty()
        {
            let snapshot = find_transcript(&self.db, namespace, user_id).await?;
            listeners.notify(snapshot);
        }
        Ok(())
    }
}
