//! The core models for a study conversation.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::gemini::Source;
use crate::gemini::Reply;
use crate::identity::User;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    // Stored transcripts use the model's own name for its turns
    #[serde(rename = "model", alias = "assistant")]
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "model" | "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// A locally generated message with a fresh ID and the client's
    /// clock as timestamp.
    pub fn new(role: Role, text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.to_string(),
            sources: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn from_reply(reply: Reply) -> Self {
        Self {
            sources: reply.sources,
            ..Self::new(Role::Assistant, &reply.text)
        }
    }
}

/// Where the conversation is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    /// No identity notification received yet
    #[default]
    NotReady,
    /// No user, the transcript only lives in memory
    Guest,
    Authenticated(User),
}

impl Phase {
    pub fn user(&self) -> Option<&User> {
        match self {
            Phase::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Derived view of the phase. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub current_user: Option<User>,
    pub is_ready: bool,
}

impl From<&Phase> for Session {
    fn from(phase: &Phase) -> Self {
        Self {
            current_user: phase.user().cloned(),
            is_ready: *phase != Phase::NotReady,
        }
    }
}
