//! Public types for the chat page
use serde::{Deserialize, Serialize};

use crate::chat::{Message, Session};
use crate::render::{NodeView, format_text};

/// Sources shown under a single reply
pub const MAX_SOURCES_SHOWN: usize = 3;

#[derive(Deserialize)]
pub struct ChatForm {
    pub text: String,
}

#[derive(Serialize)]
pub struct SourceView {
    pub uri: String,
    pub title: Option<String>,
}

#[derive(Serialize)]
pub struct MessageView {
    pub role: &'static str,
    pub nodes: Vec<NodeView>,
    pub sources: Vec<SourceView>,
    pub latest: bool,
}

#[derive(Serialize)]
pub struct ChatPage {
    pub ready: bool,
    pub guest: bool,
    pub user_label: Option<String>,
    pub persistence_failed: bool,
    pub empty: bool,
    pub loading: bool,
    pub draft: String,
    pub messages: Vec<MessageView>,
}

impl ChatPage {
    pub fn new(
        session: &Session,
        messages: &[Message],
        loading: bool,
        persistence_failed: bool,
        draft: String,
    ) -> Self {
        let last = messages.len().saturating_sub(1);
        let messages = messages
            .iter()
            .enumerate()
            .map(|(idx, msg)| MessageView {
                role: msg.role.as_str(),
                nodes: format_text(&msg.text).iter().map(NodeView::from).collect(),
                sources: msg
                    .sources
                    .iter()
                    .take(MAX_SOURCES_SHOWN)
                    .map(|s| SourceView {
                        uri: s.uri.clone(),
                        title: s.title.clone(),
                    })
                    .collect(),
                latest: idx == last,
            })
            .collect::<Vec<_>>();

        let user_label = session
            .current_user
            .as_ref()
            .map(|u| u.email.clone().unwrap_or_else(|| "User".to_string()));

        Self {
            ready: session.is_ready,
            guest: session.is_ready && session.current_user.is_none(),
            user_label,
            persistence_failed,
            empty: messages.is_empty(),
            loading,
            draft,
            messages,
        }
    }
}
