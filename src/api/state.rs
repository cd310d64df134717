use std::sync::Arc;

use handlebars::Handlebars;
use tokio_rusqlite::Connection;

use super::templates::templates;
use crate::chat::{ControllerBuilder, ConversationController, SqliteTranscriptStore};
use crate::core::AppConfig;
use crate::gemini::GeminiClient;
use crate::identity::LocalIdentity;

/// Everything a session of the tutor needs, wired together from the
/// config. Shared by the web server and the terminal chat.
pub struct AppState {
    pub db: Connection,
    pub config: AppConfig,
    pub identity: Arc<LocalIdentity>,
    pub controller: ConversationController,
    pub templates: Handlebars<'static>,
}

impl AppState {
    /// Must be called from within a tokio runtime.
    pub fn new(db: Connection, config: AppConfig) -> Self {
        if config.gemini_api_key.is_empty() {
            tracing::warn!("GEMINI_API_KEY is not set, every question will fail");
        }

        let identity = Arc::new(LocalIdentity::new(&db));
        let store = Arc::new(SqliteTranscriptStore::new(&db));
        let gateway = Arc::new(GeminiClient::new(
            &config.gemini_api_hostname,
            &config.gemini_api_key,
            &config.gemini_model,
        ));
        let controller = ControllerBuilder::new(identity.clone(), store, gateway)
            .namespace(&config.app_id)
            .system_instruction(&config.system_instruction)
            .build();

        Self {
            db,
            config,
            identity,
            controller,
            templates: templates(),
        }
    }
}
