use std::env;

pub const DEFAULT_GEMINI_API_HOSTNAME: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-05-20";
pub const DEFAULT_APP_ID: &str = "study-tutor-app";
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a world-class, supportive, and knowledgeable **educational assistant (Gemini Study Tutor)**. You are limited to academic and study topics only (science, history, coding, literature, etc.). Decline politely if asked anything non-academic.";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub db_path: String,
    pub gemini_api_hostname: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Namespace every transcript is keyed under, alongside the user ID
    pub app_id: String,
    pub system_instruction: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("STUDY_TUTOR_STORAGE_PATH").unwrap_or("./".to_string());
        let db_path = format!("{}/study_tutor.db", storage_path.trim_end_matches('/'));
        let gemini_api_hostname = env::var("STUDY_TUTOR_GEMINI_HOST")
            .unwrap_or_else(|_| DEFAULT_GEMINI_API_HOSTNAME.to_string());
        let gemini_api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        let gemini_model = env::var("STUDY_TUTOR_GEMINI_MODEL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        let app_id = env::var("STUDY_TUTOR_APP_ID").unwrap_or_else(|_| DEFAULT_APP_ID.to_string());
        let system_instruction = env::var("STUDY_TUTOR_SYSTEM_INSTRUCTION")
            .unwrap_or_else(|_| DEFAULT_SYSTEM_INSTRUCTION.to_string());

        Self {
            storage_path,
            db_path,
            gemini_api_hostname,
            gemini_api_key,
            gemini_model,
            app_id,
            system_instruction,
        }
    }
}
