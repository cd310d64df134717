//! The study chat: message model, transcript persistence and the
//! controller that ties identity, storage and the model together.

pub mod controller;
pub use controller::{ControllerBuilder, ConversationController};

pub mod db;
pub use db::SqliteTranscriptStore;

pub mod models;
pub use models::{Message, Phase, Role, Session, Source};

pub mod store;
pub use store::{SnapshotCallback, TranscriptStore};
