pub mod config;
pub use config::AppConfig;

pub mod db;

pub mod subscription;
pub use subscription::{Listeners, Subscription};
