//! Who is using the tutor. The conversation only ever sees the
//! `IdentityObserver` seam; `LocalIdentity` is the account store the
//! app ships with.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::Subscription;

mod error;
pub use error::AuthError;

mod local;
pub use local::LocalIdentity;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
}

pub type UserCallback = Arc<dyn Fn(Option<User>) + Send + Sync>;

#[async_trait]
pub trait IdentityObserver: Send + Sync {
    /// Register for current-user changes. `None` means nobody is
    /// signed in. The current state is always delivered first.
    fn on_change(&self, callback: UserCallback) -> Subscription;

    async fn sign_out(&self) -> Result<()>;
}
