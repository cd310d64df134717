use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use super::{AuthError, IdentityObserver, User, UserCallback};
use crate::core::{Listeners, Subscription};

pub const MIN_PASSWORD_LEN: usize = 6;

fn password_hash(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AuthError::InvalidEmail(email)),
    }
}

/// Email and password accounts stored next to the transcripts. Holds
/// the signed-in user for this process.
pub struct LocalIdentity {
    db: Connection,
    current: Mutex<Option<User>>,
    listeners: Listeners<Option<User>>,
}

impl LocalIdentity {
    pub fn new(db: &Connection) -> Self {
        Self {
            db: db.clone(),
            current: Mutex::new(None),
            listeners: Listeners::new(),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Create an account and sign in as it.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let uid = Uuid::new_v4().to_string();
        let salt = Uuid::new_v4().to_string();
        let hash = password_hash(&salt, password);

        let (id, email_owned) = (uid.clone(), email.clone());
        let inserted = self
            .db
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT OR IGNORE INTO user_account (id, email, salt, password_hash) VALUES (?, ?, ?, ?)",
                    [id, email_owned, salt, hash],
                )?;
                Ok(changed > 0)
            })
            .await?;

        if !inserted {
            return Err(AuthError::EmailInUse(email));
        }

        tracing::info!("Registered user {}", uid);
        let user = User {
            uid,
            email: Some(email),
        };
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;

        let email_owned = email.clone();
        let account = self
            .db
            .call(move |conn| {
                let mut stmt = conn
                    .prepare("SELECT id, salt, password_hash FROM user_account WHERE email = ?")?;
                let mut rows = stmt.query_map([email_owned], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?;
                Ok(rows.next().transpose()?)
            })
            .await?;

        let Some((uid, salt, hash)) = account else {
            return Err(AuthError::InvalidCredentials);
        };
        if password_hash(&salt, password) != hash {
            return Err(AuthError::InvalidCredentials);
        }

        tracing::debug!("Signed in user {}", uid);
        let user = User {
            uid,
            email: Some(email),
        };
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    fn set_current(&self, user: Option<User>) {
        let changed = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            let changed = *current != user;
            *current = user.clone();
            changed
        };
        if changed {
            self.listeners.notify(user);
        }
    }
}

#[async_trait]
impl IdentityObserver for LocalIdentity {
    fn on_change(&self, callback: UserCallback) -> Subscription {
        let (id, subscription) = self.listeners.add(callback);
        self.listeners.notify_one(id, self.current_user());
        subscription
    }

    async fn sign_out(&self) -> Result<()> {
        self.set_current(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::memory_db;
    use std::sync::Arc;

    async fn identity() -> LocalIdentity {
        LocalIdentity::new(&memory_db().await.unwrap())
    }

    fn recorder() -> (Arc<Mutex<Vec<Option<User>>>>, UserCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Arc::new(move |u| sink.lock().unwrap().push(u)))
    }

    #[tokio::test]
    async fn test_sign_up_signs_in() {
        let identity = identity().await;
        let user = identity.sign_up(" Ada@Example.com ", "secret1").await.unwrap();

        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(identity.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_sign_up_rejects_duplicate_email() {
        let identity = identity().await;
        identity.sign_up("ada@example.com", "secret1").await.unwrap();

        let err = identity
            .sign_up("ADA@example.com", "another1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailInUse(_)));
    }

    #[tokio::test]
    async fn test_sign_up_validates_input() {
        let identity = identity().await;

        let err = identity.sign_up("ada@example.com", "12345").await.unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(6)));

        let err = identity.sign_up("not-an-email", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
        assert!(identity.current_user().is_none());
    }

    #[tokio::test]
    async fn test_sign_in() {
        let identity = identity().await;
        let registered = identity.sign_up("ada@example.com", "secret1").await.unwrap();
        identity.sign_out().await.unwrap();

        let err = identity.sign_in("ada@example.com", "wrong-pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        let err = identity.sign_in("nobody@example.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(identity.current_user().is_none());

        let user = identity.sign_in("ada@example.com", "secret1").await.unwrap();
        assert_eq!(user.uid, registered.uid);
    }

    #[tokio::test]
    async fn test_on_change_delivers_current_then_changes() {
        let identity = identity().await;
        let (seen, callback) = recorder();
        let _sub = identity.on_change(callback);

        let user = identity.sign_up("ada@example.com", "secret1").await.unwrap();
        identity.sign_out().await.unwrap();
        // Signing out twice isn't a change
        identity.sign_out().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![None, Some(user), None]);
    }

    #[tokio::test]
    async fn test_password_is_not_stored_in_plain_text() {
        let db = memory_db().await.unwrap();
        let identity = LocalIdentity::new(&db);
        identity.sign_up("ada@example.com", "secret1").await.unwrap();

        let stored: String = db
            .call(|conn| {
                Ok(conn.query_row("SELECT password_hash FROM user_account", [], |row| {
                    row.get(0)
                })?)
            })
            .await
            .unwrap();
        assert_ne!(stored, "secret1");
        assert_eq!(stored.len(), 64);
    }
}
