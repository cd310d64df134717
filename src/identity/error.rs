use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email already registered: {0}")]
    EmailInUse(String),

    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("storage error: {0}")]
    Storage(#[from] tokio_rusqlite::Error),
}
