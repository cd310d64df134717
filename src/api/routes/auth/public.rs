//! Public types for the login and registration pages
use serde::{Deserialize, Serialize};

pub const LOGIN_FAILED: &str = "Invalid email or password";
pub const REGISTRATION_FAILED: &str = "Registration failed. Try a different email.";

#[derive(Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Default)]
pub struct AuthPage {
    pub error: Option<&'static str>,
    pub email: String,
}
