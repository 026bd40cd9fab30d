//! Who is using voxclone. The lifecycle only ever reads an
//! `Option<Identity>`; signing in and out happens here.

pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::LocalAuth;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Password should be at least {minimum} characters")]
    WeakPassword { minimum: usize },

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Authentication storage failed: {0}")]
    Storage(String),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The signed-in identity, if any.
    async fn current_identity(&self) -> Option<Identity>;

    /// Register and sign in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}
