use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::{AuthError, AuthProvider, Identity};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    id: String,
    email: String,
    salt: String,
    password_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionFile {
    user_id: Option<String>,
}

/// Accounts and the current session kept as JSON files in a data directory.
pub struct LocalAuth {
    accounts_path: PathBuf,
    session_path: PathBuf,
    // Serializes read-modify-write of the accounts file within a process.
    lock: Mutex<()>,
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn storage_err(e: impl std::fmt::Display) -> AuthError {
    AuthError::Storage(e.to_string())
}

impl LocalAuth {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            accounts_path: data_dir.join("accounts.json"),
            session_path: data_dir.join("session.json"),
            lock: Mutex::new(()),
        }
    }

    fn load_accounts(&self) -> Result<Vec<Account>, AuthError> {
        if !self.accounts_path.exists() {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(&self.accounts_path).map_err(storage_err)?;
        serde_json::from_str(&json).map_err(storage_err)
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let json = serde_json::to_string_pretty(value).map_err(storage_err)?;
        fs::write(path, json).map_err(storage_err)
    }

    fn load_session(&self) -> SessionFile {
        fs::read_to_string(&self.session_path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    fn start_session(&self, account: &Account) -> Result<Identity, AuthError> {
        Self::write_json(
            &self.session_path,
            &SessionFile {
                user_id: Some(account.id.clone()),
            },
        )?;
        Ok(identity(account))
    }
}

fn identity(account: &Account) -> Identity {
    Identity {
        id: account.id.clone(),
        email: Some(account.email.clone()),
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    async fn current_identity(&self) -> Option<Identity> {
        let user_id = self.load_session().user_id?;
        let accounts = self.load_accounts().ok()?;
        accounts.iter().find(|a| a.id == user_id).map(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email);
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                minimum: MIN_PASSWORD_LEN,
            });
        }

        let _guard = self.lock.lock().unwrap();
        let mut accounts = self.load_accounts()?;
        if accounts.iter().any(|a| a.email == email) {
            return Err(AuthError::AlreadyRegistered);
        }

        let salt = Uuid::new_v4().to_string();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            password_hash: hash_password(&salt, password),
            salt,
            email,
        };
        accounts.push(account.clone());
        Self::write_json(&self.accounts_path, &accounts)?;
        info!(user_id = %account.id, "account created");

        self.start_session(&account)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email);
        let accounts = self.load_accounts()?;
        let account = accounts
            .iter()
            .find(|a| a.email == email)
            .filter(|a| a.password_hash == hash_password(&a.salt, password))
            .ok_or(AuthError::InvalidCredentials)?;

        info!(user_id = %account.id, "signed in");
        self.start_session(account)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Self::write_json(&self.session_path, &SessionFile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn sign_up_sign_out_sign_in() {
        let temp_dir = TempDir::new().unwrap();
        let auth = LocalAuth::new(temp_dir.path());
        assert_eq!(auth.current_identity().await, None);

        let created = auth.sign_up("Ada@Example.com", "hunter22").await.unwrap();
        assert_eq!(created.email.as_deref(), Some("ada@example.com"));
        assert_eq!(auth.current_identity().await, Some(created.clone()));

        auth.sign_out().await.unwrap();
        assert_eq!(auth.current_identity().await, None);

        let signed_in = auth.sign_in("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(signed_in.id, created.id);
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let temp_dir = TempDir::new().unwrap();
        let auth = LocalAuth::new(temp_dir.path());

        assert_eq!(
            auth.sign_up("not-an-email", "hunter22").await,
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(
            auth.sign_up("ada@example.com", "123").await,
            Err(AuthError::WeakPassword { minimum: 6 })
        );

        auth.sign_up("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(
            auth.sign_up("ada@example.com", "hunter22").await,
            Err(AuthError::AlreadyRegistered)
        );
        assert_eq!(
            auth.sign_in("ada@example.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            auth.sign_in("nobody@example.com", "hunter22").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn password_hash_is_salted() {
        assert_ne!(hash_password("a", "secret"), hash_password("b", "secret"));
        assert_eq!(hash_password("a", "secret").len(), 64);
    }
}
