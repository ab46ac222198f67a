//! Identity gateway: credential verification and user-record provisioning.
//!
//! The relay only consumes the [`IdentityGateway`] capability; password
//! hashing and record storage live behind it. [`MemoryUserDirectory`] is the
//! in-process implementation, holding the same record shape the external
//! directory persists (email, bcrypt hash, name, high score, reset-token
//! fields).

use async_trait::async_trait;
use log::info;
use std::collections::HashMap;
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::RwLock;

/// Shown to the client when the email exists but the password is wrong.
pub const REJECTED_PASSWORD_MESSAGE: &str = "account already registered, incorrect password";

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// Result of a login attempt against the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Record exists and the password matched.
    Authenticated,
    /// No record existed; one was created with the supplied fields.
    Created,
    /// Record exists but the password did not match. The string is safe to
    /// show to the user.
    Rejected(String),
}

impl LoginOutcome {
    /// Whether this outcome admits the connection to gameplay.
    pub fn is_admitted(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated | LoginOutcome::Created)
    }
}

/// Capability the relay consumes. The directory round trip is the relay's
/// only suspension point, so implementations must not block the runtime
/// beyond their own I/O.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Verifies credentials for a known email, or creates a record for an
    /// unknown one.
    async fn verify_or_create(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<LoginOutcome, DirectoryError>;

    /// Records a high score if it beats the stored one. Unknown emails are
    /// ignored.
    async fn record_high_score(&self, email: &str, score: u32) -> Result<(), DirectoryError>;
}

/// One stored user, mirroring the external directory's schema. The reset
/// token fields are managed by the password-reset flow, which lives outside
/// the relay; they are carried here so records round-trip intact.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub high_score: u32,
    pub reset_token: Option<String>,
    pub reset_token_exp: Option<SystemTime>,
}

/// In-process user directory keyed by email.
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
    cost: u32,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }

    /// Lower costs are for tests; production uses the bcrypt default.
    pub fn with_cost(cost: u32) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            cost,
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn find(&self, email: &str) -> Option<UserRecord> {
        self.users.read().await.get(email).cloned()
    }
}

impl Default for MemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityGateway for MemoryUserDirectory {
    async fn verify_or_create(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<LoginOutcome, DirectoryError> {
        // Write lock for the whole lookup-or-insert keeps emails unique
        // under concurrent first-time logins.
        let mut users = self.users.write().await;

        if let Some(record) = users.get(email) {
            return if bcrypt::verify(password, &record.password_hash)? {
                Ok(LoginOutcome::Authenticated)
            } else {
                Ok(LoginOutcome::Rejected(REJECTED_PASSWORD_MESSAGE.to_string()))
            };
        }

        let record = UserRecord {
            email: email.to_string(),
            password_hash: bcrypt::hash(password, self.cost)?,
            name: name.to_string(),
            high_score: 0,
            reset_token: None,
            reset_token_exp: None,
        };
        users.insert(email.to_string(), record);
        info!("created user record for {}", email);
        Ok(LoginOutcome::Created)
    }

    async fn record_high_score(&self, email: &str, score: u32) -> Result<(), DirectoryError> {
        let mut users = self.users.write().await;
        if let Some(record) = users.get_mut(email) {
            if score > record.high_score {
                record.high_score = score;
            }
        }
        Ok(())
    }
}
