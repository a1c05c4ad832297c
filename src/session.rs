//! Administrator session: who may edit the timetable, and until when.
//!
//! The shared secret is checked locally (the backend has no auth endpoint).
//! The resulting privilege is an expiring [`Session`] handed to the editor.

use anyhow::{Context, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Viewer,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::viewer()
    }
}

impl Session {
    pub fn viewer() -> Self {
        Self {
            role: Role::Viewer,
            issued_at: Utc::now(),
            expires_at: None,
        }
    }

    /// An expiry past the representable range leaves the session already expired
    pub fn admin(ttl: chrono::Duration) -> Self {
        let issued_at = Utc::now();
        Self {
            role: Role::Admin,
            issued_at,
            expires_at: Some(issued_at.checked_add_signed(ttl).unwrap_or(issued_at)),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn is_admin_at(&self, now: DateTime<Utc>) -> bool {
        self.role == Role::Admin && !self.is_expired_at(now)
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin_at(Utc::now())
    }
}

/// The configured administrator credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminSecret {
    /// Argon2id PHC string
    Hash(String),
    Plain(String),
}

/// Hash a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Exchange the administrator password for an admin session
pub fn login(password: &str, secret: Option<&AdminSecret>, ttl: chrono::Duration) -> Result<Session, AppError> {
    let accepted = match secret {
        None => {
            tracing::warn!("login attempted but no administrator password is configured");
            false
        }
        Some(AdminSecret::Plain(expected)) => !expected.is_empty() && password == expected,
        Some(AdminSecret::Hash(hash)) => verify_password(password, hash).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "configured admin password hash is invalid");
            false
        }),
    };

    if accepted {
        tracing::info!("administrator logged in");
        Ok(Session::admin(ttl))
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Persists the session between runs
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Result<Self> {
        let dirs = Config::project_dirs()?;
        Ok(Self::new(dirs.data_local_dir().join("session.json")))
    }

    /// Saved session, or a viewer session when it is missing, unreadable or expired
    pub fn load(&self) -> Session {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return Session::viewer();
        };
        match serde_json::from_str::<Session>(&contents) {
            Ok(session) if !session.is_expired_at(Utc::now()) => session,
            Ok(_) => {
                tracing::info!("stored session expired");
                self.clear();
                Session::viewer()
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable session file");
                self.clear();
                Session::viewer()
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, contents).context("Failed to write session file")?;
        Ok(())
    }

    pub fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(error = %e, "could not remove session file");
            }
        }
    }
}
