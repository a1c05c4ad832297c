use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::schedule::ConflictPolicy;
use crate::session::AdminSecret;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub anon_key: Option<String>,
    /// Argon2id PHC string for the administrator password
    #[serde(default)]
    pub admin_password_hash: Option<String>,
    /// Plain shared secret, only read from the environment
    #[serde(skip)]
    pub admin_password: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_true")]
    pub check_conflicts_on_form_create: bool,
    #[serde(default)]
    pub check_conflicts_on_update: bool,
    #[serde(default = "default_true")]
    pub confirm_discard: bool,
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_session_ttl_hours() -> i64 {
    8
}

const MAX_SESSION_TTL_HOURS: i64 = 24 * 7;

fn default_true() -> bool {
    true
}

fn default_font_scale() -> f32 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            anon_key: None,
            admin_password_hash: None,
            admin_password: None,
            request_timeout_secs: default_request_timeout_secs(),
            session_ttl_hours: default_session_ttl_hours(),
            check_conflicts_on_form_create: true,
            check_conflicts_on_update: false,
            confirm_discard: true,
            font_scale: 1.0,
        }
    }
}

impl Config {
    /// Load the saved config (or defaults), then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .context("Failed to read config file")?;
            serde_json::from_str(&contents)
                .context("Failed to parse config file")
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("SUPABASE_URL") {
            self.supabase_url = url;
        }
        if let Some(key) = var("SUPABASE_ANON_KEY") {
            self.anon_key = Some(key);
        }
        if let Some(hash) = var("ADMIN_PASSWORD_HASH") {
            self.admin_password_hash = Some(hash);
        }
        if let Some(password) = var("ADMIN_PASSWORD") {
            self.admin_password = Some(password);
        }
        if let Some(secs) = var("TIMETABLE_REQUEST_TIMEOUT_SECS").and_then(|s| s.trim().parse().ok()) {
            self.request_timeout_secs = secs;
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.trim().is_empty() && self.anon_key.is_some()
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.json"))
    }

    pub fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("org", "escola", "timetable")
            .context("Could not determine config directory")
    }

    pub fn base_url(&self) -> String {
        // Clean up the project URL - keep an explicit scheme, drop trailing slashes and paths
        let url = self.supabase_url.trim();
        let (scheme, rest) = match url.strip_prefix("http://") {
            Some(rest) => ("http", rest),
            None => ("https", url.strip_prefix("https://").unwrap_or(url)),
        };
        let host = rest
            .trim_end_matches('/')
            .split('/')
            .next()
            .unwrap_or(rest);

        format!("{}://{}/rest/v1", scheme, host)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Between one hour and one week
    pub fn session_ttl(&self) -> chrono::Duration {
        let hours = self.session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS);
        chrono::Duration::try_hours(hours).unwrap_or_else(|| chrono::Duration::hours(default_session_ttl_hours()))
    }

    /// The hash wins over a plain secret when both are set
    pub fn admin_secret(&self) -> Option<AdminSecret> {
        if let Some(hash) = &self.admin_password_hash {
            return Some(AdminSecret::Hash(hash.clone()));
        }
        self.admin_password.clone().map(AdminSecret::Plain)
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        ConflictPolicy {
            check_form_creates: self.check_conflicts_on_form_create,
            check_updates: self.check_conflicts_on_update,
        }
    }
}
