//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Portal configuration, read from `STAFF_PORTAL_*` environment variables.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// libSQL database file.
    pub db_path: PathBuf,
    /// Directory uploaded documents are written to.
    pub upload_dir: PathBuf,
    /// Base URL uploaded documents are served from.
    pub public_url: String,
    /// HTTP port for the onboarding API.
    pub port: u16,
    /// Provider id stamped on every onboarding record.
    pub provider_id: String,
    /// In-memory sessions untouched this long are dropped.
    pub session_idle: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/staff-portal.db"),
            upload_dir: PathBuf::from("./data/uploads"),
            public_url: "http://localhost:8080/files".to_string(),
            port: 8080,
            provider_id: "zense".to_string(),
            session_idle: Duration::from_secs(30 * 60),
        }
    }
}

impl PortalConfig {
    /// Load from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("STAFF_PORTAL_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "STAFF_PORTAL_PORT".to_string(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => defaults.port,
        };

        let provider_id = lookup("STAFF_PORTAL_PROVIDER_ID")
            .map(|s| s.trim().to_string())
            .unwrap_or(defaults.provider_id);
        if provider_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "STAFF_PORTAL_PROVIDER_ID".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let session_idle = match lookup("STAFF_PORTAL_SESSION_IDLE_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(|e| {
                ConfigError::InvalidValue {
                    key: "STAFF_PORTAL_SESSION_IDLE_SECS".to_string(),
                    message: format!("{raw:?}: {e}"),
                }
            })?),
            None => defaults.session_idle,
        };

        Ok(Self {
            db_path: lookup("STAFF_PORTAL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            upload_dir: lookup("STAFF_PORTAL_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            public_url: lookup("STAFF_PORTAL_PUBLIC_URL").unwrap_or(defaults.public_url),
            port,
            provider_id,
            session_idle,
        })
    }
}
