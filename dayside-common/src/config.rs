//! Configuration loading and backend endpoint resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Resolved backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the remote datastore REST endpoint.
    pub store_url: String,
    /// API key sent with every datastore request.
    pub store_key: String,
    /// Base URL of the task-creation API, when one is configured.
    pub task_api_url: Option<String>,
}

/// Raw TOML config file contents (`[backend]` table).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub backend: TomlBackend,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlBackend {
    pub store_url: Option<String>,
    pub store_key: Option<String>,
    pub task_api_url: Option<String>,
}

/// Explicit overrides, e.g. from command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub store_url: Option<String>,
    pub store_key: Option<String>,
    pub task_api_url: Option<String>,
}

/// Environment variable names consulted during resolution.
pub const ENV_STORE_URL: &str = "DAYSIDE_STORE_URL";
pub const ENV_STORE_KEY: &str = "DAYSIDE_STORE_KEY";
pub const ENV_TASK_API_URL: &str = "DAYSIDE_TASK_API_URL";

/// Resolve backend configuration following the priority order:
/// 1. Explicit override (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. None (an error for required settings, absent for optional ones)
pub fn resolve(overrides: &ConfigOverrides) -> Result<BackendConfig> {
    let file = load_config_file()
        .and_then(|path| {
            std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))
        })
        .and_then(|text| {
            toml::from_str::<TomlConfig>(&text)
                .map_err(|e| Error::Config(format!("invalid config file: {e}")))
        })
        .map(|c| c.backend)
        .unwrap_or_else(|e| {
            tracing::debug!(error = %e, "no usable config file, continuing without one");
            TomlBackend::default()
        });

    let store_url = resolve_setting(
        overrides.store_url.as_deref(),
        ENV_STORE_URL,
        file.store_url.as_deref(),
    )
    .ok_or_else(|| Error::Config("datastore URL is not configured".to_string()))?;

    let store_key = resolve_setting(
        overrides.store_key.as_deref(),
        ENV_STORE_KEY,
        file.store_key.as_deref(),
    )
    .ok_or_else(|| Error::Config("datastore API key is not configured".to_string()))?;

    let task_api_url = resolve_setting(
        overrides.task_api_url.as_deref(),
        ENV_TASK_API_URL,
        file.task_api_url.as_deref(),
    );

    Ok(BackendConfig {
        store_url,
        store_key,
        task_api_url,
    })
}

fn resolve_setting(explicit: Option<&str>, env_var: &str, file: Option<&str>) -> Option<String> {
    if let Some(v) = explicit {
        return Some(v.to_string());
    }
    if let Ok(v) = std::env::var(env_var) {
        if !v.is_empty() {
            return Some(v);
        }
    }
    file.map(|v| v.to_string())
}

/// Locate the config file for the platform.
///
/// Linux checks the user config directory first, then `/etc/dayside`.
pub fn load_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("dayside").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/dayside/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("no config file found".to_string()))
}
