use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

pub const SETTINGS_FILE_NAME: &str = "skillmatrix.toml";
pub const DEFAULT_NOTIFICATION_DWELL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub database_url: String,
    pub notification_dwell: Duration,
    /// When set, credentials are checked against this server instead of the built-in table.
    pub auth_server_url: Option<Url>,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|base| base.join("skillmatrix"))
            .unwrap_or_else(|| PathBuf::from("./data"));
        let database_url = sqlite_url_for_data_dir(&data_dir);
        Self {
            data_dir,
            database_url,
            notification_dwell: DEFAULT_NOTIFICATION_DWELL,
            auth_server_url: None,
        }
    }
}

impl Settings {
    /// Settings backed by a private in-memory database, for tests and throwaway sessions.
    pub fn ephemeral() -> Self {
        Self {
            data_dir: std::env::temp_dir().join("skillmatrix"),
            database_url: "sqlite::memory:".to_string(),
            notification_dwell: DEFAULT_NOTIFICATION_DWELL,
            auth_server_url: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    data_dir: Option<PathBuf>,
    database_url: Option<String>,
    notification_dwell_ms: Option<u64>,
    auth_server_url: Option<String>,
}

/// Defaults, then `./skillmatrix.toml`, then environment overrides.
pub fn load_settings() -> Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE_NAME), |name| std::env::var(name).ok())
}

pub fn load_settings_from(
    config_path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(config_path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse '{}'", config_path.display()))?;
            apply_file_settings(&mut settings, file_cfg)?;
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", config_path.display()))
        }
    }

    apply_env_overrides(&mut settings, env)?;
    settings.database_url = normalize_database_url(&settings.database_url, &settings.data_dir);
    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) -> Result<()> {
    if let Some(dir) = file_cfg.data_dir {
        settings.database_url = sqlite_url_for_data_dir(&dir);
        settings.data_dir = dir;
    }
    if let Some(url) = file_cfg.database_url {
        settings.database_url = url;
    }
    if let Some(ms) = file_cfg.notification_dwell_ms {
        settings.notification_dwell = Duration::from_millis(ms);
    }
    if let Some(raw) = file_cfg.auth_server_url {
        settings.auth_server_url = Some(parse_auth_url(&raw)?);
    }
    Ok(())
}

fn apply_env_overrides(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) -> Result<()> {
    let lookup = |suffix: &str| {
        env(&format!("APP__{suffix}"))
            .or_else(|| env(&format!("SKILLMATRIX_{suffix}")))
            .filter(|value| !value.trim().is_empty())
    };

    if let Some(dir) = lookup("DATA_DIR") {
        let dir = PathBuf::from(dir);
        settings.database_url = sqlite_url_for_data_dir(&dir);
        settings.data_dir = dir;
    }
    if let Some(url) = lookup("DATABASE_URL") {
        settings.database_url = url;
    }
    if let Some(raw) = lookup("NOTIFICATION_DWELL_MS") {
        let ms = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("NOTIFICATION_DWELL_MS must be milliseconds, got '{raw}'"))?;
        settings.notification_dwell = Duration::from_millis(ms);
    }
    if let Some(raw) = lookup("AUTH_URL") {
        settings.auth_server_url = Some(parse_auth_url(&raw)?);
    }
    Ok(())
}

fn parse_auth_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    // Url::join drops the last segment unless the base ends with '/'.
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash).with_context(|| format!("invalid auth server url '{raw}'"))
}

pub fn sqlite_url_for_data_dir(data_dir: &Path) -> String {
    format!(
        "sqlite://{}",
        data_dir
            .join("client.sqlite3")
            .to_string_lossy()
            .replace('\\', "/")
    )
}

pub(crate) fn normalize_database_url(raw_database_url: &str, data_dir: &Path) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return sqlite_url_for_data_dir(data_dir);
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
