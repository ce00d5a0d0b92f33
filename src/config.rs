use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, read once at start-up and shared with handlers as
/// `web::Data<AppConfig>`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub session_key: Option<String>,
    pub latex_enabled: bool,
    pub xelatex_path: PathBuf,
    pub latex_timeout: Duration,
    pub cache_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub unclaimed_file_ttl: Duration,
    pub admin_password: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "Missing required environment variable {key}"),
            ConfigError::Invalid { key, value } => write!(f, "Invalid value for {key}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// Load from the process environment. Call `dotenvy::dotenv()` first if a
    /// `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(AppConfig {
            database_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            session_key: get("SESSION_KEY"),
            latex_enabled: match get("LATEX_ENABLED") {
                Some(v) => parse_bool("LATEX_ENABLED", &v)?,
                None => false,
            },
            xelatex_path: get("XELATEX_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("xelatex")),
            latex_timeout: Duration::from_secs(parse_num("LATEX_TIMEOUT_SECS", get("LATEX_TIMEOUT_SECS"), 120)?),
            cache_dir: get("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/cache")),
            storage_dir: get("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/files")),
            max_upload_bytes: parse_num("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"), 100 * 1024 * 1024)? as usize,
            unclaimed_file_ttl: Duration::from_secs(
                parse_num("UNCLAIMED_FILE_TTL_HOURS", get("UNCLAIMED_FILE_TTL_HOURS"), 24)? * 3600,
            ),
            admin_password: get("ADMIN_PASSWORD"),
        })
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value: value.to_string() }),
    }
}

fn parse_num(key: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match value {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid { key, value: v }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/boa")]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert!(!config.latex_enabled);
        assert_eq!(config.xelatex_path, PathBuf::from("xelatex"));
        assert_eq!(config.latex_timeout, Duration::from_secs(120));
        assert_eq!(config.cache_dir, PathBuf::from("data/cache"));
        assert_eq!(config.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(config.unclaimed_file_ttl, Duration::from_secs(24 * 3600));
        assert!(config.admin_password.is_none());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn latex_flag_accepts_common_spellings() {
        for value in ["1", "true", "YES", "on"] {
            let config = config_from(&[("DATABASE_URL", "x"), ("LATEX_ENABLED", value)]).unwrap();
            assert!(config.latex_enabled, "{value} should enable LaTeX");
        }
        let config = config_from(&[("DATABASE_URL", "x"), ("LATEX_ENABLED", "off")]).unwrap();
        assert!(!config.latex_enabled);
    }

    #[test]
    fn garbage_values_are_rejected() {
        let err = config_from(&[("DATABASE_URL", "x"), ("LATEX_ENABLED", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LATEX_ENABLED", .. }));

        let err = config_from(&[("DATABASE_URL", "x"), ("MAX_UPLOAD_BYTES", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MAX_UPLOAD_BYTES", .. }));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[("DATABASE_URL", "x"), ("BIND_ADDR", "  ")]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }
}
