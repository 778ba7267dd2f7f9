//! Application configuration.
//!
//! Defaults live here as constants. The server reads overrides from the
//! environment (a `.env` file is loaded first if present):
//!
//! | Variable | Default |
//! |----------|---------|
//! | `TABCONV_PORT` | `3000` |
//! | `TABCONV_MAX_UPLOAD_MB` | `50` |
//! | `TABCONV_PREVIEW_ROWS` | `5` |
//! | `TABCONV_STATIC_DIR` | unset |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Rows shown in each preview.
pub const PREVIEW_ROWS: usize = 5;

/// Maximum upload size (in bytes).
///
/// 50 MB limit.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Numeric columns drawn in a chart.
pub const CHART_MAX_SERIES: usize = 2;

/// Log entries buffered for slow SSE subscribers.
pub const LOG_CHANNEL_CAPACITY: usize = 100;

/// Server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub max_upload_bytes: usize,
    pub preview_rows: usize,
    /// Directory served at `/` for a browser front end.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            preview_rows: PREVIEW_ROWS,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `TABCONV_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try loading .env file
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = parse_var::<u16>(&lookup, "TABCONV_PORT")? {
            config.port = port;
        }
        if let Some(mb) = parse_var::<usize>(&lookup, "TABCONV_MAX_UPLOAD_MB")? {
            config.max_upload_bytes =
                mb.checked_mul(1024 * 1024)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: "TABCONV_MAX_UPLOAD_MB".to_string(),
                        value: mb.to_string(),
                        message: "upload limit too large".to_string(),
                    })?;
        }
        if let Some(rows) = parse_var::<usize>(&lookup, "TABCONV_PREVIEW_ROWS")? {
            config.preview_rows = rows;
        }
        config.static_dir = lookup("TABCONV_STATIC_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }

    /// Override the port when one was given on the command line.
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
                message: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.preview_rows, 5);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("TABCONV_PORT", "8080"),
            ("TABCONV_MAX_UPLOAD_MB", "2"),
            ("TABCONV_PREVIEW_ROWS", " 10 "),
            ("TABCONV_STATIC_DIR", "dist"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(config.preview_rows, 10);
        assert_eq!(config.static_dir, Some(PathBuf::from("dist")));
    }

    #[test]
    fn test_invalid_port() {
        let err = ServerConfig::from_lookup(lookup(&[("TABCONV_PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("TABCONV_PORT"));
    }

    #[test]
    fn test_upload_limit_overflow() {
        let err = ServerConfig::from_lookup(lookup(&[("TABCONV_MAX_UPLOAD_MB", "99999999999999")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TABCONV_MAX_UPLOAD_MB"));
    }

    #[test]
    fn test_cli_port_wins() {
        let config = ServerConfig::default().with_port(Some(9000));
        assert_eq!(config.port, 9000);
        assert_eq!(ServerConfig::default().with_port(None).port, DEFAULT_PORT);
    }
}
