//! Server configuration parsed from environment variables.

use std::path::PathBuf;

use axum::http::HeaderValue;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CLIENT_URL: &str = "http://localhost:5173";
pub const DEFAULT_UPLOAD_DIR: &str = "temp_assets";
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    /// Only an explicit `development` opts in; anything else is production.
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("development" | "dev") => Self::Development,
            _ => Self::Production,
        }
    }

    #[must_use]
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Allowed CORS origin (credentials enabled).
    pub client_origin: HeaderValue,
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    pub app_env: AppEnv,
    /// Built SPA to serve for non-API paths.
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 5000
    /// - `CLIENT_URL`: default `http://localhost:5173`
    /// - `UPLOAD_DIR`: default `temp_assets`
    /// - `UPLOAD_MAX_BYTES`: default 10 MiB
    /// - `APP_ENV`: `development` exposes internal error detail
    /// - `STATIC_DIR`: unset disables static serving
    ///
    /// # Errors
    ///
    /// Returns an error when a numeric variable or `CLIENT_URL` is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let port = parse_or("PORT", non_empty("PORT"), DEFAULT_PORT)?;
        let upload_max_bytes = parse_or("UPLOAD_MAX_BYTES", non_empty("UPLOAD_MAX_BYTES"), DEFAULT_UPLOAD_MAX_BYTES)?;
        if upload_max_bytes == 0 {
            return Err(ConfigError::Invalid { var: "UPLOAD_MAX_BYTES", value: "0".into() });
        }

        let client_url = non_empty("CLIENT_URL").unwrap_or_else(|| DEFAULT_CLIENT_URL.to_owned());
        let client_url = client_url.trim_end_matches('/');
        let client_origin = HeaderValue::from_str(client_url)
            .map_err(|_| ConfigError::Invalid { var: "CLIENT_URL", value: client_url.to_owned() })?;

        Ok(Self {
            port,
            client_origin,
            upload_dir: non_empty("UPLOAD_DIR").map_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR), PathBuf::from),
            upload_max_bytes,
            app_env: AppEnv::parse(lookup("APP_ENV").as_deref()),
            static_dir: non_empty("STATIC_DIR").map(PathBuf::from),
        })
    }

    #[must_use]
    pub fn client_url(&self) -> &str {
        self.client_origin.to_str().unwrap_or_default()
    }
}

fn parse_or<T: std::str::FromStr>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
