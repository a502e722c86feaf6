//! Identity Toolkit configuration parsed from environment variables.

pub const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum FirebaseConfigError {
    #[error("missing config: env var {var} not set")]
    Missing { var: &'static str },
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirebaseTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub auth_domain: String,
    /// Identity Toolkit base URL, without trailing slash.
    pub base_url: String,
    pub timeouts: FirebaseTimeouts,
}

impl FirebaseConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `FIREBASE_API_KEY`
    /// - `FIREBASE_PROJECT_ID`
    ///
    /// Optional:
    /// - `FIREBASE_AUTH_DOMAIN`: `<project>.firebaseapp.com` when absent
    /// - `FIREBASE_AUTH_EMULATOR_HOST`: `host:port` of the auth emulator
    /// - `FIREBASE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `FIREBASE_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseConfigError::Missing`] if a required variable is unset.
    pub fn from_env() -> Result<Self, FirebaseConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`FirebaseConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseConfigError::Missing`] if a required key is absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, FirebaseConfigError> {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(FirebaseConfigError::Missing { var })
        };
        let api_key = required("FIREBASE_API_KEY")?;
        let project_id = required("FIREBASE_PROJECT_ID")?;

        let auth_domain = lookup("FIREBASE_AUTH_DOMAIN").unwrap_or_else(|| format!("{project_id}.firebaseapp.com"));
        let base_url = match lookup("FIREBASE_AUTH_EMULATOR_HOST") {
            Some(host) => format!("http://{}/identitytoolkit.googleapis.com/v1", host.trim_end_matches('/')),
            None => DEFAULT_IDENTITY_TOOLKIT_URL.to_owned(),
        };
        let parse_secs = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };
        let timeouts = FirebaseTimeouts {
            request_secs: parse_secs("FIREBASE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_secs("FIREBASE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_key, project_id, auth_domain, base_url, timeouts })
    }

    /// URL for an `accounts:<method>` call, API key included.
    #[must_use]
    pub fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{method}?key={}", self.base_url, self.api_key)
    }

    /// Redirect URI registered for federated sign-in.
    #[must_use]
    pub fn request_uri(&self) -> String {
        format!("https://{}/__/auth/handler", self.auth_domain)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
