//! Client configuration.
//!
//! Everything the HTTP transport and the loader need is passed in at
//! construction time; nothing is read from global state afterwards.

use std::{env, fmt, time::Duration};

const PRODUCTION_API_URL: &str = "https://ierp.invistto.com/api";
const LOCAL_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_TIMEOUT_SECONDS: u64 = 600;
const MIN_TIMEOUT_SECONDS: u64 = 3;
const DEFAULT_PAGE_DELAY_MS: u64 = 100;

/// Deployment whose default API root is used when no URL is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiEnvironment {
    /// Developer machine.
    #[default]
    Local,
    /// Hosted production API.
    Production,
}

impl ApiEnvironment {
    /// Default API root for this environment.
    pub fn default_base_url(self) -> &'static str {
        match self {
            ApiEnvironment::Local => LOCAL_API_URL,
            ApiEnvironment::Production => PRODUCTION_API_URL,
        }
    }

    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            ApiEnvironment::Production
        } else {
            ApiEnvironment::Local
        }
    }
}

/// How requests authenticate. The two schemes are mutually exclusive.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// `X-API-Key` / `X-API-Secret` header pair.
    ApiKey {
        /// Public key.
        key: String,
        /// Secret paired with the key.
        secret: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Bearer(_) => f.write_str("Bearer(***)"),
            Credentials::ApiKey {
                key, ..
            } => f
                .debug_struct("ApiKey")
                .field("key", key)
                .field("secret", &"***")
                .finish(),
        }
    }
}

/// Configuration for [`crate::HttpTransport`] and [`crate::BulkDataLoader`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root every endpoint is appended to.
    pub base_url: String,
    /// Authentication scheme, if any.
    pub credentials: Option<Credentials>,
    /// Tenant an administrator browses instead of their own. Only sent with
    /// bearer credentials.
    pub admin_base_override: Option<i64>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Optional HTTP proxy.
    pub proxy_url: Option<String>,
    /// Pause between two page requests.
    pub page_delay: Duration,
}

impl ClientConfig {
    /// Configuration for `base_url` with default timeouts and no credentials.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: None,
            admin_base_override: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            proxy_url: None,
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
        }
    }

    /// Read configuration from `ARI_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] but reading through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let base_url = match var("ARI_API_URL") {
            Some(url) => format!("{}/api", url.trim_end_matches('/')),
            None => var("ARI_ENVIRONMENT")
                .map(|value| ApiEnvironment::parse(&value))
                .unwrap_or_default()
                .default_base_url()
                .to_string(),
        };

        let credentials = match (var("ARI_API_KEY"), var("ARI_API_SECRET")) {
            (Some(key), Some(secret)) => Some(Credentials::ApiKey {
                key,
                secret,
            }),
            _ => var("ARI_API_TOKEN").map(Credentials::Bearer),
        };

        let admin_base_override = var("ARI_ADMIN_BASE_OVERRIDE")
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|_| matches!(credentials, Some(Credentials::Bearer(_))));

        let timeout_seconds = var("ARI_HTTP_TIMEOUT_SECONDS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
            .max(MIN_TIMEOUT_SECONDS);

        let page_delay_ms = var("ARI_PAGE_DELAY_MS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_PAGE_DELAY_MS);

        Self {
            base_url,
            credentials,
            admin_base_override,
            timeout: Duration::from_secs(timeout_seconds),
            proxy_url: var("ARI_PROXY_URL"),
            page_delay: Duration::from_millis(page_delay_ms),
        }
    }

    /// Use `credentials` for every request.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Browse tenant `base_id` as an administrator.
    pub fn with_admin_base_override(mut self, base_id: i64) -> Self {
        self.admin_base_override = Some(base_id);
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Route requests through `proxy_url`.
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Set the pause between page requests.
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> ClientConfig {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        ClientConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_to_local_api() {
        let config = config_from(&[]);
        assert_eq!(config.base_url, "http://localhost:3000/api");
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert_eq!(config.page_delay, Duration::from_millis(100));
        assert!(config.credentials.is_none());
    }

    #[test]
    fn explicit_url_wins_over_environment() {
        let config = config_from(&[
            ("ARI_API_URL", "https://erp.example.com/"),
            ("ARI_ENVIRONMENT", "production"),
        ]);
        assert_eq!(config.base_url, "https://erp.example.com/api");

        let config = config_from(&[("ARI_ENVIRONMENT", "Production")]);
        assert_eq!(config.base_url, "https://ierp.invistto.com/api");
    }

    #[test]
    fn api_key_pair_takes_precedence_over_token() {
        let config = config_from(&[
            ("ARI_API_TOKEN", "jwt"),
            ("ARI_API_KEY", "key"),
            ("ARI_API_SECRET", "secret"),
            ("ARI_ADMIN_BASE_OVERRIDE", "42"),
        ]);
        assert_eq!(
            config.credentials,
            Some(Credentials::ApiKey {
                key: "key".to_string(),
                secret: "secret".to_string(),
            })
        );
        assert_eq!(config.admin_base_override, None);
    }

    #[test]
    fn bearer_token_keeps_admin_override() {
        let config = config_from(&[("ARI_API_TOKEN", "jwt"), ("ARI_ADMIN_BASE_OVERRIDE", "42")]);
        assert_eq!(config.credentials, Some(Credentials::Bearer("jwt".to_string())));
        assert_eq!(config.admin_base_override, Some(42));
    }

    #[test]
    fn timeout_has_a_floor() {
        let config = config_from(&[("ARI_HTTP_TIMEOUT_SECONDS", "1")]);
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!(
            "{:?}",
            Credentials::ApiKey {
                key: "key".to_string(),
                secret: "top-secret".to_string(),
            }
        );
        assert!(!rendered.contains("top-secret"));
        assert!(!format!("{:?}", Credentials::Bearer("jwt".to_string())).contains("jwt"));
    }
}
