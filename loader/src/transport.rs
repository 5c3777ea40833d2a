//! Transport boundary: the injected HTTP client and response envelope decoding.

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use url::Url;

use crate::{
    config::{ClientConfig, Credentials},
    error::{ConfigError, SchemaError, TransportError},
};

const API_KEY_HEADER: &str = "x-api-key";
const API_SECRET_HEADER: &str = "x-api-secret";
const ADMIN_BASE_OVERRIDE_HEADER: &str = "x-admin-base-override";
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Issues GET requests against the API and returns the raw response body.
///
/// Implementations must map network failures, timeouts and non-2xx statuses
/// to [`TransportError`]; they do not interpret the body.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// GET `path` (relative to the API root) with `query` parameters.
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Bytes, TransportError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Decode a `{ "data": ... }` envelope, rejecting anything else.
pub fn decode_envelope<T: DeserializeOwned>(path: &str, body: &[u8]) -> Result<T, SchemaError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| SchemaError::new(path, format!("body is not valid JSON: {err}")))?;
    if value.get("data").is_none() {
        return Err(SchemaError::new(path, "missing `data` field"));
    }
    let envelope: Envelope<T> = serde_json::from_value(value)
        .map_err(|err| SchemaError::new(path, format!("unexpected `data` shape: {err}")))?;
    Ok(envelope.data)
}

/// [`ApiTransport`] backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|err| ConfigError::InvalidBaseUrl {
            url: config.base_url.clone(),
            message: err.to_string(),
        })?;

        let mut client_builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers(config)?);
        if let Some(proxy_url) = config.proxy_url.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|source| {
                ConfigError::InvalidProxy {
                    url: proxy_url.to_string(),
                    source,
                }
            })?;
            client_builder = client_builder.proxy(proxy);
        }
        let client = client_builder.build().map_err(ConfigError::Client)?;

        Ok(Self {
            client,
            base_url,
        })
    }

    /// Build a transport from `ARI_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(&ClientConfig::from_env())
    }

    /// Join `path` onto the API root. Endpoints carry their `/api` prefix, so
    /// it is dropped when the root already ends in `/api`.
    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        let mut relative = path.trim_start_matches('/');
        if self.base_url.ends_with("/api") {
            relative = relative.strip_prefix("api/").unwrap_or(relative);
        }
        let joined = format!("{}/{relative}", self.base_url);
        Url::parse(&joined).map_err(|err| TransportError::InvalidUrl {
            path: path.to_string(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Bytes, TransportError> {
        let url = self.url_for(path)?;
        let base_id = query
            .iter()
            .find(|(key, _)| key == "baseId")
            .map(|(_, value)| value.as_str())
            .unwrap_or("-");
        let started = Instant::now();
        tracing::debug!(path, ?query, "api request");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| network_error(path, source))?;

        let status = response.status();
        tracing::info!(
            target: "audit",
            method = "GET",
            path,
            base_id,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "api access"
        );

        let body = response
            .bytes()
            .await
            .map_err(|source| network_error(path, source))?;
        if !status.is_success() {
            return Err(TransportError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message: error_message(&body, status.canonical_reason()),
            });
        }
        Ok(body)
    }
}

fn default_headers(config: &ClientConfig) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    match &config.credentials {
        Some(Credentials::Bearer(token)) => {
            let mut bearer = header_value("authorization", &format!("Bearer {token}"))?;
            bearer.set_sensitive(true);
            headers.insert(AUTHORIZATION, bearer);
            if let Some(base_id) = config.admin_base_override {
                headers.insert(
                    HeaderName::from_static(ADMIN_BASE_OVERRIDE_HEADER),
                    header_value(ADMIN_BASE_OVERRIDE_HEADER, &base_id.to_string())?,
                );
            }
        },
        Some(Credentials::ApiKey {
            key,
            secret,
        }) => {
            headers.insert(
                HeaderName::from_static(API_KEY_HEADER),
                header_value(API_KEY_HEADER, key)?,
            );
            let mut secret = header_value(API_SECRET_HEADER, secret)?;
            secret.set_sensitive(true);
            headers.insert(HeaderName::from_static(API_SECRET_HEADER), secret);
        },
        None => {
            tracing::warn!("no api credentials configured; requests will be anonymous");
        },
    }
    Ok(headers)
}

fn header_value(header: &'static str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidCredential {
        header,
    })
}

fn network_error(path: &str, source: reqwest::Error) -> TransportError {
    if source.is_timeout() {
        TransportError::Timeout {
            path: path.to_string(),
        }
    } else {
        TransportError::Network {
            path: path.to_string(),
            source,
        }
    }
}

/// Prefer the API's own `message` field; fall back to the raw body, then to
/// the status reason.
fn error_message(body: &[u8], reason: Option<&str>) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return reason.unwrap_or("request failed").to_string();
    }
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
