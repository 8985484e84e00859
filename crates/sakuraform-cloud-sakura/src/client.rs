//! Authenticated JSON client for the Sakura Cloud API

use crate::error::{ApiErrorBody, Result, SakuraError};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_API_ROOT_URL: &str = "https://secure.sakura.ad.jp/cloud/zone";
pub const DEFAULT_ZONE: &str = "is1b";

const ACCESS_TOKEN_ENV: &str = "SAKURACLOUD_ACCESS_TOKEN";
const ACCESS_TOKEN_SECRET_ENV: &str = "SAKURACLOUD_ACCESS_TOKEN_SECRET";

/// Credentials and endpoint of one zone
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub access_token: String,
    pub access_token_secret: String,
    pub zone: String,
    pub api_root_url: String,
}

impl ClientConfig {
    pub fn new(access_token: impl Into<String>, access_token_secret: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
            zone: DEFAULT_ZONE.to_string(),
            api_root_url: DEFAULT_API_ROOT_URL.to_string(),
        }
    }

    /// Read the API key pair from environment variables
    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var(ACCESS_TOKEN_ENV)
            .map_err(|_| SakuraError::MissingEnvVar(ACCESS_TOKEN_ENV.to_string()))?;
        let access_token_secret = std::env::var(ACCESS_TOKEN_SECRET_ENV)
            .map_err(|_| SakuraError::MissingEnvVar(ACCESS_TOKEN_SECRET_ENV.to_string()))?;

        Ok(Self::new(access_token, access_token_secret))
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = zone.into();
        self
    }

    pub fn with_api_root_url(mut self, url: impl Into<String>) -> Self {
        self.api_root_url = url.into();
        self
    }

    /// `{root}/{zone}/api/cloud/1.1`
    pub fn base_url(&self) -> String {
        format!(
            "{}/{}/api/cloud/1.1",
            self.api_root_url.trim_end_matches('/'),
            self.zone
        )
    }
}

/// Thin wrapper over `reqwest::Client` that knows the zone endpoint
#[derive(Debug, Clone)]
pub struct SakuraClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl SakuraClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url(), path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// PUT/DELETE without a meaningful response body
    pub async fn send<B: Serialize>(&self, method: Method, path: &str, body: Option<&B>) -> Result<()> {
        self.request::<B, serde_json::Value>(method, path, body)
            .await
            .map(|_| ())
    }

    async fn request<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.config.access_token, Some(&self.config.access_token_secret));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(SakuraError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.message())
                .unwrap_or(text);
            return Err(SakuraError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // Some endpoints answer 2xx with an empty body
        let body = if text.trim().is_empty() {
            "null"
        } else {
            text.as_str()
        };
        Ok(serde_json::from_str(body)?)
    }
}

/// Ids come back as strings from most endpoints and as numbers from a few
pub(crate) fn flexible_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(id) => id,
        Id::Number(id) => id.to_string(),
    })
}
