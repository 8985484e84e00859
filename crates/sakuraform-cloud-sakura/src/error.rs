//! Sakura Cloud adapter error types

use sakuraform_cloud::CloudError;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SakuraError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Sakura Cloud API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SakuraError>;

impl From<SakuraError> for CloudError {
    fn from(err: SakuraError) -> Self {
        match err {
            SakuraError::NotFound(what) => CloudError::ResourceNotFound(what),
            SakuraError::MissingEnvVar(_) => CloudError::InvalidConfig(err.to_string()),
            SakuraError::Json(err) => CloudError::Json(err),
            other => CloudError::ApiError(other.to_string()),
        }
    }
}

/// Error body returned by the API on non-2xx responses
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
}

impl ApiErrorBody {
    pub(crate) fn message(&self) -> String {
        match (&self.error_code, &self.error_msg) {
            (Some(code), Some(msg)) => format!("{}: {}", code, msg),
            (None, Some(msg)) => msg.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "Unknown error".to_string(),
        }
    }
}
