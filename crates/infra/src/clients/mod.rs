//! HTTP clients for the common API (task registry, attribute service, upload).
//!
//! One blocking `reqwest` client is shared by the three ports. Error statuses
//! are not transport failures: the body is read as an [`ErrorResponse`] and the
//! port decides which taxonomy cause it becomes.

pub mod attribute;
pub mod task_registry;
pub mod upload;

use regex::Regex;
use reqwest::blocking::{Client, Response};
use thiserror::Error;

use ufbatch_core::model::ErrorResponse;

use crate::config::ApiSettings;

/// Remote message marking a locked attribute resource.
pub const REGEX_DATA_LOCKED: &str = r"^(?:.*DataLocked.*)$";
/// Remote message marking a request outside the maintained data range.
pub const REGEX_INVALID_DATA_RANGE: &str = r"^(?:.*InvalidDataRange.*)$";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid error pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Blocking client for the common API.
#[derive(Debug, Clone)]
pub struct CommonApi {
    http: Client,
    base_url: String,
    settings: ApiSettings,
    locked: Regex,
    out_of_range: Regex,
}

impl CommonApi {
    pub fn new(settings: &ApiSettings) -> Result<Self, ClientError> {
        Self::with_base_url(settings, settings.base_url())
    }

    /// Same as [`CommonApi::new`] but pointed at an explicit base URL.
    pub fn with_base_url(
        settings: &ApiSettings,
        base_url: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.read_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings: settings.clone(),
            locked: Regex::new(REGEX_DATA_LOCKED)?,
            out_of_range: Regex::new(REGEX_INVALID_DATA_RANGE)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn is_error_status(response: &Response) -> bool {
    let status = response.status();
    status.is_client_error() || status.is_server_error()
}

/// Read the error body of a 4xx/5xx response.
fn read_error(response: Response) -> Result<ErrorResponse, String> {
    let status = response.status();
    let body: ErrorResponse = response.json().map_err(|e| e.to_string())?;
    tracing::debug!(
        status = status.as_u16(),
        code = body.code.as_deref().unwrap_or(""),
        message = body.message.as_deref().unwrap_or(""),
        "common api returned an error"
    );
    Ok(body)
}
