use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::MetricsList,
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

mod session;

pub use session::{ConsoleSession, SessionRole, StaticRole};

const METRICS_PATH: &str = "v2/console/metrics";
const AUTHENTICATE_PATH: &str = "v2/console/authenticate";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConsoleClientError {
    #[error("invalid console url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("console session token could not be decoded: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Listing API the metrics page is driven by.
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    /// Lists one page of metrics. `id_scope` narrows to a single account when non-empty,
    /// an empty or absent `cursor` requests the first page.
    async fn list_metrics(
        &self,
        id_scope: &str,
        filter: Option<&str>,
        tombstones: bool,
        cursor: Option<&str>,
    ) -> Result<MetricsList, ApiError>;
}

#[derive(Debug, Serialize)]
struct AuthenticateRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthenticateResponse {
    token: String,
}

/// Gateway style error body, used when the server does not answer with an [`ApiError`].
#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: String,
}

pub struct ConsoleClient {
    http: Client,
    base_url: Url,
    session: Option<ConsoleSession>,
}

impl ConsoleClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConsoleClientError> {
        let base_url = normalize_base_url(base_url)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            session: None,
        })
    }

    pub fn session(&self) -> Option<&ConsoleSession> {
        self.session.as_ref()
    }

    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<ConsoleSession, ApiError> {
        let url = self.endpoint(AUTHENTICATE_PATH)?;
        let response = self
            .http
            .post(url)
            .json(&AuthenticateRequest { username, password })
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let body: AuthenticateResponse = response.json().await.map_err(decode_error)?;

        let session = ConsoleSession::from_token(body.token).map_err(|err| {
            ApiError::new(ErrorCode::Unauthorized, err.to_string())
        })?;
        debug!(username, role = ?session.role(), "console session established");
        self.session = Some(session.clone());
        Ok(session)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::new(ErrorCode::Validation, err.to_string()))
    }
}

#[async_trait]
impl ConsoleApi for ConsoleClient {
    async fn list_metrics(
        &self,
        id_scope: &str,
        filter: Option<&str>,
        tombstones: bool,
        cursor: Option<&str>,
    ) -> Result<MetricsList, ApiError> {
        let url = self.endpoint(METRICS_PATH)?;
        let query = list_metrics_query(id_scope, filter, tombstones, cursor);

        let mut request = self.http.get(url).query(&query);
        if let Some(session) = &self.session {
            request = request.bearer_auth(session.token());
        }

        debug!(?query, "listing metrics");
        let response = request.send().await.map_err(transport_error)?;
        let response = check_status(response).await?;
        response.json().await.map_err(decode_error)
    }
}

fn list_metrics_query(
    id_scope: &str,
    filter: Option<&str>,
    tombstones: bool,
    cursor: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut query = Vec::with_capacity(4);
    if !id_scope.is_empty() {
        query.push(("id", id_scope.to_string()));
    }
    if let Some(filter) = filter {
        query.push(("filter", filter.to_string()));
    }
    query.push(("tombstones", tombstones.to_string()));
    if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
        query.push(("cursor", cursor.to_string()));
    }
    query
}

fn normalize_base_url(raw: &str) -> Result<Url, ConsoleClientError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|source| ConsoleClientError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let err = error_from_body(status, &body);
    warn!(status = status.as_u16(), error = %err, "console request failed");
    Err(err)
}

fn error_from_body(status: StatusCode, body: &str) -> ApiError {
    if let Ok(api_error) = serde_json::from_str::<ApiError>(body) {
        return api_error;
    }

    let code = ErrorCode::from_http_status(status.as_u16());
    let message = serde_json::from_str::<GatewayErrorBody>(body)
        .ok()
        .map(|b| if b.message.is_empty() { b.error } else { b.message })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        });
    ApiError::new(code, message)
}

fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::new(ErrorCode::Unavailable, format!("transport error: {err}"))
}

fn decode_error(err: reqwest::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, format!("malformed response: {err}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
