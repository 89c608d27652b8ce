//! Upstream gateway: issues one bearer-authenticated HTTP call against the
//! Power BI REST API and normalizes the result into a typed outcome. Non-2xx
//! responses are data (`UpstreamOutcome::Failure`), not raised faults; only
//! transport-level problems (DNS, TLS, timeout) surface as errors. The
//! gateway never retries and never reclassifies a 2xx by inspecting its body.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use thiserror::Error;
use tracing::{debug, trace};

use crate::auth::AccessToken;

#[derive(Debug, Error)]
#[error("transport error calling upstream API: {0}")]
pub struct TransportError(#[from] pub reqwest::Error);

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    /// Binary content sent as one multipart form part named `file`.
    File {
        file_name: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> UpstreamRequest {
        UpstreamRequest {
            method: Method::GET,
            url: url.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> UpstreamRequest {
        UpstreamRequest {
            method: Method::POST,
            url: url.into(),
            body: RequestBody::Json(body),
        }
    }

    pub fn post_file(
        url: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> UpstreamRequest {
        UpstreamRequest {
            method: Method::POST,
            url: url.into(),
            body: RequestBody::File {
                file_name: file_name.into(),
                bytes,
            },
        }
    }

    pub fn delete(url: impl Into<String>) -> UpstreamRequest {
        UpstreamRequest {
            method: Method::DELETE,
            url: url.into(),
            body: RequestBody::Empty,
        }
    }
}

/// HTTP outcome of one upstream call. `Failure` keeps the raw response body
/// verbatim so callers can surface upstream diagnostics unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamOutcome {
    Success { status: u16, body: Vec<u8> },
    Failure { status: u16, body: String },
}

impl UpstreamOutcome {
    pub(crate) fn classify(status: reqwest::StatusCode, body: Vec<u8>) -> UpstreamOutcome {
        if status.is_success() {
            UpstreamOutcome::Success {
                status: status.as_u16(),
                body,
            }
        } else {
            UpstreamOutcome::Failure {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }
        }
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn call(
        &self,
        token: &AccessToken,
        request: UpstreamRequest,
    ) -> Result<UpstreamOutcome, TransportError>;
}

pub struct HttpGateway {
    client: Client,
}

impl HttpGateway {
    pub fn new() -> Result<HttpGateway, TransportError> {
        let client = Client::builder().user_agent("pbigate").build()?;
        Ok(HttpGateway { client })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn call(
        &self,
        token: &AccessToken,
        request: UpstreamRequest,
    ) -> Result<UpstreamOutcome, TransportError> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .bearer_auth(token.as_str())
            .header(ACCEPT, "application/json");

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::File { file_name, bytes } => {
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("application/octet-stream")?;
                builder.multipart(Form::new().part("file", part))
            }
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        trace!("Upstream responded with status {} ({} bytes)", status, body.len());

        Ok(UpstreamOutcome::classify(status, body))
    }
}
