//! Graph API transport
//!
//! The publish flow talks to the Graph API only through [`GraphTransport`].
//! Implementations normalize every failure into an [`ErrorEnvelope`] so the
//! core never inspects transport-specific error shapes.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::InstagramConfig;
use crate::error::Result;

/// `accept` header sent with every Graph API request
pub const ACCEPT_HEADER: &str = "application/json,text/*;q=0.99";

/// HTTP method used by the publish flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// One authenticated Graph API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL
    pub url: String,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
}

impl GraphRequest {
    fn new(method: HttpMethod, url: String) -> Self {
        Self {
            method,
            url,
            query: Vec::new(),
            headers: vec![("accept".to_string(), ACCEPT_HEADER.to_string())],
        }
    }

    /// GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url.into())
    }

    /// POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url.into())
    }

    /// Append a query parameter (builder pattern)
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters (builder pattern)
    pub fn with_query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Look up a query parameter
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Successful response body
#[derive(Debug, Clone, PartialEq)]
pub enum GraphResponse {
    /// Body parsed as JSON
    Json(Value),
    /// Body that was not valid JSON
    Text(String),
}

impl GraphResponse {
    /// Classify a raw response body
    pub fn from_body(body: String) -> Self {
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::String(text)) => Self::Text(text),
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(body),
        }
    }
}

/// `error` object of a Graph API error response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphApiError {
    /// Error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Numeric error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Numeric error sub-code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_subcode: Option<i64>,
    /// Remaining fields (`type`, `fbtrace_id`, `error_user_msg`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphApiError {
    /// Error with only a code set
    pub fn with_code(code: i64) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    /// Error with only a message set
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Fields to merge into an error record, without `message`
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = self.extra.clone();
        if let Some(code) = self.code {
            fields.insert("code".to_string(), Value::from(code));
        }
        if let Some(subcode) = self.error_subcode {
            fields.insert("error_subcode".to_string(), Value::from(subcode));
        }
        fields.remove("message");
        fields
    }
}

/// Normalized transport failure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorEnvelope {
    /// HTTP status code; `None` when no response was received
    pub status_code: Option<u16>,
    /// Transport-level message
    pub message: String,
    /// Remote `error` object, when the body carried one
    pub error: Option<GraphApiError>,
    /// Response headers
    pub headers: BTreeMap<String, String>,
}

impl ErrorEnvelope {
    /// Envelope for an HTTP error response
    pub fn http(status_code: u16, error: Option<GraphApiError>) -> Self {
        Self {
            status_code: Some(status_code),
            message: format!("Request failed with status code {}", status_code),
            error,
            headers: BTreeMap::new(),
        }
    }

    /// Envelope for a failure with no HTTP response
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Attach a response header (builder pattern)
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Remote message if present, transport message otherwise
    pub fn display_message(&self) -> &str {
        self.error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .unwrap_or(&self.message)
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(status) => write!(f, "{} (status: {})", self.display_message(), status),
            None => write!(f, "{}", self.display_message()),
        }
    }
}

/// Authenticated Graph API call supplied by the host
#[async_trait]
pub trait GraphTransport: Send + Sync {
    /// Perform one request
    async fn request(&self, request: GraphRequest) -> std::result::Result<GraphResponse, ErrorEnvelope>;
}

/// URL builder for one host and API version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEndpoint {
    host: String,
    version: String,
}

impl GraphEndpoint {
    /// Endpoint for `https://{host}/{version}/`
    pub fn new(host: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            version: version.into(),
        }
    }

    /// Container creation: `/{node}/media`
    pub fn media(&self, node: &str) -> String {
        format!("https://{}/{}/{}/media", self.host, self.version, node)
    }

    /// Publish: `/{node}/media_publish`
    pub fn media_publish(&self, node: &str) -> String {
        format!("https://{}/{}/{}/media_publish", self.host, self.version, node)
    }

    /// Graph object by id, e.g. a container
    pub fn object(&self, id: &str) -> String {
        format!("https://{}/{}/{}", self.host, self.version, id)
    }
}

/// Default transport backed by `reqwest`, authenticating with `access_token`
pub struct HttpTransport {
    http_client: Client,
    access_token: String,
}

impl HttpTransport {
    /// Create a transport from the plugin configuration
    pub fn new(config: &InstagramConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            access_token: config.access_token.clone(),
        })
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn parse_error_body(body: &str) -> Option<GraphApiError> {
    let value: Value = serde_json::from_str(body).ok()?;
    serde_json::from_value(value.get("error")?.clone()).ok()
}

#[async_trait]
impl GraphTransport for HttpTransport {
    async fn request(&self, request: GraphRequest) -> std::result::Result<GraphResponse, ErrorEnvelope> {
        debug!("{} {}", request.method, request.url);

        let mut builder = match request.method {
            HttpMethod::Get => self.http_client.get(&request.url),
            HttpMethod::Post => self.http_client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = builder
            .query(&request.query)
            .query(&[("access_token", self.access_token.as_str())]);

        let response = builder
            .send()
            .await
            .map_err(|e| ErrorEnvelope::network(e.to_string()))?;

        let status = response.status();
        let headers = collect_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| ErrorEnvelope::network(e.to_string()))?;

        if !status.is_success() {
            let mut envelope = ErrorEnvelope::http(status.as_u16(), parse_error_body(&body));
            envelope.headers = headers;
            return Err(envelope);
        }

        Ok(GraphResponse::from_body(body))
    }
}
