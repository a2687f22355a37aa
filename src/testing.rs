//! In-memory collaborators for running the publish flow without a network
//!
//! [`ScriptedTransport`] replays queued responses in order and records every
//! request it receives. [`RecordingDelay`] records requested sleeps and
//! returns immediately.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::delay::Delay;
use crate::transport::{ErrorEnvelope, GraphApiError, GraphRequest, GraphResponse, GraphTransport};

type Scripted = std::result::Result<GraphResponse, ErrorEnvelope>;

/// Transport that answers from a queue of canned responses
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<GraphRequest>>,
}

impl ScriptedTransport {
    /// Empty script
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, response: Scripted) -> Self {
        self.responses
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
        self
    }

    /// Queue a JSON body
    pub fn with_json(self, body: Value) -> Self {
        self.with(Ok(GraphResponse::Json(body)))
    }

    /// Queue a non-JSON body
    pub fn with_text(self, body: impl Into<String>) -> Self {
        self.with(Ok(GraphResponse::Text(body.into())))
    }

    /// Queue a transport failure
    pub fn with_error(self, envelope: ErrorEnvelope) -> Self {
        self.with(Err(envelope))
    }

    /// Queue an HTTP 400 carrying a Graph API error
    pub fn with_graph_error(self, error: GraphApiError) -> Self {
        self.with_error(ErrorEnvelope::http(400, Some(error)))
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<GraphRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests whose URL ends with `suffix`
    pub fn count_requests_to(&self, suffix: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.url.ends_with(suffix))
            .count()
    }

    /// Responses not consumed yet
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl GraphTransport for ScriptedTransport {
    async fn request(&self, request: GraphRequest) -> Scripted {
        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let response = next.unwrap_or_else(|| {
            Err(ErrorEnvelope::network(format!(
                "no scripted response left for {} {}",
                request.method, request.url
            )))
        });

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        response
    }
}

/// Delay that records requested sleeps without waiting
#[derive(Debug, Default)]
pub struct RecordingDelay {
    sleeps: Mutex<Vec<u64>>,
}

impl RecordingDelay {
    /// Fresh recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested sleeps in milliseconds, in order
    pub fn sleeps(&self) -> Vec<u64> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep_ms(&self, ms: u64) {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ms);
    }
}
