//! Instagram publish service implementation
//!
//! Provides the InstagramPublishService that owns the Graph API transport and
//! runs publish batches.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use serde_json::Value;

use crate::batch::{BatchExecutor, FailurePolicy};
use crate::config::InstagramConfig;
use crate::delay::{Delay, TokioDelay};
use crate::error::{InstagramError, Result, Stage};
use crate::parameters::decode_items;
use crate::publish::MediaPublisher;
use crate::transport::{GraphEndpoint, GraphRequest, GraphResponse, GraphTransport, HttpTransport};
use crate::types::{ItemOutcome, WorkItem};

/// Service state once started
struct RunningState {
    transport: Arc<dyn GraphTransport>,
    executor: Arc<BatchExecutor>,
}

/// Instagram publish service for elizaOS
///
/// Items run strictly one after another; concurrent batches on the same
/// service are not coordinated.
pub struct InstagramPublishService {
    config: InstagramConfig,
    state: Arc<RwLock<Option<RunningState>>>,
}

impl InstagramPublishService {
    /// Create a new publish service
    pub fn new(config: InstagramConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a service from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(InstagramConfig::from_env()?))
    }

    /// Get the configuration
    pub fn config(&self) -> &InstagramConfig {
        &self.config
    }

    /// Check if the service is running
    pub async fn is_running(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Start the service with the default HTTP transport
    pub async fn start(&self) -> Result<()> {
        let transport = Arc::new(HttpTransport::new(&self.config)?);
        self.start_with(transport, Arc::new(TokioDelay)).await
    }

    /// Start the service with host-supplied collaborators
    pub async fn start_with(
        &self,
        transport: Arc<dyn GraphTransport>,
        delay: Arc<dyn Delay>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if state.is_some() {
            return Err(InstagramError::AlreadyRunning);
        }

        self.config.validate()?;

        info!(
            "Starting Instagram publish service against {} ({})",
            self.config.host_url, self.config.graph_api_version
        );

        let publisher = MediaPublisher::new(transport.clone(), delay)
            .with_host_url(self.config.host_url.clone());

        *state = Some(RunningState {
            transport,
            executor: Arc::new(BatchExecutor::new(publisher)),
        });

        info!("Instagram publish service started");
        Ok(())
    }

    /// Stop the service
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping Instagram publish service...");
        *self.state.write().await = None;
        info!("Instagram publish service stopped");
        Ok(())
    }

    async fn executor(&self) -> Result<Arc<BatchExecutor>> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.executor.clone())
            .ok_or(InstagramError::ClientNotInitialized)
    }

    /// Publish a batch using the configured continuation policy
    pub async fn publish_batch(&self, items: Vec<Result<WorkItem>>) -> Result<Vec<ItemOutcome>> {
        self.publish_batch_with(items, &self.config.continue_on_fail)
            .await
    }

    /// Publish a batch with an explicit continuation policy
    pub async fn publish_batch_with<P>(
        &self,
        items: Vec<Result<WorkItem>>,
        policy: &P,
    ) -> Result<Vec<ItemOutcome>>
    where
        P: FailurePolicy + ?Sized,
    {
        let executor = self.executor().await?;
        debug!("Publishing batch of {} item(s)", items.len());
        executor.run(items, policy).await
    }

    /// Decode host parameter objects and publish them
    pub async fn publish_parameters(&self, parameters: &[Value]) -> Result<Vec<ItemOutcome>> {
        let items = decode_items(parameters, &self.config.graph_api_version);
        self.publish_batch(items).await
    }

    /// Check the access token with `GET /me?fields=id`
    pub async fn verify_credentials(&self) -> Result<Value> {
        let transport = self
            .state
            .read()
            .await
            .as_ref()
            .map(|s| s.transport.clone())
            .ok_or(InstagramError::ClientNotInitialized)?;

        let endpoint = GraphEndpoint::new(
            self.config.host_url.as_str(),
            self.config.graph_api_version.as_str(),
        );
        let request = GraphRequest::get(endpoint.object("me")).with_query("fields", "id");

        match transport.request(request).await? {
            GraphResponse::Json(body) => {
                debug!("Credentials verified for {}", body["id"]);
                Ok(body)
            }
            GraphResponse::Text(body) => Err(InstagramError::UnparseableResponse {
                stage: Stage::Request,
                body,
            }),
        }
    }
}
