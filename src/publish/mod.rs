//! Media publish orchestration
//!
//! One work item runs through container creation, readiness polling and
//! publishing. Carousels create and await every child before the parent.
//! All remote calls go through [`GraphTransport`] and all waiting through
//! [`Delay`], one call at a time.

mod carousel;
mod container;
mod poller;
mod retrier;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::delay::Delay;
use crate::error::{InstagramError, Result, Stage};
use crate::transport::{GraphEndpoint, GraphTransport};
use crate::types::{MediaPayload, WorkItem};
use crate::DEFAULT_GRAPH_HOST;

pub use carousel::{validate_media_items, MAX_CAROUSEL_ITEMS, MIN_CAROUSEL_ITEMS};
pub use container::ContainerRequest;
pub use poller::{normalize_statuses, ContainerStatus, ERROR_STATUSES, READY_STATUSES, STATUS_FIELDS};
pub use retrier::is_media_not_ready;

/// Drives the publish protocol for single work items
pub struct MediaPublisher {
    transport: Arc<dyn GraphTransport>,
    delay: Arc<dyn Delay>,
    host_url: String,
}

impl MediaPublisher {
    /// Create a publisher against the default Graph API host
    pub fn new(transport: Arc<dyn GraphTransport>, delay: Arc<dyn Delay>) -> Self {
        Self {
            transport,
            delay,
            host_url: DEFAULT_GRAPH_HOST.to_string(),
        }
    }

    /// Set the Graph API host (builder pattern)
    pub fn with_host_url(mut self, host_url: impl Into<String>) -> Self {
        self.host_url = host_url.into();
        self
    }

    /// Graph API host in use
    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    fn endpoint(&self, item: &WorkItem) -> GraphEndpoint {
        GraphEndpoint::new(self.host_url.as_str(), item.graph_api_version.as_str())
    }

    /// Publish one work item and return the published media object
    ///
    /// Input is validated before the first remote call.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the item. A container that was created
    /// but never published is reported through [`InstagramError::creation_id`].
    pub async fn publish(&self, item: &WorkItem) -> Result<Value> {
        let node = item.node.trim();
        if node.is_empty() {
            return Err(InstagramError::InvalidParameter(
                "node cannot be empty".to_string(),
            ));
        }

        let endpoint = self.endpoint(item);
        let policy = item.policy();
        let kind = item.kind();

        let container_id = match item.media {
            MediaPayload::Image { ref image_url } => {
                let request = ContainerRequest::Image {
                    image_url: required_url(image_url, "imageUrl")?,
                    caption: item.caption.clone(),
                };
                let id = self
                    .create_container(&endpoint, node, &request, Stage::MediaContainer)
                    .await?;
                self.wait_for_container_ready(&endpoint, &id, &policy).await?;
                id
            }
            MediaPayload::Video {
                ref video_url,
                format,
            } => {
                let request = ContainerRequest::Video {
                    video_url: required_url(video_url, "videoUrl")?,
                    format,
                    caption: item.caption.clone(),
                };
                let id = self
                    .create_container(&endpoint, node, &request, Stage::MediaContainer)
                    .await?;
                self.wait_for_container_ready(&endpoint, &id, &policy).await?;
                id
            }
            MediaPayload::Carousel { ref media_items } => {
                let children = validate_media_items(media_items)?;
                debug!("Carousel with {} items validated", children.len());
                self.create_carousel(&endpoint, node, &item.caption, children, &policy)
                    .await?
            }
        };

        let published = self
            .publish_container(&endpoint, node, &container_id, &policy)
            .await?;

        info!("Published {} container {} on node {}", kind, container_id, node);
        Ok(published)
    }
}

fn required_url(url: &str, field: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(InstagramError::InvalidParameter(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(url.to_string())
}
