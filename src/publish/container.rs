//! Container creation: `POST /{node}/media`

use serde_json::Value;
use tracing::debug;

use super::MediaPublisher;
use crate::error::{InstagramError, Result, Stage};
use crate::transport::{GraphEndpoint, GraphRequest, GraphResponse};
use crate::types::{CarouselChild, ContainerId, MediaKind, VideoFormat};

/// Creation request for one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerRequest {
    /// Image post
    Image {
        /// Public image URL
        image_url: String,
        /// Caption text
        caption: String,
    },
    /// Reel or story
    Video {
        /// Public video URL
        video_url: String,
        /// Reel or story
        format: VideoFormat,
        /// Caption text
        caption: String,
    },
    /// Carousel child, created without a caption
    CarouselChild(CarouselChild),
    /// Carousel parent
    Carousel {
        /// Ready child containers, in order
        children: Vec<ContainerId>,
        /// Caption text
        caption: String,
    },
}

impl ContainerRequest {
    /// Media kind of the container
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Image { .. } => MediaKind::Image,
            Self::Video { .. } => MediaKind::Video,
            Self::CarouselChild(_) => MediaKind::CarouselChild,
            Self::Carousel { .. } => MediaKind::Carousel,
        }
    }

    /// Query parameters sent to `/{node}/media`
    pub fn query(&self) -> Vec<(String, String)> {
        let pairs: Vec<(&str, String)> = match self {
            Self::Image { image_url, caption } => vec![
                ("caption", caption.clone()),
                ("image_url", image_url.clone()),
            ],
            Self::Video {
                video_url,
                format,
                caption,
            } => vec![
                ("caption", caption.clone()),
                ("video_url", video_url.clone()),
                ("media_type", format.media_type().to_string()),
            ],
            Self::CarouselChild(CarouselChild::Image { image_url }) => vec![
                ("is_carousel_item", "true".to_string()),
                ("image_url", image_url.clone()),
            ],
            Self::CarouselChild(CarouselChild::Video { video_url }) => vec![
                ("is_carousel_item", "true".to_string()),
                ("video_url", video_url.clone()),
                ("media_type", "VIDEO".to_string()),
            ],
            Self::Carousel { children, caption } => vec![
                ("media_type", "CAROUSEL".to_string()),
                (
                    "children",
                    children
                        .iter()
                        .map(ContainerId::as_str)
                        .collect::<Vec<_>>()
                        .join(","),
                ),
                ("caption", caption.clone()),
            ],
        };

        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

fn creation_id(body: &Value) -> Option<ContainerId> {
    match body.get("id")? {
        Value::String(id) if !id.is_empty() => Some(ContainerId::new(id.clone())),
        Value::Number(id) => Some(ContainerId::new(id.to_string())),
        _ => None,
    }
}

impl MediaPublisher {
    /// Create one container and return its creation id
    ///
    /// No retry happens here; a failed creation fails the item.
    pub(crate) async fn create_container(
        &self,
        endpoint: &GraphEndpoint,
        node: &str,
        request: &ContainerRequest,
        stage: Stage,
    ) -> Result<ContainerId> {
        debug!("Creating {} container on node {} ({})", request.kind(), node, stage);

        let graph_request = GraphRequest::post(endpoint.media(node)).with_query_pairs(request.query());

        let response = self
            .transport
            .request(graph_request)
            .await
            .map_err(|envelope| InstagramError::Transport { stage, envelope })?;

        match response {
            GraphResponse::Text(body) => Err(InstagramError::UnparseableResponse { stage, body }),
            GraphResponse::Json(body) => {
                let id = creation_id(&body)
                    .ok_or(InstagramError::MissingCreationId { stage, response: body })?;
                debug!("Created container {} ({})", id, stage);
                Ok(id)
            }
        }
    }
}
