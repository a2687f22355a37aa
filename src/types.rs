//! Type definitions for the Instagram publishing plugin
//!
//! Strong types for work items, publish policies and per-item outcomes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{InstagramError, Result};
use crate::DEFAULT_GRAPH_API_VERSION;

/// Kind of media container handled by the publish flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Single image post
    Image,
    /// Video container, published as a reel or a story
    Video,
    /// One image or video inside a carousel
    CarouselChild,
    /// Carousel parent aggregating its children
    Carousel,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::CarouselChild => "carousel_child",
            Self::Carousel => "carousel",
        };
        write!(f, "{}", s)
    }
}

/// Where a video container ends up once published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    /// Reel
    Reels,
    /// Story
    Stories,
}

impl VideoFormat {
    /// Graph API `media_type` value for this format
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Reels => "REELS",
            Self::Stories => "STORIES",
        }
    }
}

/// Timing budget for polling and publishing one work item
///
/// Selected once per work item from its top-level kind and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishPolicy {
    poll_interval_ms: u64,
    max_poll_attempts: u32,
    publish_retry_delay_ms: u64,
    publish_max_attempts: u32,
}

impl PublishPolicy {
    /// Policy for image posts
    pub const IMAGE: Self = Self {
        poll_interval_ms: 1500,
        max_poll_attempts: 20,
        publish_retry_delay_ms: 1500,
        publish_max_attempts: 3,
    };

    /// Policy for reels and stories
    pub const VIDEO: Self = Self {
        poll_interval_ms: 3000,
        max_poll_attempts: 80,
        publish_retry_delay_ms: 3000,
        publish_max_attempts: 6,
    };

    /// Policy for carousels and their children
    pub const CAROUSEL: Self = Self {
        poll_interval_ms: 1500,
        max_poll_attempts: 20,
        publish_retry_delay_ms: 1500,
        publish_max_attempts: 3,
    };

    /// Build a custom policy
    ///
    /// # Errors
    ///
    /// Returns `InstagramError::ConfigError` if any field is zero.
    pub fn new(
        poll_interval_ms: u64,
        max_poll_attempts: u32,
        publish_retry_delay_ms: u64,
        publish_max_attempts: u32,
    ) -> Result<Self> {
        if poll_interval_ms == 0
            || max_poll_attempts == 0
            || publish_retry_delay_ms == 0
            || publish_max_attempts == 0
        {
            return Err(InstagramError::ConfigError(
                "Publish policy values must all be positive".to_string(),
            ));
        }

        Ok(Self {
            poll_interval_ms,
            max_poll_attempts,
            publish_retry_delay_ms,
            publish_max_attempts,
        })
    }

    /// Built-in policy for a media kind
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => Self::IMAGE,
            MediaKind::Video => Self::VIDEO,
            MediaKind::CarouselChild | MediaKind::Carousel => Self::CAROUSEL,
        }
    }

    /// Delay between status checks in milliseconds
    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    /// Ceiling on status checks per container
    pub fn max_poll_attempts(&self) -> u32 {
        self.max_poll_attempts
    }

    /// Delay between publish attempts in milliseconds
    pub fn publish_retry_delay_ms(&self) -> u64 {
        self.publish_retry_delay_ms
    }

    /// Ceiling on publish attempts
    pub fn publish_max_attempts(&self) -> u32 {
        self.publish_max_attempts
    }
}

/// Opaque container identifier returned by the Graph API
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Wrap a creation id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw carousel child as supplied by the host parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSpec {
    /// Declared type, `IMAGE` or `VIDEO`
    #[serde(rename = "type")]
    pub media_type: String,
    /// Image URL for `IMAGE` children
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Video URL for `VIDEO` children
    #[serde(rename = "videoUrl", skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl ChildSpec {
    /// Image child
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            media_type: "IMAGE".to_string(),
            image_url: Some(url.into()),
            video_url: None,
        }
    }

    /// Video child
    pub fn video(url: impl Into<String>) -> Self {
        Self {
            media_type: "VIDEO".to_string(),
            image_url: None,
            video_url: Some(url.into()),
        }
    }
}

/// Validated carousel child
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarouselChild {
    /// Image with a trimmed, non-empty URL
    Image {
        /// Public image URL
        image_url: String,
    },
    /// Video with a trimmed, non-empty URL
    Video {
        /// Public video URL
        video_url: String,
    },
}

/// Kind-specific payload of a work item
#[derive(Debug, Clone, PartialEq)]
pub enum MediaPayload {
    /// Single image
    Image {
        /// Public image URL
        image_url: String,
    },
    /// Reel or story video
    Video {
        /// Public video URL
        video_url: String,
        /// Reel or story
        format: VideoFormat,
    },
    /// Carousel, validated when the item is processed
    Carousel {
        /// Raw `mediaItems` parameter
        media_items: Value,
    },
}

/// One unit of the input batch
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    /// Instagram Business Account ID or User ID to publish on
    pub node: String,
    /// Graph API version, e.g. `v22.0`
    pub graph_api_version: String,
    /// Caption text
    pub caption: String,
    /// Media payload
    pub media: MediaPayload,
}

impl WorkItem {
    fn with_media(node: impl Into<String>, caption: impl Into<String>, media: MediaPayload) -> Self {
        Self {
            node: node.into(),
            graph_api_version: DEFAULT_GRAPH_API_VERSION.to_string(),
            caption: caption.into(),
            media,
        }
    }

    /// Image post
    pub fn image(
        node: impl Into<String>,
        caption: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self::with_media(
            node,
            caption,
            MediaPayload::Image {
                image_url: image_url.into(),
            },
        )
    }

    /// Reel
    pub fn reel(
        node: impl Into<String>,
        caption: impl Into<String>,
        video_url: impl Into<String>,
    ) -> Self {
        Self::with_media(
            node,
            caption,
            MediaPayload::Video {
                video_url: video_url.into(),
                format: VideoFormat::Reels,
            },
        )
    }

    /// Story
    pub fn story(
        node: impl Into<String>,
        caption: impl Into<String>,
        video_url: impl Into<String>,
    ) -> Self {
        Self::with_media(
            node,
            caption,
            MediaPayload::Video {
                video_url: video_url.into(),
                format: VideoFormat::Stories,
            },
        )
    }

    /// Carousel from typed children
    pub fn carousel(
        node: impl Into<String>,
        caption: impl Into<String>,
        children: &[ChildSpec],
    ) -> Self {
        let media_items = Value::Array(
            children
                .iter()
                .filter_map(|child| serde_json::to_value(child).ok())
                .collect(),
        );
        Self::carousel_raw(node, caption, media_items)
    }

    /// Carousel from the raw `mediaItems` parameter
    pub fn carousel_raw(
        node: impl Into<String>,
        caption: impl Into<String>,
        media_items: Value,
    ) -> Self {
        Self::with_media(node, caption, MediaPayload::Carousel { media_items })
    }

    /// Override the Graph API version (builder pattern)
    pub fn with_graph_api_version(mut self, version: impl Into<String>) -> Self {
        self.graph_api_version = version.into();
        self
    }

    /// Top-level media kind
    pub fn kind(&self) -> MediaKind {
        match self.media {
            MediaPayload::Image { .. } => MediaKind::Image,
            MediaPayload::Video { .. } => MediaKind::Video,
            MediaPayload::Carousel { .. } => MediaKind::Carousel,
        }
    }

    /// Policy selected for this item
    pub fn policy(&self) -> PublishPolicy {
        PublishPolicy::for_kind(self.kind())
    }
}

/// Failure class of a recorded error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// HTTP call failed
    Transport,
    /// Remote payload had an unexpected shape
    Protocol,
    /// Container reported ERROR or FAILED
    ContainerStatus,
    /// Container never became ready
    Timeout,
    /// Container exists but could not be published
    Publish,
    /// Input rejected before any remote call
    Validation,
    /// Plugin misconfigured or not started
    Configuration,
}

/// Structured output for a failed work item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// HTTP status code, when the failure came from an HTTP response
    #[serde(rename = "statusCode", skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Human-readable message
    pub message: String,
    /// Failure class
    pub error_kind: ErrorKind,
    /// Remote Graph API error fields (`code`, `error_subcode`, `type`, ...)
    #[serde(flatten)]
    pub remote: Map<String, Value>,
    /// Response headers
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Contextual note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Container that was created before the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_id: Option<ContainerId>,
    /// 1-based carousel child the failure belongs to
    #[serde(rename = "itemIndex", skip_serializing_if = "Option::is_none")]
    pub child_index: Option<usize>,
    /// Creation parameters of the failed carousel child
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Published media object or the error that stopped the item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemResult {
    /// Publish response body
    Published(Value),
    /// Recorded failure
    Failed(ErrorRecord),
}

/// Outcome of one work item, paired with its input index
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    /// Index of the input item
    pub item_index: usize,
    /// Result
    pub result: ItemResult,
}

impl ItemOutcome {
    /// Whether the item was published
    pub fn is_published(&self) -> bool {
        matches!(self.result, ItemResult::Published(_))
    }

    /// Recorded error, if the item failed
    pub fn error(&self) -> Option<&ErrorRecord> {
        match self.result {
            ItemResult::Failed(ref record) => Some(record),
            ItemResult::Published(_) => None,
        }
    }

    /// Host output item: `{ "json": ..., "pairedItem": { "item": n } }`
    pub fn to_json(&self) -> Result<Value> {
        let body = match self.result {
            ItemResult::Published(ref value) => value.clone(),
            ItemResult::Failed(ref record) => serde_json::to_value(record)?,
        };
        Ok(json!({
            "json": body,
            "pairedItem": { "item": self.item_index },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_policy_for_kind() {
        assert_eq!(PublishPolicy::for_kind(MediaKind::Image), PublishPolicy::IMAGE);
        assert_eq!(PublishPolicy::for_kind(MediaKind::Video).publish_max_attempts(), 6);
        assert_eq!(PublishPolicy::for_kind(MediaKind::Video).max_poll_attempts(), 80);
        assert_eq!(
            PublishPolicy::for_kind(MediaKind::CarouselChild),
            PublishPolicy::for_kind(MediaKind::Carousel)
        );
    }

    #[test]
    fn test_policy_rejects_zero() {
        assert!(PublishPolicy::new(0, 1, 1, 1).is_err());
        assert!(PublishPolicy::new(1, 1, 1, 0).is_err());
        let policy = PublishPolicy::new(10, 2, 20, 4).unwrap();
        assert_eq!(policy.poll_interval_ms(), 10);
        assert_eq!(policy.publish_retry_delay_ms(), 20);
    }

    #[test]
    fn test_work_item_kind() {
        assert_eq!(WorkItem::image("me", "", "https://x/a.jpg").kind(), MediaKind::Image);
        assert_eq!(WorkItem::story("me", "", "https://x/a.mp4").kind(), MediaKind::Video);
        let carousel = WorkItem::carousel("me", "", &[ChildSpec::image("https://x/a.jpg")]);
        assert_eq!(carousel.kind(), MediaKind::Carousel);
        assert_eq!(carousel.graph_api_version, DEFAULT_GRAPH_API_VERSION);
    }

    #[test]
    fn test_carousel_children_serialize_as_parameters() {
        let item = WorkItem::carousel(
            "me",
            "",
            &[ChildSpec::image("https://x/a.jpg"), ChildSpec::video("https://x/b.mp4")],
        );
        let MediaPayload::Carousel { media_items } = item.media else {
            panic!("expected carousel payload");
        };
        assert_eq!(
            media_items,
            json!([
                { "type": "IMAGE", "imageUrl": "https://x/a.jpg" },
                { "type": "VIDEO", "videoUrl": "https://x/b.mp4" }
            ])
        );

        let spec: ChildSpec = serde_json::from_value(media_items[1].clone()).unwrap();
        assert_eq!(spec, ChildSpec::video("https://x/b.mp4"));
    }

    #[test]
    fn test_video_format_media_type() {
        assert_eq!(VideoFormat::Reels.media_type(), "REELS");
        assert_eq!(VideoFormat::Stories.media_type(), "STORIES");
    }

    #[test]
    fn test_outcome_json_pairs_item() {
        let outcome = ItemOutcome {
            item_index: 2,
            result: ItemResult::Published(json!({ "id": "p1" })),
        };
        let value = outcome.to_json().unwrap();
        assert_eq!(value["json"]["id"], "p1");
        assert_eq!(value["pairedItem"]["item"], 2);
        assert!(outcome.is_published());
        assert!(outcome.error().is_none());
    }
}
