//! Error types for the Instagram publishing plugin
//!
//! Every failure of a work item is an [`InstagramError`]. The batch executor
//! either returns it or turns it into an [`ErrorRecord`], never both.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::transport::ErrorEnvelope;
use crate::types::{ContainerId, ErrorKind, ErrorRecord};

/// Result type alias for Instagram operations
pub type Result<T> = std::result::Result<T, InstagramError>;

/// Step of the publish flow a remote call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Standalone request outside the publish flow
    Request,
    /// Creating an image, reel or story container
    MediaContainer,
    /// Creating carousel child `n` (1-based)
    CarouselItem(usize),
    /// Creating the carousel parent container
    CarouselContainer,
    /// Polling a container's status
    StatusCheck,
    /// Publishing a ready container
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::MediaContainer => write!(f, "media creation"),
            Self::CarouselItem(index) => write!(f, "carousel item {} creation", index),
            Self::CarouselContainer => write!(f, "carousel creation"),
            Self::StatusCheck => write!(f, "container status check"),
            Self::Publish => write!(f, "media publish"),
        }
    }
}

/// Reasons a carousel's `mediaItems` parameter is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaItemsError {
    /// Parameter is neither an object nor an array
    #[error("Media items parameter is missing or invalid. Please add at least 2 media items to the carousel.")]
    Malformed,

    /// Parameter is an empty object
    #[error("No media items provided. Please add at least 2 media items (images or videos) to the carousel.")]
    Empty,

    /// Fewer than the minimum number of children
    #[error("Carousel posts require at least 2 media items. Found: {found}")]
    TooFew {
        /// Children found
        found: usize,
    },

    /// More than the maximum number of children
    #[error("Carousel posts can contain at most 10 media items. Found: {found}")]
    TooMany {
        /// Children found
        found: usize,
    },

    /// Child is not an object
    #[error("Media item {index} is invalid")]
    InvalidItem {
        /// 1-based child index
        index: usize,
    },

    /// Child lacks the URL its type requires
    #[error("Media item {index} is missing {field}")]
    MissingUrl {
        /// 1-based child index
        index: usize,
        /// Missing parameter name
        field: &'static str,
    },

    /// Child type is neither IMAGE nor VIDEO
    #[error("Media item {index} has invalid type: {found}. Must be IMAGE or VIDEO.")]
    InvalidType {
        /// 1-based child index
        index: usize,
        /// Declared type
        found: String,
    },
}

/// Instagram plugin error types
#[derive(Debug, Error)]
pub enum InstagramError {
    /// Service is not started
    #[error("Instagram publish service not initialized - call start() first")]
    ClientNotInitialized,

    /// Service is already started
    #[error("Instagram publish service is already running")]
    AlreadyRunning,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Missing required setting
    #[error("Missing required setting: {0}")]
    MissingSetting(String),

    /// The Graph API call failed
    #[error("Graph API {stage} failed: {envelope}")]
    Transport {
        /// Step that issued the call
        stage: Stage,
        /// Normalized failure
        envelope: ErrorEnvelope,
    },

    /// The response body was not JSON
    #[error("{stage} response body is not valid JSON")]
    UnparseableResponse {
        /// Step that issued the call
        stage: Stage,
        /// Raw body
        body: String,
    },

    /// The creation response had no `id`
    #[error("{stage} response did not contain an id (creation_id)")]
    MissingCreationId {
        /// Step that issued the call
        stage: Stage,
        /// Response body as received
        response: Value,
    },

    /// The container reported ERROR or FAILED
    #[error("Media container reported error status ({}) while waiting to publish", .statuses.join(", "))]
    ContainerFailed {
        /// Container being polled
        container_id: ContainerId,
        /// Normalized status values
        statuses: Vec<String>,
    },

    /// The container stayed pending for the whole poll budget
    #[error(
        "Timed out waiting for container to become ready. Last known status: {}",
        .last_status.as_deref().unwrap_or("unknown")
    )]
    PollTimeout {
        /// Container being polled
        container_id: ContainerId,
        /// Status checks performed
        attempts: u32,
        /// Last string status seen
        last_status: Option<String>,
    },

    /// A carousel child never became ready
    #[error("Failed to wait for carousel item {index} container {container_id} to be ready: {source}")]
    CarouselItemNotReady {
        /// 1-based child index
        index: usize,
        /// Child container
        container_id: ContainerId,
        /// Poll failure
        #[source]
        source: Box<InstagramError>,
    },

    /// A carousel child container could not be created
    #[error("Failed to create carousel item {index}: {source}")]
    CarouselItemCreationFailed {
        /// 1-based child index
        index: usize,
        /// Query parameters sent for the child
        payload: Value,
        /// Creation failure
        #[source]
        source: Box<InstagramError>,
    },

    /// Publishing a ready container failed
    #[error("Media was created but publishing failed after {attempts} attempt(s): {envelope}")]
    PublishFailed {
        /// Container that was created
        creation_id: ContainerId,
        /// Publish attempts made
        attempts: u32,
        /// Failure of the last attempt
        envelope: ErrorEnvelope,
    },

    /// Carousel media items rejected
    #[error("Invalid carousel media items: {0}")]
    InvalidMediaItems(#[from] MediaItemsError),

    /// Item parameter missing or malformed
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation other than publish
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Resource other than image, reels, stories or carousel
    #[error("Unsupported resource: {0}")]
    UnsupportedResource(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(String),
}

/// Note attached to records of containers that could not be published
pub const PUBLISH_FAILED_NOTE: &str = "Media was created but publishing failed";

impl InstagramError {
    /// Failure class
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } | Self::HttpError(_) => ErrorKind::Transport,
            Self::UnparseableResponse { .. }
            | Self::MissingCreationId { .. }
            | Self::SerializationError(_) => ErrorKind::Protocol,
            Self::ContainerFailed { .. } => ErrorKind::ContainerStatus,
            Self::PollTimeout { .. } => ErrorKind::Timeout,
            Self::CarouselItemNotReady { source, .. }
            | Self::CarouselItemCreationFailed { source, .. } => source.kind(),
            Self::PublishFailed { .. } => ErrorKind::Publish,
            Self::InvalidMediaItems(_)
            | Self::InvalidParameter(_)
            | Self::UnsupportedOperation(_)
            | Self::UnsupportedResource(_) => ErrorKind::Validation,
            Self::ClientNotInitialized
            | Self::AlreadyRunning
            | Self::ConfigError(_)
            | Self::MissingSetting(_) => ErrorKind::Configuration,
        }
    }

    /// Whether the error was raised before any remote call
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Container left behind by the failure, if any
    pub fn creation_id(&self) -> Option<&ContainerId> {
        match self {
            Self::ContainerFailed { container_id, .. }
            | Self::PollTimeout { container_id, .. }
            | Self::CarouselItemNotReady { container_id, .. } => Some(container_id),
            Self::PublishFailed { creation_id, .. } => Some(creation_id),
            _ => None,
        }
    }

    /// Transport envelope carried by the error, if any
    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            Self::Transport { envelope, .. } | Self::PublishFailed { envelope, .. } => Some(envelope),
            Self::CarouselItemNotReady { source, .. }
            | Self::CarouselItemCreationFailed { source, .. } => source.envelope(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for InstagramError {
    fn from(err: serde_json::Error) -> Self {
        InstagramError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for InstagramError {
    fn from(err: reqwest::Error) -> Self {
        InstagramError::HttpError(err.to_string())
    }
}

impl From<ErrorEnvelope> for InstagramError {
    fn from(envelope: ErrorEnvelope) -> Self {
        InstagramError::Transport {
            stage: Stage::Request,
            envelope,
        }
    }
}

impl ErrorRecord {
    fn new(error_kind: ErrorKind, message: String) -> Self {
        Self {
            status_code: None,
            message,
            error_kind,
            remote: Map::new(),
            headers: Default::default(),
            note: None,
            creation_id: None,
            child_index: None,
            payload: None,
        }
    }

    fn apply_envelope(&mut self, envelope: &ErrorEnvelope) {
        self.status_code = envelope.status_code;
        self.message = envelope.display_message().to_string();
        if let Some(ref error) = envelope.error {
            self.remote = error.to_fields();
        }
        self.headers = envelope.headers.clone();
    }
}

impl From<&InstagramError> for ErrorRecord {
    fn from(err: &InstagramError) -> Self {
        let mut record = ErrorRecord::new(err.kind(), err.to_string());

        match err {
            InstagramError::Transport { stage, envelope } => {
                record.apply_envelope(envelope);
                if let Stage::CarouselItem(index) = stage {
                    record.child_index = Some(*index);
                }
            }
            InstagramError::UnparseableResponse { stage, body } => {
                record
                    .remote
                    .insert("response".to_string(), Value::String(body.clone()));
                if let Stage::CarouselItem(index) = stage {
                    record.child_index = Some(*index);
                }
            }
            InstagramError::MissingCreationId { stage, response } => {
                record.remote.insert("response".to_string(), response.clone());
                if let Stage::CarouselItem(index) = stage {
                    record.child_index = Some(*index);
                }
            }
            InstagramError::ContainerFailed {
                container_id,
                statuses,
            } => {
                record.creation_id = Some(container_id.clone());
                record.remote.insert(
                    "statuses".to_string(),
                    Value::Array(statuses.iter().cloned().map(Value::String).collect()),
                );
            }
            InstagramError::PollTimeout {
                container_id,
                attempts,
                last_status,
            } => {
                record.creation_id = Some(container_id.clone());
                record
                    .remote
                    .insert("pollAttempts".to_string(), Value::from(*attempts));
                if let Some(status) = last_status {
                    record
                        .remote
                        .insert("lastStatus".to_string(), Value::String(status.clone()));
                }
            }
            InstagramError::CarouselItemNotReady {
                index,
                container_id,
                source,
            } => {
                record = ErrorRecord::from(source.as_ref());
                record.message = err.to_string();
                record.child_index = Some(*index);
                record.creation_id = Some(container_id.clone());
            }
            InstagramError::CarouselItemCreationFailed {
                index,
                payload,
                source,
            } => {
                record = ErrorRecord::from(source.as_ref());
                record.message = err.to_string();
                record.child_index = Some(*index);
                record.payload = Some(payload.clone());
            }
            InstagramError::PublishFailed {
                creation_id,
                envelope,
                ..
            } => {
                record.apply_envelope(envelope);
                record.creation_id = Some(creation_id.clone());
                record.note = Some(PUBLISH_FAILED_NOTE.to_string());
            }
            _ => {}
        }

        record
    }
}
