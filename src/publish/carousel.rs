//! Carousel assembly: children first, then the parent container

use serde_json::{Map, Value};
use tracing::debug;

use super::container::ContainerRequest;
use super::MediaPublisher;
use crate::error::{InstagramError, MediaItemsError, Result, Stage};
use crate::transport::GraphEndpoint;
use crate::types::{CarouselChild, ContainerId, PublishPolicy};

/// Fewest children a carousel accepts
pub const MIN_CAROUSEL_ITEMS: usize = 2;

/// Most children a carousel accepts
pub const MAX_CAROUSEL_ITEMS: usize = 10;

fn child_entries(media_items: &Value) -> std::result::Result<Vec<&Value>, MediaItemsError> {
    match media_items {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(object) => Ok(match (object.get("item"), object.get("values")) {
            (Some(Value::Array(items)), _) => items.iter().collect(),
            (Some(item), _) if item.is_object() => vec![item],
            (_, Some(Value::Array(values))) => values.iter().collect(),
            _ => Vec::new(),
        }),
        _ => Err(MediaItemsError::Malformed),
    }
}

fn is_empty_parameter(media_items: &Value) -> bool {
    match media_items {
        Value::Array(items) => items.is_empty(),
        Value::Object(object) => object.is_empty(),
        _ => false,
    }
}

fn url_field(child: &Map<String, Value>, field: &str) -> Option<String> {
    let url = match child.get(field)? {
        Value::String(s) => s.trim().to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!url.is_empty()).then_some(url)
}

fn validate_child(index: usize, entry: &Value) -> std::result::Result<CarouselChild, MediaItemsError> {
    let child = entry
        .as_object()
        .ok_or(MediaItemsError::InvalidItem { index })?;

    let declared = match child.get("type") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    match declared.as_str() {
        "IMAGE" => url_field(child, "imageUrl")
            .map(|image_url| CarouselChild::Image { image_url })
            .ok_or(MediaItemsError::MissingUrl {
                index,
                field: "imageUrl",
            }),
        "VIDEO" => url_field(child, "videoUrl")
            .map(|video_url| CarouselChild::Video { video_url })
            .ok_or(MediaItemsError::MissingUrl {
                index,
                field: "videoUrl",
            }),
        _ => Err(MediaItemsError::InvalidType {
            index,
            found: declared,
        }),
    }
}

/// Validate a raw `mediaItems` parameter into ordered carousel children
///
/// Accepts a bare array, `{ "item": [...] }`, `{ "item": {...} }` or
/// `{ "values": [...] }`. Any other object holds zero children.
pub fn validate_media_items(
    media_items: &Value,
) -> std::result::Result<Vec<CarouselChild>, MediaItemsError> {
    let entries = child_entries(media_items)?;

    if entries.len() < MIN_CAROUSEL_ITEMS {
        if is_empty_parameter(media_items) {
            return Err(MediaItemsError::Empty);
        }
        return Err(MediaItemsError::TooFew {
            found: entries.len(),
        });
    }

    if entries.len() > MAX_CAROUSEL_ITEMS {
        return Err(MediaItemsError::TooMany {
            found: entries.len(),
        });
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| validate_child(i + 1, entry))
        .collect()
}

fn query_object(request: &ContainerRequest) -> Value {
    Value::Object(
        request
            .query()
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    )
}

impl MediaPublisher {
    /// Create and await every child, then create and await the parent
    ///
    /// Children are handled strictly in order and the first failure stops
    /// the carousel. Returns the ready parent container.
    pub(crate) async fn create_carousel(
        &self,
        endpoint: &GraphEndpoint,
        node: &str,
        caption: &str,
        children: Vec<CarouselChild>,
        policy: &PublishPolicy,
    ) -> Result<ContainerId> {
        let total = children.len();
        let mut child_ids = Vec::with_capacity(total);

        for (i, child) in children.into_iter().enumerate() {
            let index = i + 1;
            let request = ContainerRequest::CarouselChild(child);

            let child_id = self
                .create_container(endpoint, node, &request, Stage::CarouselItem(index))
                .await
                .map_err(|source| InstagramError::CarouselItemCreationFailed {
                    index,
                    payload: query_object(&request),
                    source: Box::new(source),
                })?;

            self.wait_for_container_ready(endpoint, &child_id, policy)
                .await
                .map_err(|source| InstagramError::CarouselItemNotReady {
                    index,
                    container_id: child_id.clone(),
                    source: Box::new(source),
                })?;

            debug!("Carousel item {}/{} ready: {}", index, total, child_id);
            child_ids.push(child_id);
        }

        let parent = ContainerRequest::Carousel {
            children: child_ids,
            caption: caption.to_string(),
        };
        let parent_id = self
            .create_container(endpoint, node, &parent, Stage::CarouselContainer)
            .await?;

        self.wait_for_container_ready(endpoint, &parent_id, policy)
            .await?;

        Ok(parent_id)
    }
}
