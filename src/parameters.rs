//! Decoding of per-item host parameters into work items

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::validate_graph_api_version;
use crate::error::{InstagramError, Result};
use crate::types::WorkItem;

/// Only operation the plugin implements
pub const PUBLISH_OPERATION: &str = "publish";

/// Resources the plugin can publish
pub const SUPPORTED_RESOURCES: [&str; 4] = ["image", "reels", "stories", "carousel"];

fn default_operation() -> String {
    PUBLISH_OPERATION.to_string()
}

/// Host parameter object for one input item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemParameters {
    /// `image`, `reels`, `stories` or `carousel`
    #[serde(default)]
    pub resource: String,
    /// Always `publish`
    #[serde(default = "default_operation")]
    pub operation: String,
    /// Instagram Business Account ID or User ID
    #[serde(default)]
    pub node: String,
    /// Graph API version; the configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_api_version: Option<String>,
    /// Caption text
    #[serde(default)]
    pub caption: String,
    /// Image URL for image posts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Video URL for reels and stories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Raw carousel children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_items: Option<Value>,
}

impl ItemParameters {
    /// Decode a host parameter object
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| InstagramError::InvalidParameter(format!("malformed item parameters: {}", e)))
    }

    /// Build the work item these parameters describe
    ///
    /// Carousel children are kept raw here and validated when the item runs.
    pub fn into_work_item(self, default_version: &str) -> Result<WorkItem> {
        if self.operation != PUBLISH_OPERATION {
            return Err(InstagramError::UnsupportedOperation(self.operation));
        }

        if !SUPPORTED_RESOURCES.contains(&self.resource.as_str()) {
            return Err(InstagramError::UnsupportedResource(self.resource));
        }

        let node = self.node.trim();
        if node.is_empty() {
            return Err(InstagramError::InvalidParameter(
                "node is required".to_string(),
            ));
        }

        let version = self
            .graph_api_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(default_version)
            .to_string();
        validate_graph_api_version(&version)
            .map_err(|_| InstagramError::InvalidParameter(format!("invalid graphApiVersion '{}'", version)))?;

        let item = match self.resource.as_str() {
            "image" => WorkItem::image(node, self.caption, required(self.image_url, "imageUrl")?),
            "reels" => WorkItem::reel(node, self.caption, required(self.video_url, "videoUrl")?),
            "stories" => WorkItem::story(node, self.caption, required(self.video_url, "videoUrl")?),
            _ => WorkItem::carousel_raw(node, self.caption, self.media_items.unwrap_or(Value::Null)),
        };

        Ok(item.with_graph_api_version(version))
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| InstagramError::InvalidParameter(format!("{} is required", field)))
}

/// Decode every input item, keeping failures in place
pub fn decode_items(items: &[Value], default_version: &str) -> Vec<Result<WorkItem>> {
    items
        .iter()
        .map(|value| ItemParameters::from_value(value)?.into_work_item(default_version))
        .collect()
}
