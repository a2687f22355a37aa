//! Publish media action for Instagram

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{ActionContext, InstagramAction};
use crate::error::Result;
use crate::parameters::decode_items;
use crate::service::InstagramPublishService;

/// Action to publish images, reels, stories and carousels
pub struct PublishMediaAction {
    service: Arc<InstagramPublishService>,
}

impl PublishMediaAction {
    /// Create the action on top of a service
    pub fn new(service: Arc<InstagramPublishService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl InstagramAction for PublishMediaAction {
    fn name(&self) -> &'static str {
        "PUBLISH_INSTAGRAM_MEDIA"
    }

    fn description(&self) -> &'static str {
        "Publish images, reels, stories or carousels to Instagram through the Graph API"
    }

    async fn validate(&self, context: &ActionContext) -> Result<bool> {
        Ok(!context.items.is_empty())
    }

    async fn execute(&self, context: &ActionContext) -> Result<Value> {
        let config = self.service.config();
        let items = decode_items(&context.items, &config.graph_api_version);
        let continue_on_fail = context.continue_on_fail.unwrap_or(config.continue_on_fail);

        let outcomes = self
            .service
            .publish_batch_with(items, &continue_on_fail)
            .await?;

        let output = outcomes
            .iter()
            .map(|outcome| outcome.to_json())
            .collect::<Result<Vec<_>>>()?;

        Ok(Value::Array(output))
    }
}
