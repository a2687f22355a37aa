//! Instagram actions module
//!
//! Contains action implementations for Instagram publishing.

mod publish_media;

pub use publish_media::PublishMediaAction;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Context for action execution
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// Per-item host parameter objects, in input order
    pub items: Vec<Value>,
    /// Overrides the configured continue-on-fail setting
    pub continue_on_fail: Option<bool>,
}

impl ActionContext {
    /// Context for a list of parameter objects
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items,
            continue_on_fail: None,
        }
    }

    /// Set continue-on-fail (builder pattern)
    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = Some(continue_on_fail);
        self
    }
}

/// Trait for Instagram actions
#[async_trait]
pub trait InstagramAction: Send + Sync {
    /// Get action name
    fn name(&self) -> &'static str;

    /// Get action description
    fn description(&self) -> &'static str;

    /// Validate if action should run
    async fn validate(&self, context: &ActionContext) -> Result<bool>;

    /// Execute the action
    async fn execute(&self, context: &ActionContext) -> Result<Value>;
}
