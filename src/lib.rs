//! elizaOS Instagram Publish Plugin
//!
//! This crate publishes images, reels, stories and carousels to Instagram
//! through the Facebook Graph API container workflow: create a media
//! container, poll it until it is ready, then publish it.
//!
//! # Features
//!
//! - `native`: Full async support with tokio, the default HTTP transport
//!   driver, the service and the actions (default)
//!
//! # Example
//!
//! ```no_run
//! use elizaos_plugin_instagram_publish::{InstagramConfig, InstagramPublishService, WorkItem};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = InstagramConfig::from_env().expect("Missing Instagram credentials");
//!     let service = InstagramPublishService::new(config);
//!     service.start().await.expect("Failed to start Instagram publish service");
//!
//!     let item = WorkItem::image("me", "Hello from elizaOS", "https://example.com/a.jpg");
//!     let outcomes = service.publish_batch(vec![Ok(item)]).await.expect("Publish failed");
//!     println!("{:?}", outcomes);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod batch;
pub mod config;
pub mod delay;
pub mod error;
pub mod parameters;
pub mod publish;
pub mod testing;
pub mod transport;
pub mod types;

#[cfg(feature = "native")]
pub mod service;

#[cfg(feature = "native")]
pub mod actions;

// Re-exports for convenience
pub use batch::{BatchExecutor, FailurePolicy};
pub use config::InstagramConfig;
pub use delay::Delay;
pub use error::{InstagramError, MediaItemsError, Result, Stage};
pub use parameters::ItemParameters;
pub use publish::MediaPublisher;
pub use transport::{ErrorEnvelope, GraphApiError, GraphRequest, GraphResponse, GraphTransport, HttpTransport};
pub use types::*;

#[cfg(feature = "native")]
pub use delay::TokioDelay;

#[cfg(feature = "native")]
pub use service::InstagramPublishService;

/// Plugin metadata
pub const PLUGIN_NAME: &str = "instagram-publish";
/// Plugin version matching Cargo.toml
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Plugin description
pub const PLUGIN_DESCRIPTION: &str = "Publish media to Instagram using the Facebook Graph API";

/// Graph API version used when an item does not name one
pub const DEFAULT_GRAPH_API_VERSION: &str = "v22.0";
/// Graph API host
pub const DEFAULT_GRAPH_HOST: &str = "graph.facebook.com";

/// Create the Instagram publish plugin instance
pub fn plugin() -> Plugin {
    Plugin {
        name: PLUGIN_NAME.to_string(),
        description: PLUGIN_DESCRIPTION.to_string(),
        version: PLUGIN_VERSION.to_string(),
    }
}

/// Plugin metadata structure
#[derive(Debug, Clone)]
pub struct Plugin {
    /// Plugin name
    pub name: String,
    /// Plugin description
    pub description: String,
    /// Plugin version
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_creation() {
        let p = plugin();
        assert_eq!(p.name, PLUGIN_NAME);
        assert!(!p.description.is_empty());
        assert_eq!(p.version, PLUGIN_VERSION);
    }
}
