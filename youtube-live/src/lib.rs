//! Manage YouTube live broadcasts and live streams through the YouTube Data API v3.
//!
//! Start with [`LiveStreamingClient`]; see [`youtube_api`] for how broadcasts and streams relate.

pub mod alerts;
pub mod config;
pub mod error;
pub mod oauth;
pub mod youtube_api;

pub use alerts::{AlertSink, FailurePolicy, LogAlerts};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use oauth::{Authorize, BearerToken, OAuthGate, OAuthManager};
pub use youtube_api::LiveStreamingClient;
pub use youtube_api::broadcasts::{BroadcastFilter, BroadcastStatus};
pub use youtube_api::streams::{IngestionType, VideoFormat};
