//! Client for the live-streaming part of the YouTube Data API v3.
//!
//! # Broadcasts vs Streams
//!
//! The YouTube Live API has two resource types that work together:
//!
//! - [`broadcasts::LiveBroadcast`]: the viewer-facing event. Title, schedule, privacy and
//!   lifecycle. Each broadcast is exactly one YouTube video.
//! - [`streams::LiveStream`]: the encoder-facing pipeline. Resolution, frame rate, ingestion
//!   protocol and stream key. One stream can power many broadcasts over time.
//!
//! ## Typical Workflow
//! 1. Create a [`streams::LiveStream`] (done once, reusable)
//! 2. Create a [`broadcasts::LiveBroadcast`] for each live event
//! 3. Bind the broadcast to the stream before going live
//! 4. Transition the broadcast through `testing`, `live` and `complete`
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tokio_stream::StreamExt;
//! use youtube_live::{BroadcastFilter, Config, LiveStreamingClient};
//!
//! # async fn example() -> eyre::Result<()> {
//! let client = LiveStreamingClient::with_oauth(Config::from_env()?);
//!
//! let mut broadcasts = std::pin::pin!(client.broadcasts(BroadcastFilter::Upcoming));
//! while let Some(broadcast) = broadcasts.next().await {
//!     let broadcast = broadcast?;
//!     println!("{} ({})", broadcast.snippet.title, broadcast.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod broadcasts;
pub mod client;
pub mod datetime;
pub mod streams;
pub mod types;

pub use client::LiveStreamingClient;
pub use types::{ApiErrorBody, PageInfo, PagedStream, Resource, find_by_id};

pub use broadcasts::{
    BroadcastFilter, BroadcastLifeCycleStatus, BroadcastStatus, LiveBroadcast,
    LiveBroadcastContentDetails, LiveBroadcastListResponse, LiveBroadcastSnippet,
    LiveBroadcastStatus, PrivacyStatus,
};

pub use streams::{
    FrameRate, IngestionInfo, IngestionType, LiveStream, LiveStreamCdn, LiveStreamListResponse,
    LiveStreamSnippet, LiveStreamStatus, StreamStatus, VideoFormat,
};
