//! `liveStreams`: the encoder-facing side of a live event.
//!
//! A stream carries the ingestion settings (resolution, frame rate, protocol, stream key). One
//! stream can be bound to many broadcasts over time.

use crate::alerts::FailurePolicy;
use crate::error::{Error, Result};
use crate::oauth::Authorize;
use crate::youtube_api::broadcasts::TitleSnippet;
use crate::youtube_api::client::{LiveStreamingClient, MAX_RESULTS};
use crate::youtube_api::types::{PageInfo, PagedStream, Resource, find_by_id};
use http::Method;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use tokio_stream::Stream;
use tracing::instrument;

const STREAMS: &str = "liveStreams";
const STREAM_PARTS: &str = "id,snippet,cdn,status";

/// Response structure for the `liveStreams.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveStreams/list>
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamListResponse {
    /// `youtube#liveStreamListResponse`.
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub items: VecDeque<LiveStream>,
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_page_token: Option<String>,
}

/// A `liveStream` resource represents the video pipeline for transmitting content to YouTube.
///
/// A single stream can be reused across multiple broadcasts, and streams can exist independently
/// of any specific broadcast event.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveStreams#resource>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStream {
    pub id: String,
    #[serde(default)]
    pub snippet: LiveStreamSnippet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<LiveStreamCdn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LiveStreamStatus>,
}

impl Resource for LiveStream {
    fn id(&self) -> &str {
        &self.id
    }
}

impl LiveStream {
    /// The stream key an encoder has to push to.
    pub fn stream_name(&self) -> Option<&str> {
        self.cdn
            .as_ref()
            .and_then(|cdn| cdn.ingestion_info.as_ref())
            .and_then(|info| info.stream_name.as_deref())
    }

    pub fn stream_status(&self) -> Option<StreamStatus> {
        self.status.as_ref().map(|s| s.stream_status)
    }
}

/// See: <https://developers.google.com/youtube/v3/live/docs/liveStreams#snippet>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
}

/// Encoder-facing settings of a stream.
///
/// Values are kept as YouTube reports them: the service uses a few (`variable`, `hls`) that this
/// client never sends.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveStreams#cdn>
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamCdn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingestion_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingestion_info: Option<IngestionInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionInfo {
    /// The stream key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingestion_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_ingestion_address: Option<String>,
}

/// See: <https://developers.google.com/youtube/v3/live/docs/liveStreams#status>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamStatus {
    pub stream_status: StreamStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_status: Option<HealthStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `good`, `ok`, `bad` or `noData`.
    pub status: String,
}

/// The status of a live stream.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveStreams#status.streamStatus>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamStatus {
    /// The stream is receiving data.
    Active,
    /// The stream exists but lacks valid CDN settings.
    Created,
    /// An error condition exists on the stream.
    Error,
    /// The stream is not receiving data.
    Inactive,
    /// The stream has valid CDN settings.
    Ready,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Created => write!(f, "created"),
            Self::Error => write!(f, "error"),
            Self::Inactive => write!(f, "inactive"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Video format / resolution of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoFormat {
    #[serde(rename = "240p")]
    P240,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
}

impl VideoFormat {
    pub const ALL: [Self; 6] = [
        Self::P240,
        Self::P360,
        Self::P480,
        Self::P720,
        Self::P1080,
        Self::P1440,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P240 => "240p",
            Self::P360 => "360p",
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
            Self::P1440 => "1440p",
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown video format {s:?}, expected one of 240p, 360p, 480p, 720p, 1080p, 1440p"
                ))
            })
    }
}

/// How video gets pushed into a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IngestionType {
    Dash,
    Rtmp,
}

impl fmt::Display for IngestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dash => write!(f, "dash"),
            Self::Rtmp => write!(f, "rtmp"),
        }
    }
}

impl FromStr for IngestionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dash" => Ok(Self::Dash),
            "rtmp" => Ok(Self::Rtmp),
            _ => Err(Error::InvalidArgument(format!(
                "unknown ingestion type {s:?}, expected dash or rtmp"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameRate {
    #[serde(rename = "30fps")]
    Fps30,
    #[serde(rename = "60fps")]
    Fps60,
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fps30 => write!(f, "30fps"),
            Self::Fps60 => write!(f, "60fps"),
        }
    }
}

/// The `cdn` block of an update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnUpdate {
    pub format: VideoFormat,
    pub ingestion_type: IngestionType,
}

/// Body of `liveStreams.insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamInsertRequest {
    pub snippet: StreamInsertSnippet,
    pub cdn: StreamInsertCdn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamInsertSnippet {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInsertCdn {
    pub resolution: VideoFormat,
    pub frame_rate: FrameRate,
    pub ingestion_type: IngestionType,
    pub ingestion_info: StreamInsertIngestionInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInsertIngestionInfo {
    pub stream_name: String,
}

impl LiveStreamInsertRequest {
    /// A 720p60 RTMP stream.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        stream_name: impl Into<String>,
    ) -> Self {
        Self {
            snippet: StreamInsertSnippet {
                title: title.into(),
                description: description.into(),
            },
            cdn: StreamInsertCdn {
                resolution: VideoFormat::P720,
                frame_rate: FrameRate::Fps60,
                ingestion_type: IngestionType::Rtmp,
                ingestion_info: StreamInsertIngestionInfo {
                    stream_name: stream_name.into(),
                },
            },
        }
    }
}

/// Body of `liveStreams.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveStreamUpdateRequest {
    pub id: String,
    pub snippet: TitleSnippet,
    pub cdn: CdnUpdate,
}

impl LiveStreamUpdateRequest {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        format: VideoFormat,
        ingestion_type: IngestionType,
    ) -> Self {
        Self {
            id: id.into(),
            snippet: TitleSnippet {
                title: title.into(),
            },
            cdn: CdnUpdate {
                format,
                ingestion_type,
            },
        }
    }
}

impl<A: Authorize> LiveStreamingClient<A> {
    /// Fetches a single stream by id.
    ///
    /// Like [`Self::get_broadcast`], this is a filtered list plus an exact-id scan; a missing
    /// stream is `Ok(None)`.
    ///
    /// <https://developers.google.com/youtube/v3/live/docs/liveStreams/list>
    #[instrument(skip(self), ret)]
    pub async fn get_stream(&self, stream_id: &str) -> Result<Option<LiveStream>> {
        let result = self
            .call::<LiveStreamListResponse>(
                Method::GET,
                STREAMS,
                &[("part", STREAM_PARTS), ("id", stream_id)],
                None::<&()>,
            )
            .await
            .map(|list| find_by_id(list.items, stream_id));
        self.finish(
            result,
            FailurePolicy::Alert,
            "Error while requesting live stream",
        )
    }

    /// Returns one page (up to 50) of the user's streams.
    #[instrument(skip(self))]
    pub async fn list_streams(&self, page_token: Option<&str>) -> Result<LiveStreamListResponse> {
        let mut query = vec![
            ("part", STREAM_PARTS),
            ("mine", "true"),
            ("maxResults", MAX_RESULTS),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let result = self
            .call::<LiveStreamListResponse>(Method::GET, STREAMS, &query, None::<&()>)
            .await;
        if let Ok(list) = &result {
            tracing::debug!(
                total_results = list.page_info.total_results,
                returned_items = list.items.len(),
                "fetched live streams"
            );
        }
        self.finish(result, FailurePolicy::Alert, "Failed to get live streams")
    }

    /// Every stream the user owns, across all pages.
    pub fn streams(&self) -> impl Stream<Item = Result<LiveStream>> + use<'_, A> {
        PagedStream::new(move |page_token: Option<String>| async move {
            let list = self.list_streams(page_token.as_deref()).await?;
            Ok((list.items, list.next_page_token))
        })
    }

    /// Creates a 720p60 RTMP stream whose key is `stream_name`.
    ///
    /// <https://developers.google.com/youtube/v3/live/docs/liveStreams/insert>
    #[instrument(skip(self), ret)]
    pub async fn create_stream(
        &self,
        title: &str,
        description: &str,
        stream_name: &str,
    ) -> Result<LiveStream> {
        let body = LiveStreamInsertRequest::new(title, description, stream_name);
        let result = self
            .call(Method::POST, STREAMS, &[("part", STREAM_PARTS)], Some(&body))
            .await;
        self.finish(
            result,
            FailurePolicy::Alert,
            "Error while creating YouTube live stream",
        )
    }

    /// <https://developers.google.com/youtube/v3/live/docs/liveStreams/delete>
    #[instrument(skip(self), ret)]
    pub async fn delete_stream(&self, stream_id: &str) -> Result<()> {
        let result = self
            .send(Method::DELETE, STREAMS, &[("id", stream_id)], None::<&()>)
            .await
            .map(|_| ());
        if result.is_ok() {
            tracing::debug!(stream_id, "video stream deleted");
        }
        self.finish(result, FailurePolicy::Alert, "Failed to delete live stream")
    }

    /// Retitles a stream and changes its format and ingestion protocol.
    ///
    /// Some properties cannot be changed on an existing stream; YouTube rejects those updates and
    /// a new stream has to be created instead.
    ///
    /// <https://developers.google.com/youtube/v3/live/docs/liveStreams/update>
    #[instrument(skip(self), ret)]
    pub async fn update_stream(
        &self,
        stream_id: &str,
        title: &str,
        format: VideoFormat,
        ingestion_type: IngestionType,
    ) -> Result<LiveStream> {
        let body = LiveStreamUpdateRequest::new(stream_id, title, format, ingestion_type);
        let result = self
            .call(Method::PUT, STREAMS, &[("part", STREAM_PARTS)], Some(&body))
            .await;
        self.finish(result, FailurePolicy::Alert, "Failed to update live stream")
    }
}
