//! YouTube Live Broadcasts API types and operations.
//!
//! # Core Concepts: Broadcasts vs Streams
//!
//! ## [`LiveBroadcast`] - Viewer-Facing Events
//! - **What viewers see**: Title, description, scheduled time
//! - **Event lifecycle**: Created → Ready → Testing → Live → Complete (or Revoked)
//! - **Relationship**: Each broadcast = exactly one YouTube video, bound to at most one
//!   [`LiveStream`](crate::youtube_api::streams::LiveStream) at a time

use crate::alerts::FailurePolicy;
use crate::error::{Error, Result};
use crate::oauth::Authorize;
use crate::youtube_api::client::{LiveStreamingClient, MAX_RESULTS};
use crate::youtube_api::datetime::format_scheduled_start;
use crate::youtube_api::streams::{CdnUpdate, IngestionType, VideoFormat};
use crate::youtube_api::types::{PageInfo, PagedStream, Resource, find_by_id};
use http::Method;
use jiff::{Timestamp, Zoned};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use tokio_stream::Stream;
use tracing::instrument;

const BROADCASTS: &str = "liveBroadcasts";
const BROADCAST_PARTS: &str = "id,snippet,contentDetails,status";

/// Response structure for the `liveBroadcasts.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts/list>
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcastListResponse {
    /// `youtube#liveBroadcastListResponse`.
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Broadcasts that match the request criteria, in the order YouTube returned them.
    #[serde(default)]
    pub items: VecDeque<LiveBroadcast>,
    #[serde(default)]
    pub page_info: PageInfo,
    /// Pass as `page_token` to get the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    /// Pass as `page_token` to get the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_page_token: Option<String>,
}

/// A `liveBroadcast` resource represents a viewer-facing live streaming event on YouTube.
///
/// Broadcasts must be bound to a stream to actually transmit video, but the broadcast
/// defines the public-facing aspects of the live event.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts#resource>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcast {
    /// The ID that YouTube assigns to uniquely identify the broadcast.
    pub id: String,
    #[serde(default)]
    pub snippet: LiveBroadcastSnippet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_details: Option<LiveBroadcastContentDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LiveBroadcastStatus>,
}

impl Resource for LiveBroadcast {
    fn id(&self) -> &str {
        &self.id
    }
}

impl LiveBroadcast {
    /// The stream this broadcast currently airs, if any.
    pub fn bound_stream_id(&self) -> Option<&str> {
        self.content_details
            .as_ref()
            .and_then(|d| d.bound_stream_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn life_cycle_status(&self) -> Option<BroadcastLifeCycleStatus> {
        self.status.as_ref().map(|s| s.life_cycle_status)
    }
}

/// Basic details about the broadcast.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts#snippet>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcastSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When the broadcast was added to YouTube's live broadcast schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start_time: Option<Timestamp>,
    /// Unset means the broadcast is scheduled to continue indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_end_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end_time: Option<Timestamp>,
}

/// See: <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts#contentDetails>
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcastContentDetails {
    /// The stream bound to this broadcast. A broadcast binds to at most one stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_stream_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_auto_start: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_auto_stop: Option<bool>,
}

/// See: <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts#status>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcastStatus {
    pub life_cycle_status: BroadcastLifeCycleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_status: Option<PrivacyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_status: Option<String>,
}

/// The broadcast's current lifecycle status.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts#status.lifeCycleStatus>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BroadcastLifeCycleStatus {
    /// The broadcast was created but has no complete settings yet.
    Created,
    /// The broadcast settings are complete and it can go live or into testing.
    Ready,
    /// Transitioning to testing.
    TestStarting,
    /// Visible only to the broadcaster.
    Testing,
    /// Transitioning to live.
    LiveStarting,
    /// Visible to anyone with access to the URL.
    Live,
    /// The broadcast is over.
    Complete,
    /// Removed by an admin action.
    Revoked,
}

impl fmt::Display for BroadcastLifeCycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Ready => write!(f, "ready"),
            Self::TestStarting => write!(f, "testStarting"),
            Self::Testing => write!(f, "testing"),
            Self::LiveStarting => write!(f, "liveStarting"),
            Self::Live => write!(f, "live"),
            Self::Complete => write!(f, "complete"),
            Self::Revoked => write!(f, "revoked"),
        }
    }
}

/// See: <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts#status.privacyStatus>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrivacyStatus {
    Public,
    Unlisted,
    Private,
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Unlisted => write!(f, "unlisted"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// Which broadcasts `liveBroadcasts.list` should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BroadcastFilter {
    /// Current live broadcasts.
    Active,
    All,
    /// Broadcasts that have already ended.
    Completed,
    /// Broadcasts that have not yet started.
    Upcoming,
}

impl BroadcastFilter {
    pub const ALL: [Self; 4] = [Self::Active, Self::All, Self::Completed, Self::Upcoming];
}

impl fmt::Display for BroadcastFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::All => write!(f, "all"),
            Self::Completed => write!(f, "completed"),
            Self::Upcoming => write!(f, "upcoming"),
        }
    }
}

impl FromStr for BroadcastFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "all" => Ok(Self::All),
            "completed" => Ok(Self::Completed),
            "upcoming" => Ok(Self::Upcoming),
            _ => Err(Error::InvalidArgument(format!(
                "unknown broadcast status {s:?}, expected active, all, completed or upcoming"
            ))),
        }
    }
}

/// Target states for `liveBroadcasts.transition`.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts/transition>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BroadcastStatus {
    /// Start broadcast testing mode.
    Testing,
    /// Make broadcast visible to audience.
    Live,
    /// Mark broadcast as complete/over.
    Complete,
}

impl fmt::Display for BroadcastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Testing => write!(f, "testing"),
            Self::Live => write!(f, "live"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

impl FromStr for BroadcastStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "testing" => Ok(Self::Testing),
            "live" => Ok(Self::Live),
            "complete" => Ok(Self::Complete),
            _ => Err(Error::InvalidArgument(format!(
                "unknown transition target {s:?}, expected testing, live or complete"
            ))),
        }
    }
}

/// Body of `liveBroadcasts.insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcastInsertRequest {
    pub snippet: InsertSnippet,
    pub status: InsertStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertSnippet {
    pub title: String,
    /// Already rendered, see [`format_scheduled_start`].
    pub scheduled_start_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertStatus {
    pub privacy_status: PrivacyStatus,
}

impl LiveBroadcastInsertRequest {
    /// A public broadcast titled `title`, starting at `start` in `start`'s own time zone.
    pub fn new(title: impl Into<String>, start: &Zoned) -> Self {
        Self {
            snippet: InsertSnippet {
                title: title.into(),
                scheduled_start_time: format_scheduled_start(start),
            },
            status: InsertStatus {
                privacy_status: PrivacyStatus::Public,
            },
        }
    }
}

/// Body of `liveBroadcasts.update` as this client sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcastUpdateRequest {
    pub id: String,
    pub snippet: TitleSnippet,
    pub cdn: CdnUpdate,
}

/// A snippet that only changes the title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleSnippet {
    pub title: String,
}

impl LiveBroadcastUpdateRequest {
    /// Broadcasts are always pushed over RTMP.
    pub fn new(id: impl Into<String>, title: impl Into<String>, format: VideoFormat) -> Self {
        Self {
            id: id.into(),
            snippet: TitleSnippet {
                title: title.into(),
            },
            cdn: CdnUpdate {
                format,
                ingestion_type: IngestionType::Rtmp,
            },
        }
    }
}

impl<A: Authorize> LiveStreamingClient<A> {
    /// Returns one page (up to 50) of the user's broadcasts that match `filter`.
    ///
    /// If [`PageInfo::has_more_pages`], pass the returned `next_page_token` back in as
    /// `page_token` to continue, or use [`Self::broadcasts`] which does that for you.
    ///
    /// <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts/list>
    #[instrument(skip(self))]
    pub async fn list_broadcasts(
        &self,
        filter: BroadcastFilter,
        page_token: Option<&str>,
    ) -> Result<LiveBroadcastListResponse> {
        let result = self.list_broadcasts_internal(filter, page_token).await;
        self.finish(result, FailurePolicy::Alert, "Failed to get broadcast info")
    }

    async fn list_broadcasts_internal(
        &self,
        filter: BroadcastFilter,
        page_token: Option<&str>,
    ) -> Result<LiveBroadcastListResponse> {
        let filter = filter.to_string();
        let mut query = vec![
            ("part", BROADCAST_PARTS),
            ("broadcastStatus", filter.as_str()),
            ("maxResults", MAX_RESULTS),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let list: LiveBroadcastListResponse = self
            .call(Method::GET, BROADCASTS, &query, None::<&()>)
            .await?;

        tracing::debug!(
            total_results = list.page_info.total_results,
            returned_items = list.items.len(),
            "fetched live broadcasts"
        );
        if list.page_info.has_more_pages() {
            tracing::debug!(
                next_page_token = ?list.next_page_token,
                "more broadcasts available than fit in one page"
            );
        }

        Ok(list)
    }

    /// Every broadcast matching `filter`, across all pages.
    pub fn broadcasts(
        &self,
        filter: BroadcastFilter,
    ) -> impl Stream<Item = Result<LiveBroadcast>> + use<'_, A> {
        PagedStream::new(move |page_token: Option<String>| async move {
            let list = self.list_broadcasts(filter, page_token.as_deref()).await?;
            Ok((list.items, list.next_page_token))
        })
    }

    /// Fetches a single broadcast by id.
    ///
    /// The API has no single-item fetch: this lists with an `id` filter and scans the result for
    /// an exact match. A broadcast that does not exist is `Ok(None)`.
    #[instrument(skip(self), ret)]
    pub async fn get_broadcast(&self, broadcast_id: &str) -> Result<Option<LiveBroadcast>> {
        let result = self
            .call::<LiveBroadcastListResponse>(
                Method::GET,
                BROADCASTS,
                &[("part", BROADCAST_PARTS), ("id", broadcast_id)],
                None::<&()>,
            )
            .await
            .map(|list| find_by_id(list.items, broadcast_id));
        self.finish(
            result,
            FailurePolicy::Alert,
            "Error while requesting broadcast list",
        )
    }

    /// Schedules a new public broadcast.
    ///
    /// <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts/insert>
    #[instrument(skip(self), ret)]
    pub async fn create_broadcast(&self, title: &str, start: &Zoned) -> Result<LiveBroadcast> {
        let body = LiveBroadcastInsertRequest::new(title, start);
        let result = self
            .call(
                Method::POST,
                BROADCASTS,
                &[("part", BROADCAST_PARTS)],
                Some(&body),
            )
            .await;
        self.finish(
            result,
            FailurePolicy::Alert,
            "Error while creating YouTube broadcast",
        )
    }

    /// Moves a broadcast to `status` and starts whatever goes with it (e.g. the monitor stream
    /// for testing).
    ///
    /// YouTube expects the bound stream's `streamStatus` to be `active` first; this is not
    /// checked here. Errors reported by YouTube are returned but only logged, never alerted:
    /// transitions are frequently attempted before the stream is up and failing one is not fatal.
    /// Transport and authorization failures are alerted like everywhere else.
    ///
    /// <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts/transition>
    #[instrument(skip(self), ret)]
    pub async fn transition_broadcast(
        &self,
        broadcast_id: &str,
        status: BroadcastStatus,
    ) -> Result<LiveBroadcast> {
        let status_string = status.to_string();
        let result = self
            .call::<LiveBroadcast>(
                Method::POST,
                "liveBroadcasts/transition",
                &[
                    ("id", broadcast_id),
                    ("broadcastStatus", status_string.as_str()),
                    ("part", BROADCAST_PARTS),
                ],
                None::<&()>,
            )
            .await;
        if let Ok(broadcast) = &result {
            tracing::debug!(
                broadcast_id = broadcast.id,
                life_cycle_status = ?broadcast.life_cycle_status(),
                "successfully transitioned broadcast"
            );
        }
        self.finish(
            result,
            FailurePolicy::LogOnly,
            &format!("failed transition to the {status} status"),
        )
    }

    /// <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts/delete>
    #[instrument(skip(self), ret)]
    pub async fn delete_broadcast(&self, broadcast_id: &str) -> Result<()> {
        let result = self
            .send(Method::DELETE, BROADCASTS, &[("id", broadcast_id)], None::<&()>)
            .await
            .map(|_| ());
        self.finish(result, FailurePolicy::Alert, "Failed to delete broadcast")
    }

    /// Binds the broadcast to `stream_id`, replacing any existing binding.
    ///
    /// An empty `stream_id` removes the binding instead, see [`Self::unbind_broadcast`].
    ///
    /// <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts/bind>
    #[instrument(skip(self), ret)]
    pub async fn bind_broadcast(&self, broadcast_id: &str, stream_id: &str) -> Result<LiveBroadcast> {
        let mut query = vec![("id", broadcast_id)];
        // Leaving out streamId is how the API spells "unbind".
        if !stream_id.is_empty() {
            query.push(("streamId", stream_id));
        }
        query.push(("part", BROADCAST_PARTS));

        let result = self
            .call(Method::POST, "liveBroadcasts/bind", &query, None::<&()>)
            .await;
        self.finish(
            result,
            FailurePolicy::Alert,
            "Error while binding YouTube broadcast with live stream",
        )
    }

    /// Removes the broadcast's stream binding.
    pub async fn unbind_broadcast(&self, broadcast_id: &str) -> Result<LiveBroadcast> {
        self.bind_broadcast(broadcast_id, "").await
    }

    /// Retitles a broadcast and sets its video format.
    ///
    /// <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts/update>
    #[instrument(skip(self), ret)]
    pub async fn update_broadcast(
        &self,
        broadcast_id: &str,
        title: &str,
        format: VideoFormat,
    ) -> Result<LiveBroadcast> {
        let body = LiveBroadcastUpdateRequest::new(broadcast_id, title, format);
        let result = self
            .call(Method::PUT, BROADCASTS, &[("part", BROADCAST_PARTS)], Some(&body))
            .await;
        self.finish(result, FailurePolicy::Alert, "Failed to update broadcast")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_json_snapshot;
    use jiff::civil::date;
    use jiff::tz::{TimeZone, offset};
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_request_body() {
        let start = date(2024, 1, 5)
            .at(10, 0, 0, 0)
            .to_zoned(TimeZone::fixed(offset(3)))
            .unwrap();
        let body = LiveBroadcastInsertRequest::new("T", &start);
        assert_json_snapshot!(body, @r#"
        {
          "snippet": {
            "title": "T",
            "scheduledStartTime": "2024-01-05T10:00:00+03:00"
          },
          "status": {
            "privacyStatus": "public"
          }
        }
        "#);
    }

    #[test]
    fn insert_request_escapes_title() {
        let start = date(2024, 1, 5)
            .at(10, 0, 0, 0)
            .to_zoned(TimeZone::UTC)
            .unwrap();
        let body = LiveBroadcastInsertRequest::new(r#"say "hi" \o/"#, &start);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["snippet"]["title"], r#"say "hi" \o/"#);
    }

    #[test]
    fn update_request_body() {
        let body = LiveBroadcastUpdateRequest::new("b1", "New title", VideoFormat::P1080);
        assert_json_snapshot!(body, @r#"
        {
          "id": "b1",
          "snippet": {
            "title": "New title"
          },
          "cdn": {
            "format": "1080p",
            "ingestionType": "rtmp"
          }
        }
        "#);
    }

    #[test]
    fn decode_broadcast() {
        let json = r#"{
            "kind": "youtube#liveBroadcast",
            "etag": "abc",
            "id": "b1",
            "snippet": {
                "publishedAt": "2024-01-01T08:00:00Z",
                "channelId": "UC123",
                "title": "Morning show",
                "description": "",
                "scheduledStartTime": "2024-01-05T10:00:00+03:00",
                "isDefaultBroadcast": false
            },
            "status": {
                "lifeCycleStatus": "testStarting",
                "privacyStatus": "public",
                "recordingStatus": "notRecording",
                "madeForKids": false
            },
            "contentDetails": {
                "boundStreamId": "s1",
                "enableAutoStart": true,
                "monitorStream": {"enableMonitorStream": true}
            }
        }"#;
        let broadcast: LiveBroadcast = serde_json::from_str(json).unwrap();
        assert_eq!(broadcast.id, "b1");
        assert_eq!(broadcast.snippet.title, "Morning show");
        assert_eq!(
            broadcast.snippet.scheduled_start_time,
            Some("2024-01-05T07:00:00Z".parse::<Timestamp>().unwrap())
        );
        assert_eq!(broadcast.bound_stream_id(), Some("s1"));
        assert_eq!(
            broadcast.life_cycle_status(),
            Some(BroadcastLifeCycleStatus::TestStarting)
        );
    }

    #[test]
    fn decode_sparse_list() {
        let list: LiveBroadcastListResponse =
            serde_json::from_str(r#"{"items": [{"id": "b1"}]}"#).unwrap();
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].bound_stream_id(), None);
        assert_eq!(list.items[0].life_cycle_status(), None);
        assert_eq!(list.next_page_token, None);
    }

    #[test]
    fn filters_round_trip_through_strings() {
        for filter in BroadcastFilter::ALL {
            assert_eq!(filter.to_string().parse::<BroadcastFilter>(), Ok(filter));
        }
        assert!(matches!(
            "live".parse::<BroadcastFilter>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn transition_targets() {
        assert_eq!(
            "testing".parse::<BroadcastStatus>(),
            Ok(BroadcastStatus::Testing)
        );
        assert_eq!(
            "complete".parse::<BroadcastStatus>(),
            Ok(BroadcastStatus::Complete)
        );
        assert!("ready".parse::<BroadcastStatus>().is_err());
    }
}
