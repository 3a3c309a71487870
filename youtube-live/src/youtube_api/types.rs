//! Shared types and streaming infrastructure for the YouTube API client.

use crate::error::{Error, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

type OneFuturePage<'a, F, T> =
    Pin<Box<dyn Future<Output = Result<(F, (VecDeque<T>, Option<String>))>> + 'a + Send>>;

/// A paginated stream that automatically fetches subsequent pages from a YouTube API list endpoint.
///
/// This stream yields items one by one, automatically fetching the next page when the current
/// page is exhausted. Only supports forward pagination (no previous page support).
pub struct PagedStream<'a, T, F> {
    /// Current batch of items from the most recent API response
    current_items: VecDeque<T>,
    /// Future representing the currently pending API request, if any
    pending_request: Option<OneFuturePage<'a, F, T>>,
    /// Whether we've reached the end of all available data
    is_done: bool,
}

impl<'a, T, F> PagedStream<'a, T, F> {
    /// Create a new PagedStream. The first page is requested on first poll.
    pub fn new<Fut>(fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = Result<(VecDeque<T>, Option<String>)>> + Send + 'a,
    {
        let first_page = async move {
            let results = fetcher(None).await?;
            Ok((fetcher, results))
        };
        Self {
            pending_request: Some(Box::pin(first_page)),
            current_items: VecDeque::new(),
            is_done: false,
        }
    }
}

impl<'a, T: Unpin, F> Unpin for PagedStream<'a, T, F> {}

impl<'a, T: Unpin, F, Fut> Stream for PagedStream<'a, T, F>
where
    F: Fn(Option<String>) -> Fut,
    F: Send + 'a,
    Fut: Future<Output = Result<(VecDeque<T>, Option<String>)>> + Send + 'a,
{
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.current_items.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if self.is_done {
                return Poll::Ready(None);
            }

            let Some(pending) = self.pending_request.as_mut() else {
                self.is_done = true;
                return Poll::Ready(None);
            };

            match pending.as_mut().poll(cx) {
                Poll::Ready(Ok((fetcher, (items, next_token)))) => {
                    self.current_items.extend(items);

                    // The API hands out an empty string rather than omitting the token on some
                    // endpoints.
                    match next_token.filter(|t| !t.is_empty()) {
                        Some(next_token) => {
                            // set up the next page, but don't poll it until we run dry
                            self.pending_request = Some(Box::pin(async move {
                                let results = fetcher(Some(next_token)).await?;
                                Ok((fetcher, results))
                            }));
                        }
                        None => {
                            self.is_done = true;
                            self.pending_request = None;
                        }
                    }
                }
                Poll::Ready(Err(e)) => {
                    self.pending_request = None;
                    self.is_done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Paging details for lists of resources.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(default)]
    pub total_results: u32,
    /// The number of results included in the API response.
    #[serde(default)]
    pub results_per_page: u32,
}

impl PageInfo {
    /// Whether the result set does not fit in a single page.
    pub fn has_more_pages(&self) -> bool {
        self.total_results > self.results_per_page
    }
}

/// Resources that carry a YouTube-assigned id.
pub trait Resource {
    fn id(&self) -> &str;
}

/// Picks the resource with exactly `id` out of a decoded list response.
///
/// The API has no single-item fetch for live resources: `list` filtered by `id` is the closest
/// thing, and the filtered list may in principle contain other entries. Missing is `None`, not an
/// error.
pub fn find_by_id<T: Resource>(items: impl IntoIterator<Item = T>, id: &str) -> Option<T> {
    items.into_iter().find(|item| item.id() == id)
}

/// The `error` envelope YouTube puts in a response body when a call fails.
///
/// See: <https://developers.google.com/youtube/v3/docs/errors>
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorField>,
    /// Sits next to a string-valued `error`.
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Detailed(ApiErrorBody),
    Code(String),
}

/// The body of a structured API error.
///
/// Fields sent as `null` read as if they were missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<ApiErrorDetail>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Turns a response into an [`Error::Application`] if it describes a failure.
///
/// An error envelope wins regardless of the status code (YouTube has been known to send them
/// with 200). Without one, any non-2xx status is a failure.
pub(crate) fn check_response(status: StatusCode, body: &str) -> Result<()> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') {
        // A body we cannot parse as an envelope is the caller's decoding problem, not ours.
        let envelope: ErrorEnvelope = serde_json::from_str(trimmed).unwrap_or_default();
        let http_code = (!status.is_success()).then_some(status.as_u16());
        match envelope.error {
            Some(ErrorField::Detailed(error)) if !error.message.is_empty() || error.code > 0 => {
                let code = if error.code > 0 {
                    Some(error.code)
                } else {
                    http_code
                };
                let message = if error.message.is_empty() {
                    code
                        .and_then(|c| StatusCode::from_u16(c).ok())
                        .map_or_else(|| fallback_message(status), fallback_message)
                } else {
                    error.message
                };
                return Err(Error::Application { code, message });
            }
            Some(ErrorField::Code(error)) if !error.is_empty() => {
                let message = envelope
                    .message
                    .or(envelope.error_description)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(error);
                return Err(Error::Application {
                    code: http_code,
                    message,
                });
            }
            _ => {}
        }
    }

    if !status.is_success() {
        let message = if body.trim().is_empty() {
            fallback_message(status)
        } else {
            body.trim().to_string()
        };
        return Err(Error::Application {
            code: Some(status.as_u16()),
            message,
        });
    }

    Ok(())
}

fn fallback_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("request failed with status {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio_stream::StreamExt;

    #[derive(Debug, PartialEq)]
    struct Thing(&'static str);

    impl Resource for Thing {
        fn id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn find_by_id_matches_exactly() {
        let items = vec![Thing("a"), Thing("abc"), Thing("b")];
        assert_eq!(find_by_id(items, "abc"), Some(Thing("abc")));
        assert_eq!(find_by_id(vec![Thing("abc")], "ab"), None);
        assert_eq!(find_by_id(Vec::<Thing>::new(), "ab"), None);
    }

    #[test]
    fn more_pages() {
        let info = PageInfo {
            total_results: 51,
            results_per_page: 50,
        };
        assert!(info.has_more_pages());
        assert!(!PageInfo::default().has_more_pages());
    }

    #[test]
    fn envelope_with_200_is_application_error() {
        let body = r#"{"error": {"code": 403, "message": "Stream is inactive", "errors": [{"reason": "errorStreamInactive"}]}}"#;
        assert_eq!(
            check_response(StatusCode::OK, body),
            Err(Error::Application {
                code: Some(403),
                message: "Stream is inactive".to_string()
            })
        );
    }

    #[test]
    fn envelope_with_only_code() {
        let body = r#"{"error": {"code": 404}}"#;
        assert_eq!(
            check_response(StatusCode::NOT_FOUND, body),
            Err(Error::Application {
                code: Some(404),
                message: "Not Found".to_string()
            })
        );
    }

    #[test]
    fn envelope_with_null_message() {
        let body = r#"{"error": {"code": 403, "message": null, "errors": null}}"#;
        assert_eq!(
            check_response(StatusCode::OK, body),
            Err(Error::Application {
                code: Some(403),
                message: "Forbidden".to_string()
            })
        );

        let body = r#"{"error": {"code": null, "message": "Quota exceeded"}}"#;
        assert_eq!(
            check_response(StatusCode::FORBIDDEN, body),
            Err(Error::Application {
                code: Some(403),
                message: "Quota exceeded".to_string()
            })
        );
    }

    #[test]
    fn string_error_field() {
        let body = r#"{"error": "invalid_token", "error_description": "Invalid Credentials"}"#;
        assert_eq!(
            check_response(StatusCode::UNAUTHORIZED, body),
            Err(Error::Application {
                code: Some(401),
                message: "Invalid Credentials".to_string()
            })
        );
    }

    #[test]
    fn empty_error_message_is_not_an_error() {
        let body = r#"{"error": {"message": ""}, "id": "x"}"#;
        assert_eq!(check_response(StatusCode::OK, body), Ok(()));
        assert_eq!(check_response(StatusCode::OK, r#"{"id": "x"}"#), Ok(()));
        assert_eq!(check_response(StatusCode::NO_CONTENT, ""), Ok(()));
    }

    #[test]
    fn bare_failure_status() {
        assert_eq!(
            check_response(StatusCode::BAD_GATEWAY, ""),
            Err(Error::Application {
                code: Some(502),
                message: "Bad Gateway".to_string()
            })
        );
        assert_eq!(
            check_response(StatusCode::SERVICE_UNAVAILABLE, "try later"),
            Err(Error::Application {
                code: Some(503),
                message: "try later".to_string()
            })
        );
    }

    #[tokio::test]
    async fn paged_stream_follows_tokens() {
        let stream = PagedStream::new(|token: Option<String>| async move {
            Ok(match token.as_deref() {
                None => (VecDeque::from([1, 2]), Some("p2".to_string())),
                Some("p2") => (VecDeque::from([3]), Some(String::new())),
                Some(other) => panic!("unexpected token {other}"),
            })
        });
        let all: Vec<_> = stream.collect::<Result<_>>().await.unwrap();
        assert_eq!(all, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn paged_stream_stops_on_error() {
        let stream = PagedStream::new(|token: Option<String>| async move {
            match token {
                None => Ok((VecDeque::from([1]), Some("p2".to_string()))),
                Some(_) => Err(Error::Transport {
                    message: "reset".to_string(),
                }),
            }
        });
        let mut stream = std::pin::pin!(stream);
        assert_eq!(stream.next().await, Some(Ok(1)));
        assert!(matches!(
            stream.next().await,
            Some(Err(Error::Transport { .. }))
        ));
        assert_eq!(stream.next().await, None);
    }
}
