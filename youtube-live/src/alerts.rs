//! User-facing failure reporting.
//!
//! Every operation returns its error to the caller. In addition, most operations show the error to
//! the user through an [`AlertSink`]; which ones do is decided per operation by a
//! [`FailurePolicy`].

use crate::error::{Error, ErrorKind};
use std::fmt;

/// Something that can put a message in front of the user.
pub trait AlertSink: Send + Sync + fmt::Debug {
    fn show(&self, title: &str, message: &str);
}

/// Writes alerts to the log. Used when nothing better is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn show(&self, title: &str, message: &str) {
        tracing::error!(title, message, "alert");
    }
}

/// What to do with a failed operation besides returning the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Show the failure through the client's [`AlertSink`].
    Alert,
    /// Only log errors reported by the API. Transport and authorization failures are still shown.
    LogOnly,
}

/// Title used for failures that happen before any structured response exists.
pub const SYSTEM_ERROR_TITLE: &str = "System error";

/// Reports a failed operation according to `policy`.
///
/// `title` names the operation and is used for application-level failures.
pub(crate) fn report(sink: &dyn AlertSink, policy: FailurePolicy, title: &str, error: &Error) {
    if policy == FailurePolicy::LogOnly && error.kind() == ErrorKind::Application {
        tracing::warn!(kind = %error.kind(), error = %error, "{title}");
        return;
    }

    let title = match error.kind() {
        ErrorKind::Transport => SYSTEM_ERROR_TITLE,
        ErrorKind::Auth => "Authorization failed",
        ErrorKind::Application | ErrorKind::InvalidArgument => title,
    };
    sink.show(title, error.message());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    /// Remembers every alert so tests can look at them.
    #[derive(Debug, Clone, Default)]
    struct RecordingAlerts(Arc<Mutex<Vec<(String, String)>>>);

    impl AlertSink for RecordingAlerts {
        fn show(&self, title: &str, message: &str) {
            self.0
                .lock()
                .unwrap()
                .push((title.to_string(), message.to_string()));
        }
    }

    #[test]
    fn transport_failures_use_system_title() {
        let sink = RecordingAlerts::default();
        let error = Error::Transport {
            message: "connection refused".to_string(),
        };
        report(&sink, FailurePolicy::Alert, "Failed to delete broadcast", &error);
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![(
                SYSTEM_ERROR_TITLE.to_string(),
                "connection refused".to_string()
            )]
        );
    }

    #[test]
    fn application_failures_use_operation_title() {
        let sink = RecordingAlerts::default();
        let error = Error::Application {
            code: Some(403),
            message: "forbidden".to_string(),
        };
        report(&sink, FailurePolicy::Alert, "Failed to delete broadcast", &error);
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![(
                "Failed to delete broadcast".to_string(),
                "forbidden".to_string()
            )]
        );
    }

    #[test]
    fn log_only_hides_api_errors() {
        let sink = RecordingAlerts::default();
        let error = Error::Application {
            code: Some(403),
            message: "redundantTransition".to_string(),
        };
        report(&sink, FailurePolicy::LogOnly, "transition failed", &error);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn log_only_still_alerts_transport_and_auth_failures() {
        let sink = RecordingAlerts::default();
        let transport = Error::Transport {
            message: "connection refused".to_string(),
        };
        let auth = Error::Auth {
            message: "user denied authorization".to_string(),
        };
        report(&sink, FailurePolicy::LogOnly, "transition failed", &transport);
        report(&sink, FailurePolicy::LogOnly, "transition failed", &auth);
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![
                (
                    SYSTEM_ERROR_TITLE.to_string(),
                    "connection refused".to_string()
                ),
                (
                    "Authorization failed".to_string(),
                    "user denied authorization".to_string()
                ),
            ]
        );
    }
}
