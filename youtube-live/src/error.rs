//! Error kinds surfaced by every YouTube Live operation.
//!
//! Operations resolve to exactly one of:
//!
//! - [`Error::Transport`]: no structured response exists (connect, DNS, TLS, body read, or the
//!   body could not be decoded into the expected resource).
//! - [`Error::Application`]: YouTube answered with an error envelope, or a non-2xx status.
//! - [`Error::Auth`]: the authorization gate failed, so no request was sent.
//! - [`Error::InvalidArgument`]: an enumerated input was rejected before building a request.

use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("transport failure: {message}")]
    Transport { message: String },

    #[error("YouTube API error{}: {message}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    Application { code: Option<u16>, message: String },

    #[error("authorization failed: {message}")]
    Auth { message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Discriminant of [`Error`], handy for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Application,
    Auth,
    InvalidArgument,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Application => write!(f, "application"),
            Self::Auth => write!(f, "auth"),
            Self::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Application { .. } => ErrorKind::Application,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// The human-readable part of the error, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message }
            | Self::Application { message, .. }
            | Self::Auth { message } => message,
            Self::InvalidArgument(message) => message,
        }
    }

    /// The numeric code YouTube attached to an application error, if any.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Application { code, .. } => *code,
            _ => None,
        }
    }

    /// Builds a transport error from any error, keeping its whole source chain in the message.
    pub(crate) fn transport(context: &str, error: &(dyn std::error::Error + 'static)) -> Self {
        Self::Transport {
            message: format!("{context}: {}", chain(error)),
        }
    }

    pub(crate) fn auth(error: &eyre::Report) -> Self {
        Self::Auth {
            message: format!("{error:#}"),
        }
    }
}

fn chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn application_display_includes_code_when_present() {
        let with_code = Error::Application {
            code: Some(403),
            message: "insufficient permissions".to_string(),
        };
        assert_eq!(
            with_code.to_string(),
            "YouTube API error 403: insufficient permissions"
        );

        let without = Error::Application {
            code: None,
            message: "boom".to_string(),
        };
        assert_eq!(without.to_string(), "YouTube API error: boom");
    }

    #[test]
    fn accessors() {
        let e = Error::Transport {
            message: "connection refused".to_string(),
        };
        assert_eq!(e.kind(), ErrorKind::Transport);
        assert_eq!(e.message(), "connection refused");
        assert_eq!(e.code(), None);

        let e = Error::Application {
            code: Some(404),
            message: "not found".to_string(),
        };
        assert_eq!(e.kind(), ErrorKind::Application);
        assert_eq!(e.code(), Some(404));
    }

    #[test]
    fn transport_keeps_source_chain() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let e = Error::transport("send GET request", &inner);
        assert_eq!(e.message(), "send GET request: refused");
    }
}
