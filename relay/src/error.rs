//! Error types for the `relay` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level relay error type.
///
/// Errors carry an `error_kind` that callers match on and an optional `source`
/// holding the lower-level error that caused it. Most relay failures never leave
/// the relay (a broken transport tears down exactly one connection), so only the
/// bootstrap path surfaces these to the `web` layer, which maps kinds to HTTP
/// status codes.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: RelayErrorKind,
}

/// Enum representing the kinds of errors that can occur in the `relay` layer.
#[derive(Debug, PartialEq)]
pub enum RelayErrorKind {
    /// A subscription request did not name a conversation.
    MissingConversationId,
    /// A message was addressed to a different conversation than it belongs to.
    ConversationMismatch,
    /// A message could not be encoded for the wire.
    Serialization,
    /// An inbound frame was not a well-formed client message.
    MalformedFrame,
    /// The underlying websocket failed while reading or writing.
    Transport,
}

impl Error {
    pub fn missing_conversation_id() -> Self {
        Error {
            source: None,
            error_kind: RelayErrorKind::MissingConversationId,
        }
    }

    pub fn conversation_mismatch(expected: &str, actual: &str) -> Self {
        Error {
            source: Some(
                format!("message belongs to conversation {actual}, not {expected}").into(),
            ),
            error_kind: RelayErrorKind::ConversationMismatch,
        }
    }

    pub fn serialization(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: RelayErrorKind::Serialization,
        }
    }

    pub fn malformed_frame<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error {
            source: Some(err.into()),
            error_kind: RelayErrorKind::MalformedFrame,
        }
    }

    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error {
            source: Some(err.into()),
            error_kind: RelayErrorKind::Transport,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Relay Error ({:?}): {source}", self.error_kind),
            None => write!(f, "Relay Error ({:?})", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<axum::Error> for Error {
    fn from(err: axum::Error) -> Self {
        Error::transport(err)
    }
}
