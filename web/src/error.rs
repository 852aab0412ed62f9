use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

use relay::error::{Error as RelayError, RelayErrorKind};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(RelayError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

impl Error {
    pub fn kind(&self) -> &RelayErrorKind {
        &self.0.error_kind
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            RelayErrorKind::MissingConversationId => {
                (StatusCode::BAD_REQUEST, "conversation ID required").into_response()
            }
            RelayErrorKind::ConversationMismatch | RelayErrorKind::MalformedFrame => {
                debug!("Rejecting request: {}", self.0);
                (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE ENTITY").into_response()
            }
            RelayErrorKind::Serialization => {
                error!("Internal relay error: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
            RelayErrorKind::Transport => {
                warn!("Transport error: {}", self.0);
                (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<RelayError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: RelayError) -> StatusCode {
        Error::from(err).into_response().status()
    }

    #[test]
    fn relay_error_kinds_map_to_http_status_codes() {
        assert_eq!(
            status_of(RelayError::missing_conversation_id()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RelayError::conversation_mismatch("conv-1", "conv-2")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(RelayError::malformed_frame("bad frame")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(RelayError::transport("connection reset")),
            StatusCode::BAD_GATEWAY
        );
    }
}
