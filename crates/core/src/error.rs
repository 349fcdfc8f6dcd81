use ragchat_protocol::DecodeError;
use ragchat_transport::TransportError;

/// Why a turn did not complete.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    /// The request or the response body failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The response body was not valid UTF-8.
    #[error("malformed response: {0}")]
    Decode(#[from] DecodeError),
    /// The upstream service reported an error inside the stream.
    #[error("{0}")]
    Protocol(String),
    /// The turn was cancelled before it finished.
    #[error("the request was cancelled")]
    Cancelled,
}

impl TurnError {
    /// Returns `true` if this is a cancellation rather than a failure.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TurnError::Cancelled)
    }
}
