use std::fmt::{self, Display};

/// The kind of transport error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request could not be delivered.
    Connect,
    /// The server answered with a non-success status code.
    Status(u16),
    /// Reading the response body failed midway.
    Body,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Connect => write!(f, "connection error"),
            ErrorKind::Status(code) => write!(f, "status {code}"),
            ErrorKind::Body => write!(f, "body error"),
        }
    }
}

/// A network or HTTP-level failure.
///
/// The message is meant to be shown to users as-is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    kind: ErrorKind,
    message: String,
}

impl TransportError {
    /// Creates an error of the given kind.
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an error for a non-success status code.
    #[inline]
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Status(code), message)
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}
