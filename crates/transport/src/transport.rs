use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use crate::{QueryRequest, TransportError};

/// The body of a successful response, as raw byte chunks.
///
/// The stream ends when the server closes the body. Dropping it closes the
/// underlying connection.
pub type ByteStream =
    Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// The outcome of [`QueryTransport::send_query`].
pub type QueryResult = Result<ByteStream, TransportError>;

/// A type that can deliver a query to the answer service.
///
/// Implementations should behave like stateless objects: every call is an
/// independent request, and the returned future must not borrow from the
/// transport.
pub trait QueryTransport: Send + Sync {
    /// Sends the query and resolves once the response head is received.
    ///
    /// A non-success status must be reported as an error of kind
    /// [`ErrorKind::Status`](crate::ErrorKind::Status) rather than as a
    /// body stream.
    fn send_query(
        &self,
        req: &QueryRequest,
    ) -> impl Future<Output = QueryResult> + Send + 'static;
}
