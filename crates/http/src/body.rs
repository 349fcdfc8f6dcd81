use futures_util::stream;
use ragchat_transport::{ByteStream, ErrorKind, TransportError};
use reqwest::Response;

/// Adapts a response body into a [`ByteStream`].
///
/// The stream yields at most one error and then ends.
pub fn byte_stream(response: Response) -> ByteStream {
    Box::pin(stream::unfold(Some(response), |response| async move {
        let mut response = response?;
        match response.chunk().await {
            Ok(Some(chunk)) => {
                trace!("received {} byte(s)", chunk.len());
                Some((Ok(chunk), Some(response)))
            }
            Ok(None) => None,
            Err(err) => {
                error!("failed to read the body: {err}");
                let err = TransportError::new(ErrorKind::Body, err.to_string());
                Some((Err(err), None))
            }
        }
    }))
}
