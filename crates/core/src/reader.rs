use futures_util::StreamExt;
use ragchat_protocol::Utf8Decoder;
use ragchat_transport::ByteStream;
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::TurnError;

/// Reads a response body as a sequence of decoded text increments.
///
/// Every read is a suspend point guarded by the cancellation token: the
/// token is checked before the read, raced against it, and checked again
/// once the read returns. After cancellation has been observed, no more
/// text is ever returned.
pub struct StreamReader {
    body: ByteStream,
    decoder: Utf8Decoder,
    token: CancellationToken,
    finished: bool,
}

impl StreamReader {
    /// Creates a reader over `body` that stops when `token` is cancelled.
    #[inline]
    pub fn new(body: ByteStream, token: CancellationToken) -> Self {
        Self {
            body,
            decoder: Utf8Decoder::new(),
            token,
            finished: false,
        }
    }

    /// Returns the next piece of text, or `None` once the body has ended.
    ///
    /// # Cancel safety
    ///
    /// This method is not cancel safe: bytes taken from the body when the
    /// returned future is dropped are lost. Cancel through the token
    /// instead.
    pub async fn next_text(&mut self) -> Result<Option<String>, TurnError> {
        loop {
            if self.token.is_cancelled() {
                return Err(TurnError::Cancelled);
            }
            if self.finished {
                return Ok(None);
            }

            let chunk = select! {
                biased;

                _ = self.token.cancelled() => {
                    return Err(TurnError::Cancelled);
                }
                chunk = self.body.next() => chunk,
            };
            if self.token.is_cancelled() {
                return Err(TurnError::Cancelled);
            }

            let Some(chunk) = chunk else {
                self.finished = true;
                self.decoder.finish()?;
                trace!("body finished");
                return Ok(None);
            };
            let text = self.decoder.decode(&chunk?)?;
            trace!("decoded {} byte(s) of text", text.len());
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }
}
