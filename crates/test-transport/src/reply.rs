use bytes::Bytes;
use ragchat_transport::TransportError;

/// How a scripted body ends after its chunks are delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ending {
    /// The body closes normally.
    Close,
    /// Reading the body fails with this error.
    Fail(TransportError),
    /// The body never delivers anything else.
    Hang,
}

/// The scripted answer for one query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptedReply {
    /// If set, the request itself fails and no body is produced.
    pub rejection: Option<TransportError>,
    /// Body chunks, delivered one per read.
    pub chunks: Vec<Bytes>,
    /// What happens after the last chunk.
    pub ending: Ending,
}

impl ScriptedReply {
    /// Creates a reply that delivers `chunks` and closes.
    #[inline]
    pub fn with_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            rejection: None,
            chunks: chunks.into_iter().map(Into::into).collect(),
            ending: Ending::Close,
        }
    }

    /// Creates a reply that delivers `body` in chunks of `size` bytes.
    ///
    /// Chunk boundaries ignore character boundaries on purpose.
    pub fn split_every(body: &str, size: usize) -> Self {
        let size = size.max(1);
        let bytes = Bytes::copy_from_slice(body.as_bytes());
        let chunks = (0..bytes.len())
            .step_by(size)
            .map(|start| bytes.slice(start..(start + size).min(bytes.len())));
        Self::with_chunks(chunks)
    }

    /// Creates a reply whose request is rejected with `error`.
    #[inline]
    pub fn rejected(error: TransportError) -> Self {
        Self {
            rejection: Some(error),
            chunks: vec![],
            ending: Ending::Close,
        }
    }

    /// Makes the body fail with `error` after the chunks.
    #[inline]
    pub fn then_fail(mut self, error: TransportError) -> Self {
        self.ending = Ending::Fail(error);
        self
    }

    /// Makes the body stall forever after the chunks.
    #[inline]
    pub fn then_hang(mut self) -> Self {
        self.ending = Ending::Hang;
        self
    }
}
