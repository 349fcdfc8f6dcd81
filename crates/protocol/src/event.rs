/// An event extracted from the answer stream.
///
/// Events are transient: they are produced by the parser and consumed
/// right away by whoever drives the stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolEvent {
    /// A piece of answer text, to be appended as-is.
    ContentFragment(String),
    /// The upstream service reported an error.
    ErrorReported(String),
    /// The answer is complete.
    StreamEnded,
}

impl ProtocolEvent {
    /// Returns `true` if no further events follow this one.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProtocolEvent::ErrorReported(_) | ProtocolEvent::StreamEnded
        )
    }
}
