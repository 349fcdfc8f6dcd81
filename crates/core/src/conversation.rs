//! Conversation-related types.
//!
//! [`Conversation`] is the state machine behind a session. It is purely
//! synchronous: the session driver feeds it protocol events and lifecycle
//! transitions, and every method is a no-op for turns that are no longer
//! current. That makes late updates from a superseded stream harmless.

use chrono::{DateTime, Utc};
use ragchat_protocol::ProtocolEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TurnError;

/// Unique identifier of a message.
pub type MessageId = Uuid;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking.
    User,
    /// The answer service.
    Assistant,
}

/// One message in the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Returns the message id.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the author of the message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text received so far.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns when the message was created.
    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Identifier of a turn, increasing with every submit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(u64);

impl TurnId {
    /// Returns the raw value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Lifecycle of a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TurnState {
    /// The query is on its way, no response body yet.
    Pending,
    /// The answer is streaming in.
    Streaming,
    /// The answer ended normally.
    Completed,
    /// The turn failed; the assistant message carries an annotation.
    Errored,
    /// The turn was abandoned and its assistant message removed.
    Cancelled,
}

impl TurnState {
    /// Returns `true` for states a turn never leaves.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TurnState::Completed | TurnState::Errored | TurnState::Cancelled
        )
    }
}

#[derive(Clone, Debug)]
struct Turn {
    id: TurnId,
    assistant_id: MessageId,
    state: TurnState,
}

/// The messages of a session plus the state of its latest turn.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    turn: Option<Turn>,
    error: Option<String>,
    next_turn_id: u64,
}

impl Conversation {
    /// Creates an empty conversation.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages in insertion order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the last conversation-level error.
    #[inline]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the latest turn, if any.
    #[inline]
    pub fn current_turn(&self) -> Option<TurnId> {
        self.turn.as_ref().map(|t| t.id)
    }

    /// Returns the state of `turn` if it is the latest one.
    pub fn turn_state(&self, turn: TurnId) -> Option<TurnState> {
        self.turn
            .as_ref()
            .filter(|t| t.id == turn)
            .map(|t| t.state)
    }

    /// Returns `true` while the latest turn is pending or streaming.
    pub fn is_loading(&self) -> bool {
        self.turn
            .as_ref()
            .is_some_and(|t| !t.state.is_terminal())
    }

    /// Starts a new turn for `query`.
    ///
    /// An unfinished previous turn is cancelled first. Adds the user
    /// message and an empty assistant message.
    pub fn begin_turn<S: Into<String>>(&mut self, query: S) -> TurnId {
        if let Some(prev) = self.live_turn().map(|t| t.id) {
            debug!("turn {} superseded", prev.get());
            self.cancel(prev);
        }

        self.next_turn_id += 1;
        let id = TurnId(self.next_turn_id);
        let user = Message::new(Role::User, query.into());
        let assistant = Message::new(Role::Assistant, String::new());
        let assistant_id = assistant.id;
        self.messages.push(user);
        self.messages.push(assistant);
        self.turn = Some(Turn {
            id,
            assistant_id,
            state: TurnState::Pending,
        });
        self.error = None;
        debug!("turn {} started", id.get());
        id
    }

    /// Records that the response body for `turn` is being received.
    pub fn mark_streaming(&mut self, turn: TurnId) -> bool {
        let Some(t) = self.live_turn_mut(turn) else {
            return false;
        };
        t.state = TurnState::Streaming;
        true
    }

    /// Applies a protocol event to `turn`.
    ///
    /// Returns `false` if the event was ignored because the turn is not
    /// the latest one or has already terminated.
    pub fn apply(&mut self, turn: TurnId, event: ProtocolEvent) -> bool {
        let Some(t) = self.live_turn_mut(turn) else {
            trace!("dropping {event:?} for turn {}", turn.get());
            return false;
        };
        let assistant_id = t.assistant_id;

        match event {
            ProtocolEvent::ContentFragment(text) => {
                t.state = TurnState::Streaming;
                if let Some(msg) = self.message_mut(assistant_id) {
                    msg.content.push_str(&text);
                }
            }
            ProtocolEvent::ErrorReported(message) => {
                t.state = TurnState::Errored;
                warn!("turn {} reported an error: {message}", turn.get());
                self.annotate(assistant_id, &message);
                self.error = Some(message);
            }
            ProtocolEvent::StreamEnded => {
                t.state = TurnState::Completed;
                debug!("turn {} completed", turn.get());
            }
        }
        true
    }

    /// Completes `turn` after its transport finished without an end
    /// marker.
    pub fn complete(&mut self, turn: TurnId) -> bool {
        let Some(t) = self.live_turn_mut(turn) else {
            return false;
        };
        t.state = TurnState::Completed;
        debug!("turn {} completed by end of body", turn.get());
        true
    }

    /// Fails `turn` with a transport-level error.
    ///
    /// A cancellation error takes the cancellation path instead.
    pub fn fail(&mut self, turn: TurnId, err: &TurnError) -> bool {
        if err.is_cancelled() {
            return self.cancel(turn);
        }
        let Some(t) = self.live_turn_mut(turn) else {
            return false;
        };
        t.state = TurnState::Errored;
        let assistant_id = t.assistant_id;

        let message = err.to_string();
        error!("turn {} failed: {message}", turn.get());
        self.annotate(assistant_id, &message);
        self.error = Some(message);
        true
    }

    /// Cancels `turn`, removing its assistant message.
    ///
    /// The user message stays. Cancellation is not an error, so the
    /// conversation-level error is cleared.
    pub fn cancel(&mut self, turn: TurnId) -> bool {
        let Some(t) = self.live_turn_mut(turn) else {
            return false;
        };
        t.state = TurnState::Cancelled;
        let assistant_id = t.assistant_id;
        self.messages.retain(|m| m.id != assistant_id);
        self.error = None;
        debug!("turn {} cancelled", turn.get());
        true
    }

    /// Cancels the latest turn and clears everything.
    pub fn reset(&mut self) {
        if let Some(turn) = self.live_turn().map(|t| t.id) {
            self.cancel(turn);
        }
        self.messages.clear();
        self.turn = None;
        self.error = None;
    }

    fn live_turn(&self) -> Option<&Turn> {
        self.turn.as_ref().filter(|t| !t.state.is_terminal())
    }

    fn live_turn_mut(&mut self, turn: TurnId) -> Option<&mut Turn> {
        self.turn
            .as_mut()
            .filter(|t| t.id == turn && !t.state.is_terminal())
    }

    fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().rev().find(|m| m.id == id)
    }

    fn annotate(&mut self, id: MessageId, message: &str) {
        let Some(msg) = self.message_mut(id) else {
            return;
        };
        if !msg.content.is_empty() {
            msg.content.push_str("\n\n");
        }
        msg.content.push_str(&format!("[Error: {message}]"));
    }
}

#[cfg(test)]
mod tests {
    use ragchat_transport::{ErrorKind, TransportError};

    use super::*;

    fn contents(conv: &Conversation) -> Vec<(Role, &str)> {
        conv.messages().iter().map(|m| (m.role(), m.content())).collect()
    }

    fn fragment(text: &str) -> ProtocolEvent {
        ProtocolEvent::ContentFragment(text.to_owned())
    }

    #[test]
    fn test_streamed_answer() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("What is RAG?");
        assert_eq!(conv.turn_state(turn), Some(TurnState::Pending));
        assert!(conv.is_loading());

        assert!(conv.mark_streaming(turn));
        assert!(conv.apply(turn, fragment("Retrieval-")));
        assert!(conv.apply(turn, fragment("augmented")));
        assert!(conv.apply(turn, ProtocolEvent::StreamEnded));

        assert_eq!(conv.turn_state(turn), Some(TurnState::Completed));
        assert!(!conv.is_loading());
        assert_eq!(
            contents(&conv),
            vec![
                (Role::User, "What is RAG?"),
                (Role::Assistant, "Retrieval-augmented")
            ]
        );
    }

    #[test]
    fn test_completion_is_idempotent() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("q");
        conv.apply(turn, fragment("done"));
        assert!(conv.apply(turn, ProtocolEvent::StreamEnded));
        assert!(!conv.apply(turn, ProtocolEvent::StreamEnded));
        assert!(!conv.complete(turn));
        assert!(!conv.apply(turn, fragment(" again")));
        assert_eq!(conv.turn_state(turn), Some(TurnState::Completed));
        assert_eq!(conv.messages()[1].content(), "done");
    }

    #[test]
    fn test_error_event() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("q");
        conv.apply(turn, fragment("partial"));
        conv.apply(turn, ProtocolEvent::ErrorReported("rate limited".into()));
        assert!(!conv.apply(turn, fragment("more")));

        assert_eq!(conv.turn_state(turn), Some(TurnState::Errored));
        assert_eq!(conv.error(), Some("rate limited"));
        assert_eq!(
            conv.messages()[1].content(),
            "partial\n\n[Error: rate limited]"
        );
    }

    #[test]
    fn test_transport_failure() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("q");
        let err = TurnError::Transport(TransportError::status(503, "busy"));
        assert!(conv.fail(turn, &err));
        assert_eq!(conv.error(), Some("busy"));
        assert_eq!(conv.messages()[1].content(), "[Error: busy]");

        // A new turn clears the previous error.
        conv.begin_turn("again");
        assert_eq!(conv.error(), None);
        assert_eq!(conv.messages().len(), 4);
    }

    #[test]
    fn test_cancel_removes_partial_turn() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("q");
        assert!(conv.cancel(turn));
        assert_eq!(conv.turn_state(turn), Some(TurnState::Cancelled));
        assert_eq!(contents(&conv), vec![(Role::User, "q")]);
        assert!(!conv.is_loading());

        // Cancelling as a failure takes the same path.
        let turn = conv.begin_turn("r");
        conv.apply(turn, fragment("half an ans"));
        assert!(conv.fail(turn, &TurnError::Cancelled));
        assert_eq!(
            contents(&conv),
            vec![(Role::User, "q"), (Role::User, "r")]
        );
        assert_eq!(conv.error(), None);
    }

    #[test]
    fn test_cancel_after_completion_keeps_answer() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("q");
        conv.apply(turn, fragment("answer"));
        conv.complete(turn);
        assert!(!conv.cancel(turn));
        assert_eq!(conv.messages().len(), 2);
    }

    #[test]
    fn test_supersession() {
        let mut conv = Conversation::new();
        let a = conv.begin_turn("A");
        conv.apply(a, fragment("answer to A"));
        let b = conv.begin_turn("B");

        assert_eq!(conv.current_turn(), Some(b));
        assert_eq!(conv.turn_state(a), None);
        assert!(!conv.apply(a, fragment("late")));
        assert!(conv.apply(b, fragment("answer to B")));
        assert_eq!(
            contents(&conv),
            vec![
                (Role::User, "A"),
                (Role::User, "B"),
                (Role::Assistant, "answer to B")
            ]
        );
    }

    #[test]
    fn test_reset() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("q");
        conv.fail(
            turn,
            &TurnError::Transport(TransportError::new(
                ErrorKind::Connect,
                "refused",
            )),
        );
        conv.reset();
        assert!(conv.messages().is_empty());
        assert_eq!(conv.error(), None);
        assert_eq!(conv.current_turn(), None);
    }
}
