mod builder;
mod state;
mod turn;

use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::conversation::{Conversation, Message};
pub use builder::SessionBuilder;
use state::Command;

/// Read-only view of a session, republished after every change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Messages in insertion order.
    pub messages: Vec<Message>,
    /// Whether a turn is pending or streaming.
    pub loading: bool,
    /// The last conversation-level error.
    pub error: Option<String>,
}

impl SessionSnapshot {
    fn of(conversation: &Conversation) -> Self {
        Self {
            messages: conversation.messages().to_vec(),
            loading: conversation.is_loading(),
            error: conversation.error().map(ToOwned::to_owned),
        }
    }
}

/// A conversation with the answer service.
///
/// The session owns a background driver that holds the conversation and
/// at most one in-flight turn. Methods on this type only enqueue commands,
/// so they never block; observe the outcome through [`Session::subscribe`].
///
/// Dropping the session stops the driver and cancels the in-flight turn.
pub struct Session {
    cmd_tx: mpsc::UnboundedSender<Command>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    kill_tx: watch::Sender<bool>,
}

impl Session {
    /// Submits a query as a new turn.
    ///
    /// Empty or whitespace-only queries are ignored. Otherwise the new turn
    /// always supersedes the in-flight one, whose partial answer is
    /// removed.
    #[inline]
    pub fn submit<S: Into<String>>(&self, query: S) {
        self.send(Command::Submit(query.into()));
    }

    /// Cancels the in-flight turn, keeping the rest of the conversation.
    #[inline]
    pub fn cancel(&self) {
        self.send(Command::Cancel);
    }

    /// Cancels the in-flight turn and clears the conversation.
    #[inline]
    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    /// Returns a receiver that is notified on every change.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Returns the current state.
    #[inline]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    fn send(&self, cmd: Command) {
        if self.cmd_tx.send(cmd).is_err() {
            warn!("session driver has terminated, command dropped");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.kill_tx.send(true).ok();
    }
}
