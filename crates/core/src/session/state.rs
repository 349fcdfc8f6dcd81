use ragchat_protocol::{FrameOptions, ProtocolEvent};
use ragchat_transport::QueryRequest;
use tokio::select;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::SessionSnapshot;
use super::turn::{TurnContext, run_turn};
use crate::TurnError;
use crate::conversation::{Conversation, TurnId};
use crate::query_client::QueryClient;

#[derive(Debug)]
pub enum Command {
    Submit(String),
    Cancel,
    Reset,
    Update(TurnId, TurnUpdate),
    TurnEnded(TurnId),
}

/// Progress reported by a stream task.
#[derive(Debug)]
pub enum TurnUpdate {
    Streaming,
    Event(ProtocolEvent),
    Finished,
    Failed(TurnError),
}

struct ActiveTurn {
    id: TurnId,
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Everything the driver owns. Only the driver task touches it, so
/// commands are applied strictly one after another.
pub struct SessionState {
    client: QueryClient,
    frame_options: FrameOptions,
    conversation: Conversation,
    // The single cancellation slot: at most one turn is ever active.
    active: Option<ActiveTurn>,
    // A cancelled task that may still be winding down. The next turn
    // awaits it before sending its request.
    teardown: Option<JoinHandle<()>>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionState {
    pub fn new(
        client: QueryClient,
        frame_options: FrameOptions,
        cmd_tx: mpsc::UnboundedSender<Command>,
        snapshot_tx: watch::Sender<SessionSnapshot>,
    ) -> Self {
        Self {
            client,
            frame_options,
            conversation: Conversation::new(),
            active: None,
            teardown: None,
            cmd_tx,
            snapshot_tx,
        }
    }

    fn handle(&mut self, cmd: Command) {
        let changed = match cmd {
            Command::Submit(query) => self.submit(query),
            Command::Cancel => self.cancel_active(),
            Command::Reset => {
                self.cancel_active();
                self.conversation.reset();
                true
            }
            Command::Update(id, update) => self.apply_update(id, update),
            Command::TurnEnded(id) => {
                if self.active.as_ref().is_some_and(|t| t.id == id) {
                    self.active = None;
                }
                false
            }
        };
        if changed {
            self.publish();
        }
    }

    fn submit(&mut self, query: String) -> bool {
        let query = query.trim();
        if query.is_empty() {
            debug!("ignoring empty query");
            return false;
        }

        // The new task waits for the old one to wind down before sending
        // its own request.
        self.cancel_active();
        let prev_task = self.teardown.take();
        let id = self.conversation.begin_turn(query);
        let token = CancellationToken::new();
        let ctx = TurnContext {
            id,
            client: self.client.clone(),
            request: QueryRequest::new(query),
            token: token.clone(),
            frame_options: self.frame_options.clone(),
            cmd_tx: self.cmd_tx.clone(),
        };
        let task = tokio::spawn(
            run_turn(ctx, prev_task)
                .instrument(trace_span!("turn", id = id.get())),
        );
        self.active = Some(ActiveTurn { id, token, task });
        true
    }

    /// Cancels the active turn, if any, and keeps its task handle for the
    /// next turn to await.
    ///
    /// A task that is already held for teardown is covered by the newer
    /// one, because every turn awaits its predecessor first.
    fn cancel_active(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        active.token.cancel();
        self.conversation.cancel(active.id);
        self.teardown = Some(active.task);
        true
    }

    fn apply_update(&mut self, id: TurnId, update: TurnUpdate) -> bool {
        if self.active.as_ref().is_none_or(|t| t.id != id) {
            trace!("ignoring update for stale turn {}", id.get());
            return false;
        }
        match update {
            TurnUpdate::Streaming => self.conversation.mark_streaming(id),
            TurnUpdate::Event(event) => self.conversation.apply(id, event),
            TurnUpdate::Finished => self.conversation.complete(id),
            TurnUpdate::Failed(err) => self.conversation.fail(id, &err),
        }
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(SessionSnapshot::of(&self.conversation));
    }

    fn shutdown(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
        }
    }
}

pub async fn run_session(
    mut state: SessionState,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    mut kill_rx: watch::Receiver<bool>,
) {
    debug!("started");
    loop {
        let cmd = select! {
            biased;

            _ = kill_rx.changed() => {
                break;
            }
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                cmd
            }
        };
        trace!("received command: {cmd:?}");
        state.handle(cmd);
    }
    state.shutdown();
    debug!("will terminate");
}
