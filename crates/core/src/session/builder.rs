use ragchat_protocol::FrameOptions;
use ragchat_transport::QueryTransport;
use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use super::state::{SessionState, run_session};
use super::{Session, SessionSnapshot};
use crate::query_client::QueryClient;

/// [`Session`] builder.
pub struct SessionBuilder {
    client: QueryClient,
    frame_options: FrameOptions,
}

impl SessionBuilder {
    /// Creates a new builder with the specified transport.
    #[inline]
    pub fn with_transport<T: QueryTransport + 'static>(transport: T) -> Self {
        Self {
            client: QueryClient::new(transport),
            frame_options: FrameOptions::default(),
        }
    }

    /// Overrides how answer streams are framed.
    #[inline]
    pub fn with_frame_options(mut self, options: FrameOptions) -> Self {
        self.frame_options = options;
        self
    }

    /// Builds the session and spawns its driver.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn build(self) -> Session {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) =
            watch::channel(SessionSnapshot::default());
        let (kill_tx, kill_rx) = watch::channel(false);

        let state = SessionState::new(
            self.client,
            self.frame_options,
            cmd_tx.clone(),
            snapshot_tx,
        );
        tokio::spawn(
            run_session(state, cmd_rx, kill_rx)
                .instrument(trace_span!("session")),
        );

        Session {
            cmd_tx,
            snapshot_rx,
            kill_tx,
        }
    }
}
