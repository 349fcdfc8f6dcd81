use ragchat_protocol::{FrameOptions, FrameParser, ProtocolEvent};
use ragchat_transport::QueryRequest;
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::state::{Command, TurnUpdate};
use crate::conversation::TurnId;
use crate::query_client::QueryClient;
use crate::{StreamReader, TurnError};

pub struct TurnContext {
    pub id: TurnId,
    pub client: QueryClient,
    pub request: QueryRequest,
    pub token: CancellationToken,
    pub frame_options: FrameOptions,
    pub cmd_tx: mpsc::UnboundedSender<Command>,
}

impl TurnContext {
    #[inline]
    fn report(&self, update: TurnUpdate) {
        self.cmd_tx.send(Command::Update(self.id, update)).ok();
    }
}

/// Runs one turn: read, decode, parse, report, until the stream ends.
pub async fn run_turn(ctx: TurnContext, prev_task: Option<JoinHandle<()>>) {
    if let Some(prev_task) = prev_task {
        prev_task.await.ok();
        trace!("previous turn torn down");
    }

    match stream_answer(&ctx).await {
        Ok(()) => trace!("finished"),
        Err(TurnError::Cancelled) => debug!("cancelled"),
        Err(err) => ctx.report(TurnUpdate::Failed(err)),
    }
    ctx.cmd_tx.send(Command::TurnEnded(ctx.id)).ok();
}

async fn stream_answer(ctx: &TurnContext) -> Result<(), TurnError> {
    if ctx.token.is_cancelled() {
        return Err(TurnError::Cancelled);
    }
    let body = select! {
        biased;

        _ = ctx.token.cancelled() => {
            return Err(TurnError::Cancelled);
        }
        body = ctx.client.send_query(ctx.request.clone()) => body?,
    };
    ctx.report(TurnUpdate::Streaming);

    let mut reader = StreamReader::new(body, ctx.token.clone());
    let mut parser = FrameParser::new(ctx.frame_options.clone());
    while let Some(text) = reader.next_text().await? {
        if !forward(ctx, parser.feed(&text)) {
            return Ok(());
        }
    }
    if forward(ctx, parser.finish()) {
        ctx.report(TurnUpdate::Finished);
    }
    Ok(())
}

/// Reports events in order. Returns `false` if the upstream service
/// reported an error, in which case the caller stops reading and the
/// body is dropped, closing the transport.
///
/// Data after the end of the answer is still read to drain the body;
/// the parser discards it.
fn forward(
    ctx: &TurnContext,
    events: impl Iterator<Item = ProtocolEvent>,
) -> bool {
    for event in events {
        let is_error = matches!(event, ProtocolEvent::ErrorReported(_));
        ctx.report(TurnUpdate::Event(event));
        if is_error {
            debug!("upstream reported an error, closing the stream");
            return false;
        }
    }
    true
}
