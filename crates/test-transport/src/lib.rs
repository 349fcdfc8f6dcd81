//! A scripted in-process transport for testing purpose.

mod reply;

use std::collections::{HashMap, VecDeque};
use std::future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::stream;
use ragchat_transport::{
    ByteStream, QueryRequest, QueryResult, QueryTransport, TransportError,
};
use tokio::time::sleep;

pub use reply::*;

/// A transport that answers queries from a script.
///
/// Each query text maps to a [`ScriptedReply`]. Queries without a reply
/// are rejected with a 404 status error. Every received query is logged
/// and can be inspected with [`ScriptedTransport::received_queries`].
///
/// # Note
///
/// Replies are cloned for every request. You should only use this type
/// for testing.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: HashMap<String, ScriptedReply>,
    delay: Option<Duration>,
    received: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    /// Sets the reply for `query`, replacing any previous one.
    #[inline]
    pub fn add_reply<S: Into<String>>(
        &mut self,
        query: S,
        reply: ScriptedReply,
    ) {
        self.replies.insert(query.into(), reply);
    }

    /// Delays the response head and every body chunk by `duration`.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns the queries received so far, in order.
    pub fn received_queries(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl QueryTransport for ScriptedTransport {
    fn send_query(
        &self,
        req: &QueryRequest,
    ) -> impl Future<Output = QueryResult> + Send + 'static {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req.query.clone());
        let reply = self.replies.get(&req.query).cloned();
        let query = req.query.clone();
        let delay = self.delay;

        async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            let Some(reply) = reply else {
                return Err(TransportError::status(
                    404,
                    format!("no scripted reply for {query:?}"),
                ));
            };
            if let Some(err) = reply.rejection {
                return Err(err);
            }
            Ok(body_stream(reply.chunks.into(), reply.ending, delay))
        }
    }
}

fn body_stream(
    chunks: VecDeque<bytes::Bytes>,
    ending: Ending,
    delay: Option<Duration>,
) -> ByteStream {
    let state = (chunks, Some(ending));
    Box::pin(stream::unfold(state, move |(mut chunks, ending)| async move {
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        if let Some(chunk) = chunks.pop_front() {
            return Some((Ok(chunk), (chunks, ending)));
        }
        match ending? {
            Ending::Close => None,
            Ending::Fail(err) => Some((Err(err), (chunks, None))),
            Ending::Hang => future::pending().await,
        }
    }))
}
