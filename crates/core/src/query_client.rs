use std::pin::Pin;
use std::sync::Arc;

use ragchat_transport::{QueryRequest, QueryResult, QueryTransport};
use tracing::Instrument;

type BoxedSendQueryFuture =
    Pin<Box<dyn Future<Output = QueryResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(QueryRequest) -> BoxedSendQueryFuture + Send + Sync>;

/// A type-erased handle to a [`QueryTransport`], cheap to clone into
/// stream tasks.
#[derive(Clone)]
pub struct QueryClient {
    handler_fn: HandlerFn,
}

impl QueryClient {
    #[inline]
    pub fn new<T: QueryTransport + 'static>(transport: T) -> Self {
        // Erase `T` so that sessions don't need a generic parameter.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = transport.send_query(&req);
            Box::pin(
                async move {
                    trace!("sending query: {:?}", req.query);
                    let result = fut.await;
                    if let Err(err) = &result {
                        debug!("query rejected: {err}");
                    }
                    result
                }
                .instrument(trace_span!("send query")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a query and resolves with the response body.
    #[inline]
    pub async fn send_query(&self, req: QueryRequest) -> QueryResult {
        (self.handler_fn)(req).await
    }
}
