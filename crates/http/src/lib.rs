//! An HTTP transport for the answer service, built on `reqwest`.

#[macro_use]
extern crate tracing;

mod body;
mod config;
mod error;

use std::sync::Arc;

use mime::Mime;
use ragchat_transport::{
    ErrorKind, QueryRequest, QueryResult, QueryTransport, TransportError,
};
use reqwest::{Client, Response, header};

pub use config::{HttpConfig, HttpConfigBuilder};
pub use error::extract_error_message;

/// Posts queries to the answer service and streams back the body.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    config: Arc<HttpConfig>,
}

impl HttpTransport {
    /// Creates a new `HttpTransport` with the given configuration.
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build().map_err(|err| {
            TransportError::new(ErrorKind::Connect, err.to_string())
        })?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }
}

impl QueryTransport for HttpTransport {
    fn send_query(
        &self,
        req: &QueryRequest,
    ) -> impl Future<Output = QueryResult> + Send + 'static {
        let resp_fut = self
            .client
            .post(self.config.endpoint())
            .header(header::ACCEPT, "text/event-stream")
            .json(req)
            .send();
        let endpoint = self.config.endpoint().to_owned();

        async move {
            debug!("posting query to {endpoint}");
            let resp = resp_fut.await.map_err(|err| {
                error!("request failed: {err}");
                TransportError::new(ErrorKind::Connect, err.to_string())
            })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(status_error(resp).await);
            }

            check_content_type(&resp);
            Ok(body::byte_stream(resp))
        }
    }
}

async fn status_error(resp: Response) -> TransportError {
    let code = resp.status().as_u16();
    // The body is only used to improve the message, so a failed read
    // just falls through to the status-derived one.
    let body = resp.text().await.unwrap_or_default();
    let message = extract_error_message(code, &body);
    error!("server answered {code}: {message}");
    TransportError::status(code, message)
}

fn check_content_type(resp: &Response) {
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let is_stream = content_type
        .and_then(|v| v.parse().ok())
        .map(|m: Mime| {
            m.type_() == mime::TEXT
                && (m.subtype() == mime::EVENT_STREAM
                    || m.subtype() == mime::PLAIN)
        })
        .unwrap_or(false);
    if !is_stream {
        warn!("unexpected content type {content_type:?}, reading it anyway");
    }
}
