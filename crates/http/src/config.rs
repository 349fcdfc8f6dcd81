use std::time::Duration;

/// Builder for [`HttpConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpConfigBuilder {
    base_url: String,
    query_path: Option<String>,
    connect_timeout: Option<Duration>,
}

impl HttpConfigBuilder {
    /// Creates a builder for the service at `base_url`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            query_path: None,
            connect_timeout: None,
        }
    }

    /// Sets the path of the query route, relative to the base URL.
    #[inline]
    pub fn with_query_path<S: Into<String>>(mut self, path: S) -> Self {
        self.query_path = Some(path.into());
        self
    }

    /// Bounds the time spent establishing a connection.
    ///
    /// This doesn't limit how long a response may stream. Use
    /// cancellation for that.
    #[inline]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> HttpConfig {
        let base_url = self.base_url.trim_end_matches('/').to_owned();
        let path = self
            .query_path
            .unwrap_or_else(|| HttpConfig::DEFAULT_QUERY_PATH.to_owned());
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        HttpConfig {
            endpoint: format!("{base_url}{path}"),
            connect_timeout: self.connect_timeout,
        }
    }
}

/// Configuration for [`HttpTransport`](crate::HttpTransport).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpConfig {
    pub(crate) endpoint: String,
    pub(crate) connect_timeout: Option<Duration>,
}

impl HttpConfig {
    /// The query route used when none is configured.
    pub const DEFAULT_QUERY_PATH: &'static str = "/api/chat";

    /// Returns the full URL queries are posted to.
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
