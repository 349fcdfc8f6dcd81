use serde::{Deserialize, Serialize};

/// A query sent to the answer service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The user's question.
    pub query: String,
}

impl QueryRequest {
    /// Creates a request for `query`.
    #[inline]
    pub fn new<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_format() {
        let req = QueryRequest::new("What is RAG?");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "query": "What is RAG?" })
        );
    }
}
