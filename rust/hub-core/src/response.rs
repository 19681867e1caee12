//! Hub responses.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::store::ObjectContainer;

/// Body of an object query response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectQueryResponse {
    /// Matching object metadata the requester may see.
    pub objects: Vec<ObjectContainer>,
    /// Token for the next page.
    pub skip_token: Option<String>,
}

/// Body of a commit query response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitQueryResponse {
    /// Commit envelopes, projected to the requested fields.
    pub commits: Vec<Value>,
    /// Token for the next page.
    pub skip_token: Option<String>,
}

/// Body of a write response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteResponse {
    /// Every revision known for the written object.
    pub revisions: Vec<String>,
}

/// A successful hub response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Reply to an object query.
    ObjectQuery(ObjectQueryResponse),
    /// Reply to a commit query.
    CommitQuery(CommitQueryResponse),
    /// Reply to a write.
    Write(WriteResponse),
}

impl Response {
    /// The response `@type`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Response::ObjectQuery(_) => "ObjectQueryResponse",
            Response::CommitQuery(_) => "CommitQueryResponse",
            Response::Write(_) => "WriteResponse",
        }
    }

    /// Render the response body under `context`.
    pub fn to_json(&self, context: &str) -> Value {
        let body = match self {
            Response::ObjectQuery(body) => serde_json::to_value(body),
            Response::CommitQuery(body) => serde_json::to_value(body),
            Response::Write(body) => serde_json::to_value(body),
        };
        let mut rendered = Map::new();
        rendered.insert("@context".into(), Value::String(context.to_string()));
        rendered.insert("@type".into(), Value::String(self.type_name().to_string()));
        if let Ok(Value::Object(fields)) = body {
            rendered.extend(fields);
        }
        Value::Object(rendered)
    }
}
