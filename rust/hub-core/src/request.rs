//! Hub requests.
//!
//! Every request carries a [`BaseRequest`] envelope naming the requester
//! (`iss`), the hub (`aud`) and the owner whose data is addressed (`sub`). The
//! `@type` field selects one of three closed variants of [`Request`].

use hub_common::HubError;
use hub_commit::{Interface, Operation, SignedCommit};
use serde_json::{Map, Value};

use crate::store::{FilterValue, QueryFilter};

/// `@type` of an object query.
pub const OBJECT_QUERY_REQUEST: &str = "ObjectQueryRequest";
/// `@type` of a commit query.
pub const COMMIT_QUERY_REQUEST: &str = "CommitQueryRequest";
/// `@type` of a write.
pub const WRITE_REQUEST: &str = "WriteRequest";

/// Fields shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRequest {
    /// Requester DID.
    pub iss: String,
    /// Hub DID.
    pub aud: String,
    /// Owner DID.
    pub sub: String,
    /// Request `@type`.
    pub r#type: String,
}

impl BaseRequest {
    fn parse(raw: &Map<String, Value>) -> Result<Self, HubError> {
        Ok(Self {
            r#type: string(raw, "@type", "@type")?,
            iss: string(raw, "iss", "iss")?,
            aud: string(raw, "aud", "aud")?,
            sub: string(raw, "sub", "sub")?,
        })
    }

    /// Whether the requester is the owner.
    pub fn is_owner(&self) -> bool {
        self.iss == self.sub
    }
}

/// A query for object metadata of one context and type.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectQueryRequest {
    /// Envelope fields.
    pub base: BaseRequest,
    /// Interface queried.
    pub interface: Interface,
    /// Schema context of the objects.
    pub context: String,
    /// Schema type of the objects.
    pub r#type: String,
    /// Restrict to these object ids.
    pub object_ids: Option<Vec<String>>,
    /// Additional equality filters.
    pub filters: Vec<QueryFilter>,
    /// Token from a previous page.
    pub skip_token: Option<String>,
}

/// A commit field a [`CommitQueryRequest`] can project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitField {
    /// The encoded protected header.
    Protected,
    /// The encoded payload.
    Payload,
    /// The unprotected header.
    Header,
    /// The signature.
    Signature,
}

impl CommitField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "protected" => Some(CommitField::Protected),
            "payload" => Some(CommitField::Payload),
            "header" => Some(CommitField::Header),
            "signature" => Some(CommitField::Signature),
            _ => None,
        }
    }

    /// The envelope key of this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitField::Protected => "protected",
            CommitField::Payload => "payload",
            CommitField::Header => "header",
            CommitField::Signature => "signature",
        }
    }
}

/// A query for the raw commits of some objects.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitQueryRequest {
    /// Envelope fields.
    pub base: BaseRequest,
    /// Objects whose commits are wanted. Never empty.
    pub object_ids: Vec<String>,
    /// Restrict to these revisions.
    pub revisions: Option<Vec<String>>,
    /// Envelope fields to return; all when `None`.
    pub fields: Option<Vec<CommitField>>,
    /// Token from a previous page.
    pub skip_token: Option<String>,
}

/// A signed commit to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    /// Envelope fields.
    pub base: BaseRequest,
    /// The commit, not yet signature-checked.
    pub commit: SignedCommit,
}

/// A parsed hub request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Object metadata query.
    ObjectQuery(ObjectQueryRequest),
    /// Raw commit query.
    CommitQuery(CommitQueryRequest),
    /// Commit write.
    Write(WriteRequest),
}

impl Request {
    /// Parse a request body.
    pub fn from_json(raw: &str) -> Result<Self, HubError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| HubError::bad_request("request", format!("invalid JSON: {e}")))?;
        Self::parse(&value)
    }

    /// Parse a decoded request body.
    pub fn parse(value: &Value) -> Result<Self, HubError> {
        let Value::Object(raw) = value else {
            return Err(HubError::incorrect_parameter("request"));
        };
        let base = BaseRequest::parse(raw)?;
        match base.r#type.as_str() {
            OBJECT_QUERY_REQUEST => parse_object_query(base, raw).map(Request::ObjectQuery),
            COMMIT_QUERY_REQUEST => parse_commit_query(base, raw).map(Request::CommitQuery),
            WRITE_REQUEST => parse_write(base, raw).map(Request::Write),
            _ => Err(HubError::incorrect_parameter("@type")),
        }
    }

    /// Envelope fields.
    pub fn base(&self) -> &BaseRequest {
        match self {
            Request::ObjectQuery(request) => &request.base,
            Request::CommitQuery(request) => &request.base,
            Request::Write(request) => &request.base,
        }
    }

    /// Requester DID.
    pub fn iss(&self) -> &str {
        &self.base().iss
    }

    /// Owner DID.
    pub fn sub(&self) -> &str {
        &self.base().sub
    }
}

impl WriteRequest {
    /// Interface the commit targets.
    pub fn interface(&self) -> Interface {
        self.commit.protected_headers().interface
    }

    /// Schema context of the written object.
    pub fn context(&self) -> &str {
        &self.commit.protected_headers().context
    }

    /// Schema type of the written object.
    pub fn object_type(&self) -> &str {
        &self.commit.protected_headers().r#type
    }

    /// The commit's operation.
    pub fn operation(&self) -> Operation {
        self.commit.operation()
    }
}

fn parse_object_query(
    base: BaseRequest,
    raw: &Map<String, Value>,
) -> Result<ObjectQueryRequest, HubError> {
    let query = object(raw, "query", "query")?;
    let interface = string(query, "interface", "query.interface")?;
    let interface = Interface::parse(&interface)
        .ok_or_else(|| HubError::incorrect_parameter("query.interface"))?;

    let filters = match query.get("filters") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(filters)) => filters
            .iter()
            .enumerate()
            .map(|(index, filter)| parse_filter(index, filter))
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(HubError::incorrect_parameter("query.filters")),
    };

    Ok(ObjectQueryRequest {
        base,
        interface,
        context: string(query, "context", "query.context")?,
        r#type: string(query, "type", "query.type")?,
        object_ids: optional_strings(query, "object_id", "query.object_id")?,
        filters,
        skip_token: optional_string(query, "skip_token", "query.skip_token")?,
    })
}

fn parse_filter(index: usize, filter: &Value) -> Result<QueryFilter, HubError> {
    let path = format!("query.filters.{index}");
    let Value::Object(filter) = filter else {
        return Err(HubError::incorrect_parameter(path));
    };
    let field = string(filter, "field", &format!("{path}.field"))?;
    match filter.get("type") {
        None | Some(Value::Null) => {}
        Some(Value::String(kind)) if kind == "eq" => {}
        Some(_) => return Err(HubError::incorrect_parameter(format!("{path}.type"))),
    }
    let value = match filter.get("value") {
        Some(Value::String(value)) => FilterValue::One(value.clone()),
        Some(Value::Array(_)) => {
            FilterValue::Any(strings(filter, "value", &format!("{path}.value"))?)
        }
        None | Some(Value::Null) => {
            return Err(HubError::missing_parameter(format!("{path}.value")));
        }
        Some(_) => return Err(HubError::incorrect_parameter(format!("{path}.value"))),
    };
    Ok(QueryFilter { field, value })
}

fn parse_commit_query(
    base: BaseRequest,
    raw: &Map<String, Value>,
) -> Result<CommitQueryRequest, HubError> {
    let query = object(raw, "query", "query")?;
    let object_ids = strings(query, "object_id", "query.object_id")?;
    if object_ids.is_empty() {
        return Err(HubError::missing_parameter("query.object_id"));
    }

    let fields = optional_strings(query, "fields", "query.fields")?
        .map(|names| {
            names
                .iter()
                .map(|name| {
                    CommitField::parse(name)
                        .ok_or_else(|| HubError::incorrect_parameter("query.fields"))
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    Ok(CommitQueryRequest {
        base,
        object_ids,
        revisions: optional_strings(query, "revision", "query.revision")?,
        fields,
        skip_token: optional_string(query, "skip_token", "query.skip_token")?,
    })
}

fn parse_write(base: BaseRequest, raw: &Map<String, Value>) -> Result<WriteRequest, HubError> {
    let commit = match raw.get("commit") {
        None | Some(Value::Null) => return Err(HubError::missing_parameter("commit")),
        Some(commit) => SignedCommit::parse(commit)?,
    };
    if commit.subject() != base.sub {
        return Err(HubError::incorrect_parameter("commit.protected.sub"));
    }
    if commit.issuer() != base.iss {
        return Err(HubError::incorrect_parameter("commit.protected.kid"));
    }
    Ok(WriteRequest { base, commit })
}

fn object<'a>(
    raw: &'a Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, HubError> {
    match raw.get(field) {
        None | Some(Value::Null) => Err(HubError::missing_parameter(path)),
        Some(Value::Object(value)) => Ok(value),
        Some(_) => Err(HubError::incorrect_parameter(path)),
    }
}

fn string(raw: &Map<String, Value>, field: &str, path: &str) -> Result<String, HubError> {
    optional_string(raw, field, path)?.ok_or_else(|| HubError::missing_parameter(path))
}

fn optional_string(
    raw: &Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<Option<String>, HubError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(HubError::incorrect_parameter(path)),
    }
}

fn strings(raw: &Map<String, Value>, field: &str, path: &str) -> Result<Vec<String>, HubError> {
    optional_strings(raw, field, path)?.ok_or_else(|| HubError::missing_parameter(path))
}

fn optional_strings(
    raw: &Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<Option<Vec<String>>, HubError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| match value {
                Value::String(value) => Ok(value.clone()),
                _ => Err(HubError::incorrect_parameter(path)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(HubError::incorrect_parameter(path)),
    }
}
