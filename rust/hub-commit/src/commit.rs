//! The commit data model.

use hub_common::{HubError, Revision, encoding};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::headers::{Operation, ProtectedHeaders};

/// An immutable record of one mutation to one logical object.
///
/// Constructed once from a wire envelope by [`Commit::parse`] and never
/// mutated afterwards. The revision is a pure function of the encoded
/// `protected` and `payload` strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    protected: String,
    payload: String,
    header: Map<String, Value>,
    headers: ProtectedHeaders,
    payload_bytes: Vec<u8>,
    revision: Revision,
    object_id: String,
}

impl Commit {
    /// Parse and validate a commit envelope.
    ///
    /// # Errors
    ///
    /// Returns a `BadRequest` [`HubError`] whose property is a dotted path into
    /// the envelope, e.g. `commit.protected.object_id`.
    pub fn parse(envelope: &Value) -> Result<Self, HubError> {
        let Value::Object(envelope) = envelope else {
            return Err(HubError::incorrect_parameter("commit"));
        };

        let protected = envelope_string(envelope, "protected")?;
        let payload = envelope_string(envelope, "payload")?;

        let header = match envelope.get("header") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(header)) => header.clone(),
            Some(_) => return Err(HubError::incorrect_parameter("commit.header")),
        };

        let decoded = encoding::decode(protected)
            .map_err(|_| HubError::incorrect_parameter("commit.protected"))?;
        let raw: Map<String, Value> = serde_json::from_slice(&decoded)
            .map_err(|_| HubError::incorrect_parameter("commit.protected"))?;
        let headers = ProtectedHeaders::from_map(raw)?;

        let payload_bytes = encoding::decode(payload)
            .map_err(|_| HubError::incorrect_parameter("commit.payload"))?;

        let revision = Revision::of(protected, payload);
        let object_id = match headers.operation {
            Operation::Create => revision.to_string(),
            _ => headers
                .object_id
                .clone()
                .unwrap_or_else(|| revision.to_string()),
        };

        Ok(Self {
            protected: protected.to_string(),
            payload: payload.to_string(),
            header,
            headers,
            payload_bytes,
            revision,
            object_id,
        })
    }

    /// The encoded protected header, as transmitted.
    pub fn encoded_protected(&self) -> &str {
        &self.protected
    }

    /// The encoded payload, as transmitted.
    pub fn encoded_payload(&self) -> &str {
        &self.payload
    }

    /// The unprotected header object.
    pub fn unprotected_headers(&self) -> &Map<String, Value> {
        &self.header
    }

    /// Typed protected headers.
    pub fn protected_headers(&self) -> &ProtectedHeaders {
        &self.headers
    }

    /// Unprotected and protected headers merged, protected taking precedence,
    /// plus the derived `rev`, `iss` and `object_id`. The map is a copy.
    pub fn headers(&self) -> Map<String, Value> {
        let mut merged = self.header.clone();
        for (key, value) in self.headers.raw() {
            merged.insert(key.clone(), value.clone());
        }
        merged.insert("rev".into(), Value::String(self.revision.to_string()));
        merged.insert("iss".into(), Value::String(self.issuer().to_string()));
        merged.insert("object_id".into(), Value::String(self.object_id.clone()));
        merged
    }

    /// Decoded payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload_bytes
    }

    /// Decode the payload as JSON into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, HubError> {
        serde_json::from_slice(&self.payload_bytes)
            .map_err(|_| HubError::incorrect_parameter("commit.payload"))
    }

    /// Content-derived revision of this commit.
    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    /// Id of the object this commit belongs to. For creates this is the
    /// commit's own revision.
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// DID of the signer, derived from the key id.
    pub fn issuer(&self) -> &str {
        self.headers.issuer()
    }

    /// Owner DID.
    pub fn subject(&self) -> &str {
        &self.headers.sub
    }

    /// Mutation kind.
    pub fn operation(&self) -> Operation {
        self.headers.operation
    }

    /// Folding strategy name.
    pub fn commit_strategy(&self) -> &str {
        &self.headers.commit_strategy
    }

    /// The bytes a signature covers: `"<protected>.<payload>"`.
    pub fn signing_input(&self) -> Vec<u8> {
        format!("{}.{}", self.protected, self.payload).into_bytes()
    }

    /// Re-emit the envelope without a signature.
    pub fn to_json(&self) -> Value {
        let mut envelope = Map::new();
        envelope.insert("protected".into(), Value::String(self.protected.clone()));
        envelope.insert("payload".into(), Value::String(self.payload.clone()));
        if !self.header.is_empty() {
            envelope.insert("header".into(), Value::Object(self.header.clone()));
        }
        Value::Object(envelope)
    }
}

fn envelope_string<'a>(envelope: &'a Map<String, Value>, field: &str) -> Result<&'a str, HubError> {
    match envelope.get(field) {
        None | Some(Value::Null) => Err(HubError::missing_parameter(format!("commit.{field}"))),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(HubError::incorrect_parameter(format!("commit.{field}"))),
    }
}
