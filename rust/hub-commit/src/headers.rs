//! Protected header vocabulary.

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset};
use hub_common::HubError;
use serde_json::{Map, Value};

/// Name of the only commit strategy this hub can fold.
pub const BASIC_COMMIT_STRATEGY: &str = "basic";

/// The mutation a commit performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Originates a new object whose id is this commit's revision.
    Create,
    /// Replaces the state of an existing object.
    Update,
    /// Tombstones an existing object.
    Delete,
}

impl Operation {
    /// The wire name of this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            _ => Err(HubError::incorrect_parameter("commit.protected.operation")),
        }
    }
}

/// Hub interfaces a commit or query can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interface {
    /// Arbitrary typed objects.
    Collections,
    /// Messages sent to the owner.
    Actions,
    /// Permission grants.
    Permissions,
    /// The owner's profile document.
    Profile,
}

impl Interface {
    /// Every interface, in wire order.
    pub const ALL: [Interface; 4] = [
        Interface::Collections,
        Interface::Actions,
        Interface::Permissions,
        Interface::Profile,
    ];

    /// The wire name of this interface.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interface::Collections => "Collections",
            Interface::Actions => "Actions",
            Interface::Permissions => "Permissions",
            Interface::Profile => "Profile",
        }
    }

    /// Parse a wire name, returning `None` when it is not an interface.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.as_str() == name)
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of a commit's protected header.
///
/// All fields except `object_id` and `alg` are mandatory. `rev` must never be
/// present: it is derived from the envelope, not supplied by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectedHeaders {
    /// Interface the commit targets.
    pub interface: Interface,
    /// Schema context of the object.
    pub context: String,
    /// Schema type of the object.
    pub r#type: String,
    /// Mutation kind.
    pub operation: Operation,
    /// Client-asserted commit time.
    pub committed_at: DateTime<FixedOffset>,
    /// Folding strategy for the object's history.
    pub commit_strategy: String,
    /// Owner DID.
    pub sub: String,
    /// Signing key id, `<did>#<fragment>`.
    pub kid: String,
    /// Signature algorithm.
    pub alg: Option<String>,
    /// Object the commit mutates. Absent on the wire for creates.
    pub object_id: Option<String>,
    raw: Map<String, Value>,
}

impl ProtectedHeaders {
    /// Validate a decoded protected header object.
    pub fn from_map(raw: Map<String, Value>) -> Result<Self, HubError> {
        if raw.contains_key("rev") {
            return Err(HubError::incorrect_parameter("commit.protected.rev"));
        }

        let interface = required(&raw, "interface")?;
        let context = required(&raw, "context")?;
        let r#type = required(&raw, "type")?;
        let operation = required(&raw, "operation")?;
        let committed_at = required(&raw, "committed_at")?;
        let commit_strategy = required(&raw, "commit_strategy")?;
        let sub = required(&raw, "sub")?;
        let kid = required(&raw, "kid")?;

        let interface = Interface::parse(interface)
            .ok_or_else(|| HubError::incorrect_parameter("commit.protected.interface"))?;
        let operation: Operation = operation.parse()?;
        let committed_at = DateTime::parse_from_rfc3339(committed_at)
            .map_err(|_| HubError::incorrect_parameter("commit.protected.committed_at"))?;
        let alg = optional(&raw, "alg")?;

        let object_id = match (operation, raw.get("object_id")) {
            (Operation::Create, Some(_)) => {
                return Err(HubError::incorrect_parameter("commit.protected.object_id"));
            }
            (Operation::Create, None) => None,
            (_, None) => return Err(HubError::missing_parameter("commit.protected.object_id")),
            (_, Some(Value::String(id))) => Some(id.clone()),
            (_, Some(_)) => {
                return Err(HubError::incorrect_parameter("commit.protected.object_id"));
            }
        };

        Ok(Self {
            interface,
            context: context.to_string(),
            r#type: r#type.to_string(),
            operation,
            committed_at,
            commit_strategy: commit_strategy.to_string(),
            sub: sub.to_string(),
            kid: kid.to_string(),
            alg: alg.map(str::to_string),
            object_id,
            raw,
        })
    }

    /// The decoded header object exactly as the client sent it.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// DID of the signer: the part of the key id before `#`.
    pub fn issuer(&self) -> &str {
        self.kid.split('#').next().unwrap_or(&self.kid)
    }
}

fn required<'a>(raw: &'a Map<String, Value>, field: &str) -> Result<&'a str, HubError> {
    match raw.get(field) {
        None | Some(Value::Null) => Err(HubError::missing_parameter(format!(
            "commit.protected.{field}"
        ))),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(HubError::incorrect_parameter(format!(
            "commit.protected.{field}"
        ))),
    }
}

fn optional<'a>(raw: &'a Map<String, Value>, field: &str) -> Result<Option<&'a str>, HubError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(HubError::incorrect_parameter(format!(
            "commit.protected.{field}"
        ))),
    }
}
