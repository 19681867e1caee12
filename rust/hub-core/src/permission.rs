//! Permission grants.
//!
//! A grant is an object the owner stores in their own `Permissions`
//! interface, entitling a grantee to some of `create`, `read`, `update`,
//! `delete` and `execute` on one context and type. The entitlements are a
//! five character mask such as `-R---` or `CRUD-`.

use std::{fmt, str::FromStr, sync::LazyLock};

use hub_common::HubError;
use hub_commit::{Commit, Operation};
use serde_json::{Map, Value};

/// Context of permission grant objects.
pub const PERMISSION_GRANT_CONTEXT: &str = "https://schema.identity.foundation/0.1";

/// Type of permission grant objects.
pub const PERMISSION_GRANT_TYPE: &str = "PermissionGrant";

/// Context and type placeholder of [`OWNER_PERMISSION`].
pub const ANY: &str = "*";

/// An entitlement a grant can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionOperation {
    /// `C`
    Create,
    /// `R`
    Read,
    /// `U`
    Update,
    /// `D`
    Delete,
    /// `X`
    Execute,
}

impl PermissionOperation {
    const ALL: [PermissionOperation; 5] = [
        PermissionOperation::Create,
        PermissionOperation::Read,
        PermissionOperation::Update,
        PermissionOperation::Delete,
        PermissionOperation::Execute,
    ];

    /// Position of this entitlement in an allow mask.
    pub fn position(&self) -> usize {
        match self {
            PermissionOperation::Create => 0,
            PermissionOperation::Read => 1,
            PermissionOperation::Update => 2,
            PermissionOperation::Delete => 3,
            PermissionOperation::Execute => 4,
        }
    }

    /// Mask letter of this entitlement.
    pub fn letter(&self) -> char {
        match self {
            PermissionOperation::Create => 'C',
            PermissionOperation::Read => 'R',
            PermissionOperation::Update => 'U',
            PermissionOperation::Delete => 'D',
            PermissionOperation::Execute => 'X',
        }
    }
}

impl From<Operation> for PermissionOperation {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::Create => PermissionOperation::Create,
            Operation::Update => PermissionOperation::Update,
            Operation::Delete => PermissionOperation::Delete,
        }
    }
}

/// A CRUDX entitlement mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Allow([bool; 5]);

impl Allow {
    /// Every entitlement.
    pub const ALL: Allow = Allow([true; 5]);

    /// Whether the mask grants `operation`.
    pub fn permits(&self, operation: PermissionOperation) -> bool {
        self.0[operation.position()]
    }
}

impl FromStr for Allow {
    type Err = HubError;

    /// Parse a five character mask. Letters are case-insensitive and must sit
    /// at their own position; `-` leaves an entitlement out.
    fn from_str(mask: &str) -> Result<Self, Self::Err> {
        let letters: Vec<char> = mask.chars().collect();
        if letters.len() != PermissionOperation::ALL.len() {
            return Err(HubError::incorrect_parameter("allow"));
        }
        let mut allow = [false; 5];
        for (operation, letter) in PermissionOperation::ALL.iter().zip(letters) {
            match letter {
                '-' => {}
                letter if letter.to_ascii_uppercase() == operation.letter() => {
                    allow[operation.position()] = true;
                }
                _ => return Err(HubError::incorrect_parameter("allow")),
            }
        }
        Ok(Allow(allow))
    }
}

impl fmt::Display for Allow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for operation in PermissionOperation::ALL {
            let letter = if self.permits(operation) {
                operation.letter()
            } else {
                '-'
            };
            write!(f, "{letter}")?;
        }
        Ok(())
    }
}

/// An entitlement of `grantee` over `owner`'s objects of one context and
/// type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrant {
    /// DID whose data the grant covers.
    pub owner: String,
    /// DID receiving the entitlements.
    pub grantee: String,
    /// Entitlement mask.
    pub allow: Allow,
    /// Schema context covered.
    pub context: String,
    /// Schema type covered.
    pub r#type: String,
    /// Restrict the grant to objects created by this DID.
    pub created_by: Option<String>,
}

/// Synthetic grant standing for the owner's unconditional authority. It is
/// never stored.
pub static OWNER_PERMISSION: LazyLock<PermissionGrant> = LazyLock::new(|| PermissionGrant {
    owner: String::new(),
    grantee: String::new(),
    allow: Allow::ALL,
    context: ANY.to_string(),
    r#type: ANY.to_string(),
    created_by: None,
});

impl PermissionGrant {
    /// Decode a grant from the JSON object stored as a commit payload.
    ///
    /// # Errors
    ///
    /// `BadRequest` naming the offending `permission_grant.*` field.
    pub fn decode(value: &Value) -> Result<Self, HubError> {
        let Value::Object(raw) = value else {
            return Err(HubError::incorrect_parameter("permission_grant"));
        };
        Ok(Self {
            owner: field(raw, "owner")?,
            grantee: field(raw, "grantee")?,
            allow: field(raw, "allow")?
                .parse()
                .map_err(|_| HubError::incorrect_parameter("permission_grant.allow"))?,
            context: field(raw, "context")?,
            r#type: field(raw, "type")?,
            created_by: match raw.get("created_by") {
                None | Some(Value::Null) => None,
                Some(Value::String(created_by)) => Some(created_by.clone()),
                Some(_) => {
                    return Err(HubError::incorrect_parameter(
                        "permission_grant.created_by",
                    ));
                }
            },
        })
    }

    /// Decode the grant a commit's payload carries.
    pub fn from_commit(commit: &Commit) -> Result<Self, HubError> {
        Self::decode(&commit.payload_as::<Value>()?)
    }

    /// Render as the JSON object stored in a commit payload.
    pub fn to_json(&self) -> Value {
        let mut raw = Map::new();
        raw.insert("owner".into(), Value::String(self.owner.clone()));
        raw.insert("grantee".into(), Value::String(self.grantee.clone()));
        raw.insert("allow".into(), Value::String(self.allow.to_string()));
        raw.insert("context".into(), Value::String(self.context.clone()));
        raw.insert("type".into(), Value::String(self.r#type.clone()));
        if let Some(created_by) = &self.created_by {
            raw.insert("created_by".into(), Value::String(created_by.clone()));
        }
        Value::Object(raw)
    }

    /// Whether the grant entitles `operation`.
    pub fn permits(&self, operation: PermissionOperation) -> bool {
        self.allow.permits(operation)
    }

    /// Whether this is the synthetic [`OWNER_PERMISSION`].
    pub fn is_owner_permission(&self) -> bool {
        *self == *OWNER_PERMISSION
    }
}

fn field(raw: &Map<String, Value>, name: &str) -> Result<String, HubError> {
    match raw.get(name) {
        None | Some(Value::Null) => Err(HubError::missing_parameter(format!(
            "permission_grant.{name}"
        ))),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(HubError::incorrect_parameter(format!(
            "permission_grant.{name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_reads_masks_by_position() {
        let allow: Allow = "-R-d-".parse().unwrap();
        assert!(allow.permits(PermissionOperation::Read));
        assert!(allow.permits(PermissionOperation::Delete));
        assert!(!allow.permits(PermissionOperation::Create));
        assert!(!allow.permits(PermissionOperation::Execute));
        assert_eq!(allow.to_string(), "-R-D-");
    }

    #[test]
    fn it_rejects_misplaced_letters() {
        assert!("R----".parse::<Allow>().is_err());
        assert!("CRUD".parse::<Allow>().is_err());
        assert!("CRUDXX".parse::<Allow>().is_err());
    }

    #[test]
    fn it_decodes_grants() {
        let grant = PermissionGrant::decode(&json!({
            "owner": "did:example:alice",
            "grantee": "did:example:bob",
            "allow": "-R---",
            "context": "example.com",
            "type": "Person",
        }))
        .unwrap();
        assert_eq!(grant.created_by, None);
        assert!(grant.permits(PermissionOperation::Read));
        assert_eq!(PermissionGrant::decode(&grant.to_json()).unwrap(), grant);
    }

    #[test]
    fn it_names_malformed_grant_fields() {
        let err = PermissionGrant::decode(&json!({
            "owner": "did:example:alice",
            "allow": "-R---",
            "context": "example.com",
            "type": "Person",
        }))
        .unwrap_err();
        assert_eq!(err, HubError::missing_parameter("permission_grant.grantee"));

        let err = PermissionGrant::decode(&json!({
            "owner": "did:example:alice",
            "grantee": "did:example:bob",
            "allow": "read",
            "context": "example.com",
            "type": "Person",
        }))
        .unwrap_err();
        assert_eq!(err, HubError::incorrect_parameter("permission_grant.allow"));
    }

    #[test]
    fn it_grants_the_owner_everything() {
        for operation in PermissionOperation::ALL {
            assert!(OWNER_PERMISSION.permits(operation));
        }
        assert!(OWNER_PERMISSION.is_owner_permission());
    }
}
