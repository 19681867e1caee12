//! Error taxonomy for hub requests.
//!
//! Every failure that can reach a hub client is a [`HubError`]: an
//! [`ErrorCode`] classifying the failure, an optional dotted `property` path
//! pointing into the request that caused it, and an optional developer
//! message. The code maps to an HTTP status via [`ErrorCode::status_code`].

use serde::Serialize;
use serde_json::{Value, json};

use crate::DEFAULT_SCHEMA_CONTEXT;

/// Error codes returned by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed, missing or illegal input.
    BadRequest,
    /// The requester holds no grant for the operation.
    PermissionsRequired,
    /// A referenced object does not exist.
    NotFound,
    /// An invariant was violated or an internal failure occurred.
    ServerError,
    /// No handler exists for the interface and operation.
    NotImplemented,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::PermissionsRequired => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::ServerError => 500,
            ErrorCode::NotImplemented => 501,
        }
    }

    /// The wire name of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::PermissionsRequired => "permissions_required",
            ErrorCode::NotFound => "not_found",
            ErrorCode::ServerError => "server_error",
            ErrorCode::NotImplemented => "not_implemented",
        }
    }
}

/// Canned developer messages prefixed to the offending property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeveloperMessage {
    /// A required field is absent.
    MissingParameter,
    /// A field is present but has the wrong type or an illegal value.
    IncorrectParameter,
    /// A handler is not implemented.
    NotImplemented,
}

impl DeveloperMessage {
    /// Message text.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeveloperMessage::MissingParameter => "Missing required parameter",
            DeveloperMessage::IncorrectParameter => "Incorrect parameter",
            DeveloperMessage::NotImplemented => "Not implemented",
        }
    }

    /// Message text followed by the property it concerns.
    pub fn about(&self, property: &str) -> String {
        format!("{}: {}", self.as_str(), property)
    }
}

/// A hub failure, representable as `{error_code, target?, developer_message?}`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.describe())]
pub struct HubError {
    /// Failure classification.
    pub code: ErrorCode,
    /// Dotted path of the offending request property.
    pub property: Option<String>,
    /// Human-readable explanation aimed at client developers.
    pub developer_message: Option<String>,
}

impl HubError {
    /// Create a new hub error.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            property: None,
            developer_message: None,
        }
    }

    /// Attach a developer message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.developer_message = Some(message.into());
        self
    }

    /// Attach the offending property path.
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }

    /// Malformed or illegal input at `property`.
    pub fn bad_request(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest)
            .with_property(property)
            .with_message(message)
    }

    /// A required field at `property` is absent.
    pub fn missing_parameter(property: impl Into<String>) -> Self {
        let property = property.into();
        let message = DeveloperMessage::MissingParameter.about(&property);
        Self::bad_request(property, message)
    }

    /// The field at `property` has the wrong type or an illegal value.
    pub fn incorrect_parameter(property: impl Into<String>) -> Self {
        let property = property.into();
        let message = DeveloperMessage::IncorrectParameter.about(&property);
        Self::bad_request(property, message)
    }

    /// Authorization denied. Never carries a property path.
    pub fn permissions_required() -> Self {
        Self::new(ErrorCode::PermissionsRequired)
    }

    /// A referenced object is absent.
    pub fn not_found() -> Self {
        Self::new(ErrorCode::NotFound)
    }

    /// Invariant violation or internal failure.
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerError).with_message(message)
    }

    /// No handler for the interface and operation.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotImplemented).with_message(message)
    }

    /// Render this error as an `ErrorResponse` body using the default schema context.
    pub fn to_response(&self) -> Value {
        self.to_response_in(DEFAULT_SCHEMA_CONTEXT)
    }

    /// Render this error as an `ErrorResponse` body under `context`.
    pub fn to_response_in(&self, context: &str) -> Value {
        let mut body = json!({
            "@context": context,
            "@type": "ErrorResponse",
            "error_code": self.code.as_str(),
        });
        if let Some(property) = &self.property {
            body["target"] = Value::String(property.clone());
        }
        if let Some(message) = &self.developer_message {
            body["developer_message"] = Value::String(message.clone());
        }
        body
    }

    fn describe(&self) -> String {
        match (&self.property, &self.developer_message) {
            (_, Some(message)) => format!("{}: {}", self.code.as_str(), message),
            (Some(property), None) => format!("{}: {}", self.code.as_str(), property),
            (None, None) => self.code.as_str().to_string(),
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::server_error(format!("serialization failed: {err}"))
    }
}
