//! Runtime settings.
//!
//! Settings are layered: defaults, then an optional JSON document, then
//! environment overrides. Invalid override values are logged and ignored.

use serde::{Deserialize, Serialize};

use crate::HubError;

/// `@context` stamped onto every hub response.
pub const DEFAULT_SCHEMA_CONTEXT: &str = "https://schema.identity.foundation/0.1";

/// Number of records a store returns per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Environment variable overriding [`Settings::page_size`].
pub const PAGE_SIZE_ENV_VAR: &str = "HUB_PAGE_SIZE";

/// Environment variable overriding [`Settings::schema_context`].
pub const SCHEMA_CONTEXT_ENV_VAR: &str = "HUB_SCHEMA_CONTEXT";

/// Hub runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Records per page returned by store queries.
    pub page_size: usize,
    /// `@context` of response bodies.
    pub schema_context: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            schema_context: DEFAULT_SCHEMA_CONTEXT.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON layer on top of the defaults.
    pub fn from_json(raw: &str) -> Result<Self, HubError> {
        let mut settings: Settings = serde_json::from_str(raw)
            .map_err(|e| HubError::server_error(format!("invalid settings: {e}")))?;
        if settings.page_size == 0 {
            tracing::warn!("page_size of 0 is not usable, using {DEFAULT_PAGE_SIZE}");
            settings.page_size = DEFAULT_PAGE_SIZE;
        }
        Ok(settings)
    }

    /// Apply `HUB_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(PAGE_SIZE_ENV_VAR) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                match trimmed.parse::<usize>() {
                    Ok(0) => {
                        tracing::warn!("{PAGE_SIZE_ENV_VAR} must be positive, ignoring");
                    }
                    Ok(value) => self.page_size = value,
                    Err(err) => {
                        tracing::warn!("invalid {PAGE_SIZE_ENV_VAR}, ignoring: {err}");
                    }
                }
            }
        }

        if let Some(raw) = lookup(SCHEMA_CONTEXT_ENV_VAR) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                self.schema_context = trimmed.to_string();
            }
        }
    }
}
