//! Configuration of the fleet register module and its request authentication.

use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceConfig;

/// Configuration for the `fleet_register` module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetRegisterConfig {
    /// Page size used when a listing names no `limit`.
    pub default_page_size: u64,
    /// Upper bound applied to any requested `limit`.
    pub max_page_size: u64,
    /// Header carrying the caller's role hint.
    pub role_header: String,
}

impl Default for FleetRegisterConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 1000,
            role_header: "X-Active-Role".to_owned(),
        }
    }
}

impl FleetRegisterConfig {
    #[must_use]
    pub(crate) fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

/// Bearer token authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthnConfig {
    pub mode: AuthNMode,

    /// Party every token resolves to in `accept_all` mode.
    pub default_username: String,

    /// Static token-to-party mappings for `static_tokens` mode.
    pub tokens: Vec<TokenMapping>,
}

impl Default for AuthnConfig {
    fn default() -> Self {
        Self {
            mode: AuthNMode::AcceptAll,
            default_username: "admin".to_owned(),
            tokens: Vec::new(),
        }
    }
}

impl AuthnConfig {
    /// Username a presented token resolves to, if any.
    #[must_use]
    pub fn username_for(&self, token: &str) -> Option<&str> {
        if token.is_empty() {
            return None;
        }
        match self.mode {
            AuthNMode::AcceptAll => Some(self.default_username.as_str()),
            AuthNMode::StaticTokens => self
                .tokens
                .iter()
                .find(|mapping| mapping.token == token)
                .map(|mapping| mapping.username.as_str()),
        }
    }
}

/// Authentication mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthNMode {
    /// Accept any non-empty token as the default party.
    #[default]
    AcceptAll,
    /// Map specific tokens to specific parties.
    StaticTokens,
}

/// Maps a static token to a party username.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenMapping {
    /// The bearer token value to match.
    pub token: String,
    /// Username of the party this token authenticates as.
    pub username: String,
}
