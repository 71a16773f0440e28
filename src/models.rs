// src/models.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How credentials are attached to the outbound request.
///
/// Only the active variant's fields are read. The JSON shape matches the
/// flat form posted by the UI, so fields belonging to other variants are
/// ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthConfig {
    #[default]
    None,
    Basic {
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
    },
    Bearer {
        #[serde(default)]
        token: String,
    },
    #[serde(rename_all = "camelCase")]
    ApiKey {
        #[serde(default, alias = "api_key")]
        api_key: String,
        #[serde(default, alias = "header_key")]
        header_key: String,
        #[serde(default = "default_in_header", alias = "in_header")]
        in_header: bool,
    },
}

fn default_in_header() -> bool {
    true
}

impl AuthConfig {
    /// Short name used in logs. Never includes credential material.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthConfig::None => "none",
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::ApiKey { in_header: true, .. } => "apiKey(header)",
            AuthConfig::ApiKey { in_header: false, .. } => "apiKey(query)",
        }
    }
}

/// One submission from the UI shell or the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub api_url: String,
    pub wallet_address: String,
    pub verification_expression: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusLabel {
    Valid,
    Invalid,
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusLabel::Valid => write!(f, "VALID"),
            StatusLabel::Invalid => write!(f, "INVALID"),
        }
    }
}

/// Outcome of one request/evaluate round trip.
///
/// `is_valid` carries whatever the expression returned (or `0` when it
/// failed); `status` is `VALID` only for a strict `1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the expression failed to compile or run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

impl VerificationResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_valid_verdict(&self) -> bool {
        self.status == Some(StatusLabel::Valid)
    }
}
