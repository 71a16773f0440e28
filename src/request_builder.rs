// src/request_builder.rs
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::form_urlencoded;

use crate::models::AuthConfig;

/// Target URL and headers for the outbound GET.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

impl BuiltRequest {
    /// Header names only, for logging without leaking credentials.
    pub fn header_names(&self) -> Vec<&str> {
        self.headers.keys().map(String::as_str).collect()
    }
}

/// `url` without its query string, for logging. Query values may carry an
/// API key.
pub fn without_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// Builds the outbound request for one wallet address.
///
/// `walletAddress` is always appended as a query parameter. Nothing is
/// validated here: a malformed `api_url` is passed through and only fails
/// once the request is sent. Query values are form-encoded.
pub fn build(api_url: &str, wallet_address: &str, auth: &AuthConfig) -> BuiltRequest {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("walletAddress", wallet_address);

    let mut headers = BTreeMap::new();
    match auth {
        AuthConfig::None => {}
        AuthConfig::Basic { username, password } => {
            let credentials = STANDARD.encode(format!("{}:{}", username, password));
            headers.insert("Authorization".to_string(), format!("Basic {}", credentials));
        }
        AuthConfig::Bearer { token } => {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        AuthConfig::ApiKey { api_key, header_key, in_header: true } => {
            if !header_key.is_empty() {
                headers.insert(header_key.clone(), api_key.clone());
            }
        }
        AuthConfig::ApiKey { api_key, header_key, in_header: false } => {
            // Lenient: an incomplete key pair is dropped rather than rejected.
            if !header_key.is_empty() && !api_key.is_empty() {
                query.append_pair(header_key, api_key);
            }
        }
    }

    let separator = if api_url.contains('?') { '&' } else { '?' };
    BuiltRequest {
        url: format!("{}{}{}", api_url, separator, query.finish()),
        headers,
    }
}
