//! Access-token claims.
//!
//! Tokens are decoded, not verified: the signature is the provider's and the
//! backend's business.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::{Map, Value};

use super::ProviderError;

/// Parsed JWT payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims(Map<String, Value>);

impl TokenClaims {
    /// Decode the payload segment of a compact JWT.
    pub fn decode(token: &str) -> Result<Self, ProviderError> {
        let payload = token
            .split('.')
            .nth(1)
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| ProviderError::MalformedToken("missing payload segment".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ProviderError::MalformedToken(format!("invalid base64: {}", e)))?;

        let claims: Map<String, Value> = serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::MalformedToken(format!("invalid JSON: {}", e)))?;

        Ok(Self(claims))
    }

    pub fn from_map(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// All claims, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn exp(&self) -> Option<i64> {
        self.0.get("exp").and_then(Value::as_i64)
    }

    pub fn iat(&self) -> Option<i64> {
        self.0.get("iat").and_then(Value::as_i64)
    }

    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    pub fn preferred_username(&self) -> Option<&str> {
        self.0.get("preferred_username").and_then(Value::as_str)
    }

    /// Roles under `realm_access.roles`.
    pub fn realm_roles(&self) -> Vec<String> {
        self.0
            .get("realm_access")
            .map(roles_of)
            .unwrap_or_default()
    }

    /// Roles under `resource_access.<client>.roles`, for every client.
    pub fn resource_roles(&self) -> Vec<String> {
        match self.0.get("resource_access").and_then(Value::as_object) {
            Some(clients) => clients.values().flat_map(roles_of).collect(),
            None => Vec::new(),
        }
    }

    /// Realm roles followed by client roles, first occurrence wins.
    pub fn all_roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = Vec::new();
        for role in self.realm_roles().into_iter().chain(self.resource_roles()) {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        roles
    }
}

fn roles_of(access: &Value) -> Vec<String> {
    access
        .get("roles")
        .and_then(Value::as_array)
        .map(|roles| {
            roles
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}
