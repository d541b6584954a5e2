use axum::http::{HeaderMap, header::AUTHORIZATION};
use config::AuthConfig;
use lex_core::EnvironmentTier;
use sha2::{Digest, Sha256};

use crate::errors::{GatewayError, GatewayResult};

pub const CLIENT_ID_HEADER: &str = "x-client-id";
const ANONYMOUS: &str = "anonymous";
const MAX_CLIENT_ID_CHARS: usize = 64;

/// Identity used for rate limiting and logs. Never carries the raw key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub client_key: String,
    pub authenticated: bool
}

fn digest(secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn digests_equal(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// First 16 hex chars of the SHA-256 of an API key.
pub fn client_key_for(api_key: &str) -> String {
    let mut key = hex::encode(digest(api_key));
    key.truncate(16);
    key
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn client_id_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_CLIENT_ID_CHARS
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        })
}

pub struct AuthState {
    enabled: bool,
    key_digests: Vec<[u8; 32]>,
    ops_digest: Option<[u8; 32]>,
    hardened: bool
}

impl AuthState {
    pub fn from_config(auth: &AuthConfig, environment: EnvironmentTier) -> Self {
        Self {
            enabled: auth.enabled,
            key_digests: auth.api_keys.iter().map(|k| digest(k)).collect(),
            ops_digest: auth
                .ops_token
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(digest),
            hardened: environment.is_hardened()
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Resolves the caller of the chat endpoint.
    pub fn authenticate(&self, headers: &HeaderMap) -> GatewayResult<Principal> {
        if !self.enabled {
            return Ok(Principal {
                client_key: client_id_header(headers).unwrap_or(ANONYMOUS).to_string(),
                authenticated: false
            });
        }

        let token = bearer_token(headers)
            .ok_or_else(|| GatewayError::unauthorized("missing bearer API key"))?;
        let presented = digest(token);

        // Compare against every key so timing does not reveal the match index.
        let matched = self
            .key_digests
            .iter()
            .fold(false, |found, known| digests_equal(known, &presented) | found);

        if matched {
            Ok(Principal {
                client_key: client_key_for(token),
                authenticated: true
            })
        } else {
            Err(GatewayError::unauthorized("invalid API key"))
        }
    }

    /// Ops endpoints use their own token. Without one they are open outside
    /// hardened tiers and closed inside them.
    pub fn authorize_ops(&self, headers: &HeaderMap) -> GatewayResult<()> {
        let Some(expected) = &self.ops_digest else {
            return if self.hardened {
                Err(GatewayError::unauthorized(
                    "operations endpoints are disabled: no ops token configured"
                ))
            } else {
                Ok(())
            };
        };

        match bearer_token(headers) {
            Some(token) if digests_equal(expected, &digest(token)) => Ok(()),
            Some(_) => Err(GatewayError::unauthorized("invalid ops token")),
            None => Err(GatewayError::unauthorized("missing ops token"))
        }
    }
}
