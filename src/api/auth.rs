//! Inbound bearer-token gate.
//!
//! Applied to every privileged route: validates the token's signature, issuer
//! and audience before any handler body runs, and attaches the validated claim
//! set to the request for downstream use. Failures always short-circuit with
//! `401 {"msg": "Invalid token"}`.

use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{
    decode, decode_header,
    jwk::{AlgorithmParameters, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Claim set extracted from a validated inbound token.
///
/// `sub` identifies the calling subject; all other claims ride along opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

struct GateKey {
    kid: Option<String>,
    key: DecodingKey,
}

/// Validates inbound bearer tokens against the configured issuer and audience.
pub struct AuthGate {
    issuer: String,
    audience: String,
    algorithms: Vec<Algorithm>,
    keys: Vec<GateKey>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("algorithms", &self.algorithms)
            .field("keys", &self.keys.len())
            .finish()
    }
}

impl AuthGate {
    /// Fetch the issuer's JWKS document and build an RS256 gate from it.
    ///
    /// Keys are loaded once at startup; rotation requires a restart.
    ///
    /// # Errors
    /// Returns an error if the JWKS document cannot be fetched or holds no
    /// usable RSA key.
    pub async fn from_issuer(issuer_base_url: &str, audience: &str) -> Result<Self> {
        let base = issuer_base_url.trim_end_matches('/');
        let jwks_url = format!("{base}/.well-known/jwks.json");

        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()?;

        let jwks: JwkSet = client
            .get(&jwks_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {jwks_url}"))?
            .json()
            .await
            .context("Failed to parse JWKS document")?;

        let mut keys = Vec::new();

        for jwk in &jwks.keys {
            if !matches!(jwk.algorithm, AlgorithmParameters::RSA(_)) {
                continue;
            }

            let key = DecodingKey::from_jwk(jwk)
                .with_context(|| format!("Unusable JWK {:?}", jwk.common.key_id))?;

            keys.push(GateKey {
                kid: jwk.common.key_id.clone(),
                key,
            });
        }

        if keys.is_empty() {
            return Err(anyhow!("JWKS document at {jwks_url} holds no RSA keys"));
        }

        info!("Loaded {} signing key(s) from {}", keys.len(), jwks_url);

        Ok(Self {
            issuer: format!("{base}/"),
            audience: audience.to_string(),
            algorithms: vec![Algorithm::RS256],
            keys,
        })
    }

    /// Build a gate around a fixed decoding key. Used by tests, where tokens
    /// are minted locally instead of by the provider.
    #[must_use]
    pub fn with_key(issuer: &str, audience: &str, key: DecodingKey, algorithm: Algorithm) -> Self {
        Self {
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            algorithms: vec![algorithm],
            keys: vec![GateKey { kid: None, key }],
        }
    }

    /// Validate signature and claims, returning the claim set on success.
    ///
    /// # Errors
    /// Returns the underlying decode error; callers map any failure to 401.
    pub fn validate(&self, token: &str) -> jsonwebtoken::errors::Result<TokenClaims> {
        let header = decode_header(token)?;

        if !self.algorithms.contains(&header.alg) {
            return Err(jsonwebtoken::errors::ErrorKind::InvalidAlgorithm.into());
        }

        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        let mut last_error: jsonwebtoken::errors::Error =
            jsonwebtoken::errors::ErrorKind::InvalidToken.into();

        for gate_key in self.candidates(header.kid.as_deref()) {
            match decode::<TokenClaims>(token, &gate_key.key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(err) => last_error = err,
            }
        }

        Err(last_error)
    }

    // Prefer an exact kid match; a token without kid is tried against all keys.
    fn candidates(&self, kid: Option<&str>) -> Vec<&GateKey> {
        match kid {
            Some(kid) => {
                let matched: Vec<&GateKey> = self
                    .keys
                    .iter()
                    .filter(|key| key.kid.as_deref() == Some(kid))
                    .collect();

                if matched.is_empty() {
                    self.keys.iter().collect()
                } else {
                    matched
                }
            }
            None => self.keys.iter().collect(),
        }
    }
}

/// Middleware guarding privileged routes.
///
/// On success the validated [`TokenClaims`] are inserted into the request
/// extensions; on failure the handler never runs.
pub async fn require_bearer(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return invalid_token();
    };

    match gate.validate(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            debug!("Bearer token rejected: {err}");
            invalid_token()
        }
    }
}

fn invalid_token() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Invalid token" }))).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
