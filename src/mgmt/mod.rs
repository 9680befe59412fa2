//! Token broker for the identity provider's Management API.
//!
//! Every privileged server operation performs a fresh client-credentials grant
//! and exactly one downstream call. Management tokens are short-lived and never
//! cached or persisted.

use crate::APP_USER_AGENT;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

/// Process-wide service credential, read at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ServiceCredential {
    pub domain: String,
    pub audience: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl ServiceCredential {
    #[must_use]
    pub fn new(
        domain: String,
        audience: String,
        client_id: String,
        client_secret: SecretString,
    ) -> Self {
        Self {
            domain,
            audience,
            client_id,
            client_secret,
        }
    }

    /// Base URL of the identity provider.
    ///
    /// A bare tenant domain gets an `https://` prefix; a full URL is taken as
    /// is, which lets tests point the broker at a stubbed provider.
    #[must_use]
    pub fn issuer_base_url(&self) -> String {
        let base = if self.domain.starts_with("http://") || self.domain.starts_with("https://") {
            self.domain.clone()
        } else {
            format!("https://{}", self.domain)
        };

        base.trim_end_matches('/').to_string()
    }

    /// Audience of the Management API, distinct from the application audience.
    #[must_use]
    pub fn management_audience(&self) -> String {
        format!("{}/api/v2/", self.issuer_base_url())
    }
}

/// Short-lived bearer token for the Management API, obtained fresh per
/// privileged operation.
pub struct ManagementToken(SecretString);

impl ManagementToken {
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

#[derive(Debug, Error)]
pub enum MgmtError {
    /// The client-credentials grant was rejected. Not retried automatically.
    #[error("service token grant rejected: {status}")]
    UpstreamAuth { status: StatusCode, body: Value },
    /// A Management API call failed downstream of a successful grant.
    #[error("management API call failed: {status}")]
    Api { status: StatusCode, body: Value },
    #[error("invalid management URL: {0}")]
    Url(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl MgmtError {
    /// Provider error detail carried for diagnostics in normalized responses.
    #[must_use]
    pub fn detail(&self) -> Value {
        match self {
            Self::UpstreamAuth { body, .. } | Self::Api { body, .. } => body.clone(),
            Self::Url(msg) => Value::String(msg.clone()),
            Self::Transport(err) => Value::String(err.to_string()),
        }
    }
}

fn client() -> Result<Client, MgmtError> {
    Ok(Client::builder().user_agent(APP_USER_AGENT).build()?)
}

async fn response_body(response: reqwest::Response) -> Value {
    response.json().await.unwrap_or_default()
}

/// Perform a client-credentials grant scoped to the management audience.
///
/// # Errors
/// Returns [`MgmtError::UpstreamAuth`] when the provider rejects the grant or
/// omits the access token, [`MgmtError::Transport`] on network failure.
#[instrument(skip(credential))]
pub async fn exchange_service_token(
    credential: &ServiceCredential,
) -> Result<ManagementToken, MgmtError> {
    let token_url = format!("{}/oauth/token", credential.issuer_base_url());

    let payload = json!({
        "client_id": credential.client_id,
        "client_secret": credential.client_secret.expose_secret(),
        "audience": credential.management_audience(),
        "grant_type": "client_credentials",
    });

    let response = client()?.post(&token_url).json(&payload).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response_body(response).await;

        error!("Service token grant rejected: {} {}", status, body);

        return Err(MgmtError::UpstreamAuth { status, body });
    }

    let status = response.status();
    let json_response: Value = response.json().await?;

    json_response["access_token"].as_str().map_or_else(
        || {
            error!("Service token grant succeeded but no access_token in response");

            Err(MgmtError::UpstreamAuth {
                status,
                body: json_response.clone(),
            })
        },
        |token| {
            debug!("Obtained management token");

            Ok(ManagementToken(SecretString::from(token.to_string())))
        },
    )
}

fn user_endpoint(credential: &ServiceCredential, sub: &str) -> Result<String, MgmtError> {
    let mut url =
        Url::parse(&credential.issuer_base_url()).map_err(|err| MgmtError::Url(err.to_string()))?;

    url.path_segments_mut()
        .map_err(|()| MgmtError::Url("issuer URL cannot be a base".to_string()))?
        .extend(["api", "v2", "users", sub]);

    Ok(url.to_string())
}

/// Fetch the provider's user record for `sub`.
///
/// # Errors
/// Returns [`MgmtError::Api`] when the Management API rejects the call.
#[instrument(skip(credential, token))]
pub async fn fetch_user(
    credential: &ServiceCredential,
    token: &ManagementToken,
    sub: &str,
) -> Result<Value, MgmtError> {
    let endpoint = user_endpoint(credential, sub)?;

    let response = client()?
        .get(&endpoint)
        .bearer_auth(token.expose())
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response_body(response).await;

        error!("Failed to fetch user record: {} {}", status, body);

        return Err(MgmtError::Api { status, body });
    }

    Ok(response.json().await?)
}

/// Issue a partial update of `user_metadata` on the target subject.
///
/// # Errors
/// Returns [`MgmtError::Api`] when the Management API rejects the call.
#[instrument(skip(credential, token, last_pizza_type, last_pizza_size))]
pub async fn patch_user_metadata(
    credential: &ServiceCredential,
    token: &ManagementToken,
    sub: &str,
    last_pizza_type: &str,
    last_pizza_size: &str,
) -> Result<(), MgmtError> {
    let endpoint = user_endpoint(credential, sub)?;

    let payload = json!({
        "user_metadata": {
            "lastPizzaType": last_pizza_type,
            "lastPizzaSize": last_pizza_size,
        }
    });

    let response = client()?
        .patch(&endpoint)
        .bearer_auth(token.expose())
        .json(&payload)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response_body(response).await;

        error!("Failed to patch user metadata: {} {}", status, body);

        return Err(MgmtError::Api { status, body });
    }

    Ok(())
}

/// Enqueue a verification-email job for `user_id`.
///
/// # Errors
/// Returns [`MgmtError::Api`] when the Management API rejects the call.
#[instrument(skip(credential, token))]
pub async fn send_verification_email(
    credential: &ServiceCredential,
    token: &ManagementToken,
    user_id: &str,
) -> Result<(), MgmtError> {
    let endpoint = format!(
        "{}/api/v2/jobs/verification-email",
        credential.issuer_base_url()
    );

    let payload = json!({
        "user_id": user_id,
        "client_id": credential.client_id,
    });

    let response = client()?
        .post(&endpoint)
        .bearer_auth(token.expose())
        .json(&payload)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response_body(response).await;

        error!("Failed to enqueue verification email: {} {}", status, body);

        return Err(MgmtError::Api { status, body });
    }

    Ok(())
}
