//! Seam for the identity provider's SDK.
//!
//! The SDK owns token custody, redirect mechanics, and signature validation;
//! this crate only drives it. Concrete bindings implement [`IdentityClient`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Provider-supplied user claims. Read-only; never mutated locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Application state carried opaquely through the login redirect round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub target_url: Option<String>,
}

/// Options for [`IdentityClient::login_with_redirect`].
#[derive(Debug, Clone, Default)]
pub struct RedirectOptions {
    /// Where the provider sends the browser back to; always the page origin.
    pub redirect_uri: String,
    pub app_state: Option<AppState>,
}

/// Options for [`IdentityClient::logout`].
#[derive(Debug, Clone, Default)]
pub struct LogoutOptions {
    pub return_to: String,
}

/// Outcome of the code-for-session exchange on the callback leg.
#[derive(Debug, Clone, Default)]
pub struct RedirectResult {
    pub app_state: Option<AppState>,
}

/// Capability set consumed from the identity SDK.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool>;

    /// The current user's claims, if a session exists.
    async fn get_user(&self) -> Result<Option<UserClaims>>;

    /// Leave the page for the provider's authorization endpoint. Under normal
    /// conditions this does not return control; the page unloads.
    async fn login_with_redirect(&self, options: RedirectOptions) -> Result<()>;

    /// Clear the session and leave for the provider's logout endpoint.
    async fn logout(&self, options: LogoutOptions) -> Result<()>;

    /// Obtain a short-lived access token without user-visible interaction.
    async fn get_token_silently(&self) -> Result<String>;

    /// Exchange the authorization code in the current URL for a session.
    async fn handle_redirect_callback(&self) -> Result<RedirectResult>;
}
