//! Session manager: a state machine around the identity SDK.
//!
//! Redirect-based login is a two-phase flow. `login` transitions to
//! `RedirectPending` and leaves the page; the return leg arrives as an opaque
//! authorization result in the URL and is consumed by
//! `handle_redirect_callback`, which restores the route the user was trying to
//! reach before the round trip.

use crate::spa::{
    history::History,
    identity::{AppState, IdentityClient, LogoutOptions, RedirectOptions, UserClaims},
    ui::UiSurface,
};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Before the identity SDK has finished initializing.
    Unknown,
    Unauthenticated,
    Authenticated,
    /// A login redirect has left the page and has not come back yet.
    RedirectPending,
    /// The callback leg is exchanging the authorization code for a session.
    CallbackProcessing,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("login could not be initiated")]
    LoginInitiationFailed(#[source] anyhow::Error),
    #[error("silent token retrieval failed")]
    SilentAuthFailure(#[source] anyhow::Error),
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    /// Set only while a login redirect is in flight; cleared exactly once,
    /// immediately after being consumed for the re-dispatch.
    pending_target: Option<String>,
}

/// Owned session manager, injected into every consumer as a dependency.
pub struct SessionManager<I: IdentityClient> {
    sdk: I,
    history: Arc<dyn History>,
    ui: Arc<dyn UiSurface>,
    // Never held across an await.
    inner: Mutex<Inner>,
}

impl<I: IdentityClient> SessionManager<I> {
    pub fn new(sdk: I, history: Arc<dyn History>, ui: Arc<dyn UiSurface>) -> Self {
        Self {
            sdk,
            history,
            ui,
            inner: Mutex::new(Inner {
                state: SessionState::Unknown,
                pending_target: None,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Resolve `Unknown` via the SDK's stored-session check.
    pub async fn initialize(&self) {
        let authenticated = self.is_authenticated().await;

        self.lock().state = if authenticated {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        };

        self.refresh_ui().await;
    }

    /// Query the SDK's current session state. Does not transition state.
    pub async fn is_authenticated(&self) -> bool {
        self.sdk.is_authenticated().await.unwrap_or_else(|err| {
            warn!("Session check failed: {err:#}");
            false
        })
    }

    /// The current user's claims.
    ///
    /// # Errors
    /// Fails with [`SessionError::NotAuthenticated`] when no session exists.
    pub async fn get_user(&self) -> Result<UserClaims, SessionError> {
        match self.sdk.get_user().await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(SessionError::NotAuthenticated),
            Err(err) => {
                warn!("Failed to read user claims: {err:#}");
                Err(SessionError::NotAuthenticated)
            }
        }
    }

    /// Begin the login redirect, optionally remembering where the user was
    /// trying to go. Under normal conditions the page unloads before this
    /// returns.
    ///
    /// # Errors
    /// Fails with [`SessionError::LoginInitiationFailed`] if the redirect
    /// cannot be initiated; the prior state is restored.
    pub async fn login(&self, target: Option<&str>) -> Result<(), SessionError> {
        info!("Logging in, target: {:?}", target);

        let prior = {
            let mut inner = self.lock();
            let prior = (inner.state, inner.pending_target.clone());
            inner.state = SessionState::RedirectPending;
            inner.pending_target = target.map(ToString::to_string);
            prior
        };

        let options = RedirectOptions {
            redirect_uri: self.history.origin(),
            app_state: target.map(|target| AppState {
                target_url: Some(target.to_string()),
            }),
        };

        match self.sdk.login_with_redirect(options).await {
            Ok(()) => Ok(()),
            Err(err) => {
                error!("Log in failed: {err:#}");

                let mut inner = self.lock();
                (inner.state, inner.pending_target) = prior;

                Err(SessionError::LoginInitiationFailed(err))
            }
        }
    }

    /// Clear the session and leave for the provider's logout endpoint.
    /// Failure is logged, not surfaced; the state stays last-known-good.
    pub async fn logout(&self) {
        info!("Logging out");

        let options = LogoutOptions {
            return_to: self.history.origin(),
        };

        if let Err(err) = self.sdk.logout(options).await {
            error!("Log out failed: {err:#}");
            return;
        }

        {
            let mut inner = self.lock();
            inner.state = SessionState::Unauthenticated;
            inner.pending_target = None;
        }

        self.refresh_ui().await;
    }

    /// Detection predicate for an inbound authorization result.
    #[must_use]
    pub fn callback_pending(query: &str) -> bool {
        query.contains("code=") && query.contains("state=")
    }

    /// Process the callback leg of a login redirect, if one is inbound.
    ///
    /// Returns the route to re-dispatch on success (`/` when none was carried).
    /// The query string is stripped via history replace in all cases, so a
    /// reload never re-triggers the exchange; calling this again afterwards is
    /// a no-op because the detection predicate no longer matches.
    pub async fn handle_redirect_callback(&self) -> Option<String> {
        let query = self.history.current_query();

        if !Self::callback_pending(&query) {
            return None;
        }

        info!("Parsing redirect");

        self.lock().state = SessionState::CallbackProcessing;

        let outcome = self.sdk.handle_redirect_callback().await;
        let path = self.history.current_path();

        match outcome {
            Ok(result) => {
                let target = {
                    let mut inner = self.lock();
                    inner.state = SessionState::Authenticated;
                    let pending = inner.pending_target.take();
                    result
                        .app_state
                        .and_then(|state| state.target_url)
                        .or(pending)
                };

                self.history.replace(&path);
                self.refresh_ui().await;

                info!("Logged in");

                Some(target.unwrap_or_else(|| "/".to_string()))
            }
            Err(err) => {
                error!("Error parsing redirect: {err:#}");

                {
                    let mut inner = self.lock();
                    inner.state = SessionState::Unauthenticated;
                    inner.pending_target = None;
                }

                self.history.replace(&path);
                self.refresh_ui().await;

                None
            }
        }
    }

    /// Obtain a short-lived token for this application's own API.
    ///
    /// # Errors
    /// Fails with [`SessionError::SilentAuthFailure`] when the session cannot
    /// produce a token without interaction; callers fall back to [`login`].
    ///
    /// [`login`]: Self::login
    pub async fn get_access_token(&self) -> Result<String, SessionError> {
        self.sdk
            .get_token_silently()
            .await
            .map_err(SessionError::SilentAuthFailure)
    }

    /// Idempotent visibility refresh; runs on every transition into or out of
    /// `Authenticated`.
    async fn refresh_ui(&self) {
        if self.is_authenticated().await {
            if let Ok(user) = self.get_user().await {
                self.ui.show_authenticated(&user);
                debug!("UI updated for {}", user.sub);
                return;
            }
        }

        self.ui.show_anonymous();
        debug!("UI updated for anonymous visitor");
    }

    #[cfg(test)]
    pub(crate) fn sdk(&self) -> &I {
        &self.sdk
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock scopes are short and never cross an await; poisoning would mean
        // a panicked holder, so propagate the panic.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => panic!("session state poisoned: {poisoned}"),
        }
    }
}
