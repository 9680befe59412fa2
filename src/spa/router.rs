//! Client-side navigation controller.
//!
//! Routes are exact-match paths bound to render closures. Dispatch consults
//! the session manager before running a guarded route's handler; an
//! unauthenticated hit diverts into the login flow with the requested path
//! carried through the redirect round trip.

use crate::spa::{history::History, identity::IdentityClient, session::SessionManager};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, warn};

type RouteHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route already registered: {0}")]
    Duplicate(String),
}

struct Route {
    requires_auth: bool,
    handler: RouteHandler,
}

/// Route table plus guarded dispatch. Built once at startup, then driven by
/// link clicks and history events.
pub struct Navigator<I: IdentityClient> {
    routes: HashMap<String, Route>,
    session: Arc<SessionManager<I>>,
    history: Arc<dyn History>,
}

impl<I: IdentityClient> Navigator<I> {
    pub fn new(session: Arc<SessionManager<I>>, history: Arc<dyn History>) -> Self {
        Self {
            routes: HashMap::new(),
            session,
            history,
        }
    }

    /// Bind `path` to a render closure.
    ///
    /// # Errors
    /// Fails with [`RouteError::Duplicate`] when `path` is already bound; use
    /// [`register_override`] to rebind deliberately.
    ///
    /// [`register_override`]: Self::register_override
    pub fn register<F>(&mut self, path: &str, requires_auth: bool, handler: F) -> Result<(), RouteError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if self.routes.contains_key(path) {
            return Err(RouteError::Duplicate(path.to_string()));
        }

        self.register_override(path, requires_auth, handler);

        Ok(())
    }

    /// Rebind `path`, replacing any existing binding.
    pub fn register_override<F>(&mut self, path: &str, requires_auth: bool, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.routes.insert(
            path.to_string(),
            Route {
                requires_auth,
                handler: Arc::new(handler),
            },
        );
    }

    /// Resolve `path` and run its handler, or divert into login for a guarded
    /// route without a session. Returns whether the path was recognized; the
    /// caller decides whether to push a history entry.
    pub async fn dispatch(&self, path: &str) -> bool {
        let Some(route) = self.routes.get(path) else {
            warn!("Unknown route: {path}");
            return false;
        };

        if route.requires_auth && !self.session.is_authenticated().await {
            info!("Guarded route {path}, diverting into login");

            if let Err(err) = self.session.login(Some(path)).await {
                warn!("Could not divert into login: {err}");
            }

            return true;
        }

        debug!("Rendering {path}");
        (route.handler)();

        true
    }

    /// Dispatch `path` and, when recognized, record it as a new history entry.
    pub async fn navigate(&self, path: &str) -> bool {
        let handled = self.dispatch(path).await;

        if handled {
            self.history.push(path);
        }

        handled
    }

    /// Resolve the URL the page loaded on; unknown paths fall back to `/`
    /// with a history replace so reloads land on a real route.
    pub async fn handle_startup(&self) {
        let path = self.history.current_path();

        if !self.dispatch(&path).await {
            self.dispatch("/").await;
            self.history.replace("/");
        }
    }

    /// Back/forward navigation: re-render without touching the history stack.
    pub async fn handle_pop(&self, path: &str) {
        self.dispatch(path).await;
    }

    /// Intercept an in-application link. Returns `true` when the href was
    /// handled here and the browser default must be suppressed.
    pub async fn handle_link_click(&self, href: &str) -> bool {
        if !self.routes.contains_key(href) {
            return false;
        }

        self.navigate(href).await
    }
}
