//! Single-page application shell: navigation, session handling, and the seams
//! to the browser and the identity SDK.
//!
//! Everything here is single-threaded in spirit; interior locks exist only to
//! satisfy `Send + Sync` bounds and are never held across an await.

pub mod history;
pub mod identity;
pub mod router;
pub mod session;
pub mod ui;

pub use self::history::History;
pub use self::identity::{IdentityClient, UserClaims};
pub use self::router::{Navigator, RouteError};
pub use self::session::{SessionError, SessionManager, SessionState};

use std::sync::Arc;

/// Application shell wiring the navigator and session manager together.
pub struct Spa<I: IdentityClient> {
    pub navigator: Navigator<I>,
    pub session: Arc<SessionManager<I>>,
    history: Arc<dyn History>,
}

impl<I: IdentityClient> Spa<I> {
    pub fn new(
        navigator: Navigator<I>,
        session: Arc<SessionManager<I>>,
        history: Arc<dyn History>,
    ) -> Self {
        Self {
            navigator,
            session,
            history,
        }
    }

    /// Page-load sequence: resolve the stored session, consume an inbound
    /// login callback if one is present, then render the initial route.
    ///
    /// A consumed callback re-dispatches the carried target route exactly
    /// once; otherwise the URL the page loaded on is dispatched as-is.
    pub async fn on_load(&self) {
        self.session.initialize().await;

        if self.session.is_authenticated().await {
            // Drop any stray query so the address bar shows a clean route.
            self.history.replace(&self.history.current_path());
        } else if let Some(target) = self.session.handle_redirect_callback().await {
            if self.navigator.dispatch(&target).await {
                self.history.replace(&target);
            }
            return;
        }

        self.navigator.handle_startup().await;
    }
}
