//! Seam for the DOM surface.

use crate::spa::identity::UserClaims;

/// Visibility side effects of authentication state changes.
///
/// Implementations toggle the `auth-visible`/`auth-invisible` element classes,
/// render claim fields (name, email, picture) into their display slots, and
/// reset order-entry form fields to their unselected defaults. Both methods
/// must be idempotent and side-effect-only: no navigation.
pub trait UiSurface: Send + Sync {
    fn show_authenticated(&self, user: &UserClaims);

    fn show_anonymous(&self);
}
