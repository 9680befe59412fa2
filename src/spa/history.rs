//! Seam for the browser history API.

/// Browser history as seen by the navigation controller and session manager.
///
/// `push` and `replace` mirror `pushState`/`replaceState`; a replace never
/// creates a new entry, so back/forward cannot land on a stripped callback URL.
pub trait History: Send + Sync {
    /// Path component of the current URL.
    fn current_path(&self) -> String;

    /// Query string of the current URL, without the leading `?`.
    fn current_query(&self) -> String;

    /// Scheme plus authority, used as the redirect return destination.
    fn origin(&self) -> String;

    fn push(&self, url: &str);

    fn replace(&self, url: &str);
}
