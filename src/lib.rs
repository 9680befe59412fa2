//! # Forno
//!
//! `forno` powers a single-page application that gates views behind
//! redirect-based login and lets its backend call the identity provider's
//! **Management API** on the user's behalf.
//!
//! Two cooperating subsystems, one per process boundary:
//!
//! - **Client core** ([`spa`]): a navigation controller (static route table,
//!   history integration, guarded dispatch) and a session manager (state machine
//!   around the identity SDK, redirect round trip with target-route
//!   preservation). The identity SDK, browser history, and DOM surface are trait
//!   seams so the core stays testable and binding-agnostic.
//! - **Server** ([`api`] + [`mgmt`]): every privileged route is behind a bearer
//!   token gate; the token broker exchanges the process-wide service credential
//!   for a short-lived management token (fresh per request, never cached) and
//!   issues exactly one downstream call per operation.
//!
//! Token custody is delegated entirely to the identity SDK and to JWT
//! validation; this crate never stores tokens.

pub mod api;
pub mod cli;
pub mod mgmt;
pub mod spa;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
