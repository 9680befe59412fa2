pub mod health;
pub use self::health::health;

pub mod external;
pub use self::external::external;

pub mod profile;
pub use self::profile::user_profile;

pub mod metadata;
pub use self::metadata::update_metadata;

pub mod verify_email;
pub use self::verify_email::send_verification_email;

// common failure shape for the handlers
use crate::mgmt::MgmtError;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;
use tracing::error;
use utoipa::ToSchema;

/// Normalized failure body: `msg` is stable, `error` carries raw provider
/// detail for diagnostics.
#[derive(ToSchema, Serialize, Debug)]
pub struct Failure {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

pub(crate) type HandlerError = (StatusCode, Json<Failure>);

/// Client-input shape violations return 400 before any upstream is contacted.
pub(crate) fn validation_failure(msg: &str) -> HandlerError {
    error!("{msg}");

    (
        StatusCode::BAD_REQUEST,
        Json(Failure {
            msg: msg.to_string(),
            error: None,
        }),
    )
}

/// Upstream and downstream failures are caught at the operation boundary and
/// surfaced as a normalized 500; the raw error never propagates unshaped.
pub(crate) fn downstream_failure(msg: &str, err: &MgmtError) -> HandlerError {
    error!("{msg}: {err} {}", err.detail());

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(Failure {
            msg: msg.to_string(),
            error: Some(err.detail()),
        }),
    )
}
