use axum::{response::IntoResponse, Json};
use serde_json::json;
use tracing::instrument;

#[utoipa::path(
    get,
    path= "/api/external",
    responses (
        (status = 200, description = "Inbound token accepted"),
        (status = 401, description = "Invalid token", body = super::Failure),
    ),
    tag = "api",
)]
// Reached only when the bearer gate accepted the token.
#[instrument]
pub async fn external() -> impl IntoResponse {
    Json(json!({
        "msg": "Your access token was successfully validated!"
    }))
}
