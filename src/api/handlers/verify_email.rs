use super::{downstream_failure, validation_failure, HandlerError};
use crate::mgmt::{self, ServiceCredential};
use axum::{extract::Extension, http::StatusCode, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

type VerifyEmailResponse = Result<(StatusCode, &'static str), HandlerError>;

const FAILURE_MSG: &str = "Error sending verification email";

#[utoipa::path(
    post,
    path= "/send-verification-email",
    responses (
        (status = 200, description = "Verification email enqueued", content_type = "text/plain"),
        (status = 400, description = "Missing user_id", body = super::Failure),
        (status = 401, description = "Invalid token", body = super::Failure),
        (status = 500, description = "Upstream or downstream failure", body = super::Failure),
    ),
    tag = "api",
)]
#[instrument(skip(credential, payload))]
pub async fn send_verification_email(
    Extension(credential): Extension<Arc<ServiceCredential>>,
    payload: Option<Json<Value>>,
) -> VerifyEmailResponse {
    let user_id = parse_user_id(payload)?;

    let token = mgmt::exchange_service_token(&credential)
        .await
        .map_err(|err| downstream_failure(FAILURE_MSG, &err))?;

    mgmt::send_verification_email(&credential, &token, &user_id)
        .await
        .map_err(|err| downstream_failure(FAILURE_MSG, &err))?;

    Ok((StatusCode::OK, "Verification email sent successfully"))
}

fn parse_user_id(payload: Option<Json<Value>>) -> Result<String, HandlerError> {
    payload
        .as_ref()
        .and_then(|Json(body)| body.get("user_id"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| validation_failure("Missing user_id"))
}
