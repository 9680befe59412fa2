use super::{downstream_failure, HandlerError};
use crate::{
    api::auth::TokenClaims,
    mgmt::{self, ServiceCredential},
};
use axum::{extract::Extension, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

type ProfileResponse = Result<Json<Value>, HandlerError>;

const FAILURE_MSG: &str = "Error fetching user profile";

#[utoipa::path(
    get,
    path= "/api/user-profile",
    responses (
        (status = 200, description = "Provider user record, returned verbatim"),
        (status = 401, description = "Invalid token", body = super::Failure),
        (status = 500, description = "Upstream or downstream failure", body = super::Failure),
    ),
    tag = "api",
)]
// The subject comes from the validated token claims, never from client input.
#[instrument(skip(credential, claims))]
pub async fn user_profile(
    Extension(credential): Extension<Arc<ServiceCredential>>,
    Extension(claims): Extension<TokenClaims>,
) -> ProfileResponse {
    let token = mgmt::exchange_service_token(&credential)
        .await
        .map_err(|err| downstream_failure(FAILURE_MSG, &err))?;

    let user = mgmt::fetch_user(&credential, &token, &claims.sub)
        .await
        .map_err(|err| downstream_failure(FAILURE_MSG, &err))?;

    Ok(Json(user))
}
