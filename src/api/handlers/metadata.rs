use super::{downstream_failure, validation_failure, HandlerError};
use crate::{
    api::auth::TokenClaims,
    mgmt::{self, ServiceCredential},
};
use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MetadataUpdate {
    pub sub: String,
    #[serde(rename = "lastPizzaType")]
    pub last_pizza_type: String,
    #[serde(rename = "lastPizzaSize")]
    pub last_pizza_size: String,
}

type MetadataResponse = Result<Json<Value>, HandlerError>;

const FAILURE_MSG: &str = "Error updating user metadata";

#[utoipa::path(
    post,
    path= "/api/update-metadata",
    request_body = MetadataUpdate,
    responses (
        (status = 200, description = "Metadata updated"),
        (status = 400, description = "Missing required fields", body = super::Failure),
        (status = 401, description = "Invalid token", body = super::Failure),
        (status = 500, description = "Upstream or downstream failure", body = super::Failure),
    ),
    tag = "api",
)]
#[instrument(skip(credential, claims, payload))]
pub async fn update_metadata(
    Extension(credential): Extension<Arc<ServiceCredential>>,
    Extension(claims): Extension<TokenClaims>,
    payload: Option<Json<Value>>,
) -> MetadataResponse {
    let update = parse_update(payload)?;

    // The body's subject is honored as the patch target, but a mismatch with
    // the caller's own subject is a cross-user write and gets flagged.
    if update.sub != claims.sub {
        warn!(
            "Metadata patch targets {} but the caller is {}",
            update.sub, claims.sub
        );
    }

    let token = mgmt::exchange_service_token(&credential)
        .await
        .map_err(|err| downstream_failure(FAILURE_MSG, &err))?;

    mgmt::patch_user_metadata(
        &credential,
        &token,
        &update.sub,
        &update.last_pizza_type,
        &update.last_pizza_size,
    )
    .await
    .map_err(|err| downstream_failure(FAILURE_MSG, &err))?;

    Ok(Json(json!({
        "msg": "Order Details Updated, You're All Set!"
    })))
}

// All three fields must be present and non-empty before any upstream contact.
fn parse_update(payload: Option<Json<Value>>) -> Result<MetadataUpdate, HandlerError> {
    let Some(Json(body)) = payload else {
        return Err(validation_failure("Missing required fields"));
    };

    let field = |name: &str| -> Option<String> {
        body.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
    };

    match (
        field("sub"),
        field("lastPizzaType"),
        field("lastPizzaSize"),
    ) {
        (Some(sub), Some(last_pizza_type), Some(last_pizza_size)) => Ok(MetadataUpdate {
            sub,
            last_pizza_type,
            last_pizza_size,
        }),
        _ => Err(validation_failure("Missing required fields")),
    }
}
