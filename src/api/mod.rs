pub mod auth;
pub mod handlers;

#[allow(unused_imports)]
use crate::api::handlers::{
    external::__path_external, health::__path_health, metadata::__path_update_metadata,
    profile::__path_user_profile, verify_email::__path_send_verification_email,
};
use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use auth::AuthGate;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    services::{ServeDir, ServeFile},
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(external, user_profile, update_metadata, send_verification_email, health),
    components(schemas(handlers::Failure, handlers::metadata::MetadataUpdate)),
    tags(
        (name = "forno", description = "SPA backend and Management API token broker"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

/// Build the application router.
///
/// Privileged routes sit behind the bearer gate; the SPA shell and its public
/// config are served from the web root for every other path.
#[must_use]
pub fn router(globals: &GlobalArgs, gate: Arc<AuthGate>) -> Router {
    let web_root = PathBuf::from(&globals.web_root);
    let credential = Arc::new(globals.credential.clone());

    let cors = CorsLayer::new()
        // allow `GET` and `POST` when accessing the resource
        .allow_methods([Method::GET, Method::POST])
        // allow requests from any origin
        .allow_origin(Any);

    Router::new()
        .route("/api/external", get(handlers::external))
        .route("/api/user-profile", get(handlers::user_profile))
        .route("/api/update-metadata", post(handlers::update_metadata))
        .route(
            "/send-verification-email",
            post(handlers::send_verification_email),
        )
        .route_layer(middleware::from_fn_with_state(gate, auth::require_bearer))
        .route("/health", get(handlers::health).options(handlers::health))
        .route("/openapi.json", get(openapi_json))
        .route_service(
            "/auth_config.json",
            ServeFile::new(web_root.join("auth_config.json")),
        )
        .fallback_service(
            ServeDir::new(&web_root).fallback(ServeFile::new(web_root.join("index.html"))),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(credential)),
        )
}

/// Bind and serve.
/// # Errors
/// Returns an error if the server fails to start
pub async fn new(port: u16, globals: GlobalArgs, gate: AuthGate) -> Result<()> {
    let app = router(&globals, Arc::new(gate));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
