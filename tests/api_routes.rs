//! End-to-end tests over a real listener, with the identity provider's token
//! and Management API endpoints stubbed in-process.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use forno::{
    api::{self, auth::AuthGate},
    cli::globals::GlobalArgs,
    mgmt::ServiceCredential,
};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;

const ISSUER: &str = "https://tenant.auth0.com/";
const AUDIENCE: &str = "https://api.forno.dev";
const SECRET: &[u8] = b"integration-test-secret";
const SUB: &str = "auth0|abc123";

#[derive(Default)]
struct StubProvider {
    token_grants: AtomicUsize,
    fail_patch: AtomicBool,
    users: Mutex<HashMap<String, Value>>,
    jobs: Mutex<Vec<Value>>,
}

async fn stub_token(State(stub): State<Arc<StubProvider>>, Json(body): Json<Value>) -> Json<Value> {
    stub.token_grants.fetch_add(1, Ordering::SeqCst);
    assert_eq!(body["grant_type"], json!("client_credentials"));

    Json(json!({
        "access_token": "stub-management-token",
        "token_type": "Bearer",
        "expires_in": 86400,
    }))
}

async fn stub_get_user(
    State(stub): State<Arc<StubProvider>>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    let users = stub.users.lock().unwrap();

    Json(users.get(&user_id).cloned().unwrap_or_else(|| {
        json!({
            "user_id": user_id,
            "email": "ada@example.com",
            "email_verified": true,
        })
    }))
}

async fn stub_patch_user(
    State(stub): State<Arc<StubProvider>>,
    Path(user_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if stub.fail_patch.load(Ordering::SeqCst) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "metadata write rejected"})),
        ));
    }

    let mut users = stub.users.lock().unwrap();
    let record = users.entry(user_id.clone()).or_insert_with(|| {
        json!({
            "user_id": user_id,
            "email": "ada@example.com",
        })
    });
    record["user_metadata"] = body["user_metadata"].clone();

    Ok(Json(record.clone()))
}

async fn stub_verification_job(
    State(stub): State<Arc<StubProvider>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    stub.jobs.lock().unwrap().push(body);

    (StatusCode::CREATED, Json(json!({"status": "pending"})))
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an addr");

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .expect("server should run");
    });

    addr
}

struct Harness {
    base: String,
    stub: Arc<StubProvider>,
    client: reqwest::Client,
}

async fn harness() -> Harness {
    let stub = Arc::new(StubProvider::default());

    let provider = Router::new()
        .route("/oauth/token", post(stub_token))
        .route(
            "/api/v2/users/:user_id",
            get(stub_get_user).patch(stub_patch_user),
        )
        .route("/api/v2/jobs/verification-email", post(stub_verification_job))
        .with_state(stub.clone());

    let provider_addr = spawn(provider).await;

    let credential = ServiceCredential::new(
        format!("http://{provider_addr}"),
        AUDIENCE.to_string(),
        "m2m-id".to_string(),
        SecretString::from("m2m-secret"),
    );
    let web_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("public");
    let globals = GlobalArgs::new(credential, web_root.to_string_lossy().into_owned());

    let gate = AuthGate::with_key(
        ISSUER,
        AUDIENCE,
        DecodingKey::from_secret(SECRET),
        Algorithm::HS256,
    );

    let app_addr = spawn(api::router(&globals, Arc::new(gate))).await;

    Harness {
        base: format!("http://{app_addr}"),
        stub,
        client: reqwest::Client::new(),
    }
}

fn mint_token(sub: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let claims = json!({
        "sub": sub,
        "iss": ISSUER,
        "aud": AUDIENCE,
        "iat": now,
        "exp": now + 600,
    });

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET),
    )
    .expect("token should encode")
}

#[tokio::test]
async fn privileged_routes_reject_missing_and_garbage_tokens() {
    let harness = harness().await;

    for url in [
        format!("{}/api/external", harness.base),
        format!("{}/api/user-profile", harness.base),
    ] {
        let response = harness.client.get(&url).send().await.expect("request");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.expect("json body");
        assert_eq!(body, json!({"msg": "Invalid token"}));
    }

    let response = harness
        .client
        .get(format!("{}/api/external", harness.base))
        .bearer_auth("not.a.jwt")
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn external_route_confirms_token_validation() {
    let harness = harness().await;

    let response = harness
        .client
        .get(format!("{}/api/external", harness.base))
        .bearer_auth(mint_token(SUB))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(
        body,
        json!({"msg": "Your access token was successfully validated!"})
    );
}

#[tokio::test]
async fn metadata_validation_runs_before_any_upstream_call() {
    let harness = harness().await;

    let response = harness
        .client
        .post(format!("{}/api/update-metadata", harness.base))
        .bearer_auth(mint_token(SUB))
        .json(&json!({}))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body, json!({"msg": "Missing required fields"}));
    assert_eq!(harness.stub.token_grants.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn metadata_update_round_trips_into_the_profile() {
    let harness = harness().await;
    let token = mint_token(SUB);

    let response = harness
        .client
        .post(format!("{}/api/update-metadata", harness.base))
        .bearer_auth(&token)
        .json(&json!({
            "sub": SUB,
            "lastPizzaType": "margherita",
            "lastPizzaSize": "family",
        }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body, json!({"msg": "Order Details Updated, You're All Set!"}));

    let response = harness
        .client
        .get(format!("{}/api/user-profile", harness.base))
        .bearer_auth(&token)
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let profile: Value = response.json().await.expect("json body");
    assert_eq!(profile["user_metadata"]["lastPizzaType"], "margherita");
    assert_eq!(profile["user_metadata"]["lastPizzaSize"], "family");

    // One fresh grant per privileged operation, no caching.
    assert_eq!(harness.stub.token_grants.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn upstream_metadata_failure_is_normalized() {
    let harness = harness().await;
    harness.stub.fail_patch.store(true, Ordering::SeqCst);

    let response = harness
        .client
        .post(format!("{}/api/update-metadata", harness.base))
        .bearer_auth(mint_token(SUB))
        .json(&json!({
            "sub": SUB,
            "lastPizzaType": "margherita",
            "lastPizzaSize": "family",
        }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["msg"], "Error updating user metadata");
    assert_eq!(body["error"], json!({"message": "metadata write rejected"}));
}

#[tokio::test]
async fn verification_email_enqueues_a_provider_job() {
    let harness = harness().await;

    let response = harness
        .client
        .post(format!("{}/send-verification-email", harness.base))
        .bearer_auth(mint_token(SUB))
        .json(&json!({"user_id": SUB}))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.text().await.expect("text body"),
        "Verification email sent successfully"
    );

    let jobs = harness.stub.jobs.lock().unwrap().clone();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["user_id"], SUB);
    assert_eq!(jobs[0]["client_id"], "m2m-id");
}

#[tokio::test]
async fn verification_email_requires_user_id() {
    let harness = harness().await;

    let response = harness
        .client
        .post(format!("{}/send-verification-email", harness.base))
        .bearer_auth(mint_token(SUB))
        .json(&json!({}))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body, json!({"msg": "Missing user_id"}));
    assert!(harness.stub.jobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn spa_shell_and_public_config_are_served() {
    let harness = harness().await;

    let response = harness
        .client
        .get(format!("{}/auth_config.json", harness.base))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let config: Value = response.json().await.expect("json body");
    assert_eq!(config["clientId"], "spa-client-id");

    // Any unmatched path falls back to the shell for client-side routing.
    let response = harness
        .client
        .get(format!("{}/profile", harness.base))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.expect("text body");
    assert!(html.contains("<div id=\"app\">"));
}

#[tokio::test]
async fn health_reports_name_and_version() {
    let harness = harness().await;

    let response = harness
        .client
        .get(format!("{}/health", harness.base))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["name"], "forno");
}

#[tokio::test]
async fn openapi_document_lists_privileged_paths() {
    let harness = harness().await;

    let response = harness
        .client
        .get(format!("{}/openapi.json", harness.base))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let doc: Value = response.json().await.expect("json body");
    assert!(doc["paths"].get("/api/update-metadata").is_some());
    assert!(doc["paths"].get("/send-verification-email").is_some());
}
