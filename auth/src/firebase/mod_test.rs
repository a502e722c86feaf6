use super::*;
use crate::error::AuthError;
use crate::guard::allow;
use crate::session::{AuthSession, SessionConfig};
use crate::test_helpers::RecordingRenderer;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;

const API_KEY: &str = "test-key";

// =============================================================================
// FAKE IDENTITY TOOLKIT
// =============================================================================

type Seen = Arc<Mutex<Vec<Value>>>;

fn toolkit_error(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": { "code": 400, "message": message } })))
}

fn check_key(params: &HashMap<String, String>) -> Result<(), (StatusCode, Json<Value>)> {
    if params.get("key").map(String::as_str) == Some(API_KEY) {
        Ok(())
    } else {
        Err(toolkit_error("API key not valid. Please pass a valid API key."))
    }
}

async fn send_code(
    State(seen): State<Seen>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = check_key(&params) {
        return e;
    }
    seen.lock().unwrap().push(body.clone());
    let phone = body["phoneNumber"].as_str().unwrap_or_default();
    if phone == "+15550000000" {
        return toolkit_error("INVALID_PHONE_NUMBER : Invalid format.");
    }
    (StatusCode::OK, Json(json!({ "sessionInfo": format!("session|{phone}") })))
}

async fn sign_in_phone(
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = check_key(&params) {
        return e;
    }
    if body["code"] != "123456" {
        return toolkit_error("INVALID_CODE");
    }
    let phone = body["sessionInfo"].as_str().and_then(|s| s.split_once('|')).map(|(_, p)| p).unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "localId": "uid-phone",
            "idToken": "id-token-phone",
            "refreshToken": "refresh",
            "phoneNumber": phone,
            "isNewUser": true
        })),
    )
}

async fn sign_in_idp(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let post_body = body["postBody"].as_str().unwrap_or_default();
    if !post_body.contains("id_token=good") {
        return toolkit_error("INVALID_IDP_RESPONSE : bad token");
    }
    (
        StatusCode::OK,
        Json(json!({
            "localId": "uid-google",
            "idToken": "id-token-google",
            "email": "cook@example.com",
            "displayName": "Cook",
            "phoneNumber": ""
        })),
    )
}

async fn spawn_toolkit() -> (String, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/v1/accounts:sendVerificationCode", post(send_code))
        .route("/v1/accounts:signInWithPhoneNumber", post(sign_in_phone))
        .route("/v1/accounts:signInWithIdp", post(sign_in_idp))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{addr}/v1"), seen)
}

fn config(base_url: &str) -> FirebaseConfig {
    FirebaseConfig {
        api_key: API_KEY.into(),
        project_id: "menumaven-test".into(),
        auth_domain: "menumaven-test.firebaseapp.com".into(),
        base_url: base_url.into(),
        timeouts: FirebaseTimeouts { request_secs: 5, connect_secs: 1 },
    }
}

struct StaticPrompt(Result<FederatedCredential, ProviderError>);

#[async_trait::async_trait]
impl FederatedPrompt for StaticPrompt {
    async fn credential(&self) -> Result<FederatedCredential, ProviderError> {
        self.0.clone()
    }
}

fn session(provider: FirebaseRestProvider) -> (Arc<FirebaseRestProvider>, AuthSession) {
    let provider = Arc::new(provider);
    let renderer = Arc::new(RecordingRenderer::default());
    let session = AuthSession::start(provider.clone(), renderer, SessionConfig::default());
    (provider, session)
}

// =============================================================================
// PARSING
// =============================================================================

#[test]
fn error_body_with_detail_maps_code_and_keeps_detail() {
    let err = parse_error_body(400, r#"{"error":{"code":400,"message":"TOO_MANY_ATTEMPTS_TRY_LATER : Try again later."}}"#);
    assert_eq!(err.code, "auth/too-many-requests");
    assert_eq!(err.message, "Try again later.");
}

#[test]
fn error_body_without_detail_uses_key_as_message() {
    let err = parse_error_body(400, r#"{"error":{"message":"SESSION_EXPIRED"}}"#);
    assert_eq!(err.code, "auth/code-expired");
    assert_eq!(err.message, "SESSION_EXPIRED");
}

#[test]
fn unparseable_error_body_is_internal_error() {
    let err = parse_error_body(502, "<html>bad gateway</html>");
    assert_eq!(err.code, "auth/internal-error");
    assert!(err.message.contains("502"));
}

#[test]
fn unknown_rest_keys_become_kebab_case_codes() {
    assert_eq!(rest_error_code("OPERATION_NOT_ALLOWED"), "auth/operation-not-allowed");
    assert_eq!(rest_error_code("QUOTA_EXCEEDED"), "auth/quota-exceeded");
    assert_eq!(rest_error_code("API key not valid. Please pass a valid API key."), "auth/invalid-api-key");
}

#[test]
fn sign_in_response_drops_empty_strings() {
    let response: SignInResponse = serde_json::from_value(json!({
        "localId": "u1",
        "idToken": "t",
        "email": "",
        "phoneNumber": "+15551234567"
    }))
    .unwrap();
    let (identity, id_token) = split_sign_in(response);
    assert_eq!(identity.uid, "u1");
    assert_eq!(identity.email, None);
    assert_eq!(identity.phone_number.as_deref(), Some("+15551234567"));
    assert_eq!(id_token.as_deref(), Some("t"));
}

#[test]
fn federated_credential_debug_hides_token() {
    let cred = FederatedCredential { provider_id: "google.com".into(), id_token: "secret".into() };
    assert!(!format!("{cred:?}").contains("secret"));
}

// =============================================================================
// END TO END AGAINST FAKE TOOLKIT
// =============================================================================

#[tokio::test]
async fn phone_flow_signs_in_and_notifies_stream() {
    let (base_url, seen) = spawn_toolkit().await;
    let (provider, session) = session(FirebaseRestProvider::new(config(&base_url)).unwrap());

    let pending = session.request_passcode("555-123-4567").await.unwrap();
    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0]["phoneNumber"], "+15551234567");
        assert_eq!(seen[0]["recaptchaToken"], "token-1");
    }

    let identity = session.confirm_passcode(&pending, "123456").await.unwrap();
    assert_eq!(identity.uid, "uid-phone");
    assert_eq!(identity.phone_number.as_deref(), Some("+15551234567"));
    assert_eq!(provider.id_token().as_deref(), Some("id-token-phone"));

    session.wait_for_identity(Duration::from_secs(1)).await.unwrap();
    assert!(allow(&session.state()));

    session.logout().await.unwrap();
    session.wait_for_sign_out(Duration::from_secs(1)).await.unwrap();
    assert!(provider.id_token().is_none());
    assert!(!allow(&session.state()));
}

#[tokio::test]
async fn toolkit_rejections_are_classified() {
    let (base_url, _seen) = spawn_toolkit().await;
    let (_provider, session) = session(FirebaseRestProvider::new(config(&base_url)).unwrap());

    assert_eq!(session.request_passcode("+15550000000").await.unwrap_err(), AuthError::InvalidPhoneNumber);

    let pending = session.request_passcode("5551234567").await.unwrap();
    assert_eq!(session.confirm_passcode(&pending, "999999").await.unwrap_err(), AuthError::InvalidCode);
}

#[tokio::test]
async fn wrong_api_key_is_unknown_error() {
    let (base_url, _seen) = spawn_toolkit().await;
    let mut cfg = config(&base_url);
    cfg.api_key = "wrong".into();
    let (_provider, session) = session(FirebaseRestProvider::new(cfg).unwrap());

    let err = session.request_passcode("5551234567").await.unwrap_err();
    assert!(matches!(err, AuthError::Unknown(_)));
}

#[tokio::test]
async fn unreachable_toolkit_is_network_error() {
    let (_provider, session) = session(FirebaseRestProvider::new(config("http://127.0.0.1:1/v1")).unwrap());
    assert_eq!(session.request_passcode("5551234567").await.unwrap_err(), AuthError::NetworkError);
}

#[tokio::test]
async fn federated_sign_in_uses_prompt_credential() {
    let (base_url, _seen) = spawn_toolkit().await;
    let prompt = StaticPrompt(Ok(FederatedCredential { provider_id: "google.com".into(), id_token: "good".into() }));
    let provider = FirebaseRestProvider::new(config(&base_url)).unwrap().with_federated_prompt(Arc::new(prompt));
    let (_provider, session) = session(provider);

    let identity = session.login_with_federated_provider().await.unwrap();
    assert_eq!(identity.email.as_deref(), Some("cook@example.com"));
    assert_eq!(identity.phone_number, None);
    assert_eq!(session.wait_for_identity(Duration::from_secs(1)).await.unwrap().label(), "Cook");
}

#[tokio::test]
async fn federated_prompt_cancellation_is_user_cancelled() {
    let prompt = StaticPrompt(Err(ProviderError::new("auth/popup-closed-by-user", "closed")));
    let provider = FirebaseRestProvider::new(config("http://127.0.0.1:1/v1")).unwrap().with_federated_prompt(Arc::new(prompt));
    let (_provider, session) = session(provider);

    assert_eq!(session.login_with_federated_provider().await.unwrap_err(), AuthError::UserCancelled);
}

#[tokio::test]
async fn federated_without_prompt_is_unauthorized_origin() {
    let (_provider, session) = session(FirebaseRestProvider::new(config("http://127.0.0.1:1/v1")).unwrap());
    assert_eq!(session.login_with_federated_provider().await.unwrap_err(), AuthError::UnauthorizedOrigin);
}

#[tokio::test]
async fn new_provider_resolves_signed_out() {
    let (_provider, session) = session(FirebaseRestProvider::new(config("http://127.0.0.1:1/v1")).unwrap());
    session.wait_for_sign_out(Duration::from_secs(1)).await.unwrap();
    assert!(session.state().ready);
}
