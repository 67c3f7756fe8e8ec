use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use salud_portal::{
    AppState, InMemoryRepository, MockAnalysisService,
    auth::{AuthUser, Claims},
    config::{AppConfig, Env},
    models::User,
    roles::{Role, RoleId},
};
use std::{sync::Arc, time::SystemTime};

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: &str = "uid123";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn create_token(sub: &str, iat: u64, exp: u64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        iat: iat as usize,
        exp: exp as usize,
    };
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn patient() -> User {
    User {
        id: TEST_USER_ID.to_string(),
        email: "paciente@example.com".to_string(),
        role: "paciente".to_string(),
    }
}

fn create_app_state(env: Env, users: Vec<User>) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };
    AppState::new(
        Arc::new(InMemoryRepository::with_users(users)),
        Arc::new(MockAnalysisService::new()),
        config,
    )
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

async fn extract(parts: &mut Parts, state: &AppState) -> Result<AuthUser, StatusCode> {
    AuthUser::from_request_parts(parts, state)
        .await
        .map_err(|e| e.status())
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let token = create_token(TEST_USER_ID, now(), now() + 3600);
    let state = create_app_state(Env::Production, vec![patient()]);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );

    let user = extract(&mut parts, &state).await.unwrap();
    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.role, RoleId::Known(Role::Paciente));
}

#[tokio::test]
async fn test_auth_success_with_session_cookie() {
    let token = create_token(TEST_USER_ID, now(), now() + 3600);
    let state = create_app_state(Env::Production, vec![patient()]);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::COOKIE,
        header::HeaderValue::from_str(&format!("theme=dark; session={}", token)).unwrap(),
    );

    let user = extract(&mut parts, &state).await.unwrap();
    assert_eq!(user.id, TEST_USER_ID);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let state = create_app_state(Env::Production, vec![patient()]);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let result = extract(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    // Expired well beyond the default 60 s leeway.
    let token = create_token(TEST_USER_ID, now() - 7200, now() - 3600);
    let state = create_app_state(Env::Production, vec![patient()]);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );

    let result = extract(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_wrong_secret() {
    let claims = Claims {
        sub: TEST_USER_ID.to_string(),
        iat: now() as usize,
        exp: (now() + 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();
    let state = create_app_state(Env::Production, vec![patient()]);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );

    let result = extract(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_for_removed_profile() {
    let token = create_token("ghost", now(), now() + 3600);
    let state = create_app_state(Env::Production, vec![patient()]);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );

    let result = extract(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let admin = User {
        id: "admin-1".to_string(),
        email: "admin@example.com".to_string(),
        role: "administrador".to_string(),
    };
    let state = create_app_state(Env::Local, vec![admin]);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_static("admin-1"),
    );

    let user = extract(&mut parts, &state).await.unwrap();
    assert_eq!(user.id, "admin-1");
    assert_eq!(user.role, RoleId::Known(Role::Administrador));
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let state = create_app_state(Env::Production, vec![patient()]);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_static(TEST_USER_ID),
    );

    let result = extract(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_stored_role_is_kept_as_unknown() {
    let legacy = User {
        id: "legacy".to_string(),
        email: "legacy@example.com".to_string(),
        role: "enfermero".to_string(),
    };
    let state = create_app_state(Env::Local, vec![legacy]);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_static("legacy"),
    );

    let user = extract(&mut parts, &state).await.unwrap();
    assert_eq!(user.role, RoleId::Unknown("enfermero".to_string()));
}

#[test]
fn test_request_token_prefers_bearer_over_cookie() {
    use axum::http::{HeaderMap, HeaderValue};
    use salud_portal::auth::request_token;

    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_static("session=from-cookie"));
    assert_eq!(
        request_token(&headers, "session"),
        Some("from-cookie".to_string())
    );

    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_static("Bearer from-header"),
    );
    assert_eq!(
        request_token(&headers, "session"),
        Some("from-header".to_string())
    );

    assert_eq!(request_token(&HeaderMap::new(), "session"), None);
}
