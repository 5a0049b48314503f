#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use moduleab_api::auth::jwt::{generate_session_token, JwtConfig};
use moduleab_api::config::ServerConfig;
use moduleab_api::router::build_app_router;
use moduleab_api::state::AppState;
use moduleab_core::roles::RoleFlags;
use moduleab_core::signing::{sign, ApiCredentials, SignedRequest};
use moduleab_core::types::new_id;
use moduleab_core::vault::VaultLister;
use moduleab_db::models::{Session, User};
use moduleab_db::store::{AccountStore, MemoryStore, Store};
use tower::ServiceExt;

pub const API_KEY: &str = "backup-agent";
pub const API_SECRET: &str = "backup-agent-secret";

/// Build a test `ServerConfig` with safe defaults and a configured key pair.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            session_expiry_mins: 60,
        },
        signing: Some(ApiCredentials {
            key: API_KEY.to_string(),
            secret: API_SECRET.to_string(),
        }),
        signature_max_skew_secs: 900,
        archive: None,
        bootstrap_admin: None,
    }
}

/// The production router over an in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub config: ServerConfig,
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config(), None)
}

pub fn build_test_app_with(config: ServerConfig, vaults: Option<Arc<dyn VaultLister>>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn Store> = store.clone();
    let state = AppState::new(shared, config.clone(), vaults);
    TestApp {
        router: build_app_router(state),
        store,
        config,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Insert an active user with a placeholder password hash.
    pub async fn user(&self, username: &str, roles: RoleFlags) -> User {
        let user = User {
            id: new_id(),
            username: username.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
            role_flags: roles.bits(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.create_user(&user).await.unwrap();
        user
    }

    /// Open a session for `user` directly in the store and return its token.
    pub async fn token_for(&self, user: &User) -> String {
        let now = Utc::now();
        let session = Session {
            id: new_id(),
            user_id: user.id,
            expires_at: now + Duration::minutes(60),
            is_revoked: false,
            created_at: now,
        };
        self.store.create_session(&session).await.unwrap();
        generate_session_token(user, &session, &self.config.jwt).unwrap()
    }

    /// A fresh user holding `roles`, and a token for it.
    pub async fn login_as(&self, roles: RoleFlags) -> String {
        let user = self.user(&format!("{}-{}", roles.name(), new_id()), roles).await;
        self.token_for(&user).await
    }
}

/// A JSON request, optionally carrying a bearer token.
pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// A request signed with `secret` under the test key.
pub fn signed_request_with(
    secret: &str,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    date: &str,
) -> Request<Body> {
    let bytes = body.map(|json| json.to_string()).unwrap_or_default();
    let signature = sign(
        secret,
        &SignedRequest {
            method: method.as_str(),
            path_and_query: uri,
            date,
            body: bytes.as_bytes(),
        },
    );
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .header("date", date)
        .header("signature", signature)
        .body(Body::from(bytes))
        .unwrap()
}

/// A correctly signed request dated now.
pub fn signed_request(method: Method, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    signed_request_with(API_SECRET, method, uri, body, &Utc::now().to_rfc2822())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
