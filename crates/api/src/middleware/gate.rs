//! The authorization gate in front of every protected `/api/v1` route.
//!
//! ```text
//! Unchecked ──signature header──> SignatureValid | SignatureInvalid (403)
//!     └──────no signature──────> NoSession (401) | SessionFound
//! SessionFound ──────────────────> Authorized | InsufficientRole (403)
//! ```

use axum::body::{to_bytes, Body};
use axum::extract::{OriginalUri, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use moduleab_core::error::CoreError;
use moduleab_core::roles::{check_capability, Verdict};
use moduleab_core::signing::{
    verify, SignatureError, SignedRequest, API_KEY_HEADER, DATE_HEADER, SIGNATURE_HEADER,
};

use crate::auth::jwt::validate_token;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Caller;
use crate::state::AppState;

/// Largest body a signed request may carry; it is buffered to be hashed.
pub const MAX_SIGNED_BODY_BYTES: usize = 1024 * 1024;

/// Admit or reject the request, then hand it on with a [`Caller`] attached.
pub async fn authorize(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    // Nested routers see a stripped URI; signatures and the privilege table
    // are defined over the full one.
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());

    let (caller, request) = if request.headers().contains_key(SIGNATURE_HEADER) {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());
        verify_signed(&state, &path_and_query, request).await?
    } else {
        let caller = resolve_session(&state, request.headers()).await?;
        if let Caller::Session { user_id, roles, .. } = &caller {
            let method = request.method().as_str();
            let required = state.privileges.required_role(method, uri.path());
            if check_capability(*roles, required) == Verdict::InsufficientRole {
                tracing::warn!(
                    %user_id,
                    granted = roles.name(),
                    required = required.name(),
                    %method,
                    path = uri.path(),
                    "Insufficient role"
                );
                return Err(AppError::Core(CoreError::Forbidden(format!(
                    "{} role required",
                    required.name()
                ))));
            }
        }
        (caller, request)
    };

    tracing::debug!(?caller, path = uri.path(), "Request authorized");
    let mut request = request;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Check the HMAC signature over the buffered request, then rebuild the
/// request around the same bytes.
async fn verify_signed(
    state: &AppState,
    path_and_query: &str,
    request: Request,
) -> AppResult<(Caller, Request)> {
    let credentials = state
        .config
        .signing
        .as_ref()
        .ok_or(SignatureError::NotConfigured)?;

    let headers = request.headers();
    let key = header_str(headers, API_KEY_HEADER)?.to_string();
    let date = header_str(headers, DATE_HEADER)?.to_string();
    let signature = header_str(headers, SIGNATURE_HEADER)?.to_string();

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_SIGNED_BODY_BYTES).await.map_err(|e| {
        tracing::warn!(error = %e, %key, "Signed request body could not be buffered");
        SignatureError::UnreadableBody(MAX_SIGNED_BODY_BYTES)
    })?;

    verify(
        credentials,
        &key,
        &signature,
        &SignedRequest {
            method: parts.method.as_str(),
            path_and_query,
            date: &date,
            body: &bytes,
        },
        Utc::now(),
        state.config.signature_max_skew_secs,
    )?;

    Ok((Caller::ApiClient { key }, Request::from_parts(parts, Body::from(bytes))))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::MissingHeader(name))
}

/// Resolve the bearer token to a live session of an active user.
///
/// Every way of failing here means "no active session".
async fn resolve_session(state: &AppState, headers: &HeaderMap) -> AppResult<Caller> {
    let unauthorized = |msg: &str| AppError::Core(CoreError::Unauthorized(msg.to_string()));

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("Missing session token"))?;

    let claims = validate_token(token, &state.config.jwt)
        .map_err(|_| unauthorized("Invalid or expired token"))?;

    let session = state
        .store
        .find_active_session(claims.jti)
        .await?
        .filter(|session| session.user_id == claims.sub)
        .ok_or_else(|| unauthorized("Session is no longer active"))?;

    let user = state
        .store
        .find_user(session.user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| unauthorized("Account is not active"))?;

    Ok(Caller::Session {
        user_id: user.id,
        session_id: session.id,
        roles: user.roles(),
    })
}
