//! Session token generation and validation.
//!
//! Tokens are HS256-signed JWTs carrying [`Claims`]. A token is only half of
//! a session: `jti` names the `user_sessions` row, and the gate refuses the
//! token once that row is revoked or expired, whatever `exp` says.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use moduleab_core::types::EntityId;
use moduleab_db::models::{Session, User};
use serde::{Deserialize, Serialize};

/// JWT claims embedded in every session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's id.
    pub sub: EntityId,
    /// Role name at login time, informational only.
    pub role: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// The session id.
    pub jti: EntityId,
}

/// Configuration for session token generation and validation.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Session lifetime in minutes (default: 720).
    pub session_expiry_mins: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("session_expiry_mins", &self.session_expiry_mins)
            .finish()
    }
}

/// Default session lifetime in minutes.
const DEFAULT_SESSION_EXPIRY_MINS: i64 = 720;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                   | Required | Default |
    /// |---------------------------|----------|---------|
    /// | `JWT_SECRET`              | **yes**  | --      |
    /// | `JWT_SESSION_EXPIRY_MINS` | no       | `720`   |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let session_expiry_mins: i64 = std::env::var("JWT_SESSION_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_SESSION_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_SESSION_EXPIRY_MINS must be a valid i64");

        Self {
            secret,
            session_expiry_mins,
        }
    }
}

/// Generate the token for a freshly created session.
///
/// The token expires together with the session row.
pub fn generate_session_token(
    user: &User,
    session: &Session,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user.id,
        role: user.roles().name().to_string(),
        exp: session.expires_at.timestamp(),
        iat: session.created_at.timestamp(),
        jti: session.id,
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate and decode a session token, returning the embedded [`Claims`].
///
/// Checks the signature and expiration only; session liveness is the
/// caller's business.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use moduleab_core::roles::RoleFlags;
    use moduleab_core::types::new_id;

    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            session_expiry_mins: 60,
        }
    }

    fn user() -> User {
        User {
            id: new_id(),
            username: "ops".to_string(),
            password_hash: String::new(),
            role_flags: RoleFlags::OPERATOR.bits(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn session_for(user: &User, expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: new_id(),
            user_id: user.id,
            expires_at: now + expires_in,
            is_revoked: false,
            created_at: now,
        }
    }

    #[test]
    fn test_generate_and_validate_session_token() {
        let config = test_config();
        let user = user();
        let session = session_for(&user, Duration::minutes(60));
        let token = generate_session_token(&user, &session, &config)
            .expect("token generation should succeed");

        let claims = validate_token(&token, &config).expect("token validation should succeed");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.jti, session.id);
        assert_eq!(claims.role, "operator");
        assert_eq!(claims.exp, session.expires_at.timestamp());
    }

    #[test]
    fn test_expired_token_fails() {
        let config = test_config();
        let user = user();
        // Well beyond the default 60-second leeway.
        let session = session_for(&user, Duration::minutes(-5));
        let token = generate_session_token(&user, &session, &config)
            .expect("token generation should succeed");

        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn test_different_secrets_fail() {
        let user = user();
        let session = session_for(&user, Duration::minutes(60));
        let token = generate_session_token(&user, &session, &test_config())
            .expect("token generation should succeed");

        let other = JwtConfig {
            secret: "secret-bravo".to_string(),
            session_expiry_mins: 60,
        };
        assert!(
            validate_token(&token, &other).is_err(),
            "token signed with a different secret must fail"
        );
    }
}
