use std::str::FromStr;

use moduleab_core::signing::{ApiCredentials, DEFAULT_MAX_SKEW_SECS};

use crate::archive::{ArchiveConfig, DEFAULT_PAGE_SIZE};
use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development except
/// `JWT_SECRET`, which must always be set.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Session token configuration.
    pub jwt: JwtConfig,
    /// Shared key pair for signed requests. Signed requests are refused
    /// when unset.
    pub signing: Option<ApiCredentials>,
    /// Accepted distance between a signed request's `Date` and server time.
    pub signature_max_skew_secs: i64,
    /// Remote archive service used to resolve vault names.
    pub archive: Option<ArchiveConfig>,
    /// Account created at startup when no user of that name exists.
    pub bootstrap_admin: Option<AdminSeed>,
}

/// Credentials of the bootstrap administrator.
#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `API_KEY` / `API_SECRET`  | unset                   |
    /// | `SIGNATURE_MAX_SKEW_SECS` | `900`                   |
    /// | `OAS_ENDPOINT`            | unset                   |
    /// | `OAS_API_KEY` / `OAS_API_SECRET` | unset            |
    /// | `OAS_PAGE_SIZE`           | `100`                   |
    /// | `ADMIN_USERNAME` / `ADMIN_PASSWORD` | unset         |
    ///
    /// # Panics
    ///
    /// Panics on unparsable numbers, on a half-configured key pair, and on a
    /// missing `JWT_SECRET` (see [`JwtConfig::from_env`]).
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_env("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_env("REQUEST_TIMEOUT_SECS", 30);
        let signature_max_skew_secs: i64 =
            parse_env("SIGNATURE_MAX_SKEW_SECS", DEFAULT_MAX_SKEW_SECS);

        let signing = key_pair("API_KEY", "API_SECRET");

        let archive = optional_env("OAS_ENDPOINT").map(|endpoint| ArchiveConfig {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credentials: key_pair("OAS_API_KEY", "OAS_API_SECRET")
                .expect("OAS_API_KEY and OAS_API_SECRET must be set with OAS_ENDPOINT"),
            page_size: parse_env("OAS_PAGE_SIZE", DEFAULT_PAGE_SIZE),
        });

        let bootstrap_admin = match (
            optional_env("ADMIN_USERNAME"),
            optional_env("ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(AdminSeed { username, password }),
            (None, None) => None,
            _ => panic!("ADMIN_USERNAME and ADMIN_PASSWORD must be set together"),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            signing,
            signature_max_skew_secs,
            archive,
            bootstrap_admin,
        }
    }
}

/// A non-empty environment variable.
fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid number: {e}")),
        None => default,
    }
}

fn key_pair(key_var: &str, secret_var: &str) -> Option<ApiCredentials> {
    match (optional_env(key_var), optional_env(secret_var)) {
        (Some(key), Some(secret)) => Some(ApiCredentials { key, secret }),
        (None, None) => None,
        _ => panic!("{key_var} and {secret_var} must be set together"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test owns its variable names; the test harness runs them in parallel.

    #[test]
    fn blank_variables_count_as_unset() {
        std::env::set_var("MODULEAB_TEST_BLANK", "   ");
        assert_eq!(optional_env("MODULEAB_TEST_BLANK"), None);
        assert_eq!(parse_env("MODULEAB_TEST_BLANK", 7_u32), 7);
    }

    #[test]
    fn numbers_are_parsed_after_trimming() {
        std::env::set_var("MODULEAB_TEST_PORT", " 8080 ");
        assert_eq!(parse_env("MODULEAB_TEST_PORT", 3000_u16), 8080);
    }

    #[test]
    fn key_pair_needs_both_halves() {
        assert!(key_pair("MODULEAB_TEST_NO_KEY", "MODULEAB_TEST_NO_SECRET").is_none());

        std::env::set_var("MODULEAB_TEST_KEY", "agent");
        std::env::set_var("MODULEAB_TEST_SECRET", "s3cret");
        let pair = key_pair("MODULEAB_TEST_KEY", "MODULEAB_TEST_SECRET").unwrap();
        assert_eq!(pair.key, "agent");
        assert_eq!(pair.secret, "s3cret");
    }

    #[test]
    #[should_panic(expected = "must be set together")]
    fn half_a_key_pair_is_fatal() {
        std::env::set_var("MODULEAB_TEST_LONE_KEY", "agent");
        key_pair("MODULEAB_TEST_LONE_KEY", "MODULEAB_TEST_LONE_SECRET");
    }

    #[test]
    fn admin_seed_debug_hides_the_password() {
        let seed = AdminSeed {
            username: "root".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{seed:?}");
        assert!(printed.contains("root"));
        assert!(!printed.contains("hunter2"));
    }
}
