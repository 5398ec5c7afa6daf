use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. This struct is immutable once
/// loaded and is pulled into handlers and extractors via FromRef, as part of the
/// Unified State Pattern.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Runtime environment marker. Controls log format and which settings are required.
    pub env: Env,
    // Opt-in `x-user-id` auth bypass. Only ever true in `Env::Local`.
    pub dev_auth_bypass: bool,
    // HMAC secret used to sign and validate bearer tokens.
    pub jwt_secret: String,
    // Lifetime of issued tokens, in hours.
    pub jwt_expiry_hours: i64,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Optional bootstrap administrator, created at startup when absent.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Credentials for the administrator account provisioned at startup.
#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

/// Env
///
/// Defines the runtime context, used to switch between development utilities
/// (in-memory store, optional `x-user-id` bypass) and production-grade infrastructure.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_EXPIRY_HOURS: i64 = 24;

impl Default for AppConfig {
    /// Provides a non-panicking AppConfig used for test setup. No environment
    /// variables are read.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            dev_auth_bypass: false,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_expiry_hours: DEFAULT_EXPIRY_HOURS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            bootstrap_admin: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables and implements the
    /// **fail-fast** principle.
    ///
    /// # Panics
    /// Panics if a variable required in Production (`DATABASE_URL`, `JWT_SECRET`)
    /// is missing, or if `JWT_EXPIRY_HOURS` is not a positive integer.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => {
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production.")
            }
            Env::Local => env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        let db_url = match env {
            Env::Production => Some(
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
            ),
            // Local runs fall back to the in-memory store when no database is configured.
            Env::Local => env::var("DATABASE_URL").ok(),
        };

        let jwt_expiry_hours = match env::var("JWT_EXPIRY_HOURS") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .expect("FATAL: JWT_EXPIRY_HOURS must be a positive integer"),
            Err(_) => DEFAULT_EXPIRY_HOURS,
        };

        // Never honoured outside Local, whatever the variable says.
        let dev_auth_bypass = env == Env::Local
            && env::var("AUTH_DEV_BYPASS")
                .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1"))
                .unwrap_or(false);

        let bootstrap_admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Self {
            db_url,
            env,
            dev_auth_bypass,
            jwt_secret,
            jwt_expiry_hours,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            bootstrap_admin,
        }
    }
}
