use std::env;

/// AppConfig
///
/// Holds the service configuration. Loaded once at startup and never mutated; handlers
/// and extractors pull it out of the shared state via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local auth bypass and cookie hardening.
    pub env: Env,
    // Postgres connection string. `None` is only accepted locally (in-memory history store).
    pub db_url: Option<String>,
    // HS256 secret used to validate session tokens.
    pub jwt_secret: String,
    // Name of the httpOnly session cookie.
    pub session_cookie: String,
    // Endpoint of the external anamnesis/risk analysis model.
    pub analysis_url: String,
    // Optional bearer key for the analysis endpoint.
    pub analysis_key: Option<String>,
    pub bind_addr: String,
}

/// Env
///
/// Runtime context: local development (bypass header, plain cookies, optional database)
/// or hardened production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_SESSION_COOKIE: &str = "session";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const LOCAL_JWT_SECRET: &str = "local-development-jwt-secret";
pub const LOCAL_ANALYSIS_URL: &str = "http://localhost:8787/analyze";

impl Default for AppConfig {
    /// Non-panicking configuration used to scaffold test state.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            analysis_url: LOCAL_ANALYSIS_URL.to_string(),
            analysis_key: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics when a variable required in production (`DATABASE_URL`, `JWT_SECRET`,
    /// `ANALYSIS_SERVICE_URL`) is missing, so the service never starts half-configured.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let session_cookie = env::var("SESSION_COOKIE_NAME")
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let analysis_key = env::var("ANALYSIS_SERVICE_KEY").ok();

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok(),
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                session_cookie,
                analysis_url: env::var("ANALYSIS_SERVICE_URL")
                    .unwrap_or_else(|_| LOCAL_ANALYSIS_URL.to_string()),
                analysis_key,
                bind_addr,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production"),
                ),
                jwt_secret: env::var("JWT_SECRET")
                    .expect("FATAL: JWT_SECRET must be set in production."),
                session_cookie,
                analysis_url: env::var("ANALYSIS_SERVICE_URL")
                    .expect("FATAL: ANALYSIS_SERVICE_URL required in production"),
                analysis_key,
                bind_addr,
            },
        }
    }

    pub fn secure_cookies(&self) -> bool {
        self.env == Env::Production
    }
}
