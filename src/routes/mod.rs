/// Router Module Index
///
/// Routes grouped by access level so authentication is applied per module
/// (via Axum layers) rather than per handler registration.

/// Routes reachable without a session cookie: health, onboarding (token-checked),
/// session issue/clear.
pub mod public;

/// Routes behind the `AuthUser` middleware. Handlers additionally gate on role features.
pub mod authenticated;

/// Administration dashboard routes, nested under `/admin`.
pub mod admin;
