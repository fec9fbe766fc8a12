/// Authentication and authorization
///
/// Credential/OTP sign-in with post-auth authorization checks, the
/// device-local login throttle, and the cached authorization gate that
/// decides whether the signed-in account may use the app at all.
pub mod api;
pub mod attempts;
pub mod cache;
pub mod gate;
pub mod messages;

pub use api::{AuthApi, AuthBackend, AuthFailure, AuthOutcome};
pub use cache::{auth_cache_ttl, AuthCacheEntry, AuthCacheStore, AUTH_CACHE_TTL_HOURS};
pub use gate::{AuthGate, GateDecision, GateRoute, GateState};
pub use messages::{categorize_auth_message, AuthErrorCategory};
