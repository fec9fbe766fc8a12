/// Lumera Partner - client core and media edge functions
///
/// Library surface for the partner-side client: credential/OTP sign-in with
/// post-auth authorization checks, a device-local authorization gate, and the
/// media gallery pipeline (upload, signed-URL resolution, reorder, deletion).
/// The `functions` module hosts the three media edge functions that front the
/// platform database and object storage.
pub mod auth;
pub mod baas;
pub mod config;
pub mod device;
pub mod error;
pub mod functions;
pub mod media;
pub mod metrics;
pub mod session;
pub mod telemetry;
pub mod validation;
