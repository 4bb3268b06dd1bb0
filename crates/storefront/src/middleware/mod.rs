//! HTTP middleware and extractors for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per request)
//! 2. `TraceLayer` (request span with `request_id` / `user_id` fields)
//! 3. Request ID (fills the span field, echoes `x-request-id`)
//! 4. CORS (allow headers only for configured origins)
//! 5. Timeout (JSON 503 with `Retry-After` once `REQUEST_TIMEOUT_SECS` elapses)
//!
//! The [`Caller`] extractor resolves bearer tokens per handler rather than
//! as a layer, so catalog routes never pay for a provider round trip.

pub mod cors;
pub mod identity;
pub mod request_id;
pub mod timeout;

pub use cors::cors_layer;
pub use identity::{Caller, GUEST_ID_REQUIRED};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use timeout::with_request_timeout;
