//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Trailing-slash normalization (wraps the whole router)
//! 2. Sentry layers (hub per request, transaction per route)
//! 3. CORS, when origins are configured
//! 4. `TraceLayer` (request span with method, uri and request id)
//! 5. Request ID (reuse or generate `x-request-id`)
//!
//! Authentication is not a layer: handlers opt in through the extractors
//! in [`auth`].

pub mod auth;
pub mod request_id;

pub use auth::{RequireAdmin, RequireAuth, RequireRegular};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
