//! HTTP surface for the portal clients.
//!
//! Thin axum glue over the lifecycle engine. Routes are nested under
//! `/api/`; handlers open their own SQLite connection per request.
//! The router is composable — `api_router()` returns a `Router` that
//! can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::ApiServer;
pub use types::ApiContext;
