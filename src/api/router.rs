//! Route table for the portal API.
//!
//! Returns a composable `Router`; all routes live under `/api/`.

use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the full API router around a database path.
pub fn api_router(ctx: ApiContext) -> Router {
    // .with_state() converts Router<ApiContext> → Router<()>
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/generate-pdf", post(endpoints::documents::generate))
        .route(
            "/requests",
            post(endpoints::requests::create)
                .get(endpoints::requests::list)
                .delete(endpoints::requests::remove_all),
        )
        .route("/requests/pending", get(endpoints::requests::pending))
        .route(
            "/requests/:id",
            get(endpoints::requests::detail).delete(endpoints::requests::remove),
        )
        .route("/requests/:id/approve", post(endpoints::requests::approve))
        .route("/requests/:id/reject", post(endpoints::requests::reject))
        .route("/requests/:id/pdf", get(endpoints::requests::pdf))
        .with_state(ctx);

    Router::new().nest("/api", routes)
}
