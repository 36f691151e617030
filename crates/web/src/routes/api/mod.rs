//! JSON API route handlers.
//!
//! Every failure body has the shape `{"success": false, "error": "..."}`.

pub mod debug;
pub mod directory;
pub mod organizations;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
///
/// The debug endpoints are only merged when `debug_routes` is set.
pub fn router(debug_routes: bool) -> Router<AppState> {
    let router = Router::new()
        .merge(directory::router())
        .merge(organizations::router());

    if debug_routes {
        router.merge(debug::router())
    } else {
        router
    }
}
