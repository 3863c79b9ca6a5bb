//! HTTP server and routes.

mod handlers;
mod requests;
mod state;

#[cfg(test)]
mod tests;

pub use state::AppState;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Catalog
        .route(
            "/authors/",
            get(handlers::authors_list).post(handlers::authors_create),
        )
        .route("/authors/by-name/{name}/", get(handlers::author_by_name))
        .route(
            "/authors/{id}/",
            get(handlers::author_get)
                .put(handlers::author_update)
                .delete(handlers::author_delete),
        )
        .route(
            "/books/",
            get(handlers::books_list).post(handlers::books_create),
        )
        .route(
            "/books/{id}/",
            get(handlers::book_get)
                .put(handlers::book_update)
                .delete(handlers::book_delete),
        )
        // Favorites
        .route(
            "/favorites/",
            get(handlers::favorites_list).post(handlers::favorites_add),
        )
        .route(
            "/favorites/recommendations/",
            get(handlers::favorites_recommendations),
        )
        .route("/favorites/{id}/", delete(handlers::favorite_delete))
        // Auth
        .route("/register/", post(handlers::register))
        .route("/login/", post(handlers::login))
        .route("/token/refresh/", post(handlers::token_refresh))
        .route("/api/logout/", post(handlers::logout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
