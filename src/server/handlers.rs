//! HTTP request handlers.

use super::requests::{
    AuthorRequest, BookRequest, FavoriteRequest, LoginRequest, RefreshRequest, RegisterRequest,
};
use crate::auth::TokenPair;
use crate::db::{Author, Book, Favorite, User};
use crate::error::{AppError, Result};
use crate::server::AppState;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, StatusCode, header},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// JSON body whose rejection is turned into a validation error.
type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// Integer path ID whose rejection is turned into a 404.
type IdPath = std::result::Result<Path<i64>, PathRejection>;

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ============================================================================
// AUTHORS
// ============================================================================

/// List authors.
pub async fn authors_list(State(state): State<AppState>) -> Result<Json<Vec<Author>>> {
    Ok(Json(state.catalog.list_authors()?))
}

/// Create an author.
pub async fn authors_create(
    State(state): State<AppState>,
    body: JsonBody<AuthorRequest>,
) -> Result<(StatusCode, Json<Author>)> {
    let Json(req) = body?;
    let author = state.catalog.create_author(&req.into_fields()?)?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// Author ID lookup response.
#[derive(Debug, Serialize)]
pub struct AuthorIdResponse {
    author_id: i64,
}

/// Look up an author's ID by exact name.
pub async fn author_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AuthorIdResponse>> {
    let author_id = state.catalog.get_author_by_name(&name)?;
    Ok(Json(AuthorIdResponse { author_id }))
}

/// Get an author.
pub async fn author_get(State(state): State<AppState>, path: IdPath) -> Result<Json<Author>> {
    let Path(id) = path?;
    Ok(Json(state.catalog.get_author(id)?))
}

/// Replace an author.
pub async fn author_update(
    State(state): State<AppState>,
    path: IdPath,
    body: JsonBody<AuthorRequest>,
) -> Result<Json<Author>> {
    let Path(id) = path?;
    let Json(req) = body?;
    Ok(Json(state.catalog.update_author(id, &req.into_fields()?)?))
}

/// Delete an author and their books.
pub async fn author_delete(State(state): State<AppState>, path: IdPath) -> Result<StatusCode> {
    let Path(id) = path?;
    state.catalog.delete_author(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// BOOKS
// ============================================================================

/// Book list query parameters.
#[derive(Debug, Deserialize)]
pub struct BookQuery {
    search: Option<String>,
}

/// List books, optionally searching title and author name.
pub async fn books_list(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> Result<Json<Vec<Book>>> {
    Ok(Json(state.catalog.list_books(query.search.as_deref())?))
}

/// Create a book.
pub async fn books_create(
    State(state): State<AppState>,
    body: JsonBody<BookRequest>,
) -> Result<(StatusCode, Json<Book>)> {
    let Json(req) = body?;
    let book = state.catalog.create_book(&req.into_fields()?)?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Get a book.
pub async fn book_get(State(state): State<AppState>, path: IdPath) -> Result<Json<Book>> {
    let Path(id) = path?;
    Ok(Json(state.catalog.get_book(id)?))
}

/// Replace a book.
pub async fn book_update(
    State(state): State<AppState>,
    path: IdPath,
    body: JsonBody<BookRequest>,
) -> Result<Json<Book>> {
    let Path(id) = path?;
    let Json(req) = body?;
    Ok(Json(state.catalog.update_book(id, &req.into_fields()?)?))
}

/// Delete a book.
pub async fn book_delete(State(state): State<AppState>, path: IdPath) -> Result<StatusCode> {
    let Path(id) = path?;
    state.catalog.delete_book(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// FAVORITES
// ============================================================================

/// Add-favorite response.
#[derive(Debug, Serialize)]
pub struct FavoriteAddedResponse {
    message: &'static str,
    favorite: Favorite,
    recommendations: Vec<Book>,
}

/// Add a favorite for the authenticated user.
pub async fn favorites_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<FavoriteRequest>,
) -> Result<Json<FavoriteAddedResponse>> {
    // Authentication is checked before the body is looked at.
    let user = get_authenticated_user(&state, &headers)?;
    let Json(req) = body?;

    let added = state.favorites.add_favorite(&user, req.book_id)?;

    Ok(Json(FavoriteAddedResponse {
        message: "Favorite added successfully.",
        favorite: added.favorite,
        recommendations: added.recommendations,
    }))
}

/// List the authenticated user's favorites.
pub async fn favorites_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Favorite>>> {
    let user = get_authenticated_user(&state, &headers)?;
    Ok(Json(state.favorites.list_favorites(&user)?))
}

/// Recommendations for the authenticated user's favorites.
pub async fn favorites_recommendations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Book>>> {
    let user = get_authenticated_user(&state, &headers)?;
    Ok(Json(state.favorites.recommendations(&user)?))
}

/// Remove one of the authenticated user's favorites.
pub async fn favorite_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: IdPath,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers)?;
    let Path(id) = path?;
    state.favorites.remove_favorite(&user, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// AUTH API
// ============================================================================

/// Registration response.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    message: &'static str,
    user_id: i64,
    refresh: String,
    access: String,
}

/// Access token response.
#[derive(Debug, Serialize)]
pub struct AccessResponse {
    access: String,
}

/// Plain message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

/// Register a user and return their first token pair.
pub async fn register(
    State(state): State<AppState>,
    body: JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let Json(req) = body?;
    let registration = state
        .auth
        .register(&req.username, &req.password, req.email.as_deref())?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully",
            user_id: registration.user.id,
            refresh: registration.tokens.refresh,
            access: registration.tokens.access,
        }),
    ))
}

/// Log in.
pub async fn login(
    State(state): State<AppState>,
    body: JsonBody<LoginRequest>,
) -> Result<Json<TokenPair>> {
    let Json(req) = body?;
    Ok(Json(state.auth.login(&req.username, &req.password)?))
}

/// Exchange a refresh token for a new access token.
pub async fn token_refresh(
    State(state): State<AppState>,
    body: JsonBody<RefreshRequest>,
) -> Result<Json<AccessResponse>> {
    let Json(req) = body?;
    let access = state.auth.refresh(&req.token()?)?;
    Ok(Json(AccessResponse { access }))
}

/// Blacklist the refresh token in the body.
pub async fn logout(
    State(state): State<AppState>,
    body: JsonBody<RefreshRequest>,
) -> Result<Json<MessageResponse>> {
    let Json(req) = body?;
    state.auth.logout(&req.token()?)?;
    Ok(Json(MessageResponse {
        message: "Successfully logged out.",
    }))
}

// ============================================================================
// HELPERS
// ============================================================================

/// Extract token from Authorization header.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Get authenticated user from the bearer access token.
fn get_authenticated_user(state: &AppState, headers: &HeaderMap) -> Result<User> {
    let token = extract_token(headers).ok_or_else(|| {
        AppError::Auth("Authentication credentials were not provided.".to_string())
    })?;

    state.auth.authenticate(token)
}
