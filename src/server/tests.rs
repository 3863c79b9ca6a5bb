use super::{AppState, create_router};
use crate::config::Config;
use crate::db::Database;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let db = Database::open_memory().unwrap();
    create_router(AppState::new(&Config::default(), db, "test-secret"))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body), None).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, None).await
}

async fn create_author(app: &Router, name: &str) -> i64 {
    let (status, body) = post(app, "/authors/", json!({ "name": name })).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn create_book(app: &Router, title: &str, author_id: i64) -> i64 {
    let (status, body) = post(
        app,
        "/books/",
        json!({ "title": title, "description": "", "author_id": author_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn register(app: &Router, username: &str) -> Value {
    let (status, body) = post(
        app,
        "/register/",
        json!({ "username": username, "password": "pw" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn health_check() {
    let app = app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn search_finds_book_by_author_name() {
    let app = app();
    let jane = create_author(&app, "Jane Doe").await;
    create_book(&app, "Foo", jane).await;
    let other = create_author(&app, "Someone").await;
    create_book(&app, "Bar", other).await;

    let (status, body) = get(&app, "/books/?search=jane").await;
    assert_eq!(status, StatusCode::OK);
    let books = body.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "Foo");
    assert_eq!(books[0]["author"], "Jane Doe");
    assert_eq!(books[0]["author_id"], jane);

    let (_, all) = get(&app, "/books/").await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn author_crud_over_http() {
    let app = app();
    let (status, created) = post(
        &app,
        "/authors/",
        json!({ "name": "Jane Doe", "image_url": "https://example.com/j.png", "bio": "b" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["image_url"], "https://example.com/j.png");

    let (status, body) = get(&app, "/authors/by-name/Jane%20Doe/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["author_id"], id);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/authors/{id}/"),
        Some(json!({ "name": "J. Doe" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "J. Doe");
    assert_eq!(body["bio"], "");

    let (status, body) = send(&app, Method::DELETE, &format!("/authors/{id}/"), None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = get(&app, &format!("/authors/{id}/")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Author not found");

    let (status, _) = get(&app, "/authors/by-name/Nobody/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_bodies_are_validation_errors() {
    let app = app();

    let (status, body) = post(&app, "/authors/", json!({ "bio": "no name" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = post(&app, "/authors/", json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&app, "/books/", json!({ "title": "Foo", "author_id": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/books/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_numeric_id_is_not_found() {
    let app = app();
    let (status, body) = get(&app, "/books/abc/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn book_rules_over_http() {
    let app = app();
    let (status, body) = post(
        &app,
        "/books/",
        json!({ "title": "Foo", "description": "", "author_id": 99 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Author not found");

    let jane = create_author(&app, "Jane").await;
    let id = create_book(&app, "Foo", jane).await;

    let (status, body) = post(
        &app,
        "/books/",
        json!({ "title": "Foo", "description": "again", "author_id": jane }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "This book already exists for the given author.");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/books/{id}/"),
        Some(json!({ "title": "Foo 2", "author_id": jane, "published_date": "2001-09-11" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Foo 2");
    assert_eq!(body["published_date"], "2001-09-11");

    let (status, _) = send(&app, Method::DELETE, &format!("/books/{id}/"), None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &format!("/books/{id}/"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_login_refresh_logout_flow() {
    let app = app();
    let registered = register(&app, "alice").await;
    assert_eq!(registered["message"], "User created successfully");
    assert!(registered["user_id"].as_i64().is_some());
    assert!(registered["access"].is_string());

    let (status, tokens) = post(
        &app,
        "/login/",
        json!({ "username": "alice", "password": "pw" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let refresh = tokens["refresh"].as_str().unwrap().to_string();

    let (status, body) = post(&app, "/token/refresh/", json!({ "refresh": refresh })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].is_string());

    let (status, body) = post(&app, "/api/logout/", json!({ "refresh": refresh })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out.");

    let (status, _) = post(&app, "/token/refresh/", json!({ "refresh": refresh })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = post(&app, "/api/logout/", json!({ "refresh": refresh })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_requires_refresh_token() {
    let app = app();
    let (status, body) = post(&app, "/api/logout/", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Refresh token is required.");

    let (status, _) = post(&app, "/api/logout/", json!({ "refresh": "garbage" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_rejected() {
    let app = app();
    register(&app, "alice").await;

    let (status, body) = post(
        &app,
        "/register/",
        json!({ "username": "alice", "password": "pw2" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already exists.");
}

#[tokio::test]
async fn wrong_password_errors_are_identical() {
    let app = app();
    register(&app, "alice").await;

    let attempt = json!({ "username": "alice", "password": "wrong" });
    let first = post(&app, "/login/", attempt.clone()).await;
    let second = post(&app, "/login/", attempt).await;
    let unknown = post(&app, "/login/", json!({ "username": "bob", "password": "pw" })).await;

    assert_eq!(first.0, StatusCode::UNAUTHORIZED);
    assert_eq!(first, second);
    assert_eq!(first, unknown);
}

#[tokio::test]
async fn favorites_require_authentication() {
    let app = app();
    let (status, body) = post(&app, "/favorites/", json!({ "book_id": 1 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/favorites/",
        Some(json!({ "book_id": 1 })),
        Some("not-a-token"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A refresh token is not an access token.
    let registered = register(&app, "alice").await;
    let refresh = registered["refresh"].as_str().unwrap();
    let (status, _) = send(&app, Method::GET, "/favorites/", None, Some(refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn favorites_flow_with_recommendations() {
    let app = app();
    let registered = register(&app, "alice").await;
    let access = registered["access"].as_str().unwrap().to_string();

    let x = create_author(&app, "Author X").await;
    let a = create_book(&app, "A", x).await;
    let b = create_book(&app, "B", x).await;
    let mut others = Vec::new();
    for i in 0..6 {
        others.push(create_book(&app, &format!("X{i}"), x).await);
    }

    let add = |book_id: i64| {
        let app = app.clone();
        let access = access.clone();
        async move {
            send(
                &app,
                Method::POST,
                "/favorites/",
                Some(json!({ "book_id": book_id })),
                Some(&access),
            )
            .await
        }
    };

    let (status, _) = add(a).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = add(b).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Favorite added successfully.");
    assert_eq!(body["favorite"]["book"], b);
    assert_eq!(body["favorite"]["user"], registered["user_id"]);

    let recommended: Vec<i64> = body["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|book| book["id"].as_i64().unwrap())
        .collect();
    assert_eq!(recommended.len(), 5);
    assert!(!recommended.contains(&a));
    assert!(!recommended.contains(&b));
    assert!(recommended.iter().all(|id| others.contains(id)));

    let (status, body) = add(b).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "This book is already in your favorites.");

    let (status, _) = add(9999).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = send(&app, Method::GET, "/favorites/", None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    let favorites = list.as_array().unwrap();
    assert_eq!(favorites.len(), 2);

    let (status, recs) = send(
        &app,
        Method::GET,
        "/favorites/recommendations/",
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recs.as_array().unwrap().len(), 5);

    let favorite_id = favorites[0]["id"].as_i64().unwrap();
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/favorites/{favorite_id}/"),
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn twenty_first_favorite_rejected() {
    let app = app();
    let registered = register(&app, "alice").await;
    let access = registered["access"].as_str().unwrap();
    let x = create_author(&app, "X").await;

    for i in 0..21 {
        let book = create_book(&app, &format!("B{i}"), x).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/favorites/",
            Some(json!({ "book_id": book })),
            Some(access),
        )
        .await;

        if i < 20 {
            assert_eq!(status, StatusCode::OK);
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Maximum of 20 favorite books allowed.");
        }
    }
}
