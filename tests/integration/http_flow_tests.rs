// ==================================
// tests/integration/http_flow_tests.rs
// ==================================
//! Route-level tests for `/api/v1/users`
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use vidtube_backend::create_router;

use crate::test_utils::setup_test_env;

struct Reply {
    status: StatusCode,
    cookies: Vec<String>,
    body: Value,
}

impl Reply {
    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.starts_with(&format!("{name}=")))
            .map(String::as_str)
    }

    /// Cookie value without attributes
    fn cookie_value(&self, name: &str) -> Option<String> {
        let cookie = self.cookie(name)?;
        let pair = cookie.split(';').next()?;
        Some(pair[name.len() + 1..].to_string())
    }
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Reply {
        status,
        cookies,
        body,
    }
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn register_and_login(app: &Router) -> Reply {
    let reply = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/users/register",
            json!({
                "username": "alice",
                "email": "alice@x.com",
                "fullName": "Alice Liddell",
                "password": "p1",
            }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let reply = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/users/login",
            json!({ "username": "alice", "password": "p1" }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    reply
}

#[tokio::test]
async fn test_health() {
    let (state, _dir) = setup_test_env().await;
    let app = create_router(state);

    let reply = send(
        &app,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
}

#[tokio::test]
async fn test_register_and_duplicate() {
    let (state, _dir) = setup_test_env().await;
    let app = create_router(state);
    register_and_login(&app).await;

    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/register",
            json!({
                "username": "ALICE",
                "email": "second@x.com",
                "fullName": "Impostor",
                "password": "p1",
            }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["error"]["code"], "CONFLICT_001");

    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/register",
            json!({ "username": "bob", "email": "", "fullName": "Bob", "password": "p1" }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_sets_cookies_and_hides_secrets() {
    let (state, _dir) = setup_test_env().await;
    let app = create_router(state);
    let reply = register_and_login(&app).await;

    assert_eq!(reply.cookies.len(), 2);
    let access = reply.cookie("accessToken").unwrap();
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("Secure"));
    assert!(access.contains("SameSite=Strict"));
    assert!(reply.cookie("refreshToken").is_some());

    let data = &reply.body["data"];
    assert_eq!(reply.body["success"], true);
    assert_eq!(data["user"]["username"], "alice");
    assert_eq!(
        data["accessToken"].as_str(),
        reply.cookie_value("accessToken").as_deref()
    );
    assert_eq!(
        data["refreshToken"].as_str(),
        reply.cookie_value("refreshToken").as_deref()
    );
    let user = data["user"].as_object().unwrap();
    assert!(!user.contains_key("password"));
    assert!(!user.contains_key("passwordHash"));
    assert!(!user.contains_key("refreshToken"));
}

#[tokio::test]
async fn test_login_statuses() {
    let (state, _dir) = setup_test_env().await;
    let app = create_router(state);
    register_and_login(&app).await;

    let cases = [
        (json!({ "password": "p1" }), StatusCode::BAD_REQUEST),
        (
            json!({ "username": "nobody", "password": "p1" }),
            StatusCode::NOT_FOUND,
        ),
        (
            json!({ "email": "alice@x.com", "password": "wrong" }),
            StatusCode::UNAUTHORIZED,
        ),
    ];
    for (body, expected) in cases {
        let reply = send(&app, json_request(Method::POST, "/api/v1/users/login", body)).await;
        assert_eq!(reply.status, expected);
        assert!(reply.cookies.is_empty());
    }
}

#[tokio::test]
async fn test_malformed_bodies_are_validation_errors() {
    let (state, _dir) = setup_test_env().await;
    let app = create_router(state);
    register_and_login(&app).await;

    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/login",
            json!({ "username": "alice", "password": 5 }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["code"], "VAL_001");
    assert!(reply.body["error"]["message"].is_string());

    let reply = send(
        &app,
        Request::post("/api/v1/users/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["code"], "VAL_001");

    // No content type at all
    let reply = send(
        &app,
        Request::post("/api/v1/users/login")
            .body(Body::from(r#"{"username":"alice","password":"p1"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["code"], "VAL_001");
    assert!(reply.cookies.is_empty());
}

#[tokio::test]
async fn test_current_user_via_cookie_and_bearer() {
    let (state, _dir) = setup_test_env().await;
    let app = create_router(state);
    let login = register_and_login(&app).await;
    let access = login.cookie_value("accessToken").unwrap();

    let reply = send(
        &app,
        Request::get("/api/v1/users/current-user")
            .header(header::COOKIE, format!("accessToken={access}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["username"], "alice");

    let reply = send(
        &app,
        Request::get("/api/v1/users/current-user")
            .header(header::AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(
        &app,
        Request::get("/api/v1/users/current-user")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"]["code"], "AUTH_001");
}

#[tokio::test]
async fn test_refresh_via_cookie_and_body() {
    let (state, _dir) = setup_test_env().await;
    let app = create_router(state);
    let login = register_and_login(&app).await;
    let r1 = login.cookie_value("refreshToken").unwrap();

    let reply = send(
        &app,
        Request::post("/api/v1/users/refresh-token")
            .header(header::COOKIE, format!("refreshToken={r1}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.cookies.len(), 2);
    let r2 = reply.body["data"]["refreshToken"].as_str().unwrap().to_string();
    assert_eq!(reply.cookie_value("refreshToken").as_deref(), Some(r2.as_str()));

    // Replaying the rotated token fails
    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/refresh-token",
            json!({ "refreshToken": r1 }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/refresh-token",
            json!({ "refreshToken": r2 }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(
        &app,
        Request::post("/api/v1/users/refresh-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookies() {
    let (state, _dir) = setup_test_env().await;
    let app = create_router(state);
    let login = register_and_login(&app).await;
    let access = login.cookie_value("accessToken").unwrap();
    let refresh = login.cookie_value("refreshToken").unwrap();

    let reply = send(
        &app,
        Request::post("/api/v1/users/logout")
            .header(header::AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.cookies.len(), 2);
    assert!(reply.cookies.iter().all(|c| c.contains("Max-Age=0")));

    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/refresh-token",
            json!({ "refreshToken": refresh }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(
        &app,
        Request::post("/api/v1/users/logout")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_statuses() {
    let (state, _dir) = setup_test_env().await;
    let app = create_router(state);
    let login = register_and_login(&app).await;
    let access = login.cookie_value("accessToken").unwrap();

    let change = |body: Value| {
        Request::post("/api/v1/users/change-password")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let reply = send(
        &app,
        change(json!({ "oldPassword": "p1", "newPassword": "p2", "confirmNewPassword": "p3" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(
        &app,
        change(json!({ "oldPassword": "bad", "newPassword": "p2", "confirmNewPassword": "p2" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(
        &app,
        change(json!({ "oldPassword": "p1", "newPassword": "p2", "confirmNewPassword": "p2" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/login",
            json!({ "username": "alice", "password": "p2" }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_account() {
    let (state, _dir) = setup_test_env().await;
    let app = create_router(state.clone());
    let login = register_and_login(&app).await;
    let access = login.cookie_value("accessToken").unwrap();
    crate::test_utils::register(&state, "bob", "p1").await;

    let update = |body: Value| {
        Request::patch("/api/v1/users/update-account")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, format!("accessToken={access}"))
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let reply = send(
        &app,
        update(json!({ "fullName": "Alice L", "email": "bob@x.com" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(&app, update(json!({ "fullName": "Alice L" }))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(
        &app,
        update(json!({ "fullName": "Alice L", "email": "Alice.L@X.com" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["fullName"], "Alice L");
    assert_eq!(reply.body["data"]["email"], "alice.l@x.com");
}
