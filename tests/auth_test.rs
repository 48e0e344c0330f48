//! Registration, login, and token validation behavior.
mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn register_and_login_round_trip() {
    let app = common::setup_test_app().await.expect("setup app");

    let (status, body) = common::send_request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": "alice1",
            "password": "secret123",
            "name": "Alice",
        })),
    )
    .await
    .expect("register");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice1");
    // Profile name is generated as name + random suffix
    assert!(
        body["profile_name"]
            .as_str()
            .expect("profile_name")
            .starts_with("Alice_")
    );
    // Password material must never leak out
    assert!(body.get("password_hash").is_none());

    let (status, body) = common::send_request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice1", "password": "secret123"})),
    )
    .await
    .expect("login");
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().expect("token").contains('.'));
    assert_eq!(body["username"], "alice1");
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = common::setup_test_app().await.expect("setup app");

    common::register_user(&app, "alice1", "secret123", "Alice")
        .await
        .expect("first registration");

    let (status, body) = common::send_request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": "alice1",
            "password": "different456",
            "name": "Other Alice",
        })),
    )
    .await
    .expect("second registration");

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!("Username is already taken"));
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = common::setup_test_app().await.expect("setup app");
    common::register_user(&app, "alice1", "secret123", "Alice")
        .await
        .expect("register");

    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice1", "password": "wrong"})),
    )
    .await
    .expect("login attempt");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "nobody", "password": "secret123"})),
    )
    .await
    .expect("login attempt");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_requires_a_valid_token() {
    let app = common::setup_test_app().await.expect("setup app");
    let token = common::signup_and_login(&app, "alice1", "secret123")
        .await
        .expect("signup");

    let (status, body) = common::send_request(&app, "GET", "/api/auth/me", Some(&token), None)
        .await
        .expect("me");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice1");

    // No token
    let (status, _) = common::send_request(&app, "GET", "/api/auth/me", None, None)
        .await
        .expect("me without token");
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Garbage token
    let (status, _) =
        common::send_request(&app, "GET", "/api/auth/me", Some("garbage.token"), None)
            .await
            .expect("me with garbage");
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Token signed with a different secret
    let forged = bapjigi_server::TokenKeeper::new(
        "a_completely_different_secret_32_bytes!!",
        24,
    )
    .issue("alice1");
    let (status, _) = common::send_request(&app, "GET", "/api/auth/me", Some(&forged), None)
        .await
        .expect("me with forged token");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_invalidates_old_credentials() {
    let app = common::setup_test_app().await.expect("setup app");
    let token = common::signup_and_login(&app, "alice1", "secret123")
        .await
        .expect("signup");

    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(&token),
        Some(json!({"old_password": "wrong", "new_password": "newsecret456"})),
    )
    .await
    .expect("change with wrong old password");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(&token),
        Some(json!({"old_password": "secret123", "new_password": "newsecret456"})),
    )
    .await
    .expect("change password");
    assert_eq!(status, StatusCode::OK);

    // Old password no longer works, new one does
    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice1", "password": "secret123"})),
    )
    .await
    .expect("old login");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::login_user(&app, "alice1", "newsecret456")
        .await
        .expect("new login");
}

#[tokio::test]
async fn profile_name_must_stay_unique() {
    let app = common::setup_test_app().await.expect("setup app");
    let alice = common::signup_and_login(&app, "alice1", "secret123")
        .await
        .expect("alice");
    let bob = common::signup_and_login(&app, "bob22", "secret123")
        .await
        .expect("bob");

    let (status, body) = common::send_request(
        &app,
        "POST",
        "/api/auth/update-profile",
        Some(&alice),
        Some(json!({"profile_name": "foodie"})),
    )
    .await
    .expect("update alice");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile_name"], "foodie");

    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/auth/update-profile",
        Some(&bob),
        Some(json!({"profile_name": "foodie"})),
    )
    .await
    .expect("update bob");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_profile_requires_at_least_one_field() {
    let app = common::setup_test_app().await.expect("setup app");
    let token = common::signup_and_login(&app, "alice1", "secret123")
        .await
        .expect("signup");

    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/auth/update-profile",
        Some(&token),
        Some(json!({})),
    )
    .await
    .expect("empty update");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn short_usernames_and_passwords_are_rejected() {
    let app = common::setup_test_app().await.expect("setup app");

    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "ab", "password": "secret123", "name": "A"})),
    )
    .await
    .expect("short username");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice1", "password": "123", "name": "A"})),
    )
    .await
    .expect("short password");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
