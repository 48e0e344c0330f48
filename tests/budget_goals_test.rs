//! Budget goal CRUD, period validation, and derived spending fields.
mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn budget_goal_crud_lifecycle() {
    let app = common::setup_test_app().await.expect("setup app");
    let token = common::signup_and_login(&app, "alice1", "secret123")
        .await
        .expect("signup");

    let (status, body) = common::send_request(
        &app,
        "POST",
        "/api/budget-goals",
        Some(&token),
        Some(json!({
            "target_amount": 300000,
            "start_date": "2026-08-01",
            "end_date": "2026-08-31",
        })),
    )
    .await
    .expect("create goal");
    assert_eq!(status, StatusCode::CREATED);
    let goal_id = body["id"].as_str().expect("goal id").to_string();
    assert_eq!(body["target_amount"], 300000);
    assert_eq!(body["spent_amount"], 0);
    assert_eq!(body["remaining_amount"], 300000);

    let (status, body) = common::send_request(
        &app,
        "GET",
        &format!("/api/budget-goals/{}", goal_id),
        Some(&token),
        None,
    )
    .await
    .expect("get goal");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["start_date"], "2026-08-01");
    assert_eq!(body["end_date"], "2026-08-31");

    let (status, body) = common::send_request(
        &app,
        "PUT",
        &format!("/api/budget-goals/{}", goal_id),
        Some(&token),
        Some(json!({"target_amount": 250000})),
    )
    .await
    .expect("update goal");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["target_amount"], 250000);

    let (status, _) = common::send_request(
        &app,
        "DELETE",
        &format!("/api/budget-goals/{}", goal_id),
        Some(&token),
        None,
    )
    .await
    .expect("delete goal");
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = common::send_request(
        &app,
        "GET",
        &format!("/api/budget-goals/{}", goal_id),
        Some(&token),
        None,
    )
    .await
    .expect("get deleted goal");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn goal_period_must_be_ordered() {
    let app = common::setup_test_app().await.expect("setup app");
    let token = common::signup_and_login(&app, "alice1", "secret123")
        .await
        .expect("signup");

    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/budget-goals",
        Some(&token),
        Some(json!({
            "target_amount": 100000,
            "start_date": "2026-08-31",
            "end_date": "2026-08-01",
        })),
    )
    .await
    .expect("inverted period");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A single-day period is allowed
    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/budget-goals",
        Some(&token),
        Some(json!({
            "target_amount": 100000,
            "start_date": "2026-08-15",
            "end_date": "2026-08-15",
        })),
    )
    .await
    .expect("single day period");
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = common::send_request(
        &app,
        "POST",
        "/api/budget-goals",
        Some(&token),
        Some(json!({
            "target_amount": 0,
            "start_date": "2026-09-01",
            "end_date": "2026-09-30",
        })),
    )
    .await
    .expect("zero target");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn goal_reports_spending_against_target() {
    let app = common::setup_test_app().await.expect("setup app");
    let token = common::signup_and_login(&app, "alice1", "secret123")
        .await
        .expect("signup");

    let (_, goal) = common::send_request(
        &app,
        "POST",
        "/api/budget-goals",
        Some(&token),
        Some(json!({
            "target_amount": 100000,
            "start_date": "2026-08-01",
            "end_date": "2026-08-31",
        })),
    )
    .await
    .expect("create goal");
    let goal_id = goal["id"].as_str().expect("goal id").to_string();

    // Two expenses inside the period attach to the goal automatically
    for (amount, date) in [(30000, "2026-08-05"), (10000, "2026-08-12")] {
        let (status, _) = common::send_request(
            &app,
            "POST",
            "/api/food-expenses",
            Some(&token),
            Some(json!({"amount": amount, "date": date})),
        )
        .await
        .expect("create expense");
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = common::send_request(
        &app,
        "GET",
        &format!("/api/budget-goals/{}", goal_id),
        Some(&token),
        None,
    )
    .await
    .expect("get goal");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["spent_amount"], 40000);
    assert_eq!(body["remaining_amount"], 60000);
    assert_eq!(body["progress_percentage"], 40.0);
}

#[tokio::test]
async fn current_goal_covers_today() {
    let app = common::setup_test_app().await.expect("setup app");
    let token = common::signup_and_login(&app, "alice1", "secret123")
        .await
        .expect("signup");

    // Nothing yet
    let (status, _) = common::send_request(&app, "GET", "/api/budget-goals/current", Some(&token), None)
        .await
        .expect("current with no goal");
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A goal in the distant past never covers today
    common::send_request(
        &app,
        "POST",
        "/api/budget-goals",
        Some(&token),
        Some(json!({
            "target_amount": 50000,
            "start_date": "2000-01-01",
            "end_date": "2000-01-31",
        })),
    )
    .await
    .expect("past goal");

    let (status, _) = common::send_request(&app, "GET", "/api/budget-goals/current", Some(&token), None)
        .await
        .expect("current with past goal");
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A goal spanning a very wide period always covers today
    let (_, wide) = common::send_request(
        &app,
        "POST",
        "/api/budget-goals",
        Some(&token),
        Some(json!({
            "target_amount": 500000,
            "start_date": "2000-01-01",
            "end_date": "2099-12-31",
        })),
    )
    .await
    .expect("wide goal");

    let (status, body) = common::send_request(&app, "GET", "/api/budget-goals/current", Some(&token), None)
        .await
        .expect("current with wide goal");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], wide["id"]);
}

#[tokio::test]
async fn goals_are_isolated_between_users() {
    let app = common::setup_test_app().await.expect("setup app");
    let alice = common::signup_and_login(&app, "alice1", "secret123")
        .await
        .expect("alice");
    let bob = common::signup_and_login(&app, "bob22", "secret123")
        .await
        .expect("bob");

    let (_, goal) = common::send_request(
        &app,
        "POST",
        "/api/budget-goals",
        Some(&alice),
        Some(json!({
            "target_amount": 100000,
            "start_date": "2026-08-01",
            "end_date": "2026-08-31",
        })),
    )
    .await
    .expect("alice goal");
    let goal_id = goal["id"].as_str().expect("goal id").to_string();

    let (status, _) = common::send_request(
        &app,
        "GET",
        &format!("/api/budget-goals/{}", goal_id),
        Some(&bob),
        None,
    )
    .await
    .expect("bob get");
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = common::send_request(&app, "GET", "/api/budget-goals", Some(&bob), None)
        .await
        .expect("bob list");
    assert_eq!(body.as_array().expect("list").len(), 0);
}
