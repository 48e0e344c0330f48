use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
};
use bapjigi_server::{
    AppState, TokenKeeper, auth, budget_goals, database, expenses, meal_plans, posts, ranking,
};
use serde_json::Value;
use tower::util::ServiceExt;

pub const TEST_TOKEN_SECRET: &str = "test_token_secret_at_least_32_bytes_long!!";

#[derive(Clone)]
pub struct TestConfig {
    pub temp_dir_path: String,
}

impl TestConfig {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let temp_dir_path = temp_dir.path().to_string_lossy().to_string();
        std::mem::forget(temp_dir);
        Ok(Self { temp_dir_path })
    }

    pub fn data_path(&self) -> String {
        self.temp_dir_path.clone()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub async fn setup_test_app() -> anyhow::Result<TestApp> {
    let test_config = TestConfig::new()?;

    let data_path = test_config.data_path();
    std::fs::create_dir_all(&data_path)?;

    let db = database::init_db(&data_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize database: {}", e))?;

    let tokens = TokenKeeper::new(TEST_TOKEN_SECRET, 24);

    let app_state = AppState { db, tokens };

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/auth/update-profile", post(auth::update_profile))
        .route(
            "/api/food-expenses",
            post(expenses::create_expense).get(expenses::get_expenses),
        )
        .route("/api/food-expenses/total", get(expenses::get_expense_total))
        .route(
            "/api/food-expenses/{id}",
            get(expenses::get_expense)
                .put(expenses::update_expense)
                .delete(expenses::delete_expense),
        )
        .route(
            "/api/budget-goals",
            post(budget_goals::create_budget_goal).get(budget_goals::get_budget_goals),
        )
        .route(
            "/api/budget-goals/current",
            get(budget_goals::get_current_budget_goal),
        )
        .route(
            "/api/budget-goals/{id}",
            get(budget_goals::get_budget_goal)
                .put(budget_goals::update_budget_goal)
                .delete(budget_goals::delete_budget_goal),
        )
        .route(
            "/api/meal-plans",
            post(meal_plans::create_meal_plan).get(meal_plans::get_meal_plans),
        )
        .route(
            "/api/meal-plans/generate",
            post(meal_plans::generate_meal_plan),
        )
        .route(
            "/api/meal-plans/by-date",
            get(meal_plans::get_meal_plan_by_date)
                .put(meal_plans::update_meal_plan)
                .delete(meal_plans::delete_meal_plan),
        )
        .route("/api/posts", post(posts::create_post).get(posts::get_posts))
        .route("/api/posts/mine", get(posts::get_my_posts))
        .route("/api/posts/search", get(posts::search_posts))
        .route(
            "/api/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/api/posts/{id}/like", post(posts::like_post))
        .route("/api/ranking/food-expense", get(ranking::get_ranking))
        .route(
            "/api/ranking/food-expense/period",
            get(ranking::get_ranking_by_period),
        )
        .route("/api/ranking/food-expense/me", get(ranking::get_my_ranking))
        .with_state(app_state.clone());

    Ok(TestApp {
        router,
        state: app_state,
    })
}

async fn root_handler() -> axum::response::Html<&'static str> {
    axum::response::Html("<h1>Test Server</h1>")
}

/// Send a request, optionally authenticated, optionally with a JSON body.
/// Returns the status and the body parsed as JSON (or a JSON string when the
/// body is not valid JSON).
pub async fn send_request(
    app: &TestApp,
    method: &str,
    uri: &str,
    token: Option<&str>,
    payload: Option<Value>,
) -> anyhow::Result<(StatusCode, Value)> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let body = match payload {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    let request = builder
        .body(body)
        .map_err(|e| anyhow::anyhow!("Failed to build request: {}", e))?;

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to execute request: {}", e))?;

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read response body: {}", e))?;

    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));

    Ok((status, body))
}

#[allow(dead_code)]
pub async fn register_user(
    app: &TestApp,
    username: &str,
    password: &str,
    name: &str,
) -> anyhow::Result<String> {
    let payload = serde_json::json!({
        "username": username,
        "password": password,
        "name": name,
    });

    let (status, body) = send_request(app, "POST", "/api/auth/register", None, Some(payload)).await?;
    if status != StatusCode::CREATED {
        anyhow::bail!("Registration failed with {}: {}", status, body);
    }

    body.get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("No user id in registration response"))
}

#[allow(dead_code)]
pub async fn login_user(app: &TestApp, username: &str, password: &str) -> anyhow::Result<String> {
    let payload = serde_json::json!({
        "username": username,
        "password": password,
    });

    let (status, body) = send_request(app, "POST", "/api/auth/login", None, Some(payload)).await?;
    if status != StatusCode::OK {
        anyhow::bail!("Login failed with {}: {}", status, body);
    }

    body.get("token")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("No token in login response"))
}

/// Register and log in, returning a bearer token.
#[allow(dead_code)]
pub async fn signup_and_login(
    app: &TestApp,
    username: &str,
    password: &str,
) -> anyhow::Result<String> {
    register_user(app, username, password, "Test User").await?;
    login_user(app, username, password).await
}
