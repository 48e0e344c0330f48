use axum::{
    Router,
    response::Html,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use bapjigi_server::{
    AppState, TokenKeeper, auth, budget_goals, config::Config, database, expenses, meal_plans,
    posts, ranking,
};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load and validate configuration
    let config = Config::from_env().map_err(|e| format!("Configuration error: {}", e))?;

    // Initialize database
    let db = database::init_db(&config.data_path)
        .await
        .map_err(|e| format!("Failed to initialize database: {}", e))?;

    let tokens = TokenKeeper::new(&config.token_secret, config.token_expiry_hours);

    let app_state = AppState { db, tokens };

    // Configure CORS to allow frontend requests
    let frontend_origin =
        std::env::var("FRONTEND_ORIGIN").unwrap_or_else(|_| "http://localhost:8080".to_string());

    let frontend_origin_header = frontend_origin
        .parse::<axum::http::HeaderValue>()
        .map_err(|e| format!("Invalid FRONTEND_ORIGIN '{}': {}", frontend_origin, e))?;

    let cors = CorsLayer::new()
        .allow_origin(frontend_origin_header)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::header::AUTHORIZATION,
        ]);

    // Build application router
    let app = Router::new()
        .route("/", get(root))
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
        .route("/api/meal-plans/generate", post(meal_plans::generate_meal_plan))
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
        .layer(cors)
        .with_state(app_state);

    // Create TCP listener with proper error handling
    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", bind_address, e))?;

    tracing::info!(address = %bind_address, "server running");

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}

async fn root() -> Html<&'static str> {
    Html("<h1>Bapjigi Server</h1><p>API Ready</p>")
}
