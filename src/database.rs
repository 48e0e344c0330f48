use anyhow::Result;
use libsql::{Builder, Connection};
use std::future::Future;
use std::pin::Pin;
use std::{path::Path, sync::Arc};
use tokio::sync::RwLock;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id                  TEXT    PRIMARY KEY,
    username            TEXT    UNIQUE NOT NULL,
    password_hash       TEXT    NOT NULL,
    profile_name        TEXT    UNIQUE NOT NULL,
    profile_image       TEXT    NOT NULL,
    monthly_food_budget INTEGER,
    role                TEXT    NOT NULL DEFAULT 'user',
    created_at          TEXT    NOT NULL,
    updated_at          TEXT
);
"#;

const CREATE_BUDGET_GOALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS budget_goals (
    id            TEXT    PRIMARY KEY,
    user_id       TEXT    NOT NULL,
    target_amount INTEGER NOT NULL,
    start_date    TEXT    NOT NULL,
    end_date      TEXT    NOT NULL,
    created_at    TEXT    NOT NULL,
    updated_at    TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id)
);
"#;

const CREATE_FOOD_EXPENSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS food_expenses (
    id             TEXT    PRIMARY KEY,
    user_id        TEXT    NOT NULL,
    budget_goal_id TEXT,
    amount         INTEGER NOT NULL,
    date           TEXT    NOT NULL,
    description    TEXT,
    meal_type      TEXT,
    created_at     TEXT    NOT NULL,
    updated_at     TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id),
    FOREIGN KEY (budget_goal_id) REFERENCES budget_goals(id)
);
"#;

const CREATE_MEAL_PLANS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS meal_plans (
    id             TEXT    PRIMARY KEY,
    user_id        TEXT    NOT NULL,
    date           TEXT    NOT NULL,
    breakfast      TEXT,
    lunch          TEXT,
    dinner         TEXT,
    estimated_cost INTEGER,
    ai_generated   BOOLEAN NOT NULL DEFAULT FALSE,
    created_at     TEXT    NOT NULL,
    updated_at     TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id),
    UNIQUE (user_id, date)
);
"#;

const CREATE_POSTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id         TEXT    PRIMARY KEY,
    user_id    TEXT    NOT NULL,
    title      TEXT    NOT NULL,
    content    TEXT    NOT NULL,
    image_url  TEXT,
    view_count INTEGER NOT NULL DEFAULT 0,
    like_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT    NOT NULL,
    updated_at TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id)
);
"#;

const CREATE_EXPENSES_USER_DATE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_food_expenses_user_date ON food_expenses(user_id, date);
"#;

const CREATE_MEAL_PLANS_USER_DATE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_meal_plans_user_date ON meal_plans(user_id, date);
"#;

const CREATE_POSTS_USER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id);
"#;

pub type Db = Arc<RwLock<Connection>>;

/// Application database (bapjigi.db), shared by all users
pub async fn init_db(data_dir: &str) -> Result<Db> {
    tokio::fs::create_dir_all(data_dir).await?;
    let path = Path::new(data_dir).join("bapjigi.db");
    let db = Builder::new_local(path).build().await?;
    let conn = db.connect()?;

    conn.execute(CREATE_USERS_TABLE, ()).await?;
    conn.execute(CREATE_BUDGET_GOALS_TABLE, ()).await?;
    conn.execute(CREATE_FOOD_EXPENSES_TABLE, ()).await?;
    conn.execute(CREATE_MEAL_PLANS_TABLE, ()).await?;
    conn.execute(CREATE_POSTS_TABLE, ()).await?;
    conn.execute(CREATE_EXPENSES_USER_DATE_INDEX, ()).await?;
    conn.execute(CREATE_MEAL_PLANS_USER_DATE_INDEX, ()).await?;
    conn.execute(CREATE_POSTS_USER_INDEX, ()).await?;

    Ok(Arc::new(RwLock::new(conn)))
}

/// Errors that can occur during transaction management
#[derive(Debug)]
pub enum TransactionError {
    Begin,
    Commit,
}

/// Execute a function within a database transaction, returning handler-compatible errors.
///
/// The closure must return a boxed future to handle lifetime issues with async closures.
pub async fn with_transaction<F, T, E>(db: &Db, f: F) -> Result<T, E>
where
    F: for<'a> FnOnce(&'a Connection) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>,
    E: From<TransactionError>,
{
    // Write lock gives exclusive access for the duration of the transaction
    let conn = db.write().await;

    conn.execute("BEGIN TRANSACTION", ())
        .await
        .map_err(|_| TransactionError::Begin)?;

    match f(&conn).await {
        Ok(result) => {
            conn.execute("COMMIT", ())
                .await
                .map_err(|_| TransactionError::Commit)?;
            Ok(result)
        }
        Err(e) => {
            let _ = conn.execute("ROLLBACK", ()).await;
            Err(e)
        }
    }
}
