use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use libsql::Connection;
use uuid::Uuid;

use crate::AppState;
use crate::auth::get_current_user;
use crate::models::{BudgetGoal, CreateBudgetGoalPayload, UpdateBudgetGoalPayload};
use crate::utils::{db_error, db_error_with_context, now_timestamp, parse_date, today};

struct GoalRow {
    id: String,
    target_amount: i64,
    start_date: String,
    end_date: String,
}

fn extract_goal_from_row(row: libsql::Row) -> Result<GoalRow, (StatusCode, String)> {
    let id: String = row
        .get(0)
        .map_err(|_| db_error_with_context("invalid budget goal data"))?;
    let target_amount: i64 = row
        .get(1)
        .map_err(|_| db_error_with_context("invalid budget goal data"))?;
    let start_date: String = row
        .get(2)
        .map_err(|_| db_error_with_context("invalid budget goal data"))?;
    let end_date: String = row
        .get(3)
        .map_err(|_| db_error_with_context("invalid budget goal data"))?;

    Ok(GoalRow {
        id,
        target_amount,
        start_date,
        end_date,
    })
}

const GOAL_COLUMNS: &str = "id, target_amount, start_date, end_date";

/// Derived fields come from the expenses linked to the goal.
async fn goal_with_spending(
    conn: &Connection,
    goal: GoalRow,
) -> Result<BudgetGoal, (StatusCode, String)> {
    let mut rows = conn
        .query(
            "SELECT COALESCE(SUM(amount), 0) FROM food_expenses WHERE budget_goal_id = ?",
            [goal.id.as_str()],
        )
        .await
        .map_err(|_| db_error_with_context("failed to sum goal spending"))?;

    let spent_amount: i64 = if let Some(row) = rows.next().await.map_err(|_| db_error())? {
        row.get(0).map_err(|_| db_error())?
    } else {
        0
    };

    let progress_percentage = if goal.target_amount != 0 {
        spent_amount as f64 / goal.target_amount as f64 * 100.0
    } else {
        0.0
    };

    Ok(BudgetGoal {
        id: goal.id,
        target_amount: goal.target_amount,
        start_date: goal.start_date,
        end_date: goal.end_date,
        spent_amount,
        remaining_amount: goal.target_amount - spent_amount,
        progress_percentage,
    })
}

fn validate_goal_period(start_date: &str, end_date: &str) -> Result<(), (StatusCode, String)> {
    let start = parse_date(start_date)?;
    let end = parse_date(end_date)?;
    if end < start {
        return Err((
            StatusCode::BAD_REQUEST,
            "End date must not precede start date".to_string(),
        ));
    }
    Ok(())
}

fn validate_target_amount(target_amount: i64) -> Result<(), (StatusCode, String)> {
    if target_amount <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Target amount must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_budget_goal(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateBudgetGoalPayload>,
) -> Result<(StatusCode, Json<BudgetGoal>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    validate_target_amount(payload.target_amount)?;
    validate_goal_period(&payload.start_date, &payload.end_date)?;

    let goal_id = Uuid::new_v4().to_string();
    let start_date = payload.start_date.trim().to_string();
    let end_date = payload.end_date.trim().to_string();

    let conn = app_state.db.write().await;
    conn.execute(
        "INSERT INTO budget_goals (id, user_id, target_amount, start_date, end_date, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
        (
            goal_id.as_str(),
            user.id.as_str(),
            payload.target_amount,
            start_date.as_str(),
            end_date.as_str(),
            now_timestamp(),
        ),
    )
    .await
    .map_err(|_| db_error_with_context("budget goal creation failed"))?;

    Ok((
        StatusCode::CREATED,
        Json(BudgetGoal {
            id: goal_id,
            target_amount: payload.target_amount,
            start_date,
            end_date,
            spent_amount: 0,
            remaining_amount: payload.target_amount,
            progress_percentage: 0.0,
        }),
    ))
}

pub async fn get_budget_goals(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Vec<BudgetGoal>>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    let conn = app_state.db.read().await;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM budget_goals WHERE user_id = ? ORDER BY start_date DESC",
                GOAL_COLUMNS
            ),
            [user.id.as_str()],
        )
        .await
        .map_err(|_| db_error_with_context("failed to query budget goals"))?;

    let mut plain = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        plain.push(extract_goal_from_row(row)?);
    }

    let mut goals = Vec::with_capacity(plain.len());
    for goal in plain {
        goals.push(goal_with_spending(&conn, goal).await?);
    }

    Ok((StatusCode::OK, Json(goals)))
}

/// Goal whose period covers today, if the caller has one.
pub async fn get_current_budget_goal(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<BudgetGoal>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;
    let today = today();

    let conn = app_state.db.read().await;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM budget_goals WHERE user_id = ? AND start_date <= ? AND end_date >= ? \
                 ORDER BY start_date DESC LIMIT 1",
                GOAL_COLUMNS
            ),
            (user.id.as_str(), today.as_str(), today.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query current budget goal"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => {
            let goal = goal_with_spending(&conn, extract_goal_from_row(row)?).await?;
            Ok((StatusCode::OK, Json(goal)))
        }
        None => Err((
            StatusCode::NOT_FOUND,
            "No budget goal covers today".to_string(),
        )),
    }
}

pub async fn get_budget_goal(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(goal_id): Path<String>,
) -> Result<(StatusCode, Json<BudgetGoal>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    let conn = app_state.db.read().await;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM budget_goals WHERE id = ? AND user_id = ?",
                GOAL_COLUMNS
            ),
            (goal_id.as_str(), user.id.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query budget goal"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => {
            let goal = goal_with_spending(&conn, extract_goal_from_row(row)?).await?;
            Ok((StatusCode::OK, Json(goal)))
        }
        None => Err((StatusCode::NOT_FOUND, "Budget goal not found".to_string())),
    }
}

pub async fn update_budget_goal(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(goal_id): Path<String>,
    Json(payload): Json<UpdateBudgetGoalPayload>,
) -> Result<(StatusCode, Json<BudgetGoal>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    if payload.target_amount.is_none()
        && payload.start_date.is_none()
        && payload.end_date.is_none()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "At least one field must be provided for update".to_string(),
        ));
    }

    if let Some(target_amount) = payload.target_amount {
        validate_target_amount(target_amount)?;
    }

    let conn = app_state.db.write().await;

    let mut existing_rows = conn
        .query(
            &format!(
                "SELECT {} FROM budget_goals WHERE id = ? AND user_id = ?",
                GOAL_COLUMNS
            ),
            (goal_id.as_str(), user.id.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query existing budget goal"))?;

    let existing = if let Some(row) = existing_rows.next().await.map_err(|_| db_error())? {
        extract_goal_from_row(row)?
    } else {
        return Err((StatusCode::NOT_FOUND, "Budget goal not found".to_string()));
    };

    let target_amount = payload.target_amount.unwrap_or(existing.target_amount);
    let start_date = payload
        .start_date
        .map(|d| d.trim().to_string())
        .unwrap_or(existing.start_date);
    let end_date = payload
        .end_date
        .map(|d| d.trim().to_string())
        .unwrap_or(existing.end_date);

    // The merged period must still be well-formed
    validate_goal_period(&start_date, &end_date)?;

    let affected_rows = conn
        .execute(
            "UPDATE budget_goals SET target_amount = ?, start_date = ?, end_date = ?, updated_at = ? \
             WHERE id = ? AND user_id = ?",
            (
                target_amount,
                start_date.as_str(),
                end_date.as_str(),
                now_timestamp(),
                goal_id.as_str(),
                user.id.as_str(),
            ),
        )
        .await
        .map_err(|_| db_error_with_context("failed to update budget goal"))?;

    if affected_rows == 0 {
        return Err((StatusCode::NOT_FOUND, "Budget goal not found".to_string()));
    }

    let goal = goal_with_spending(
        &conn,
        GoalRow {
            id: goal_id,
            target_amount,
            start_date,
            end_date,
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(goal)))
}

pub async fn delete_budget_goal(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(goal_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    let conn = app_state.db.write().await;
    let affected_rows = conn
        .execute(
            "DELETE FROM budget_goals WHERE id = ? AND user_id = ?",
            (goal_id.as_str(), user.id.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to delete budget goal"))?;

    if affected_rows == 0 {
        return Err((StatusCode::NOT_FOUND, "Budget goal not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
