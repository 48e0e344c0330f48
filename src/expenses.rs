use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use uuid::Uuid;

use crate::AppState;
use crate::auth::get_current_user;
use crate::constants::*;
use crate::models::{
    CreateExpensePayload, DateRangeQuery, ExpenseTotalResponse, FoodExpense, PeriodQuery,
    UpdateExpensePayload,
};
use crate::utils::{
    date_range_bounds, db_error, db_error_with_context, now_timestamp, validate_date,
    validate_meal_type, validate_string_length,
};

pub fn extract_expense_from_row(row: libsql::Row) -> Result<FoodExpense, (StatusCode, String)> {
    let id: String = row
        .get(0)
        .map_err(|_| db_error_with_context("invalid expense data"))?;
    let budget_goal_id: Option<String> = row
        .get(1)
        .map_err(|_| db_error_with_context("invalid expense data"))?;
    let amount: i64 = row
        .get(2)
        .map_err(|_| db_error_with_context("invalid expense data"))?;
    let date: String = row
        .get(3)
        .map_err(|_| db_error_with_context("invalid expense data"))?;
    let description: Option<String> = row
        .get(4)
        .map_err(|_| db_error_with_context("invalid expense data"))?;
    let meal_type: Option<String> = row
        .get(5)
        .map_err(|_| db_error_with_context("invalid expense data"))?;

    Ok(FoodExpense {
        id,
        budget_goal_id,
        amount,
        date,
        description,
        meal_type,
    })
}

const EXPENSE_COLUMNS: &str = "id, budget_goal_id, amount, date, description, meal_type";

/// Goal the expense belongs to: the explicit one (ownership-checked), or the
/// caller's goal whose period covers the expense date, if any.
async fn resolve_budget_goal(
    db: &crate::Db,
    user_id: &str,
    explicit_goal_id: Option<&str>,
    expense_date: &str,
) -> Result<Option<String>, (StatusCode, String)> {
    let conn = db.read().await;

    if let Some(goal_id) = explicit_goal_id {
        let mut rows = conn
            .query(
                "SELECT id FROM budget_goals WHERE id = ? AND user_id = ?",
                (goal_id, user_id),
            )
            .await
            .map_err(|_| db_error_with_context("failed to check budget goal"))?;
        if rows.next().await.map_err(|_| db_error())?.is_none() {
            return Err((
                StatusCode::BAD_REQUEST,
                "Budget goal does not exist".to_string(),
            ));
        }
        return Ok(Some(goal_id.to_string()));
    }

    let mut rows = conn
        .query(
            "SELECT id FROM budget_goals WHERE user_id = ? AND start_date <= ? AND end_date >= ? \
             ORDER BY start_date DESC LIMIT 1",
            (user_id, expense_date, expense_date),
        )
        .await
        .map_err(|_| db_error_with_context("failed to match budget goal"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => Ok(Some(row.get(0).map_err(|_| db_error())?)),
        None => Ok(None),
    }
}

pub async fn create_expense(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateExpensePayload>,
) -> Result<(StatusCode, Json<FoodExpense>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    validate_date(&payload.date)?;
    if let Some(ref description) = payload.description {
        validate_string_length(description, "Description", MAX_EXPENSE_DESCRIPTION_LENGTH)?;
    }
    if let Some(ref meal_type) = payload.meal_type {
        validate_meal_type(meal_type)?;
    }

    let date = payload.date.trim().to_string();
    let budget_goal_id = resolve_budget_goal(
        &app_state.db,
        &user.id,
        payload.budget_goal_id.as_deref(),
        &date,
    )
    .await?;

    let expense_id = Uuid::new_v4().to_string();

    let conn = app_state.db.write().await;
    conn.execute(
        "INSERT INTO food_expenses (id, user_id, budget_goal_id, amount, date, description, meal_type, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        (
            expense_id.as_str(),
            user.id.as_str(),
            budget_goal_id.clone(),
            payload.amount,
            date.as_str(),
            payload.description.clone(),
            payload.meal_type.clone(),
            now_timestamp(),
        ),
    )
    .await
    .map_err(|_| db_error_with_context("expense creation failed"))?;

    Ok((
        StatusCode::CREATED,
        Json(FoodExpense {
            id: expense_id,
            budget_goal_id,
            amount: payload.amount,
            date,
            description: payload.description,
            meal_type: payload.meal_type,
        }),
    ))
}

pub async fn get_expenses(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DateRangeQuery>,
) -> Result<(StatusCode, Json<Vec<FoodExpense>>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;
    let (start_date, end_date) = date_range_bounds(query.start_date, query.end_date)?;

    let conn = app_state.db.read().await;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM food_expenses WHERE user_id = ? AND date BETWEEN ? AND ? ORDER BY date DESC",
                EXPENSE_COLUMNS
            ),
            (user.id.as_str(), start_date.as_str(), end_date.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query expenses"))?;

    let mut expenses = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        expenses.push(extract_expense_from_row(row)?);
    }

    Ok((StatusCode::OK, Json(expenses)))
}

pub async fn get_expense_total(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PeriodQuery>,
) -> Result<(StatusCode, Json<ExpenseTotalResponse>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;
    validate_date(&query.start_date)?;
    validate_date(&query.end_date)?;

    let conn = app_state.db.read().await;
    let mut rows = conn
        .query(
            "SELECT COALESCE(SUM(amount), 0) FROM food_expenses WHERE user_id = ? AND date BETWEEN ? AND ?",
            (
                user.id.as_str(),
                query.start_date.trim(),
                query.end_date.trim(),
            ),
        )
        .await
        .map_err(|_| db_error_with_context("failed to sum expenses"))?;

    let total: i64 = if let Some(row) = rows.next().await.map_err(|_| db_error())? {
        row.get(0).map_err(|_| db_error())?
    } else {
        0
    };

    Ok((StatusCode::OK, Json(ExpenseTotalResponse { total })))
}

pub async fn get_expense(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(expense_id): Path<String>,
) -> Result<(StatusCode, Json<FoodExpense>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    let conn = app_state.db.read().await;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM food_expenses WHERE id = ? AND user_id = ?",
                EXPENSE_COLUMNS
            ),
            (expense_id.as_str(), user.id.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query expense"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => Ok((StatusCode::OK, Json(extract_expense_from_row(row)?))),
        None => Err((StatusCode::NOT_FOUND, "Expense not found".to_string())),
    }
}

pub async fn update_expense(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(expense_id): Path<String>,
    Json(payload): Json<UpdateExpensePayload>,
) -> Result<(StatusCode, Json<FoodExpense>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    if payload.amount.is_none()
        && payload.date.is_none()
        && payload.description.is_none()
        && payload.meal_type.is_none()
        && payload.budget_goal_id.is_none()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "At least one field must be provided for update".to_string(),
        ));
    }

    if let Some(ref date) = payload.date {
        validate_date(date)?;
    }
    if let Some(ref description) = payload.description {
        validate_string_length(description, "Description", MAX_EXPENSE_DESCRIPTION_LENGTH)?;
    }
    if let Some(ref meal_type) = payload.meal_type {
        validate_meal_type(meal_type)?;
    }

    // An explicit goal id must exist and belong to the caller
    if let Some(ref goal_id) = payload.budget_goal_id {
        resolve_budget_goal(&app_state.db, &user.id, Some(goal_id), "").await?;
    }

    let conn = app_state.db.write().await;

    let mut existing_rows = conn
        .query(
            &format!(
                "SELECT {} FROM food_expenses WHERE id = ? AND user_id = ?",
                EXPENSE_COLUMNS
            ),
            (expense_id.as_str(), user.id.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query existing expense"))?;

    let existing = if let Some(row) = existing_rows.next().await.map_err(|_| db_error())? {
        extract_expense_from_row(row)?
    } else {
        return Err((StatusCode::NOT_FOUND, "Expense not found".to_string()));
    };

    // Omitted fields keep their stored values; optional fields cannot be
    // cleared back to null through this endpoint
    let updated = FoodExpense {
        id: existing.id,
        budget_goal_id: payload.budget_goal_id.or(existing.budget_goal_id),
        amount: payload.amount.unwrap_or(existing.amount),
        date: payload
            .date
            .map(|d| d.trim().to_string())
            .unwrap_or(existing.date),
        description: payload.description.or(existing.description),
        meal_type: payload.meal_type.or(existing.meal_type),
    };

    let affected_rows = conn
        .execute(
            "UPDATE food_expenses SET budget_goal_id = ?, amount = ?, date = ?, description = ?, meal_type = ?, updated_at = ? \
             WHERE id = ? AND user_id = ?",
            (
                updated.budget_goal_id.clone(),
                updated.amount,
                updated.date.as_str(),
                updated.description.clone(),
                updated.meal_type.clone(),
                now_timestamp(),
                expense_id.as_str(),
                user.id.as_str(),
            ),
        )
        .await
        .map_err(|_| db_error_with_context("failed to update expense"))?;

    if affected_rows == 0 {
        return Err((StatusCode::NOT_FOUND, "Expense not found".to_string()));
    }

    Ok((StatusCode::OK, Json(updated)))
}

pub async fn delete_expense(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(expense_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    let conn = app_state.db.write().await;
    let affected_rows = conn
        .execute(
            "DELETE FROM food_expenses WHERE id = ? AND user_id = ?",
            (expense_id.as_str(), user.id.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to delete expense"))?;

    if affected_rows == 0 {
        return Err((StatusCode::NOT_FOUND, "Expense not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
