use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};
use libsql::Connection;
use rand::seq::IndexedRandom;
use uuid::Uuid;

use crate::constants::*;
use crate::models::{CreateMealPlanPayload, DateQuery, DateRangeQuery, MealPlan, UpdateMealPlanPayload};
use crate::utils::{
    date_range_bounds, db_error, db_error_with_context, now_timestamp, validate_date,
    validate_string_length,
};
use crate::{AppState, TransactionError, auth::get_current_user, with_transaction};

// Placeholder generator tables: (dish, estimated cost). A real recommendation
// backend would replace these.
const BREAKFAST_CHOICES: [(&str, i64); 5] = [
    ("Oatmeal with fruit", 3000),
    ("Scrambled eggs and toast", 3500),
    ("Yogurt and granola", 2800),
    ("Rice porridge with egg", 2500),
    ("Banana smoothie", 2000),
];

const LUNCH_CHOICES: [(&str, i64); 5] = [
    ("Brown rice with grilled chicken salad", 6500),
    ("Kimchi fried rice", 5000),
    ("Soba noodles with vegetables", 5500),
    ("Tuna kimbap", 4500),
    ("Pork cutlet with cabbage", 7000),
];

const DINNER_CHOICES: [(&str, i64); 5] = [
    ("Salmon steak with roasted vegetables", 9000),
    ("Tofu stew with rice", 6000),
    ("Bulgogi with lettuce wraps", 8500),
    ("Chicken breast with sweet potato", 6500),
    ("Bean sprout soup with rice", 4500),
];

pub fn extract_meal_plan_from_row(row: libsql::Row) -> Result<MealPlan, (StatusCode, String)> {
    let id: String = row
        .get(0)
        .map_err(|_| db_error_with_context("invalid meal plan data"))?;
    let date: String = row
        .get(1)
        .map_err(|_| db_error_with_context("invalid meal plan data"))?;
    let breakfast: Option<String> = row
        .get(2)
        .map_err(|_| db_error_with_context("invalid meal plan data"))?;
    let lunch: Option<String> = row
        .get(3)
        .map_err(|_| db_error_with_context("invalid meal plan data"))?;
    let dinner: Option<String> = row
        .get(4)
        .map_err(|_| db_error_with_context("invalid meal plan data"))?;
    let estimated_cost: Option<i64> = row
        .get(5)
        .map_err(|_| db_error_with_context("invalid meal plan data"))?;
    let ai_generated: bool = row
        .get(6)
        .map_err(|_| db_error_with_context("invalid meal plan data"))?;

    Ok(MealPlan {
        id,
        date,
        breakfast,
        lunch,
        dinner,
        estimated_cost,
        ai_generated,
    })
}

const MEAL_PLAN_COLUMNS: &str =
    "id, date, breakfast, lunch, dinner, estimated_cost, ai_generated";

enum CreateMealPlanError {
    Transaction(TransactionError),
    DbCheck,
    DbInsert,
    Duplicate,
}

impl From<TransactionError> for CreateMealPlanError {
    fn from(e: TransactionError) -> Self {
        CreateMealPlanError::Transaction(e)
    }
}

impl From<CreateMealPlanError> for (StatusCode, String) {
    fn from(e: CreateMealPlanError) -> Self {
        match e {
            CreateMealPlanError::Transaction(TransactionError::Begin) => {
                db_error_with_context("failed to begin transaction")
            }
            CreateMealPlanError::Transaction(TransactionError::Commit) => {
                db_error_with_context("failed to commit transaction")
            }
            CreateMealPlanError::DbCheck => {
                db_error_with_context("failed to check existing meal plan")
            }
            CreateMealPlanError::DbInsert => db_error_with_context("meal plan creation failed"),
            CreateMealPlanError::Duplicate => (
                StatusCode::BAD_REQUEST,
                "A meal plan already exists for this date".to_string(),
            ),
        }
    }
}

/// Insert a plan, failing when the (user, date) slot is already taken.
/// Runs inside the caller's transaction.
async fn insert_meal_plan(
    conn: &Connection,
    user_id: &str,
    plan: &MealPlan,
) -> Result<(), CreateMealPlanError> {
    let mut existing = conn
        .query(
            "SELECT id FROM meal_plans WHERE user_id = ? AND date = ?",
            (user_id, plan.date.as_str()),
        )
        .await
        .map_err(|_| CreateMealPlanError::DbCheck)?;

    if existing
        .next()
        .await
        .map_err(|_| CreateMealPlanError::DbCheck)?
        .is_some()
    {
        return Err(CreateMealPlanError::Duplicate);
    }

    conn.execute(
        "INSERT INTO meal_plans (id, user_id, date, breakfast, lunch, dinner, estimated_cost, ai_generated, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            plan.id.as_str(),
            user_id,
            plan.date.as_str(),
            plan.breakfast.clone(),
            plan.lunch.clone(),
            plan.dinner.clone(),
            plan.estimated_cost,
            plan.ai_generated,
            now_timestamp(),
        ),
    )
    .await
    .map_err(|_| CreateMealPlanError::DbInsert)?;

    Ok(())
}

fn validate_meal_texts(
    breakfast: Option<&str>,
    lunch: Option<&str>,
    dinner: Option<&str>,
) -> Result<(), (StatusCode, String)> {
    for (field, value) in [("Breakfast", breakfast), ("Lunch", lunch), ("Dinner", dinner)] {
        if let Some(text) = value {
            validate_string_length(text, field, MAX_MEAL_TEXT_LENGTH)?;
        }
    }
    Ok(())
}

pub async fn create_meal_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateMealPlanPayload>,
) -> Result<(StatusCode, Json<MealPlan>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    validate_date(&payload.date)?;
    validate_meal_texts(
        payload.breakfast.as_deref(),
        payload.lunch.as_deref(),
        payload.dinner.as_deref(),
    )?;

    let plan = MealPlan {
        id: Uuid::new_v4().to_string(),
        date: payload.date.trim().to_string(),
        breakfast: payload.breakfast,
        lunch: payload.lunch,
        dinner: payload.dinner,
        estimated_cost: payload.estimated_cost,
        ai_generated: payload.ai_generated,
    };

    let plan = with_transaction(&app_state.db, |conn| {
        let user_id = user.id.clone();
        let plan = plan.clone();
        Box::pin(async move {
            insert_meal_plan(conn, &user_id, &plan).await?;
            Ok(plan)
        })
    })
    .await
    .map_err(|e: CreateMealPlanError| -> (StatusCode, String) { e.into() })?;

    Ok((StatusCode::CREATED, Json(plan)))
}

/// Placeholder "AI" generation: a uniformly-random pick per meal from the
/// fixed tables, cost summed from the picks.
pub async fn generate_meal_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DateQuery>,
) -> Result<(StatusCode, Json<MealPlan>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;
    validate_date(&query.date)?;

    let (breakfast, lunch, dinner, estimated_cost) = {
        let mut rng = rand::rng();
        let (breakfast, breakfast_cost) = BREAKFAST_CHOICES
            .choose(&mut rng)
            .copied()
            .unwrap_or(BREAKFAST_CHOICES[0]);
        let (lunch, lunch_cost) = LUNCH_CHOICES
            .choose(&mut rng)
            .copied()
            .unwrap_or(LUNCH_CHOICES[0]);
        let (dinner, dinner_cost) = DINNER_CHOICES
            .choose(&mut rng)
            .copied()
            .unwrap_or(DINNER_CHOICES[0]);
        (
            breakfast.to_string(),
            lunch.to_string(),
            dinner.to_string(),
            breakfast_cost + lunch_cost + dinner_cost,
        )
    };

    let plan = MealPlan {
        id: Uuid::new_v4().to_string(),
        date: query.date.trim().to_string(),
        breakfast: Some(breakfast),
        lunch: Some(lunch),
        dinner: Some(dinner),
        estimated_cost: Some(estimated_cost),
        ai_generated: true,
    };

    let plan = with_transaction(&app_state.db, |conn| {
        let user_id = user.id.clone();
        let plan = plan.clone();
        Box::pin(async move {
            insert_meal_plan(conn, &user_id, &plan).await?;
            Ok(plan)
        })
    })
    .await
    .map_err(|e: CreateMealPlanError| -> (StatusCode, String) { e.into() })?;

    tracing::debug!(user = %user.username, date = %plan.date, "generated meal plan");

    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn get_meal_plans(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DateRangeQuery>,
) -> Result<(StatusCode, Json<Vec<MealPlan>>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;
    let (start_date, end_date) = date_range_bounds(query.start_date, query.end_date)?;

    let conn = app_state.db.read().await;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM meal_plans WHERE user_id = ? AND date BETWEEN ? AND ? ORDER BY date DESC",
                MEAL_PLAN_COLUMNS
            ),
            (user.id.as_str(), start_date.as_str(), end_date.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query meal plans"))?;

    let mut plans = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        plans.push(extract_meal_plan_from_row(row)?);
    }

    Ok((StatusCode::OK, Json(plans)))
}

pub async fn get_meal_plan_by_date(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DateQuery>,
) -> Result<(StatusCode, Json<MealPlan>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;
    validate_date(&query.date)?;

    let conn = app_state.db.read().await;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM meal_plans WHERE user_id = ? AND date = ?",
                MEAL_PLAN_COLUMNS
            ),
            (user.id.as_str(), query.date.trim()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query meal plan"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => Ok((StatusCode::OK, Json(extract_meal_plan_from_row(row)?))),
        None => Err((
            StatusCode::NOT_FOUND,
            "No meal plan exists for this date".to_string(),
        )),
    }
}

pub async fn update_meal_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DateQuery>,
    Json(payload): Json<UpdateMealPlanPayload>,
) -> Result<(StatusCode, Json<MealPlan>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;
    validate_date(&query.date)?;
    validate_meal_texts(
        payload.breakfast.as_deref(),
        payload.lunch.as_deref(),
        payload.dinner.as_deref(),
    )?;

    let date = query.date.trim().to_string();

    let conn = app_state.db.write().await;

    let mut existing_rows = conn
        .query(
            "SELECT id FROM meal_plans WHERE user_id = ? AND date = ?",
            (user.id.as_str(), date.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query existing meal plan"))?;

    let plan_id: String = match existing_rows.next().await.map_err(|_| db_error())? {
        Some(row) => row.get(0).map_err(|_| db_error())?,
        None => {
            return Err((
                StatusCode::NOT_FOUND,
                "No meal plan exists for this date".to_string(),
            ));
        }
    };

    // PUT replaces the plan contents wholesale
    conn.execute(
        "UPDATE meal_plans SET breakfast = ?, lunch = ?, dinner = ?, estimated_cost = ?, ai_generated = ?, updated_at = ? \
         WHERE id = ?",
        (
            payload.breakfast.clone(),
            payload.lunch.clone(),
            payload.dinner.clone(),
            payload.estimated_cost,
            payload.ai_generated,
            now_timestamp(),
            plan_id.as_str(),
        ),
    )
    .await
    .map_err(|_| db_error_with_context("failed to update meal plan"))?;

    Ok((
        StatusCode::OK,
        Json(MealPlan {
            id: plan_id,
            date,
            breakfast: payload.breakfast,
            lunch: payload.lunch,
            dinner: payload.dinner,
            estimated_cost: payload.estimated_cost,
            ai_generated: payload.ai_generated,
        }),
    ))
}

pub async fn delete_meal_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DateQuery>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;
    validate_date(&query.date)?;

    let conn = app_state.db.write().await;
    let affected_rows = conn
        .execute(
            "DELETE FROM meal_plans WHERE user_id = ? AND date = ?",
            (user.id.as_str(), query.date.trim()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to delete meal plan"))?;

    if affected_rows == 0 {
        return Err((
            StatusCode::NOT_FOUND,
            "No meal plan exists for this date".to_string(),
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}
