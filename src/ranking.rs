use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};
use time::OffsetDateTime;

use crate::AppState;
use crate::auth::get_current_user;
use crate::models::{PeriodQuery, RankingEntry};
use crate::utils::{db_error, db_error_with_context, format_date, validate_date};

/// Per-user expense totals for the range, users with a zero sum discarded,
/// ascending by total (lowest spender first). Rank is 1-based.
pub async fn compute_ranking(
    db: &crate::Db,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<RankingEntry>, (StatusCode, String)> {
    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT u.id, u.username, u.profile_name, u.profile_image, \
                    COALESCE(SUM(e.amount), 0) AS total_amount \
             FROM users u \
             LEFT JOIN food_expenses e ON e.user_id = u.id AND e.date BETWEEN ? AND ? \
             GROUP BY u.id \
             HAVING total_amount != 0 \
             ORDER BY total_amount ASC",
            (start_date, end_date),
        )
        .await
        .map_err(|_| db_error_with_context("failed to compute ranking"))?;

    let mut entries = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        let user_id: String = row.get(0).map_err(|_| db_error())?;
        let username: String = row.get(1).map_err(|_| db_error())?;
        let profile_name: String = row.get(2).map_err(|_| db_error())?;
        let profile_image: String = row.get(3).map_err(|_| db_error())?;
        let total_amount: i64 = row.get(4).map_err(|_| db_error())?;

        entries.push(RankingEntry {
            user_id,
            username,
            profile_name,
            profile_image,
            total_amount,
            rank: entries.len() as u32 + 1,
        });
    }

    Ok(entries)
}

/// First and last day of the current calendar month as `YYYY-MM-DD`.
fn current_month_bounds() -> (String, String) {
    let today = OffsetDateTime::now_utc().date();
    let first = today.replace_day(1).unwrap_or(today);
    let last_day = time::util::days_in_year_month(today.year(), today.month());
    let last = today.replace_day(last_day).unwrap_or(today);
    (format_date(first), format_date(last))
}

pub async fn get_ranking(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Vec<RankingEntry>>), (StatusCode, String)> {
    get_current_user(&app_state, &headers).await?;

    let (start_date, end_date) = current_month_bounds();
    let entries = compute_ranking(&app_state.db, &start_date, &end_date).await?;

    Ok((StatusCode::OK, Json(entries)))
}

pub async fn get_ranking_by_period(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PeriodQuery>,
) -> Result<(StatusCode, Json<Vec<RankingEntry>>), (StatusCode, String)> {
    get_current_user(&app_state, &headers).await?;

    validate_date(&query.start_date)?;
    validate_date(&query.end_date)?;

    let entries =
        compute_ranking(&app_state.db, query.start_date.trim(), query.end_date.trim()).await?;

    Ok((StatusCode::OK, Json(entries)))
}

/// The caller's own entry for the current month. A caller with no spending
/// is reported with a zero total and a rank one past the participants.
pub async fn get_my_ranking(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<RankingEntry>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    let (start_date, end_date) = current_month_bounds();
    let entries = compute_ranking(&app_state.db, &start_date, &end_date).await?;

    let participant_count = entries.len() as u32;
    let entry = entries
        .into_iter()
        .find(|e| e.user_id == user.id)
        .unwrap_or(RankingEntry {
            user_id: user.id,
            username: user.username,
            profile_name: user.profile_name,
            profile_image: user.profile_image,
            total_amount: 0,
            rank: participant_count + 1,
        });

    Ok((StatusCode::OK, Json(entry)))
}
