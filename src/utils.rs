use axum::http::StatusCode;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::constants::*;

pub fn db_error() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ERR_DATABASE_OPERATION.to_string(),
    )
}

pub fn db_error_with_context(context: &str) -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Database error: {}", context),
    )
}

pub fn validate_string_length(
    value: &str,
    field_name: &str,
    max_length: usize,
) -> Result<(), (StatusCode, String)> {
    if value.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("{} cannot be empty", field_name),
        ));
    }
    if value.len() > max_length {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("{} must be less than {} characters", field_name, max_length),
        ));
    }
    Ok(())
}

pub fn validate_date(value: &str) -> Result<(), (StatusCode, String)> {
    parse_date(value).map(|_| ())
}

pub fn parse_date(value: &str) -> Result<time::Date, (StatusCode, String)> {
    if value.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Date cannot be empty".to_string()));
    }

    let format = time::format_description::parse("[year]-[month]-[day]")
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid date format".to_string()))?;

    time::Date::parse(value.trim(), &format)
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid date format".to_string()))
}

pub fn format_date(date: time::Date) -> String {
    match time::format_description::parse("[year]-[month]-[day]") {
        Ok(format) => date.format(&format).unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Today's date as a `YYYY-MM-DD` string.
pub fn today() -> String {
    format_date(OffsetDateTime::now_utc().date())
}

/// Current instant as an RFC3339 timestamp, stored on created_at/updated_at.
pub fn now_timestamp() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

pub fn validate_limit(limit: Option<u32>, default: u32) -> Result<u32, (StatusCode, String)> {
    match limit {
        Some(l) => {
            if l == 0 {
                Err((
                    StatusCode::BAD_REQUEST,
                    "Limit must be greater than 0".to_string(),
                ))
            } else if l > MAX_LIMIT {
                Err((
                    StatusCode::BAD_REQUEST,
                    format!("Limit cannot exceed {}", MAX_LIMIT),
                ))
            } else {
                Ok(l)
            }
        }
        None => Ok(default),
    }
}

pub fn validate_posts_limit(limit: Option<u32>) -> Result<u32, (StatusCode, String)> {
    validate_limit(limit, DEFAULT_POSTS_LIMIT)
}

pub fn validate_offset(offset: Option<u32>) -> Result<u32, (StatusCode, String)> {
    match offset {
        Some(o) => {
            if o > MAX_OFFSET {
                Err((
                    StatusCode::BAD_REQUEST,
                    format!("Offset cannot exceed {}", MAX_OFFSET),
                ))
            } else {
                Ok(o)
            }
        }
        None => Ok(0),
    }
}

pub fn validate_meal_type(value: &str) -> Result<(), (StatusCode, String)> {
    if MEAL_TYPES.contains(&value) {
        Ok(())
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Meal type must be one of: {}",
                MEAL_TYPES.join(", ")
            ),
        ))
    }
}

/// Effective date range for list queries, widest bounds when unspecified.
pub fn date_range_bounds(
    start_date: Option<String>,
    end_date: Option<String>,
) -> Result<(String, String), (StatusCode, String)> {
    if let Some(ref start) = start_date {
        validate_date(start)?;
    }
    if let Some(ref end) = end_date {
        validate_date(end)?;
    }
    Ok((
        start_date.unwrap_or_else(|| "0000-01-01".to_string()),
        end_date.unwrap_or_else(|| "9999-12-31".to_string()),
    ))
}
