use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::constants::*;
use crate::models::{
    ChangePasswordPayload, LoginPayload, LoginResponse, PublicUser, RegisterPayload,
    UpdateProfilePayload, User,
};
use crate::utils::{db_error, db_error_with_context, now_timestamp, validate_string_length};
use crate::{AppState, Db, TransactionError, with_transaction};

pub fn validate_username(username: &str) -> Result<(), (StatusCode, String)> {
    validate_string_length(username, "Username", MAX_USERNAME_LENGTH)?;
    if username.trim().len() < MIN_USERNAME_LENGTH {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Username must be at least {} characters", MIN_USERNAME_LENGTH),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), (StatusCode, String)> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, (StatusCode, String)> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password hashing failed".to_string(),
            )
        })
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn extract_user_from_row(row: libsql::Row) -> Result<User, (StatusCode, String)> {
    let id: String = row
        .get(0)
        .map_err(|_| db_error_with_context("invalid user data"))?;
    let username: String = row
        .get(1)
        .map_err(|_| db_error_with_context("invalid user data"))?;
    let password_hash: String = row
        .get(2)
        .map_err(|_| db_error_with_context("invalid user data"))?;
    let profile_name: String = row
        .get(3)
        .map_err(|_| db_error_with_context("invalid user data"))?;
    let profile_image: String = row
        .get(4)
        .map_err(|_| db_error_with_context("invalid user data"))?;
    let monthly_food_budget: Option<i64> = row
        .get(5)
        .map_err(|_| db_error_with_context("invalid user data"))?;
    let role: String = row
        .get(6)
        .map_err(|_| db_error_with_context("invalid user data"))?;

    Ok(User {
        id,
        username,
        password_hash,
        profile_name,
        profile_image,
        monthly_food_budget,
        role,
    })
}

const USER_COLUMNS: &str =
    "id, username, password_hash, profile_name, profile_image, monthly_food_budget, role";

pub async fn find_user_by_username(
    db: &Db,
    username: &str,
) -> Result<Option<User>, (StatusCode, String)> {
    let conn = db.read().await;
    let mut rows = conn
        .query(
            &format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS),
            [username],
        )
        .await
        .map_err(|_| db_error_with_context("failed to query user"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => Ok(Some(extract_user_from_row(row)?)),
        None => Ok(None),
    }
}

/// Resolve the caller's identity from the `Authorization: Bearer <token>` header.
///
/// Any failure (missing header, bad signature, expiry, unknown user) collapses
/// to a generic 401; the reason is not surfaced to the caller.
pub async fn get_current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<User, (StatusCode, String)> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, ERR_MISSING_TOKEN.to_string()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or((StatusCode::UNAUTHORIZED, ERR_MISSING_TOKEN.to_string()))?;

    let claims = state.tokens.verify(token).map_err(|e| {
        tracing::debug!(error = ?e, "bearer token rejected");
        (StatusCode::UNAUTHORIZED, ERR_INVALID_TOKEN.to_string())
    })?;

    find_user_by_username(&state.db, &claims.sub)
        .await?
        .ok_or((StatusCode::UNAUTHORIZED, ERR_INVALID_TOKEN.to_string()))
}

enum RegisterError {
    Transaction(TransactionError),
    DbCheck,
    DbInsert,
    UsernameTaken,
    ProfileNameExhausted,
}

impl From<TransactionError> for RegisterError {
    fn from(e: TransactionError) -> Self {
        RegisterError::Transaction(e)
    }
}

impl From<RegisterError> for (StatusCode, String) {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::Transaction(TransactionError::Begin) => {
                db_error_with_context("failed to begin transaction")
            }
            RegisterError::Transaction(TransactionError::Commit) => {
                db_error_with_context("failed to commit transaction")
            }
            RegisterError::DbCheck => db_error_with_context("failed to check existing user"),
            RegisterError::DbInsert => db_error_with_context("user creation failed"),
            RegisterError::UsernameTaken => (
                StatusCode::BAD_REQUEST,
                "Username is already taken".to_string(),
            ),
            RegisterError::ProfileNameExhausted => db_error_with_context(
                "could not generate a unique profile name",
            ),
        }
    }
}

fn profile_name_candidate(name: &str) -> String {
    let base = if name.trim().is_empty() { "user" } else { name.trim() };
    let suffix = Uuid::new_v4().to_string();
    format!("{}_{}", base, &suffix[..8])
}

pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    validate_username(&payload.username)?;
    validate_password(&payload.password)?;
    validate_string_length(&payload.name, "Name", MAX_NAME_LENGTH)?;

    let username = payload.username.trim().to_string();
    let password_hash = hash_password(&payload.password)?;
    let display_name = payload.name.trim().to_string();
    let profile_image = payload
        .profile_image
        .clone()
        .unwrap_or_else(|| DEFAULT_PROFILE_IMAGE.to_string());
    let monthly_food_budget = payload.monthly_food_budget;

    let user = with_transaction(&app_state.db, |conn| {
        let username = username.clone();
        let password_hash = password_hash.clone();
        let display_name = display_name.clone();
        let profile_image = profile_image.clone();
        Box::pin(async move {
            let mut existing_rows = conn
                .query("SELECT id FROM users WHERE username = ?", [username.as_str()])
                .await
                .map_err(|_| RegisterError::DbCheck)?;

            if existing_rows
                .next()
                .await
                .map_err(|_| RegisterError::DbCheck)?
                .is_some()
            {
                return Err(RegisterError::UsernameTaken);
            }

            // Profile names are globally unique; retry until a free one is found
            let mut profile_name = None;
            for _ in 0..10 {
                let candidate = profile_name_candidate(&display_name);
                let mut rows = conn
                    .query(
                        "SELECT id FROM users WHERE profile_name = ?",
                        [candidate.as_str()],
                    )
                    .await
                    .map_err(|_| RegisterError::DbCheck)?;
                if rows
                    .next()
                    .await
                    .map_err(|_| RegisterError::DbCheck)?
                    .is_none()
                {
                    profile_name = Some(candidate);
                    break;
                }
            }
            let profile_name = profile_name.ok_or(RegisterError::ProfileNameExhausted)?;

            let user_id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO users (id, username, password_hash, profile_name, profile_image, monthly_food_budget, role, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, 'user', ?)",
                (
                    user_id.as_str(),
                    username.as_str(),
                    password_hash.as_str(),
                    profile_name.as_str(),
                    profile_image.as_str(),
                    monthly_food_budget,
                    now_timestamp(),
                ),
            )
            .await
            .map_err(|_| RegisterError::DbInsert)?;

            Ok(User {
                id: user_id,
                username,
                password_hash,
                profile_name,
                profile_image,
                monthly_food_budget,
                role: "user".to_string(),
            })
        })
    })
    .await
    .map_err(|e: RegisterError| -> (StatusCode, String) { e.into() })?;

    tracing::info!(username = %user.username, "registered new user");

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<(StatusCode, Json<LoginResponse>), (StatusCode, String)> {
    let login_failed = || {
        (
            StatusCode::BAD_REQUEST,
            "Login failed: invalid username or password".to_string(),
        )
    };

    let user = find_user_by_username(&app_state.db, payload.username.trim())
        .await?
        .ok_or_else(login_failed)?;

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::debug!(username = %user.username, "password mismatch on login");
        return Err(login_failed());
    }

    let token = app_state.tokens.issue(&user.username);

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            token,
            user_id: user.id,
            username: user.username,
            profile_name: user.profile_name,
            profile_image: user.profile_image,
        }),
    ))
}

pub async fn me(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;
    Ok((StatusCode::OK, Json(user.into())))
}

pub async fn change_password(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    if !verify_password(&payload.old_password, &user.password_hash) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Current password does not match".to_string(),
        ));
    }
    validate_password(&payload.new_password)?;

    let new_hash = hash_password(&payload.new_password)?;

    let conn = app_state.db.write().await;
    conn.execute(
        "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?",
        (new_hash.as_str(), now_timestamp(), user.id.as_str()),
    )
    .await
    .map_err(|_| db_error_with_context("failed to update password"))?;

    Ok(StatusCode::OK)
}

pub async fn update_profile(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    if payload.profile_name.is_none()
        && payload.profile_image.is_none()
        && payload.monthly_food_budget.is_none()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "At least one field must be provided for update".to_string(),
        ));
    }

    let profile_name = match payload.profile_name {
        Some(ref name) => {
            validate_string_length(name, "Profile name", MAX_PROFILE_NAME_LENGTH)?;
            let name = name.trim().to_string();
            if name != user.profile_name {
                let conn = app_state.db.read().await;
                let mut rows = conn
                    .query(
                        "SELECT id FROM users WHERE profile_name = ? AND id != ?",
                        (name.as_str(), user.id.as_str()),
                    )
                    .await
                    .map_err(|_| db_error_with_context("failed to check profile name"))?;
                if rows.next().await.map_err(|_| db_error())?.is_some() {
                    return Err((
                        StatusCode::BAD_REQUEST,
                        "Profile name is already taken".to_string(),
                    ));
                }
            }
            name
        }
        None => user.profile_name.clone(),
    };

    let profile_image = payload
        .profile_image
        .unwrap_or_else(|| user.profile_image.clone());
    // Omitted fields keep their stored values; a set monthly budget cannot be
    // cleared back to null through this endpoint
    let monthly_food_budget = payload.monthly_food_budget.or(user.monthly_food_budget);

    let conn = app_state.db.write().await;
    conn.execute(
        "UPDATE users SET profile_name = ?, profile_image = ?, monthly_food_budget = ?, updated_at = ? WHERE id = ?",
        (
            profile_name.as_str(),
            profile_image.as_str(),
            monthly_food_budget,
            now_timestamp(),
            user.id.as_str(),
        ),
    )
    .await
    .map_err(|_| db_error_with_context("failed to update profile"))?;

    Ok((
        StatusCode::OK,
        Json(PublicUser {
            id: user.id,
            username: user.username,
            profile_name,
            profile_image,
            monthly_food_budget,
        }),
    ))
}
