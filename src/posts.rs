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
    CreatePostPayload, GetPostsQuery, GetPostsResponse, Post, PostAuthor, SearchPostsQuery,
    UpdatePostPayload,
};
use crate::utils::{
    db_error, db_error_with_context, now_timestamp, validate_offset, validate_posts_limit,
    validate_string_length,
};

// posts joined with their author row
const POST_COLUMNS: &str = "p.id, p.title, p.content, p.image_url, p.view_count, p.like_count, \
     p.created_at, p.updated_at, u.id, u.username, u.profile_name, u.profile_image";

const POST_FROM: &str = "FROM posts p JOIN users u ON u.id = p.user_id";

pub fn extract_post_from_row(row: libsql::Row) -> Result<Post, (StatusCode, String)> {
    let id: String = row
        .get(0)
        .map_err(|_| db_error_with_context("invalid post data"))?;
    let title: String = row
        .get(1)
        .map_err(|_| db_error_with_context("invalid post data"))?;
    let content: String = row
        .get(2)
        .map_err(|_| db_error_with_context("invalid post data"))?;
    let image_url: Option<String> = row
        .get(3)
        .map_err(|_| db_error_with_context("invalid post data"))?;
    let view_count: i64 = row
        .get(4)
        .map_err(|_| db_error_with_context("invalid post data"))?;
    let like_count: i64 = row
        .get(5)
        .map_err(|_| db_error_with_context("invalid post data"))?;
    let created_at: String = row
        .get(6)
        .map_err(|_| db_error_with_context("invalid post data"))?;
    let updated_at: Option<String> = row
        .get(7)
        .map_err(|_| db_error_with_context("invalid post data"))?;
    let author_id: String = row
        .get(8)
        .map_err(|_| db_error_with_context("invalid post data"))?;
    let author_username: String = row
        .get(9)
        .map_err(|_| db_error_with_context("invalid post data"))?;
    let author_profile_name: String = row
        .get(10)
        .map_err(|_| db_error_with_context("invalid post data"))?;
    let author_profile_image: String = row
        .get(11)
        .map_err(|_| db_error_with_context("invalid post data"))?;

    Ok(Post {
        id,
        title,
        content,
        image_url,
        view_count,
        like_count,
        created_at,
        updated_at,
        author: PostAuthor {
            id: author_id,
            username: author_username,
            profile_name: author_profile_name,
            profile_image: author_profile_image,
        },
    })
}

fn validate_post_title(title: &str) -> Result<(), (StatusCode, String)> {
    validate_string_length(title, "Title", MAX_POST_TITLE_LENGTH)
}

fn validate_post_content(content: &str) -> Result<(), (StatusCode, String)> {
    validate_string_length(content, "Content", MAX_POST_CONTENT_LENGTH)
}

async fn fetch_post(
    conn: &libsql::Connection,
    post_id: &str,
) -> Result<Option<Post>, (StatusCode, String)> {
    let mut rows = conn
        .query(
            &format!("SELECT {} {} WHERE p.id = ?", POST_COLUMNS, POST_FROM),
            [post_id],
        )
        .await
        .map_err(|_| db_error_with_context("failed to query post"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => Ok(Some(extract_post_from_row(row)?)),
        None => Ok(None),
    }
}

pub async fn create_post(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePostPayload>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    validate_post_title(&payload.title)?;
    validate_post_content(&payload.content)?;

    let post_id = Uuid::new_v4().to_string();
    let created_at = now_timestamp();

    let conn = app_state.db.write().await;
    conn.execute(
        "INSERT INTO posts (id, user_id, title, content, image_url, view_count, like_count, created_at) \
         VALUES (?, ?, ?, ?, ?, 0, 0, ?)",
        (
            post_id.as_str(),
            user.id.as_str(),
            payload.title.trim(),
            payload.content.trim(),
            payload.image_url.clone(),
            created_at.as_str(),
        ),
    )
    .await
    .map_err(|_| db_error_with_context("post creation failed"))?;

    Ok((
        StatusCode::CREATED,
        Json(Post {
            id: post_id,
            title: payload.title.trim().to_string(),
            content: payload.content.trim().to_string(),
            image_url: payload.image_url,
            view_count: 0,
            like_count: 0,
            created_at,
            updated_at: None,
            author: PostAuthor {
                id: user.id,
                username: user.username,
                profile_name: user.profile_name,
                profile_image: user.profile_image,
            },
        }),
    ))
}

pub async fn get_posts(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GetPostsQuery>,
) -> Result<(StatusCode, Json<GetPostsResponse>), (StatusCode, String)> {
    get_current_user(&app_state, &headers).await?;

    let limit = validate_posts_limit(query.limit)?;
    let offset = validate_offset(query.offset)?;

    let conn = app_state.db.read().await;

    let mut count_rows = conn
        .query("SELECT COUNT(*) FROM posts", ())
        .await
        .map_err(|_| db_error_with_context("failed to count posts"))?;
    let total_count: u32 = if let Some(row) = count_rows.next().await.map_err(|_| db_error())? {
        row.get(0).map_err(|_| db_error())?
    } else {
        0
    };

    let mut rows = conn
        .query(
            &format!(
                "SELECT {} {} ORDER BY p.created_at DESC LIMIT ? OFFSET ?",
                POST_COLUMNS, POST_FROM
            ),
            (limit, offset),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query posts"))?;

    let mut posts = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        posts.push(extract_post_from_row(row)?);
    }

    Ok((StatusCode::OK, Json(GetPostsResponse { posts, total_count })))
}

pub async fn get_my_posts(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Vec<Post>>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    let conn = app_state.db.read().await;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} {} WHERE p.user_id = ? ORDER BY p.created_at DESC",
                POST_COLUMNS, POST_FROM
            ),
            [user.id.as_str()],
        )
        .await
        .map_err(|_| db_error_with_context("failed to query posts"))?;

    let mut posts = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        posts.push(extract_post_from_row(row)?);
    }

    Ok((StatusCode::OK, Json(posts)))
}

pub async fn search_posts(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchPostsQuery>,
) -> Result<(StatusCode, Json<GetPostsResponse>), (StatusCode, String)> {
    get_current_user(&app_state, &headers).await?;

    let keyword = query.keyword.trim();
    validate_string_length(keyword, "Search keyword", MAX_SEARCH_TERM_LENGTH)?;
    let limit = validate_posts_limit(query.limit)?;
    let offset = validate_offset(query.offset)?;

    let pattern = format!("%{}%", keyword);

    let conn = app_state.db.read().await;

    let mut count_rows = conn
        .query(
            "SELECT COUNT(*) FROM posts WHERE title LIKE ? COLLATE NOCASE OR content LIKE ? COLLATE NOCASE",
            (pattern.as_str(), pattern.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to count matching posts"))?;
    let total_count: u32 = if let Some(row) = count_rows.next().await.map_err(|_| db_error())? {
        row.get(0).map_err(|_| db_error())?
    } else {
        0
    };

    let mut rows = conn
        .query(
            &format!(
                "SELECT {} {} WHERE p.title LIKE ? COLLATE NOCASE OR p.content LIKE ? COLLATE NOCASE \
                 ORDER BY p.created_at DESC LIMIT ? OFFSET ?",
                POST_COLUMNS, POST_FROM
            ),
            (pattern.as_str(), pattern.as_str(), limit, offset),
        )
        .await
        .map_err(|_| db_error_with_context("failed to search posts"))?;

    let mut posts = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        posts.push(extract_post_from_row(row)?);
    }

    Ok((StatusCode::OK, Json(GetPostsResponse { posts, total_count })))
}

/// Reading a post bumps its view counter by exactly one.
pub async fn get_post(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<String>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    get_current_user(&app_state, &headers).await?;

    let conn = app_state.db.write().await;

    let affected_rows = conn
        .execute(
            "UPDATE posts SET view_count = view_count + 1 WHERE id = ?",
            [post_id.as_str()],
        )
        .await
        .map_err(|_| db_error_with_context("failed to update view count"))?;

    if affected_rows == 0 {
        return Err((StatusCode::NOT_FOUND, "Post not found".to_string()));
    }

    let post = fetch_post(&conn, &post_id)
        .await?
        .ok_or((StatusCode::NOT_FOUND, "Post not found".to_string()))?;

    Ok((StatusCode::OK, Json(post)))
}

pub async fn update_post(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<String>,
    Json(payload): Json<UpdatePostPayload>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    if payload.title.is_none() && payload.content.is_none() && payload.image_url.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            "At least one field must be provided for update".to_string(),
        ));
    }
    if let Some(ref title) = payload.title {
        validate_post_title(title)?;
    }
    if let Some(ref content) = payload.content {
        validate_post_content(content)?;
    }

    let conn = app_state.db.write().await;

    let existing = fetch_post(&conn, &post_id)
        .await?
        .ok_or((StatusCode::NOT_FOUND, "Post not found".to_string()))?;

    if existing.author.id != user.id {
        return Err((
            StatusCode::FORBIDDEN,
            "You can only modify your own posts".to_string(),
        ));
    }

    let title = payload
        .title
        .map(|t| t.trim().to_string())
        .unwrap_or(existing.title);
    let content = payload
        .content
        .map(|c| c.trim().to_string())
        .unwrap_or(existing.content);
    let image_url = payload.image_url.or(existing.image_url);
    let updated_at = now_timestamp();

    conn.execute(
        "UPDATE posts SET title = ?, content = ?, image_url = ?, updated_at = ? WHERE id = ?",
        (
            title.as_str(),
            content.as_str(),
            image_url.clone(),
            updated_at.as_str(),
            post_id.as_str(),
        ),
    )
    .await
    .map_err(|_| db_error_with_context("failed to update post"))?;

    Ok((
        StatusCode::OK,
        Json(Post {
            id: existing.id,
            title,
            content,
            image_url,
            view_count: existing.view_count,
            like_count: existing.like_count,
            created_at: existing.created_at,
            updated_at: Some(updated_at),
            author: existing.author,
        }),
    ))
}

pub async fn delete_post(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = get_current_user(&app_state, &headers).await?;

    let conn = app_state.db.write().await;

    let existing = fetch_post(&conn, &post_id)
        .await?
        .ok_or((StatusCode::NOT_FOUND, "Post not found".to_string()))?;

    if existing.author.id != user.id {
        return Err((
            StatusCode::FORBIDDEN,
            "You can only delete your own posts".to_string(),
        ));
    }

    conn.execute("DELETE FROM posts WHERE id = ?", [post_id.as_str()])
        .await
        .map_err(|_| db_error_with_context("failed to delete post"))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Any authenticated caller may like any post, any number of times.
pub async fn like_post(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<String>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    get_current_user(&app_state, &headers).await?;

    let conn = app_state.db.write().await;

    let affected_rows = conn
        .execute(
            "UPDATE posts SET like_count = like_count + 1 WHERE id = ?",
            [post_id.as_str()],
        )
        .await
        .map_err(|_| db_error_with_context("failed to update like count"))?;

    if affected_rows == 0 {
        return Err((StatusCode::NOT_FOUND, "Post not found".to_string()));
    }

    let post = fetch_post(&conn, &post_id)
        .await?
        .ok_or((StatusCode::NOT_FOUND, "Post not found".to_string()))?;

    Ok((StatusCode::OK, Json(post)))
}
