use bcrypt::{hash, verify, DEFAULT_COST};
use crate::dtos::user::{RegisterUserRequest, UserResponse, LoginRequest, LoginResponse, UpdateRoleRequest};
use crate::auth::jwt::sign_token;
use crate::error::{self, AppError};
use crate::models::user::{User, UserCredentials};
use crate::domain::scope::{ROLE_ADMIN, ROLE_USER};
use axum::{extract::{Path, State}, Json};
use axum::http::StatusCode;
use crate::state::AppState;
use crate::middleware::auth::AuthContext;
use axum::extract::Extension;

const USER_SELECT: &str =
    "SELECT id, email, first_name, last_name, role, is_active, created_at FROM users";

// POST /auth/register - always creates a standard user; admins are promoted
// through PATCH /users/{id}/role by an existing admin.
pub async fn register_user(
    State(AppState { db_pool }): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        return Err(AppError::validation("Valid email required"));
    }
    if payload.password.len() < 6 {
        return Err(AppError::validation("Password too short"));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash, first_name, last_name, role)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, email, first_name, last_name, role, is_active, created_at",
    )
    .bind(payload.email.trim())
    .bind(&password_hash)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(ROLE_USER)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        if error::is_unique_violation(&e) {
            AppError::conflict("Email already registered")
        } else {
            AppError::db(e)
        }
    })?;

    tracing::info!(user_id = user.id, email = %user.email, "User registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

// POST /auth/login
pub async fn login_user(
    State(AppState { db_pool }): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::validation("Email required"));
    }
    if payload.password.is_empty() {
        return Err(AppError::validation("Password required"));
    }

    let user = sqlx::query_as::<_, UserCredentials>(
        "SELECT id, email, password_hash, role, is_active FROM users WHERE email = $1",
    )
    .bind(payload.email.trim())
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    if !user.is_active {
        return Err(AppError::forbidden("Account disabled"));
    }

    let ok = verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::internal(format!("Password verify error: {e}")))?;

    if !ok {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::internal("JWT secret not configured"))?;

    let token = sign_token(user.id, &user.role, &user.email, &secret)?;

    // 8 hours = 28800 seconds
    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in_seconds: 8 * 60 * 60,
    }))
}

// GET /auth/me - full profile from the DB using the id in AuthContext
pub async fn get_me(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE id = $1"))
        .bind(auth.user_id)
        .fetch_optional(&db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}

// GET /users - admin only
pub async fn list_users(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    if !auth.is_admin() {
        return Err(AppError::forbidden("Admin access required"));
    }

    let users = sqlx::query_as::<_, User>(&format!("{USER_SELECT} ORDER BY created_at"))
        .fetch_all(&db_pool)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

// PATCH /users/{id}/role - admin only
pub async fn update_role(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if !auth.is_admin() {
        return Err(AppError::forbidden("Admin access required"));
    }
    if payload.role != ROLE_USER && payload.role != ROLE_ADMIN {
        return Err(AppError::validation("Invalid role"));
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET role = $2 WHERE id = $1
         RETURNING id, email, first_name, last_name, role, is_active, created_at",
    )
    .bind(id)
    .bind(&payload.role)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))?;

    tracing::info!(user_id = user.id, role = %user.role, "User role updated");

    Ok(Json(UserResponse::from(user)))
}
