use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use classifieds_auth::{Action, Role};
use classifieds_core::UserId;
use classifieds_infra::{NewUser, StoreError, UserChanges};

use crate::app::dto::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CallerContext;
use crate::middleware::{extract_bearer, resolve_caller};

const USERNAME_TAKEN: &str = "username already exists";

pub fn router() -> Router {
    Router::new()
        .route("/user/:id", get(get_user).patch(update_user).delete(delete_user))
}

/// Registration is open, so a credential is only looked at when the request
/// asks for the admin group.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<CreateUserRequest>,
) -> Result<Response, ApiError> {
    let role = body.group.unwrap_or_default();
    if role == Role::Admin {
        let bearer = extract_bearer(&headers)?;
        let caller = resolve_caller(&services, bearer).await?;
        authz::require(&caller, Action::Elevate, None)?;
    }
    body.validate()?;

    if services
        .store
        .get_user_by_username(&body.username)
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest(USERNAME_TAKEN.to_string()));
    }

    let password_verifier = services.auth.hash_password(&body.password)?;
    let created = services
        .store
        .create_user(NewUser {
            username: body.username,
            email: body.email,
            password_verifier,
            role,
        })
        .await
        .map_err(username_conflict)?;

    tracing::info!(subject_id = %created.id, group = %created.role, "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(created))).into_response())
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id: UserId = id.parse()?;
    authz::require(&caller, Action::Read, None)?;

    let user = services
        .store
        .get_user(&id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let id: UserId = id.parse()?;
    // The target id is the ownership fact for user records.
    authz::require(&caller, Action::Update, Some(&id))?;
    body.validate()?;

    let password_verifier = match &body.password {
        Some(password) => Some(services.auth.hash_password(password)?),
        None => None,
    };

    let updated = services
        .store
        .update_user(
            &id,
            UserChanges {
                username: body.username,
                email: body.email,
                password_verifier,
            },
        )
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound("user"),
            other => username_conflict(other),
        })?;

    Ok(Json(UserResponse::from(updated)))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id: UserId = id.parse()?;
    authz::require(&caller, Action::Delete, Some(&id))?;

    services.store.delete_user(&id).await.map_err(|e| match e {
        StoreError::NotFound => ApiError::NotFound("user"),
        other => ApiError::from(other),
    })?;

    tracing::info!(subject_id = %id, "user deleted");
    Ok(Json(serde_json::json!({ "message": "user deleted" })))
}

fn username_conflict(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(_) => ApiError::BadRequest(USERNAME_TAKEN.to_string()),
        other => ApiError::from(other),
    }
}
