use std::sync::Arc;

use axum::{extract::Extension, Json};

use crate::app::dto::{LoginRequest, TokenResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = services.auth.login(&body.username, &body.password).await?;
    Ok(Json(TokenResponse::from(token)))
}
