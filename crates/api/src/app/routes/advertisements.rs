use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use classifieds_auth::{Action, AuthError};
use classifieds_core::{AdvertisementId, UserId};
use classifieds_infra::{AdvertisementChanges, AdvertisementFilter, NewAdvertisement, StoreError};

use crate::app::dto::{
    AdvertisementResponse, CreateAdvertisementRequest, SearchQuery, UpdateAdvertisementRequest,
};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(search_advertisements).post(create_advertisement))
        .route(
            "/:id",
            get(get_advertisement)
                .patch(update_advertisement)
                .delete(delete_advertisement),
        )
}

pub async fn create_advertisement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<CreateAdvertisementRequest>,
) -> Result<Response, ApiError> {
    authz::require(&caller, Action::Create, None)?;
    let author_id = *caller
        .actor()
        .ok_or(AuthError::Unauthenticated)?
        .subject_id();
    body.validate()?;

    let created = services
        .store
        .create_advertisement(NewAdvertisement {
            title: body.title,
            description: body.description,
            price: body.price,
            author_id,
        })
        .await?;

    tracing::info!(advertisement_id = %created.id, author_id = %author_id, "advertisement created");
    Ok((StatusCode::CREATED, Json(AdvertisementResponse::from(created))).into_response())
}

pub async fn get_advertisement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Json<AdvertisementResponse>, ApiError> {
    let id: AdvertisementId = id.parse()?;
    authz::require(&caller, Action::Read, None)?;

    let ad = services
        .store
        .get_advertisement(&id)
        .await?
        .ok_or(ApiError::NotFound("advertisement"))?;
    Ok(Json(AdvertisementResponse::from(ad)))
}

pub async fn search_advertisements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<AdvertisementResponse>>, ApiError> {
    authz::require(&caller, Action::Read, None)?;

    let filter = AdvertisementFilter::from(query);
    let ads = services.store.search_advertisements(&filter).await?;
    Ok(Json(ads.into_iter().map(AdvertisementResponse::from).collect()))
}

pub async fn update_advertisement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAdvertisementRequest>,
) -> Result<Json<AdvertisementResponse>, ApiError> {
    let id: AdvertisementId = id.parse()?;
    let owner = owner_of(&services, &id).await?;
    authz::require(&caller, Action::Update, Some(&owner))?;
    body.validate()?;

    let updated = services
        .store
        .update_advertisement(
            &id,
            AdvertisementChanges {
                title: body.title,
                description: body.description,
                price: body.price,
            },
        )
        .await
        .map_err(not_found)?;

    Ok(Json(AdvertisementResponse::from(updated)))
}

pub async fn delete_advertisement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id: AdvertisementId = id.parse()?;
    let owner = owner_of(&services, &id).await?;
    authz::require(&caller, Action::Delete, Some(&owner))?;

    services
        .store
        .delete_advertisement(&id)
        .await
        .map_err(not_found)?;

    tracing::info!(advertisement_id = %id, "advertisement deleted");
    Ok(Json(serde_json::json!({ "message": "advertisement deleted" })))
}

async fn owner_of(services: &AppServices, id: &AdvertisementId) -> Result<UserId, ApiError> {
    services
        .store
        .advertisement_owner(id)
        .await?
        .ok_or(ApiError::NotFound("advertisement"))
}

fn not_found(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("advertisement"),
        other => ApiError::from(other),
    }
}
