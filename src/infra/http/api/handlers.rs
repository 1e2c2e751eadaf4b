//! Handlers for the `/api` resources.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use catalog_api_types::{ItemListParams, TOTAL_COUNT_HEADER};
use serde_json::Value;

use crate::application::error::ErrorReport;
use crate::application::items::ItemQuery;
use crate::application::pagination::PageRequest;
use crate::domain::items::ItemId;

use super::error::ApiError;
use super::state::ApiState;

pub async fn list_items(
    State(state): State<ApiState>,
    query: Result<Query<ItemListParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query?;
    let page = PageRequest::from_params(
        params.limit.as_deref(),
        params.page.as_deref(),
        state.default_page_size,
    )?;

    let result = state
        .items
        .list(&ItemQuery {
            search: params.q,
            page,
        })
        .await?;

    let mut response = Json(result.items).into_response();
    response.headers_mut().insert(
        TOTAL_COUNT_HEADER,
        HeaderValue::from(result.total as u64),
    );
    Ok(response)
}

pub async fn get_item(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_item_id(&raw_id)?;
    let item = state.items.get(id).await?;
    Ok(Json(item))
}

pub async fn create_item(
    State(state): State<ApiState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let item = state.items.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_stats(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.stats.get().ok_or_else(ApiError::stats_unavailable)?;
    Ok(Json(snapshot.as_ref().clone()))
}

pub async fn health(State(state): State<ApiState>) -> Response {
    match state.repo.load_items().await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::api::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

fn parse_item_id(raw: &str) -> Result<ItemId, ApiError> {
    raw.trim()
        .parse::<ItemId>()
        .map_err(|_| ApiError::bad_request(format!("\"id\" must be a number, got `{raw}`")))
}
