//! Item catalog routes: maintenance, price history and the per-category
//! catalog reader. Any write that can change a catalog listing drops every
//! cached `catalog:*` entry.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::{
    AppState,
    error::{ApiJson, ApiPath, ApiQuery},
};
use crate::{
    cache::get_or_compute,
    core::{
        catalog::{self, CatalogItem, ItemPage, ItemQuery, ItemUpdate, ItemWithPrices, NewItem},
        pricing::{self, ResolvedPrice},
    },
    entities::{ItemModel, PrecioModel},
    errors::Result,
};

const CATALOG_PREFIX: &str = "catalog:";

#[derive(Debug, Deserialize)]
struct CatalogQuery {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceQuery {
    fecha: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct NewPrice {
    precio: f64,
    /// Effective date; today when absent
    fecha: Option<NaiveDate>,
}

async fn invalidate_catalog(state: &AppState) {
    state.cache.invalidate_prefix(CATALOG_PREFIX).await;
}

/// GET /api/items?page=&limit=&search=
async fn list_items(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ItemQuery>,
) -> Result<Json<ItemPage>> {
    Ok(Json(catalog::list_items(state.db.as_ref(), &query).await?))
}

/// POST /api/items
async fn create_item(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewItem>,
) -> Result<(StatusCode, Json<ItemModel>)> {
    let created = catalog::create_item(state.db.as_ref(), payload).await?;
    invalidate_catalog(&state).await;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/items/catalog?category=
async fn read_catalog(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<Json<Vec<CatalogItem>>> {
    let category = query.category.unwrap_or_default();
    let key = format!("{CATALOG_PREFIX}{}", category.trim());
    let items = get_or_compute(state.cache.as_ref(), &key, state.cache_ttl, || {
        catalog::read_catalog(state.db.as_ref(), Some(&category))
    })
    .await?;
    Ok(Json(items))
}

/// GET /api/items/{id}
async fn get_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ItemWithPrices>> {
    Ok(Json(catalog::get_item(state.db.as_ref(), id).await?))
}

/// PUT /api/items/{id}
async fn update_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ItemUpdate>,
) -> Result<Json<ItemModel>> {
    let updated = catalog::update_item(state.db.as_ref(), id, payload).await?;
    invalidate_catalog(&state).await;
    Ok(Json(updated))
}

/// DELETE /api/items/{id}
async fn delete_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    catalog::delete_item(state.db.as_ref(), id).await?;
    invalidate_catalog(&state).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/items/{id}/precios
async fn list_prices(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<PrecioModel>>> {
    Ok(Json(pricing::get_price_history(state.db.as_ref(), id).await?))
}

/// POST /api/items/{id}/precios
async fn add_price(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<NewPrice>,
) -> Result<(StatusCode, Json<PrecioModel>)> {
    let fecha = payload.fecha.unwrap_or_else(|| Utc::now().date_naive());
    let created = pricing::add_price(state.db.as_ref(), id, payload.precio, fecha).await?;
    invalidate_catalog(&state).await;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/items/{id}/precio?fecha=
async fn resolve_price(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<PriceQuery>,
) -> Result<Json<ResolvedPrice>> {
    Ok(Json(
        pricing::resolve_item_price(state.db.as_ref(), id, query.fecha).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/catalog", get(read_catalog))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/items/{id}/precios", get(list_prices).post(add_price))
        .route("/items/{id}/precio", get(resolve_price))
}
