use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{
    AppState,
    error::{ApiJson, ApiPath},
};
use crate::{
    core::{
        budget::{self, Budget, BudgetSelection, BudgetUpdate, BudgetView, NewBudget},
        certificate,
    },
    entities::CertificadoModel,
    errors::Result,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewRequest {
    selecciones: Vec<BudgetSelection>,
    #[serde(default)]
    fecha_precios: Option<NaiveDate>,
}

/// POST /api/presupuestos
async fn create_presupuesto(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewBudget>,
) -> Result<(StatusCode, Json<Budget>)> {
    let created = budget::create_budget(state.db.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/presupuestos/preview
/// Assembles the grouped view without storing anything
async fn preview_presupuesto(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PreviewRequest>,
) -> Result<Json<BudgetView>> {
    Ok(Json(
        budget::preview_budget(state.db.as_ref(), &payload.selecciones, payload.fecha_precios).await?,
    ))
}

/// GET /api/presupuestos/{id}
async fn get_presupuesto(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Budget>> {
    Ok(Json(budget::get_budget(state.db.as_ref(), id).await?))
}

/// PUT /api/presupuestos/{id}
async fn update_presupuesto(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<BudgetUpdate>,
) -> Result<Json<Budget>> {
    Ok(Json(budget::update_budget(state.db.as_ref(), id, payload).await?))
}

/// DELETE /api/presupuestos/{id}
async fn delete_presupuesto(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    budget::delete_budget(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/presupuestos/{id}/certificados
/// Certificates in chain order
async fn list_certificados(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<CertificadoModel>>> {
    Ok(Json(certificate::list_chain(state.db.as_ref(), id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/presupuestos", post(create_presupuesto))
        .route("/presupuestos/preview", post(preview_presupuesto))
        .route(
            "/presupuestos/{id}",
            get(get_presupuesto)
                .put(update_presupuesto)
                .delete(delete_presupuesto),
        )
        .route("/presupuestos/{id}/certificados", get(list_certificados))
}
