use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};

use super::{
    AppState,
    error::{ApiJson, ApiPath},
};
use crate::{
    core::{
        budget::{self, BudgetSummary},
        measurement::{self, MeasurementSummary},
        obra::{self, NewObra, ObraUpdate, ObraWithBudgets},
    },
    entities::obra::Model as ObraModel,
    errors::Result,
};

/// GET /api/obras
async fn list_obras(State(state): State<AppState>) -> Result<Json<Vec<ObraWithBudgets>>> {
    Ok(Json(obra::get_all_obras(state.db.as_ref()).await?))
}

/// POST /api/obras
async fn create_obra(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewObra>,
) -> Result<(StatusCode, Json<ObraModel>)> {
    let created = obra::create_obra(state.db.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/obras/{id}
async fn get_obra(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ObraWithBudgets>> {
    Ok(Json(obra::get_obra_by_id(state.db.as_ref(), id).await?))
}

/// PUT /api/obras/{id}
async fn update_obra(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ObraUpdate>,
) -> Result<Json<ObraModel>> {
    Ok(Json(obra::update_obra(state.db.as_ref(), id, payload).await?))
}

/// DELETE /api/obras/{id}
/// Refused while the obra still has budgets
async fn delete_obra(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    obra::delete_obra(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/obras/{id}/presupuestos
async fn list_presupuestos(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<BudgetSummary>>> {
    Ok(Json(budget::list_budgets_for_obra(state.db.as_ref(), id).await?))
}

/// GET /api/obras/{id}/mediciones
async fn list_mediciones(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<MeasurementSummary>>> {
    Ok(Json(
        measurement::list_measurements_for_obra(state.db.as_ref(), id).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/obras", get(list_obras).post(create_obra))
        .route(
            "/obras/{id}",
            get(get_obra).put(update_obra).delete(delete_obra),
        )
        .route("/obras/{id}/presupuestos", get(list_presupuestos))
        .route("/obras/{id}/mediciones", get(list_mediciones))
}
