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
    core::measurement::{self, Measurement, MeasurementSummary, MeasurementUpdate, NewMeasurement},
    errors::Result,
};

/// GET /api/presupuestos/{id}/mediciones
async fn list_mediciones(
    State(state): State<AppState>,
    ApiPath(presupuesto_id): ApiPath<i64>,
) -> Result<Json<Vec<MeasurementSummary>>> {
    Ok(Json(
        measurement::list_measurements(state.db.as_ref(), presupuesto_id).await?,
    ))
}

/// POST /api/presupuestos/{id}/mediciones
async fn create_medicion(
    State(state): State<AppState>,
    ApiPath(presupuesto_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<NewMeasurement>,
) -> Result<(StatusCode, Json<Measurement>)> {
    let created = measurement::create_measurement(state.db.as_ref(), presupuesto_id, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/presupuestos/{id}/mediciones/{medicion_id}
async fn get_medicion(
    State(state): State<AppState>,
    ApiPath((presupuesto_id, medicion_id)): ApiPath<(i64, i64)>,
) -> Result<Json<Measurement>> {
    Ok(Json(
        measurement::get_measurement(state.db.as_ref(), presupuesto_id, medicion_id).await?,
    ))
}

/// PUT /api/presupuestos/{id}/mediciones/{medicion_id}
async fn update_medicion(
    State(state): State<AppState>,
    ApiPath((presupuesto_id, medicion_id)): ApiPath<(i64, i64)>,
    ApiJson(payload): ApiJson<MeasurementUpdate>,
) -> Result<Json<Measurement>> {
    Ok(Json(
        measurement::update_measurement(state.db.as_ref(), presupuesto_id, medicion_id, payload).await?,
    ))
}

/// DELETE /api/presupuestos/{id}/mediciones/{medicion_id}
async fn delete_medicion(
    State(state): State<AppState>,
    ApiPath((presupuesto_id, medicion_id)): ApiPath<(i64, i64)>,
) -> Result<StatusCode> {
    measurement::delete_measurement(state.db.as_ref(), presupuesto_id, medicion_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/presupuestos/{id}/mediciones",
            get(list_mediciones).post(create_medicion),
        )
        .route(
            "/presupuestos/{id}/mediciones/{medicion_id}",
            get(get_medicion)
                .put(update_medicion)
                .delete(delete_medicion),
        )
}
