//! Empresas, inspectores and proyectistas. Listings are served through the
//! read-through cache and invalidated whenever an entry is added.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};

use super::{AppState, error::ApiJson};
use crate::{
    cache::get_or_compute,
    core::directory::{self, NewEmpresa, NewInspector, NewProyectista},
    entities::{EmpresaModel, InspectorModel, ProyectistaModel},
    errors::Result,
};

const EMPRESAS_KEY: &str = "directory:empresas";
const INSPECTORES_KEY: &str = "directory:inspectores";
const PROYECTISTAS_KEY: &str = "directory:proyectistas";

/// GET /api/empresas
async fn list_empresas(State(state): State<AppState>) -> Result<Json<Vec<EmpresaModel>>> {
    let empresas = get_or_compute(state.cache.as_ref(), EMPRESAS_KEY, state.cache_ttl, || {
        directory::list_empresas(state.db.as_ref())
    })
    .await?;
    Ok(Json(empresas))
}

/// POST /api/empresas
async fn create_empresa(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewEmpresa>,
) -> Result<(StatusCode, Json<EmpresaModel>)> {
    let created = directory::create_empresa(state.db.as_ref(), payload).await?;
    state.cache.invalidate_prefix(EMPRESAS_KEY).await;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/inspectores
async fn list_inspectores(State(state): State<AppState>) -> Result<Json<Vec<InspectorModel>>> {
    let inspectores = get_or_compute(
        state.cache.as_ref(),
        INSPECTORES_KEY,
        state.cache_ttl,
        || directory::list_inspectores(state.db.as_ref()),
    )
    .await?;
    Ok(Json(inspectores))
}

/// POST /api/inspectores
async fn create_inspector(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewInspector>,
) -> Result<(StatusCode, Json<InspectorModel>)> {
    let created = directory::create_inspector(state.db.as_ref(), payload).await?;
    state.cache.invalidate_prefix(INSPECTORES_KEY).await;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/proyectistas
async fn list_proyectistas(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProyectistaModel>>> {
    let proyectistas = get_or_compute(
        state.cache.as_ref(),
        PROYECTISTAS_KEY,
        state.cache_ttl,
        || directory::list_proyectistas(state.db.as_ref()),
    )
    .await?;
    Ok(Json(proyectistas))
}

/// POST /api/proyectistas
async fn create_proyectista(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewProyectista>,
) -> Result<(StatusCode, Json<ProyectistaModel>)> {
    let created = directory::create_proyectista(state.db.as_ref(), payload).await?;
    state.cache.invalidate_prefix(PROYECTISTAS_KEY).await;
    Ok((StatusCode::CREATED, Json(created)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/empresas", get(list_empresas).post(create_empresa))
        .route("/inspectores", get(list_inspectores).post(create_inspector))
        .route(
            "/proyectistas",
            get(list_proyectistas).post(create_proyectista),
        )
}
