use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use super::{
    AppState,
    error::{ApiJson, ApiPath},
};
use crate::{
    core::certificate::{self, CertificateDetail, CertificateUpdate, NewCertificate},
    entities::CertificadoModel,
    errors::Result,
};

/// POST /api/certificados
/// Creates the certificate and links it after its predecessor in one transaction
async fn create_certificado(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewCertificate>,
) -> Result<(StatusCode, Json<CertificadoModel>)> {
    let created = certificate::create_certificate(state.db.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/certificados/{id}
async fn get_certificado(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CertificateDetail>> {
    Ok(Json(certificate::get_certificate(state.db.as_ref(), id).await?))
}

/// PUT /api/certificados/{id}
async fn update_certificado(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CertificateUpdate>,
) -> Result<Json<CertificadoModel>> {
    Ok(Json(
        certificate::update_certificate(state.db.as_ref(), id, payload).await?,
    ))
}

/// DELETE /api/certificados/{id}
async fn delete_certificado(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    certificate::delete_certificate(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/certificados", post(create_certificado))
        .route(
            "/certificados/{id}",
            get(get_certificado)
                .put(update_certificado)
                .delete(delete_certificado),
        )
}
