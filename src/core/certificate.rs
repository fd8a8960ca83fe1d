//! Monthly certificates (certificados de obra mensuales) and their chain.
//!
//! The certificates of a budget form a doubly linked list in chronological
//! order. Every write that touches a link runs inside one transaction so a
//! certificate is never left pointing at a neighbour that does not point back.

use crate::{
    core::{budget::BudgetSummary, measurement::month_start},
    entities::{Certificado, Medicion, Presupuesto, certificado, medicion},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Request to issue a certificate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCertificate {
    /// Budget being certified
    pub presupuesto_id: i64,
    /// Any day of the certified month
    pub periodo: NaiveDate,
    /// Measurement the certificate is issued from
    #[serde(default)]
    pub medicion_id: Option<i64>,
    /// Explicit predecessor; the chain tail when absent
    #[serde(default)]
    pub certificado_anterior_id: Option<i64>,
    /// Free-form certificate document
    #[serde(default)]
    pub documento: Option<Value>,
}

/// Replacement document for a certificate.
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateUpdate {
    /// New certificate document
    pub documento: Value,
}

/// A certificate with its neighbours and the budget it certifies.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateDetail {
    /// The certificate row
    #[serde(flatten)]
    pub certificado: certificado::Model,
    /// Previous certificate in the chain
    pub anterior: Option<certificado::Model>,
    /// Next certificate in the chain
    pub siguiente: Option<certificado::Model>,
    /// Budget the certificate belongs to
    pub presupuesto: BudgetSummary,
}

async fn find_certificate<C>(db: &C, certificado_id: i64) -> Result<certificado::Model>
where
    C: ConnectionTrait,
{
    Certificado::find_by_id(certificado_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Certificado", certificado_id))
}

/// Picks the certificate the new one will follow.
async fn resolve_predecessor(
    txn: &DatabaseTransaction,
    presupuesto_id: i64,
    periodo: NaiveDate,
    explicit: Option<i64>,
) -> Result<Option<certificado::Model>> {
    let predecessor = match explicit {
        Some(id) => {
            let candidate = find_certificate(txn, id).await?;
            if candidate.presupuesto_id != presupuesto_id {
                return Err(Error::validation(format!(
                    "Certificado {id} does not belong to presupuesto {presupuesto_id}"
                )));
            }
            if candidate.certificado_siguiente_id.is_some() {
                return Err(Error::validation(format!(
                    "Certificado {id} already has a successor"
                )));
            }
            Some(candidate)
        }
        None => {
            Certificado::find()
                .filter(certificado::Column::PresupuestoId.eq(presupuesto_id))
                .filter(certificado::Column::CertificadoSiguienteId.is_null())
                .order_by_desc(certificado::Column::Periodo)
                .one(txn)
                .await?
        }
    };

    if let Some(previous) = &predecessor {
        if previous.periodo >= periodo {
            return Err(Error::validation(format!(
                "Certificado {} covers {} which is not earlier than {}",
                previous.id,
                previous.periodo.format("%Y-%m"),
                periodo.format("%Y-%m")
            )));
        }
    }
    Ok(predecessor)
}

/// Inserts `row` and links it after `predecessor`.
///
/// The link is a conditional update that only succeeds while the predecessor
/// still has no successor. On failure the caller must drop the transaction so
/// the insert is rolled back with it.
async fn insert_linked(
    txn: &DatabaseTransaction,
    mut row: certificado::ActiveModel,
    predecessor: Option<&certificado::Model>,
) -> Result<certificado::Model> {
    row.certificado_anterior_id = Set(predecessor.map(|p| p.id));
    let inserted = row.insert(txn).await?;

    if let Some(previous) = predecessor {
        let linked = Certificado::update_many()
            .col_expr(
                certificado::Column::CertificadoSiguienteId,
                Expr::value(inserted.id),
            )
            .col_expr(certificado::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(certificado::Column::Id.eq(previous.id))
            .filter(certificado::Column::CertificadoSiguienteId.is_null())
            .exec(txn)
            .await?;

        if linked.rows_affected != 1 {
            tracing::warn!(
                "Rejected link of certificado {} after {}: predecessor changed",
                inserted.id,
                previous.id
            );
            return Err(Error::Consistency {
                message: format!("Certificado {} can no longer be linked", previous.id),
            });
        }
    }
    Ok(inserted)
}

/// Issues a certificate and links it into its budget's chain.
///
/// The new certificate and its predecessor's forward link are written in one
/// transaction: both are stored or neither is.
pub async fn create_certificate(
    db: &DatabaseConnection,
    new_certificate: NewCertificate,
) -> Result<certificado::Model> {
    let periodo = month_start(new_certificate.periodo)?;
    let presupuesto_id = new_certificate.presupuesto_id;

    let txn = db.begin().await?;

    Presupuesto::find_by_id(presupuesto_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Presupuesto", presupuesto_id))?;

    if let Some(medicion_id) = new_certificate.medicion_id {
        let measurement = Medicion::find_by_id(medicion_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("Medicion", medicion_id))?;
        if measurement.presupuesto_id != presupuesto_id {
            return Err(Error::validation(format!(
                "Medicion {medicion_id} does not belong to presupuesto {presupuesto_id}"
            )));
        }
    }

    let taken = Certificado::find()
        .filter(certificado::Column::PresupuestoId.eq(presupuesto_id))
        .filter(certificado::Column::Periodo.eq(periodo))
        .one(&txn)
        .await?;
    if taken.is_some() {
        return Err(Error::validation(format!(
            "Presupuesto {presupuesto_id} already has a certificado for {}",
            periodo.format("%Y-%m")
        )));
    }

    let predecessor = resolve_predecessor(
        &txn,
        presupuesto_id,
        periodo,
        new_certificate.certificado_anterior_id,
    )
    .await?;

    let now = Utc::now();
    let row = certificado::ActiveModel {
        presupuesto_id: Set(presupuesto_id),
        medicion_id: Set(new_certificate.medicion_id),
        periodo: Set(periodo),
        documento: Set(new_certificate.documento),
        certificado_siguiente_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let inserted = insert_linked(&txn, row, predecessor.as_ref()).await?;

    txn.commit().await?;
    tracing::info!(
        "Created certificado {} for presupuesto {} ({}) after {:?}",
        inserted.id,
        presupuesto_id,
        periodo.format("%Y-%m"),
        inserted.certificado_anterior_id
    );
    Ok(inserted)
}

/// Retrieves a certificate with its neighbours and budget.
pub async fn get_certificate(
    db: &DatabaseConnection,
    certificado_id: i64,
) -> Result<CertificateDetail> {
    let certificado = find_certificate(db, certificado_id).await?;

    let anterior = match certificado.certificado_anterior_id {
        Some(id) => Certificado::find_by_id(id).one(db).await?,
        None => None,
    };
    let siguiente = match certificado.certificado_siguiente_id {
        Some(id) => Certificado::find_by_id(id).one(db).await?,
        None => None,
    };
    let presupuesto = Presupuesto::find_by_id(certificado.presupuesto_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Presupuesto", certificado.presupuesto_id))?;

    Ok(CertificateDetail {
        certificado,
        anterior,
        siguiente,
        presupuesto: presupuesto.into(),
    })
}

/// Replaces a certificate's document.
pub async fn update_certificate(
    db: &DatabaseConnection,
    certificado_id: i64,
    update: CertificateUpdate,
) -> Result<certificado::Model> {
    let mut model: certificado::ActiveModel = find_certificate(db, certificado_id).await?.into();
    model.documento = Set(Some(update.documento));
    model.updated_at = Set(Utc::now());

    let updated = model.update(db).await?;
    tracing::info!("Updated certificado {}", certificado_id);
    Ok(updated)
}

/// Deletes a certificate and joins its neighbours to each other.
pub async fn delete_certificate(db: &DatabaseConnection, certificado_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let removed = find_certificate(&txn, certificado_id).await?;
    let now = Utc::now();

    if let Some(previous_id) = removed.certificado_anterior_id {
        Certificado::update_many()
            .col_expr(
                certificado::Column::CertificadoSiguienteId,
                Expr::value(removed.certificado_siguiente_id),
            )
            .col_expr(certificado::Column::UpdatedAt, Expr::value(now))
            .filter(certificado::Column::Id.eq(previous_id))
            .exec(&txn)
            .await?;
    }
    if let Some(next_id) = removed.certificado_siguiente_id {
        Certificado::update_many()
            .col_expr(
                certificado::Column::CertificadoAnteriorId,
                Expr::value(removed.certificado_anterior_id),
            )
            .col_expr(certificado::Column::UpdatedAt, Expr::value(now))
            .filter(certificado::Column::Id.eq(next_id))
            .exec(&txn)
            .await?;
    }

    Medicion::update_many()
        .col_expr(
            medicion::Column::CertificadoAnteriorId,
            Expr::value(Option::<i64>::None),
        )
        .filter(medicion::Column::CertificadoAnteriorId.eq(certificado_id))
        .exec(&txn)
        .await?;

    Certificado::delete_by_id(certificado_id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Deleted certificado {}", certificado_id);
    Ok(())
}

/// Lists a budget's certificates in chain order, from the first to the last.
///
/// Fails with `Consistency` when the links do not form one well-formed chain:
/// several heads, a cycle, a dangling link, a successor that does not point
/// back, or certificates unreachable from the head.
pub async fn list_chain(
    db: &DatabaseConnection,
    presupuesto_id: i64,
) -> Result<Vec<certificado::Model>> {
    Presupuesto::find_by_id(presupuesto_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Presupuesto", presupuesto_id))?;

    let rows = Certificado::find()
        .filter(certificado::Column::PresupuestoId.eq(presupuesto_id))
        .order_by_asc(certificado::Column::Periodo)
        .all(db)
        .await?;
    walk_chain(rows)
}

fn walk_chain(rows: Vec<certificado::Model>) -> Result<Vec<certificado::Model>> {
    if rows.is_empty() {
        return Ok(rows);
    }

    let broken = |message: String| Error::Consistency { message };
    let total = rows.len();
    let heads: Vec<i64> = rows
        .iter()
        .filter(|c| c.certificado_anterior_id.is_none())
        .map(|c| c.id)
        .collect();
    let [head] = heads.as_slice() else {
        return Err(broken(format!(
            "Expected one first certificado, found {}",
            heads.len()
        )));
    };

    let mut by_id: HashMap<i64, certificado::Model> = rows.into_iter().map(|c| (c.id, c)).collect();
    let mut visited = HashSet::with_capacity(total);
    let mut chain = Vec::with_capacity(total);
    let mut cursor = Some(*head);
    let mut previous: Option<i64> = None;

    while let Some(id) = cursor {
        if !visited.insert(id) {
            return Err(broken(format!("Certificado chain loops back to {id}")));
        }
        let current = by_id
            .remove(&id)
            .ok_or_else(|| broken(format!("Certificado chain links to missing {id}")))?;
        if current.certificado_anterior_id != previous {
            return Err(broken(format!(
                "Certificado {id} does not point back to {previous:?}"
            )));
        }
        previous = Some(id);
        cursor = current.certificado_siguiente_id;
        chain.push(current);
    }

    if chain.len() != total {
        return Err(broken(format!(
            "{} certificados are not reachable from the first one",
            total - chain.len()
        )));
    }
    Ok(chain)
}
