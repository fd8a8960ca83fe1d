//! Obra business logic - construction works and their budgets.
//!
//! An obra owns its presupuestos. Deleting an obra that still has budgets is
//! refused; the budgets have to be removed first.

use crate::{
    core::budget::BudgetSummary,
    entities::{Empresa, Inspector, Obra, Presupuesto, Proyectista, obra, presupuesto},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// An obra together with its budgets.
#[derive(Debug, Clone, Serialize)]
pub struct ObraWithBudgets {
    /// The obra row
    #[serde(flatten)]
    pub obra: obra::Model,
    /// Budgets of the obra
    pub presupuestos: Vec<BudgetSummary>,
}

/// Fields accepted when creating an obra. Only `nombre` is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewObra {
    /// Display name
    #[serde(default)]
    pub nombre: String,
    /// Contract amount
    pub monto_contrato: Option<f64>,
    /// Agreed duration, as written in the contract
    pub plazo: Option<String>,
    /// Contract signing date
    pub fecha_contrato: Option<NaiveDate>,
    /// Start of works
    pub fecha_inicio: Option<NaiveDate>,
    /// Planned end of works
    pub fecha_fin: Option<NaiveDate>,
    /// Contractor company
    pub empresa_id: Option<i64>,
    /// Assigned inspector
    pub inspector_id: Option<i64>,
    /// Project designer
    pub proyectista_id: Option<i64>,
    /// Whether the obra has been inaugurated
    #[serde(default)]
    pub inaugurada: bool,
}

/// Partial obra update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObraUpdate {
    /// New display name
    pub nombre: Option<String>,
    /// New contract amount
    pub monto_contrato: Option<f64>,
    /// New agreed duration
    pub plazo: Option<String>,
    /// New contract signing date
    pub fecha_contrato: Option<NaiveDate>,
    /// New start of works
    pub fecha_inicio: Option<NaiveDate>,
    /// New planned end of works
    pub fecha_fin: Option<NaiveDate>,
    /// New contractor company
    pub empresa_id: Option<i64>,
    /// New inspector
    pub inspector_id: Option<i64>,
    /// New project designer
    pub proyectista_id: Option<i64>,
    /// New inauguration flag
    pub inaugurada: Option<bool>,
}

fn validate_nombre(nombre: &str) -> Result<String> {
    let trimmed = nombre.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Missing required field: nombre"));
    }
    Ok(trimmed.to_string())
}

fn validate_monto(monto: Option<f64>) -> Result<()> {
    match monto {
        Some(amount) if !amount.is_finite() || amount < 0.0 => Err(Error::InvalidAmount { amount }),
        _ => Ok(()),
    }
}

async fn ensure_references(
    db: &DatabaseConnection,
    empresa_id: Option<i64>,
    inspector_id: Option<i64>,
    proyectista_id: Option<i64>,
) -> Result<()> {
    if let Some(id) = empresa_id {
        Empresa::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Empresa", id))?;
    }
    if let Some(id) = inspector_id {
        Inspector::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Inspector", id))?;
    }
    if let Some(id) = proyectista_id {
        Proyectista::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Proyectista", id))?;
    }
    Ok(())
}

/// Lists every obra with its budgets, ordered by name.
pub async fn get_all_obras(db: &DatabaseConnection) -> Result<Vec<ObraWithBudgets>> {
    let rows = Obra::find()
        .order_by_asc(obra::Column::Nombre)
        .order_by_asc(obra::Column::Id)
        .find_with_related(Presupuesto)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(obra, presupuestos)| ObraWithBudgets {
            obra,
            presupuestos: presupuestos.into_iter().map(BudgetSummary::from).collect(),
        })
        .collect())
}

/// Retrieves one obra with its budgets.
pub async fn get_obra_by_id(db: &DatabaseConnection, obra_id: i64) -> Result<ObraWithBudgets> {
    let obra = Obra::find_by_id(obra_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Obra", obra_id))?;

    let presupuestos = obra
        .find_related(Presupuesto)
        .order_by_asc(presupuesto::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(BudgetSummary::from)
        .collect();

    Ok(ObraWithBudgets { obra, presupuestos })
}

/// Creates an obra after validating its name, amount and references.
pub async fn create_obra(db: &DatabaseConnection, new_obra: NewObra) -> Result<obra::Model> {
    let nombre = validate_nombre(&new_obra.nombre)?;
    validate_monto(new_obra.monto_contrato)?;
    ensure_references(
        db,
        new_obra.empresa_id,
        new_obra.inspector_id,
        new_obra.proyectista_id,
    )
    .await?;

    let now = Utc::now();
    let model = obra::ActiveModel {
        nombre: Set(nombre),
        monto_contrato: Set(new_obra.monto_contrato),
        plazo: Set(new_obra.plazo),
        fecha_contrato: Set(new_obra.fecha_contrato),
        fecha_inicio: Set(new_obra.fecha_inicio),
        fecha_fin: Set(new_obra.fecha_fin),
        empresa_id: Set(new_obra.empresa_id),
        inspector_id: Set(new_obra.inspector_id),
        proyectista_id: Set(new_obra.proyectista_id),
        inaugurada: Set(new_obra.inaugurada),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let inserted = model.insert(db).await?;
    tracing::info!("Created obra {} ({})", inserted.id, inserted.nombre);
    Ok(inserted)
}

/// Applies a partial update to an obra.
pub async fn update_obra(
    db: &DatabaseConnection,
    obra_id: i64,
    update: ObraUpdate,
) -> Result<obra::Model> {
    let existing = Obra::find_by_id(obra_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Obra", obra_id))?;

    validate_monto(update.monto_contrato)?;
    ensure_references(
        db,
        update.empresa_id,
        update.inspector_id,
        update.proyectista_id,
    )
    .await?;

    let mut model: obra::ActiveModel = existing.into();
    if let Some(nombre) = update.nombre {
        model.nombre = Set(validate_nombre(&nombre)?);
    }
    if update.monto_contrato.is_some() {
        model.monto_contrato = Set(update.monto_contrato);
    }
    if update.plazo.is_some() {
        model.plazo = Set(update.plazo);
    }
    if update.fecha_contrato.is_some() {
        model.fecha_contrato = Set(update.fecha_contrato);
    }
    if update.fecha_inicio.is_some() {
        model.fecha_inicio = Set(update.fecha_inicio);
    }
    if update.fecha_fin.is_some() {
        model.fecha_fin = Set(update.fecha_fin);
    }
    if update.empresa_id.is_some() {
        model.empresa_id = Set(update.empresa_id);
    }
    if update.inspector_id.is_some() {
        model.inspector_id = Set(update.inspector_id);
    }
    if update.proyectista_id.is_some() {
        model.proyectista_id = Set(update.proyectista_id);
    }
    if let Some(inaugurada) = update.inaugurada {
        model.inaugurada = Set(inaugurada);
    }
    model.updated_at = Set(Utc::now());

    model.update(db).await.map_err(Into::into)
}

/// Deletes an obra. Refused with `Validation` while the obra still has budgets.
pub async fn delete_obra(db: &DatabaseConnection, obra_id: i64) -> Result<()> {
    Obra::find_by_id(obra_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Obra", obra_id))?;

    let budgets = Presupuesto::find()
        .filter(presupuesto::Column::ObraId.eq(obra_id))
        .count(db)
        .await?;
    if budgets > 0 {
        return Err(Error::validation(format!(
            "Obra {obra_id} still has {budgets} presupuesto(s); delete them first"
        )));
    }

    Obra::delete_by_id(obra_id).exec(db).await?;
    tracing::info!("Deleted obra {}", obra_id);
    Ok(())
}
