//! Medicion entity - A periodic measurement of completed work against a budget.
//!
//! `data` stores the reconciled view (see `core::measurement::MeasurementView`).
//! The totals and percentages are duplicated into columns for listing.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Medicion database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mediciones")]
pub struct Model {
    /// Unique identifier for the measurement
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Budget being measured
    pub presupuesto_id: i64,
    /// First day of the measured month
    pub periodo: Date,
    /// Reconciled per-line view
    pub data: Json,
    /// Amount completed during this period
    pub total_completado: f64,
    /// `total_completado` as a percentage of the budget grand total
    pub avance_medicion: f64,
    /// Amount completed up to and including this period
    pub total_acumulado: f64,
    /// `total_acumulado` as a percentage of the budget grand total
    pub avance_acumulado: f64,
    /// Certificate of the previous period this measurement follows, if any
    pub certificado_anterior_id: Option<i64>,
    /// When the measurement was created
    pub created_at: DateTimeUtc,
    /// When the measurement was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Medicion and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each measurement belongs to one budget
    #[sea_orm(
        belongs_to = "super::presupuesto::Entity",
        from = "Column::PresupuestoId",
        to = "super::presupuesto::Column::Id",
        on_delete = "Cascade"
    )]
    Presupuesto,
}

impl Related<super::presupuesto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Presupuesto.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
