//! Certificado entity - Monthly billing certificate of an obra's budget.
//!
//! Certificates of one budget form a doubly linked chronological chain through
//! `certificado_anterior_id` and `certificado_siguiente_id`. Both links are
//! written by `core::certificate` inside a single transaction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Certificado database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "certificados_obra_mensuales")]
pub struct Model {
    /// Unique identifier for the certificate
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Budget being certified
    pub presupuesto_id: i64,
    /// Measurement the certificate was derived from
    pub medicion_id: Option<i64>,
    /// First day of the certified month
    pub periodo: Date,
    /// Free-form certificate document as edited by the user
    pub documento: Option<Json>,
    /// Previous certificate in the chain
    pub certificado_anterior_id: Option<i64>,
    /// Next certificate in the chain
    pub certificado_siguiente_id: Option<i64>,
    /// When the certificate was created
    pub created_at: DateTimeUtc,
    /// When the certificate was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Certificado and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each certificate belongs to one budget
    #[sea_orm(
        belongs_to = "super::presupuesto::Entity",
        from = "Column::PresupuestoId",
        to = "super::presupuesto::Column::Id",
        on_delete = "Cascade"
    )]
    Presupuesto,
    /// Optional source measurement
    #[sea_orm(
        belongs_to = "super::medicion::Entity",
        from = "Column::MedicionId",
        to = "super::medicion::Column::Id",
        on_delete = "SetNull"
    )]
    Medicion,
}

impl Related<super::presupuesto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Presupuesto.def()
    }
}

impl Related<super::medicion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Medicion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
