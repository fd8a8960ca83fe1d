//! Presupuesto entity - A priced, categorized bill of quantities for an obra.
//!
//! `selecciones` stores the caller's ordered item/quantity list and `data`
//! stores the assembled grouped view (see `core::budget::BudgetView`). `total`
//! duplicates the view's grand total for listing without decoding `data`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Presupuesto database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "presupuestos")]
pub struct Model {
    /// Unique identifier for the budget
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning obra
    pub obra_id: i64,
    /// Display name
    pub nombre: String,
    /// Grand total of the assembled view
    pub total: f64,
    /// Reference date used to resolve prices; None means "at creation time"
    pub fecha_precios: Option<Date>,
    /// Ordered selections the view was assembled from
    pub selecciones: Json,
    /// Assembled grouped view
    pub data: Json,
    /// When the budget was created
    pub created_at: DateTimeUtc,
    /// When the budget was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Presupuesto and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each budget belongs to one obra
    #[sea_orm(
        belongs_to = "super::obra::Entity",
        from = "Column::ObraId",
        to = "super::obra::Column::Id"
    )]
    Obra,
    /// One budget has many periodic measurements
    #[sea_orm(has_many = "super::medicion::Entity")]
    Mediciones,
    /// One budget has a chain of monthly certificates
    #[sea_orm(has_many = "super::certificado::Entity")]
    Certificados,
}

impl Related<super::obra::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Obra.def()
    }
}

impl Related<super::medicion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mediciones.def()
    }
}

impl Related<super::certificado::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Certificados.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
