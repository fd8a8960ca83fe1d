//! Item entity - A priced unit of construction material or labour (insumo).
//!
//! Items are reference data. Their cost lives in the append-only `precios`
//! table, so an item row never carries a price of its own.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Catalog code (e.g. "HOR-001")
    pub codigo: String,
    /// Display name
    pub nombre: String,
    /// Unit of measure (e.g. "m3", "hora")
    pub unidad: String,
    /// Category tag; budget lines are grouped by it (rubro)
    pub categoria: String,
    /// When the item was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One item has many historical prices
    #[sea_orm(has_many = "super::precio::Entity")]
    Precios,
}

impl Related<super::precio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Precios.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
