//! Empresa entity - Contractor companies that can be awarded an obra.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Empresa database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "empresas")]
pub struct Model {
    /// Unique identifier for the company
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Registered company name
    pub nombre: String,
    /// Tax identifier, if known
    pub cuit: Option<String>,
    /// When the company was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Empresa and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One company can be awarded many obras
    #[sea_orm(has_many = "super::obra::Entity")]
    Obras,
}

impl Related<super::obra::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Obras.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
