//! Proyectista entity - Designers responsible for an obra's project documents.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Proyectista database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proyectistas")]
pub struct Model {
    /// Unique identifier for the designer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Full name
    pub nombre: String,
    /// Professional registration number
    pub matricula: Option<String>,
    /// When the designer was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Proyectista and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One designer can be assigned to many obras
    #[sea_orm(has_many = "super::obra::Entity")]
    Obras,
}

impl Related<super::obra::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Obras.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
