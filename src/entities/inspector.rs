//! Inspector entity - Site inspectors assigned to obras.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inspector database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inspectores")]
pub struct Model {
    /// Unique identifier for the inspector
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Full name
    pub nombre: String,
    /// Contact address
    pub email: Option<String>,
    /// When the inspector was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Inspector and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One inspector can be assigned to many obras
    #[sea_orm(has_many = "super::obra::Entity")]
    Obras,
}

impl Related<super::obra::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Obras.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
