//! Obra entity - A construction work, the top-level organizing entity.
//!
//! Every presupuesto belongs to exactly one obra. The contractor, inspector and
//! designer references are optional and cleared if the referenced row is removed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Obra database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "obras")]
pub struct Model {
    /// Unique identifier for the obra
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name of the construction work
    pub nombre: String,
    /// Contracted amount
    pub monto_contrato: Option<f64>,
    /// Contract term as written in the contract (e.g. "180 días")
    pub plazo: Option<String>,
    /// Date the contract was signed
    pub fecha_contrato: Option<Date>,
    /// Date works started
    pub fecha_inicio: Option<Date>,
    /// Date works finished
    pub fecha_fin: Option<Date>,
    /// Awarded contractor
    pub empresa_id: Option<i64>,
    /// Assigned inspector
    pub inspector_id: Option<i64>,
    /// Designer of record
    pub proyectista_id: Option<i64>,
    /// Whether the obra has been inaugurated
    pub inaugurada: bool,
    /// When the obra was created
    pub created_at: DateTimeUtc,
    /// When the obra was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Obra and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One obra has many presupuestos
    #[sea_orm(has_many = "super::presupuesto::Entity")]
    Presupuestos,
    #[sea_orm(
        belongs_to = "super::empresa::Entity",
        from = "Column::EmpresaId",
        to = "super::empresa::Column::Id",
        on_delete = "SetNull"
    )]
    Empresa,
    #[sea_orm(
        belongs_to = "super::inspector::Entity",
        from = "Column::InspectorId",
        to = "super::inspector::Column::Id",
        on_delete = "SetNull"
    )]
    Inspector,
    #[sea_orm(
        belongs_to = "super::proyectista::Entity",
        from = "Column::ProyectistaId",
        to = "super::proyectista::Column::Id",
        on_delete = "SetNull"
    )]
    Proyectista,
}

impl Related<super::presupuesto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Presupuestos.def()
    }
}

impl Related<super::empresa::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Empresa.def()
    }
}

impl Related<super::inspector::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inspector.def()
    }
}

impl Related<super::proyectista::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proyectista.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
