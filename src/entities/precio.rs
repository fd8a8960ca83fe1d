//! Precio entity - One entry of an item's price history.
//!
//! Prices are append-only. The effective price of an item at a date is the
//! row with the latest `fecha` not after that date; rows sharing a `fecha`
//! are ordered by `id`, i.e. insertion order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Precio database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "precios")]
pub struct Model {
    /// Unique identifier, also the insertion-order tie-break
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Item this price belongs to
    pub item_id: i64,
    /// Unit price amount
    pub precio: f64,
    /// Date from which the price is effective
    pub fecha: Date,
    /// When the row was inserted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Precio and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each price belongs to one item; removing the item removes its history
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_delete = "Cascade"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
