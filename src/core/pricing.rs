//! Price history and price resolution.
//!
//! Prices are append-only rows in `precios`. The effective price of an item at a
//! reference date is the row with the latest `fecha` not after that date; rows
//! sharing a `fecha` resolve to the one inserted last (highest id). An item with
//! no applicable price resolves to an amount of zero rather than an error.

use crate::{
    entities::{Item, Precio, precio},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// Price of an item as resolved for a reference date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPrice {
    /// Item the price belongs to
    pub item_id: i64,
    /// Unit price, zero when no price applies
    pub precio: f64,
    /// Effective date of the chosen price row
    pub fecha: Option<NaiveDate>,
    /// Id of the chosen price row
    pub precio_id: Option<i64>,
}

/// Picks the price row effective at `reference` from an item's history.
///
/// The slice may be in any order.
#[must_use]
pub fn select_price(prices: &[precio::Model], reference: NaiveDate) -> Option<&precio::Model> {
    prices
        .iter()
        .filter(|p| p.fecha <= reference)
        .max_by_key(|p| (p.fecha, p.id))
}

/// Resolves the unit price effective at `reference`, or today when `None`.
#[must_use]
pub fn resolve_price(item_id: i64, prices: &[precio::Model], reference: Option<NaiveDate>) -> ResolvedPrice {
    let reference = reference.unwrap_or_else(|| Utc::now().date_naive());
    select_price(prices, reference).map_or(
        ResolvedPrice {
            item_id,
            precio: 0.0,
            fecha: None,
            precio_id: None,
        },
        |p| ResolvedPrice {
            item_id,
            precio: p.precio,
            fecha: Some(p.fecha),
            precio_id: Some(p.id),
        },
    )
}

/// Retrieves an item's full price history, newest first.
///
/// Fails with `NotFound` if the item does not exist.
pub async fn get_price_history(db: &DatabaseConnection, item_id: i64) -> Result<Vec<precio::Model>> {
    Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Item", item_id))?;

    Precio::find()
        .filter(precio::Column::ItemId.eq(item_id))
        .order_by_desc(precio::Column::Fecha)
        .order_by_desc(precio::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the price histories of several items at once.
pub async fn get_prices_for_items<C>(db: &C, item_ids: &[i64]) -> Result<Vec<precio::Model>>
where
    C: ConnectionTrait,
{
    if item_ids.is_empty() {
        return Ok(Vec::new());
    }

    Precio::find()
        .filter(precio::Column::ItemId.is_in(item_ids.iter().copied()))
        .order_by_asc(precio::Column::ItemId)
        .order_by_desc(precio::Column::Fecha)
        .order_by_desc(precio::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Appends a new price to an item's history.
///
/// The amount must be finite and non-negative. Existing rows are never touched.
pub async fn add_price(
    db: &DatabaseConnection,
    item_id: i64,
    amount: f64,
    fecha: NaiveDate,
) -> Result<precio::Model> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }

    Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Item", item_id))?;

    let price = precio::ActiveModel {
        item_id: Set(item_id),
        precio: Set(amount),
        fecha: Set(fecha),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let inserted = price.insert(db).await?;
    tracing::info!(
        "Added price {} for item {} effective {}",
        amount,
        item_id,
        fecha
    );
    Ok(inserted)
}

/// Resolves an item's price at `reference` (today when `None`) from the database.
pub async fn resolve_item_price(
    db: &DatabaseConnection,
    item_id: i64,
    reference: Option<NaiveDate>,
) -> Result<ResolvedPrice> {
    let history = get_price_history(db, item_id).await?;
    Ok(resolve_price(item_id, &history, reference))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn price(id: i64, amount: f64, fecha: NaiveDate) -> precio::Model {
        precio::Model {
            id,
            item_id: 1,
            precio: amount,
            fecha,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_resolves_latest_price_not_after_reference() {
        let history = vec![
            price(1, 100.0, date(2024, 1, 1)),
            price(2, 150.0, date(2024, 3, 1)),
        ];

        let february = resolve_price(1, &history, Some(date(2024, 2, 1)));
        assert_eq!(february.precio, 100.0);
        assert_eq!(february.precio_id, Some(1));

        let april = resolve_price(1, &history, Some(date(2024, 4, 1)));
        assert_eq!(april.precio, 150.0);
        assert_eq!(april.fecha, Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_reference_on_effective_date_includes_that_price() {
        let history = vec![
            price(1, 100.0, date(2024, 1, 1)),
            price(2, 150.0, date(2024, 3, 1)),
        ];
        assert_eq!(resolve_price(1, &history, Some(date(2024, 3, 1))).precio, 150.0);
    }

    #[test]
    fn test_missing_history_resolves_to_zero() {
        let resolved = resolve_price(7, &[], Some(date(2024, 2, 1)));
        assert_eq!(resolved.precio, 0.0);
        assert_eq!(resolved.item_id, 7);
        assert!(resolved.precio_id.is_none());

        // Every price is in the future
        let history = vec![price(1, 100.0, date(2030, 1, 1))];
        assert_eq!(resolve_price(1, &history, Some(date(2024, 2, 1))).precio, 0.0);
    }

    #[test]
    fn test_same_date_resolves_to_last_inserted() {
        let history = vec![
            price(5, 120.0, date(2024, 1, 1)),
            price(3, 100.0, date(2024, 1, 1)),
            price(9, 130.0, date(2024, 1, 1)),
        ];
        let resolved = resolve_price(1, &history, Some(date(2024, 6, 1)));
        assert_eq!(resolved.precio, 130.0);
        assert_eq!(resolved.precio_id, Some(9));
    }

    #[tokio::test]
    async fn test_add_price_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = add_price(&db, 1, -5.0, date(2024, 1, 1)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: -5.0 })));

        let result = add_price(&db, 1, f64::NAN, date(2024, 1, 1)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_price_unknown_item() -> Result<()> {
        let db = setup_test_db().await?;
        let result = add_price(&db, 999, 10.0, date(2024, 1, 1)).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "Item", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_price_history_is_newest_first_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let item = create_test_item(&db, "HOR-001", "materiales").await?;

        add_price(&db, item.id, 100.0, date(2024, 1, 1)).await?;
        add_price(&db, item.id, 150.0, date(2024, 3, 1)).await?;
        add_price(&db, item.id, 120.0, date(2024, 2, 1)).await?;

        let history = get_price_history(&db, item.id).await?;
        let amounts: Vec<f64> = history.iter().map(|p| p.precio).collect();
        assert_eq!(amounts, vec![150.0, 120.0, 100.0]);

        let resolved = resolve_item_price(&db, item.id, Some(date(2024, 2, 15))).await?;
        assert_eq!(resolved.precio, 120.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_prices_for_items_filters_by_item_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_item(&db, "A", "materiales").await?;
        let b = create_test_item(&db, "B", "materiales").await?;
        let c = create_test_item(&db, "C", "materiales").await?;

        add_price(&db, a.id, 10.0, date(2024, 1, 1)).await?;
        add_price(&db, b.id, 20.0, date(2024, 1, 1)).await?;
        add_price(&db, c.id, 30.0, date(2024, 1, 1)).await?;

        let prices = get_prices_for_items(&db, &[a.id, c.id]).await?;
        assert_eq!(prices.len(), 2);
        assert!(prices.iter().all(|p| p.item_id != b.id));

        assert!(get_prices_for_items(&db, &[]).await?.is_empty());
        Ok(())
    }
}
