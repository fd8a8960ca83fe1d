//! Item catalog - Items (insumos) and their current prices.
//!
//! The catalog reader returns every item of a category enriched with the price
//! currently in effect; the rest of the module covers item maintenance, paginated
//! listing and first-run seeding from `config.toml`.

use crate::{
    config::catalog::CatalogConfig,
    core::pricing,
    entities::{Item, Precio, item, precio},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{Condition, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MAX_PAGE_SIZE: u64 = 100;

/// An item together with its resolved unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Item id
    pub id: i64,
    /// Item code
    pub codigo: String,
    /// Item name
    pub nombre: String,
    /// Unit of measure
    pub unidad: String,
    /// Category (rubro)
    pub categoria: String,
    /// Unit price in effect at the reference date (zero if none)
    pub precio: f64,
    /// Effective date of `precio`
    pub fecha_precio: Option<NaiveDate>,
}

impl CatalogItem {
    /// Combines an item row with the price resolved from its history.
    #[must_use]
    pub fn from_history(
        item: item::Model,
        history: &[precio::Model],
        reference: Option<NaiveDate>,
    ) -> Self {
        let resolved = pricing::resolve_price(item.id, history, reference);
        Self {
            id: item.id,
            codigo: item.codigo,
            nombre: item.nombre,
            unidad: item.unidad,
            categoria: item.categoria,
            precio: resolved.precio,
            fecha_precio: resolved.fecha,
        }
    }
}

/// An item with its full price history, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct ItemWithPrices {
    /// The item row
    #[serde(flatten)]
    pub item: item::Model,
    /// Price history, newest first
    pub precios: Vec<precio::Model>,
}

/// Fields required to create an item.
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    /// Unique item code
    pub codigo: String,
    /// Display name
    pub nombre: String,
    /// Unit of measure
    pub unidad: String,
    /// Category (rubro)
    pub categoria: String,
}

/// Partial item update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemUpdate {
    /// New item code
    pub codigo: Option<String>,
    /// New display name
    pub nombre: Option<String>,
    /// New unit of measure
    pub unidad: Option<String>,
    /// New category
    pub categoria: Option<String>,
}

/// Paging and search parameters for [`list_items`].
#[derive(Debug, Clone, Deserialize)]
pub struct ItemQuery {
    /// Zero-based page index
    #[serde(default)]
    pub page: u64,
    /// Page size, 1..=100
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Case-insensitive match against name, category or unit
    #[serde(default)]
    pub search: Option<String>,
}

const fn default_limit() -> u64 {
    10
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            page: 0,
            limit: default_limit(),
            search: None,
        }
    }
}

/// One page of catalog items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPage {
    /// Items on this page
    pub items: Vec<CatalogItem>,
    /// Items matching the search
    pub total: u64,
    /// Zero-based page index
    pub page: u64,
    /// Page size
    pub limit: u64,
    /// Number of pages
    pub page_count: u64,
    /// Whether a later page has items
    pub has_more: bool,
}

fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("Missing required field: {field}")));
    }
    Ok(trimmed.to_string())
}

fn group_by_item(prices: Vec<precio::Model>) -> HashMap<i64, Vec<precio::Model>> {
    let mut grouped: HashMap<i64, Vec<precio::Model>> = HashMap::new();
    for price in prices {
        grouped.entry(price.item_id).or_default().push(price);
    }
    grouped
}

async fn price_items<C>(
    db: &C,
    items: Vec<item::Model>,
    reference: Option<NaiveDate>,
) -> Result<Vec<CatalogItem>>
where
    C: ConnectionTrait,
{
    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let histories = group_by_item(pricing::get_prices_for_items(db, &ids).await?);

    Ok(items
        .into_iter()
        .map(|item| {
            let history = histories.get(&item.id).map_or(&[][..], Vec::as_slice);
            CatalogItem::from_history(item, history, reference)
        })
        .collect())
}

/// Returns all items tagged with `category`, each with its current price.
///
/// Fails with `Validation` when the category is absent or blank.
pub async fn read_catalog(db: &DatabaseConnection, category: Option<&str>) -> Result<Vec<CatalogItem>> {
    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::validation("Missing required field: category"))?;

    let items = Item::find()
        .filter(item::Column::Categoria.eq(category))
        .order_by_asc(item::Column::Nombre)
        .order_by_asc(item::Column::Id)
        .all(db)
        .await?;

    price_items(db, items, None).await
}

/// Loads the given items priced at `reference`, keyed by id.
///
/// Ids that do not exist are simply absent from the map.
pub async fn get_priced_items<C>(
    db: &C,
    item_ids: &[i64],
    reference: Option<NaiveDate>,
) -> Result<HashMap<i64, CatalogItem>>
where
    C: ConnectionTrait,
{
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let items = Item::find()
        .filter(item::Column::Id.is_in(item_ids.iter().copied()))
        .all(db)
        .await?;

    Ok(price_items(db, items, reference)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect())
}

/// Lists items page by page, newest first, each with its current price.
pub async fn list_items(db: &DatabaseConnection, query: &ItemQuery) -> Result<ItemPage> {
    if query.limit == 0 || query.limit > MAX_PAGE_SIZE {
        return Err(Error::validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let offset = query
        .page
        .checked_mul(query.limit)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| Error::validation(format!("page {} is out of range", query.page)))?;

    let mut select = Item::find();
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(item::Column::Nombre.contains(search))
                .add(item::Column::Categoria.contains(search))
                .add(item::Column::Unidad.contains(search)),
        );
    }

    let paginator = select
        .order_by_desc(item::Column::CreatedAt)
        .order_by_desc(item::Column::Id)
        .paginate(db, query.limit);

    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(query.page).await?;
    let items = price_items(db, items, None).await?;

    Ok(ItemPage {
        items,
        total,
        page: query.page,
        limit: query.limit,
        page_count: total.div_ceil(query.limit),
        has_more: offset.saturating_add(query.limit) < total,
    })
}

/// Retrieves an item with its full price history.
pub async fn get_item(db: &DatabaseConnection, item_id: i64) -> Result<ItemWithPrices> {
    let item = Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Item", item_id))?;
    let precios = pricing::get_price_history(db, item_id).await?;
    Ok(ItemWithPrices { item, precios })
}

/// Creates a new catalog item after validating that every field is present.
pub async fn create_item(db: &DatabaseConnection, new_item: NewItem) -> Result<item::Model> {
    let model = item::ActiveModel {
        codigo: Set(required(&new_item.codigo, "codigo")?),
        nombre: Set(required(&new_item.nombre, "nombre")?),
        unidad: Set(required(&new_item.unidad, "unidad")?),
        categoria: Set(required(&new_item.categoria, "categoria")?),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let inserted = model.insert(db).await?;
    tracing::info!("Created item {} ({})", inserted.id, inserted.codigo);
    Ok(inserted)
}

/// Applies a partial update to an item. Blank values are rejected.
pub async fn update_item(
    db: &DatabaseConnection,
    item_id: i64,
    update: ItemUpdate,
) -> Result<item::Model> {
    let existing = Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Item", item_id))?;

    let mut model: item::ActiveModel = existing.into();
    if let Some(codigo) = update.codigo {
        model.codigo = Set(required(&codigo, "codigo")?);
    }
    if let Some(nombre) = update.nombre {
        model.nombre = Set(required(&nombre, "nombre")?);
    }
    if let Some(unidad) = update.unidad {
        model.unidad = Set(required(&unidad, "unidad")?);
    }
    if let Some(categoria) = update.categoria {
        model.categoria = Set(required(&categoria, "categoria")?);
    }

    model.update(db).await.map_err(Into::into)
}

/// Deletes an item together with its price history.
///
/// Returns the deleted item so callers can invalidate anything keyed by its category.
pub async fn delete_item(db: &DatabaseConnection, item_id: i64) -> Result<item::Model> {
    let txn = db.begin().await?;

    let existing = Item::find_by_id(item_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Item", item_id))?;

    Precio::delete_many()
        .filter(precio::Column::ItemId.eq(item_id))
        .exec(&txn)
        .await?;
    Item::delete_by_id(item_id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Deleted item {} and its price history", item_id);
    Ok(existing)
}

/// Seeds the catalog from configuration when the items table is empty.
///
/// Returns the number of items inserted (zero when the catalog already had rows).
pub async fn seed_catalog(db: &DatabaseConnection, config: &CatalogConfig) -> Result<usize> {
    if Item::find().count(db).await? > 0 {
        tracing::debug!("Catalog already populated, skipping seed");
        return Ok(0);
    }

    let today = Utc::now().date_naive();
    let txn = db.begin().await?;

    for seed in &config.items {
        let inserted = item::ActiveModel {
            codigo: Set(required(&seed.codigo, "codigo")?),
            nombre: Set(required(&seed.nombre, "nombre")?),
            unidad: Set(required(&seed.unidad, "unidad")?),
            categoria: Set(required(&seed.categoria, "categoria")?),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let Some(amount) = seed.precio {
            if !amount.is_finite() || amount < 0.0 {
                return Err(Error::InvalidAmount { amount });
            }
            precio::ActiveModel {
                item_id: Set(inserted.id),
                precio: Set(amount),
                fecha: Set(seed.fecha.unwrap_or(today)),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    txn.commit().await?;
    tracing::info!("Seeded catalog with {} items", config.items.len());
    Ok(config.items.len())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::config::catalog::ItemSeed;
    use crate::core::pricing::add_price;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_read_catalog_requires_category() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = read_catalog(&db, None).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = read_catalog(&db, Some("   ")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_read_catalog_returns_latest_price_per_item_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let cement = create_test_item(&db, "Cemento", "materiales").await?;
        let sand = create_test_item(&db, "Arena", "materiales").await?;
        let labour = create_test_item(&db, "Oficial", "jornales").await?;

        add_price(&db, cement.id, 100.0, date(2024, 1, 1)).await?;
        add_price(&db, cement.id, 150.0, date(2024, 3, 1)).await?;
        add_price(&db, labour.id, 40.0, date(2024, 1, 1)).await?;

        let catalog = read_catalog(&db, Some("materiales")).await?;
        assert_eq!(catalog.len(), 2);

        // Ordered by name
        assert_eq!(catalog[0].id, sand.id);
        assert_eq!(catalog[0].precio, 0.0);
        assert!(catalog[0].fecha_precio.is_none());

        assert_eq!(catalog[1].id, cement.id);
        assert_eq!(catalog[1].precio, 150.0);
        assert_eq!(catalog[1].fecha_precio, Some(date(2024, 3, 1)));

        Ok(())
    }

    #[tokio::test]
    async fn test_read_catalog_unknown_category_is_empty() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_item(&db, "Cemento", "materiales").await?;
        assert!(read_catalog(&db, Some("indices")).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_get_priced_items_uses_reference_date() -> Result<()> {
        let db = setup_test_db().await?;
        let cement = create_test_item(&db, "Cemento", "materiales").await?;
        add_price(&db, cement.id, 100.0, date(2024, 1, 1)).await?;
        add_price(&db, cement.id, 150.0, date(2024, 3, 1)).await?;

        let priced = get_priced_items(&db, &[cement.id, 999], Some(date(2024, 2, 1))).await?;
        assert_eq!(priced.len(), 1);
        assert_eq!(priced[&cement.id].precio, 100.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_item_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_item(
            &db,
            NewItem {
                codigo: "X".to_string(),
                nombre: "  ".to_string(),
                unidad: "m2".to_string(),
                categoria: "materiales".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { message }) if message.contains("nombre")));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_items_paginates_and_searches_integration() -> Result<()> {
        let db = setup_test_db().await?;
        for name in ["Cemento", "Cal", "Arena", "Ladrillo", "Oficial"] {
            create_test_item(&db, name, "materiales").await?;
        }

        let first = list_items(
            &db,
            &ItemQuery {
                page: 0,
                limit: 2,
                search: None,
            },
        )
        .await?;
        assert_eq!(first.total, 5);
        assert_eq!(first.page_count, 3);
        assert_eq!(first.items.len(), 2);
        assert!(first.has_more);
        // Newest first
        assert_eq!(first.items[0].nombre, "Oficial");

        let last = list_items(
            &db,
            &ItemQuery {
                page: 2,
                limit: 2,
                search: None,
            },
        )
        .await?;
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);

        let searched = list_items(
            &db,
            &ItemQuery {
                search: Some("ce".to_string()),
                ..ItemQuery::default()
            },
        )
        .await?;
        assert_eq!(searched.total, 1);
        assert_eq!(searched.items[0].nombre, "Cemento");

        let result = list_items(
            &db,
            &ItemQuery {
                limit: 0,
                ..ItemQuery::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = list_items(
            &db,
            &ItemQuery {
                page: u64::MAX,
                limit: 10,
                search: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        // Far past the end is an empty page, not an error
        let beyond = list_items(
            &db,
            &ItemQuery {
                page: 1_000_000,
                limit: 2,
                search: None,
            },
        )
        .await?;
        assert!(beyond.items.is_empty());
        assert!(!beyond.has_more);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_item_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let item = create_test_item(&db, "Cemento", "materiales").await?;
        add_price(&db, item.id, 100.0, date(2024, 1, 1)).await?;

        let updated = update_item(
            &db,
            item.id,
            ItemUpdate {
                unidad: Some("bolsa".to_string()),
                ..ItemUpdate::default()
            },
        )
        .await?;
        assert_eq!(updated.unidad, "bolsa");
        assert_eq!(updated.nombre, "Cemento");

        let fetched = get_item(&db, item.id).await?;
        assert_eq!(fetched.precios.len(), 1);

        delete_item(&db, item.id).await?;
        assert!(matches!(
            get_item(&db, item.id).await,
            Err(Error::NotFound { .. })
        ));
        assert_eq!(Precio::find().count(&db).await?, 0);

        assert!(matches!(
            delete_item(&db, item.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_catalog_only_runs_once() -> Result<()> {
        let db = setup_test_db().await?;
        let config = CatalogConfig {
            items: vec![ItemSeed {
                codigo: "HOR-001".to_string(),
                nombre: "Hormigón H21".to_string(),
                unidad: "m3".to_string(),
                categoria: "materiales".to_string(),
                precio: Some(85000.0),
                fecha: Some(date(2024, 1, 1)),
            }],
        };

        assert_eq!(seed_catalog(&db, &config).await?, 1);
        assert_eq!(seed_catalog(&db, &config).await?, 0);

        let catalog = read_catalog(&db, Some("materiales")).await?;
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].precio, 85000.0);
        Ok(())
    }
}
