//! Budget (presupuesto) assembly and persistence.
//!
//! [`assemble_budget`] turns an ordered list of item selections into the grouped
//! view shown to users and stored with the budget: one group per rubro in
//! first-seen order, caller order kept within each group, with line totals, a
//! running accumulated total and each line's share of the grand total. It is a
//! pure function, so assembling the same input twice yields identical output.

use crate::{
    core::catalog::{self, CatalogItem},
    entities::{Certificado, Medicion, Obra, Presupuesto, certificado, medicion, presupuesto},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One requested budget row: an item and the quantity to budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSelection {
    /// Item to budget
    pub item_id: i64,
    /// Quantity to budget, in the item's unit
    pub quantity: f64,
}

/// A priced budget row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLine {
    /// Budgeted item
    pub item_id: i64,
    /// Item code
    pub codigo: String,
    /// Item name
    pub nombre: String,
    /// Unit of measure
    pub unidad: String,
    /// Group this line belongs to (the item's category)
    pub rubro: String,
    /// Budgeted quantity
    pub quantity: f64,
    /// Unit price frozen at assembly time
    pub unit_price: f64,
    /// `quantity × unit_price`
    pub line_total: f64,
    /// Running total up to and including this line, across all groups
    pub accumulated: f64,
    /// `line_total / grand_total`, zero when the grand total is zero
    pub percentage: f64,
}

/// All lines of one rubro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetGroup {
    /// Category shared by every line of the group
    pub rubro: String,
    /// Lines in selection order
    pub lines: Vec<BudgetLine>,
    /// Sum of the group's line totals
    pub subtotal: f64,
    /// `subtotal / grand_total`, zero when the grand total is zero
    pub percentage: f64,
}

/// The grouped, priced view of a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetView {
    /// Groups in order of first appearance
    pub groups: Vec<BudgetGroup>,
    /// Sum of every line total
    pub grand_total: f64,
}

impl BudgetView {
    /// Iterates every line in display order.
    pub fn lines(&self) -> impl Iterator<Item = &BudgetLine> {
        self.groups.iter().flat_map(|g| g.lines.iter())
    }

    /// Finds the line budgeting `item_id`.
    #[must_use]
    pub fn line(&self, item_id: i64) -> Option<&BudgetLine> {
        self.lines().find(|l| l.item_id == item_id)
    }

    /// Selections in display order, as needed to reassemble this view.
    #[must_use]
    pub fn selections(&self) -> Vec<BudgetSelection> {
        self.lines()
            .map(|l| BudgetSelection {
                item_id: l.item_id,
                quantity: l.quantity,
            })
            .collect()
    }

    /// The catalog as it was when this view was assembled (frozen prices).
    #[must_use]
    pub fn price_snapshot(&self) -> HashMap<i64, CatalogItem> {
        self.lines()
            .map(|l| {
                (
                    l.item_id,
                    CatalogItem {
                        id: l.item_id,
                        codigo: l.codigo.clone(),
                        nombre: l.nombre.clone(),
                        unidad: l.unidad.clone(),
                        categoria: l.rubro.clone(),
                        precio: l.unit_price,
                        fecha_precio: None,
                    },
                )
            })
            .collect()
    }
}

fn share(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole } else { 0.0 }
}

/// Builds the grouped budget view from ordered selections and a priced catalog.
///
/// # Errors
/// - `InvalidAmount` if a quantity is negative or not finite
/// - `Validation` if an item is selected more than once
/// - `NotFound` listing every selected item absent from `catalog`
pub fn assemble_budget(
    selections: &[BudgetSelection],
    catalog: &HashMap<i64, CatalogItem>,
) -> Result<BudgetView> {
    let mut seen = HashSet::new();
    let mut unknown = Vec::new();
    for selection in selections {
        if !selection.quantity.is_finite() || selection.quantity < 0.0 {
            return Err(Error::InvalidAmount {
                amount: selection.quantity,
            });
        }
        if !seen.insert(selection.item_id) {
            return Err(Error::validation(format!(
                "Item {} is selected more than once",
                selection.item_id
            )));
        }
        if !catalog.contains_key(&selection.item_id) {
            unknown.push(selection.item_id.to_string());
        }
    }
    if !unknown.is_empty() {
        return Err(Error::NotFound {
            entity: "Item",
            reference: unknown.join(", "),
        });
    }

    // Group in first-seen rubro order, keeping caller order inside each group.
    let mut groups: Vec<(String, Vec<(&BudgetSelection, &CatalogItem)>)> = Vec::new();
    let mut group_index: HashMap<&str, usize> = HashMap::new();
    for selection in selections {
        let item = &catalog[&selection.item_id];
        let index = *group_index
            .entry(item.categoria.as_str())
            .or_insert_with(|| {
                groups.push((item.categoria.clone(), Vec::new()));
                groups.len() - 1
            });
        groups[index].1.push((selection, item));
    }

    // Running total in display order; its final value is the grand total.
    let mut accumulated = 0.0;
    let mut grouped_lines = Vec::with_capacity(groups.len());
    for (rubro, members) in groups {
        let mut lines = Vec::with_capacity(members.len());
        let mut subtotal = 0.0;
        for (selection, item) in members {
            let line_total = selection.quantity * item.precio;
            accumulated += line_total;
            subtotal += line_total;
            lines.push(BudgetLine {
                item_id: item.id,
                codigo: item.codigo.clone(),
                nombre: item.nombre.clone(),
                unidad: item.unidad.clone(),
                rubro: rubro.clone(),
                quantity: selection.quantity,
                unit_price: item.precio,
                line_total,
                accumulated,
                percentage: 0.0,
            });
        }
        grouped_lines.push((rubro, lines, subtotal));
    }
    let grand_total = accumulated;

    let groups = grouped_lines
        .into_iter()
        .map(|(rubro, mut lines, subtotal)| {
            for line in &mut lines {
                line.percentage = share(line.line_total, grand_total);
            }
            BudgetGroup {
                rubro,
                lines,
                subtotal,
                percentage: share(subtotal, grand_total),
            }
        })
        .collect();

    Ok(BudgetView {
        groups,
        grand_total,
    })
}

/// Reassembles a stored view from its own frozen prices.
///
/// Used when displaying a stored budget so derived fields are always recomputed
/// from quantities and unit prices.
pub fn regenerate_view(view: &BudgetView) -> Result<BudgetView> {
    assemble_budget(&view.selections(), &view.price_snapshot())
}

/// A persisted budget with its decoded view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// Primary key
    pub id: i64,
    /// Obra the budget belongs to
    pub obra_id: i64,
    /// Display name
    pub nombre: String,
    /// Grand total at assembly time
    pub total: f64,
    /// Date prices were resolved at
    pub fecha_precios: Option<NaiveDate>,
    /// Grouped, priced lines
    pub view: BudgetView,
    /// When the budget was created
    pub created_at: DateTime<Utc>,
    /// When the budget was last changed
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Decodes the stored view of a presupuesto row.
    pub fn from_model(model: presupuesto::Model) -> Result<Self> {
        let view: BudgetView = serde_json::from_value(model.data)?;
        Ok(Self {
            id: model.id,
            obra_id: model.obra_id,
            nombre: model.nombre,
            total: model.total,
            fecha_precios: model.fecha_precios,
            view,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Budget listing entry without the view payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    /// Primary key
    pub id: i64,
    /// Obra the budget belongs to
    pub obra_id: i64,
    /// Display name
    pub nombre: String,
    /// Grand total at assembly time
    pub total: f64,
    /// When the budget was created
    pub created_at: DateTime<Utc>,
    /// When the budget was last changed
    pub updated_at: DateTime<Utc>,
}

impl From<presupuesto::Model> for BudgetSummary {
    fn from(model: presupuesto::Model) -> Self {
        Self {
            id: model.id,
            obra_id: model.obra_id,
            nombre: model.nombre,
            total: model.total,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Request to create a budget.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    /// Obra the budget belongs to
    pub obra_id: i64,
    /// Display name
    pub nombre: String,
    /// Items and quantities to price
    pub selecciones: Vec<BudgetSelection>,
    /// Date prices are resolved at; today when absent
    #[serde(default)]
    pub fecha_precios: Option<NaiveDate>,
}

/// Partial budget update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUpdate {
    /// New display name
    pub nombre: Option<String>,
    /// Replacement selection; reprices the budget
    pub selecciones: Option<Vec<BudgetSelection>>,
    /// New price date; reprices the budget
    pub fecha_precios: Option<NaiveDate>,
}

/// Assembles a budget view against current catalog prices without storing it.
pub async fn preview_budget(
    db: &DatabaseConnection,
    selections: &[BudgetSelection],
    fecha_precios: Option<NaiveDate>,
) -> Result<BudgetView> {
    let ids: Vec<i64> = selections.iter().map(|s| s.item_id).collect();
    let priced = catalog::get_priced_items(db, &ids, fecha_precios).await?;
    assemble_budget(selections, &priced)
}

/// Creates a budget for an obra, resolving prices at `fecha_precios`.
pub async fn create_budget(db: &DatabaseConnection, new_budget: NewBudget) -> Result<Budget> {
    let nombre = new_budget.nombre.trim().to_string();
    if nombre.is_empty() {
        return Err(Error::validation("Missing required field: nombre"));
    }

    Obra::find_by_id(new_budget.obra_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Obra", new_budget.obra_id))?;

    let view = preview_budget(db, &new_budget.selecciones, new_budget.fecha_precios).await?;

    let now = Utc::now();
    let model = presupuesto::ActiveModel {
        obra_id: Set(new_budget.obra_id),
        nombre: Set(nombre),
        total: Set(view.grand_total),
        fecha_precios: Set(new_budget.fecha_precios),
        selecciones: Set(serde_json::to_value(&new_budget.selecciones)?),
        data: Set(serde_json::to_value(&view)?),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let inserted = model.insert(db).await?;
    tracing::info!(
        "Created presupuesto {} for obra {} with total {}",
        inserted.id,
        inserted.obra_id,
        inserted.total
    );
    Budget::from_model(inserted)
}

async fn find_budget_model<C>(db: &C, budget_id: i64) -> Result<presupuesto::Model>
where
    C: ConnectionTrait,
{
    Presupuesto::find_by_id(budget_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Presupuesto", budget_id))
}

/// Loads a budget and its view, reassembled from the stored frozen prices.
pub async fn get_budget<C>(db: &C, budget_id: i64) -> Result<Budget>
where
    C: ConnectionTrait,
{
    let mut budget = Budget::from_model(find_budget_model(db, budget_id).await?)?;
    budget.view = regenerate_view(&budget.view)?;
    Ok(budget)
}

/// Lists an obra's budgets, newest first.
pub async fn list_budgets_for_obra(
    db: &DatabaseConnection,
    obra_id: i64,
) -> Result<Vec<BudgetSummary>> {
    Obra::find_by_id(obra_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Obra", obra_id))?;

    Ok(Presupuesto::find()
        .filter(presupuesto::Column::ObraId.eq(obra_id))
        .order_by_desc(presupuesto::Column::CreatedAt)
        .order_by_desc(presupuesto::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(BudgetSummary::from)
        .collect())
}

/// Renames a budget and/or reassembles it from new selections or a new price date.
///
/// When only the price date changes, the stored selections are re-priced.
pub async fn update_budget(
    db: &DatabaseConnection,
    budget_id: i64,
    update: BudgetUpdate,
) -> Result<Budget> {
    let existing = find_budget_model(db, budget_id).await?;
    let reprice = update.selecciones.is_some() || update.fecha_precios.is_some();

    let fecha_precios = update.fecha_precios.or(existing.fecha_precios);
    let selections: Vec<BudgetSelection> = match update.selecciones {
        Some(selections) => selections,
        None => serde_json::from_value(existing.selecciones.clone())?,
    };

    let mut model: presupuesto::ActiveModel = existing.into();
    if let Some(nombre) = update.nombre {
        let nombre = nombre.trim().to_string();
        if nombre.is_empty() {
            return Err(Error::validation("Missing required field: nombre"));
        }
        model.nombre = Set(nombre);
    }

    if reprice {
        let view = preview_budget(db, &selections, fecha_precios).await?;
        model.total = Set(view.grand_total);
        model.fecha_precios = Set(fecha_precios);
        model.selecciones = Set(serde_json::to_value(&selections)?);
        model.data = Set(serde_json::to_value(&view)?);
    }
    model.updated_at = Set(Utc::now());

    let updated = model.update(db).await?;
    tracing::info!("Updated presupuesto {} (repriced: {})", budget_id, reprice);
    Budget::from_model(updated)
}

/// Deletes a budget with its measurements and certificates.
pub async fn delete_budget(db: &DatabaseConnection, budget_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    find_budget_model(&txn, budget_id).await?;

    Certificado::delete_many()
        .filter(certificado::Column::PresupuestoId.eq(budget_id))
        .exec(&txn)
        .await?;
    Medicion::delete_many()
        .filter(medicion::Column::PresupuestoId.eq(budget_id))
        .exec(&txn)
        .await?;
    Presupuesto::delete_by_id(budget_id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Deleted presupuesto {}", budget_id);
    Ok(())
}
