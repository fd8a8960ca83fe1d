//! Measurement (medición) reconciliation and persistence.
//!
//! A measurement records, per budget line, the quantity completed during one
//! month. [`reconcile`] checks the submission against the budget view and
//! computes the period's completed amount and percentage, carrying forward the
//! quantities accumulated by the previous period's measurement so each line
//! shows previous, present and accumulated progress.

use crate::{
    core::budget::{self, BudgetView},
    entities::{Certificado, Medicion, Obra, Presupuesto, medicion, presupuesto},
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::{JoinType, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Quantity of one budget line completed during the period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEntry {
    /// Budget line the quantity applies to
    pub item_id: i64,
    /// Quantity completed this period
    pub completed_quantity: f64,
}

/// Progress of one budget line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementLine {
    /// Budgeted item
    pub item_id: i64,
    /// Item code
    pub codigo: String,
    /// Item name
    pub nombre: String,
    /// Unit of measure
    pub unidad: String,
    /// Budgeted quantity
    pub quantity: f64,
    /// Unit price frozen in the budget
    pub unit_price: f64,
    /// Budgeted amount of the line
    pub line_total: f64,
    /// Quantity accumulated by the previous measurement (anterior)
    pub previous_quantity: f64,
    /// Quantity completed this period (presente)
    pub completed_quantity: f64,
    /// `previous_quantity + completed_quantity` (acumulado)
    pub accumulated_quantity: f64,
    /// `completed_quantity × unit_price`
    pub completed_amount: f64,
    /// `accumulated_quantity × unit_price`
    pub accumulated_amount: f64,
}

/// Progress of all lines of one rubro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementGroup {
    /// Category shared by every line of the group
    pub rubro: String,
    /// Lines in budget order
    pub lines: Vec<MeasurementLine>,
    /// Amount completed this period
    pub completed_total: f64,
    /// Amount completed so far
    pub accumulated_total: f64,
}

/// Reconciled measurement, mirroring the budget's grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementView {
    /// Groups in budget order
    pub groups: Vec<MeasurementGroup>,
    /// Budget grand total
    pub grand_total: f64,
    /// Amount completed this period
    pub completed_total: f64,
    /// `completed_total / grand_total × 100`, zero when the grand total is zero
    pub completed_percentage: f64,
    /// Amount completed up to and including this period
    pub accumulated_total: f64,
    /// `accumulated_total / grand_total × 100`, zero when the grand total is zero
    pub accumulated_percentage: f64,
}

impl MeasurementView {
    /// Iterates every line in display order.
    pub fn lines(&self) -> impl Iterator<Item = &MeasurementLine> {
        self.groups.iter().flat_map(|g| g.lines.iter())
    }

    /// Finds the line for `item_id`.
    #[must_use]
    pub fn line(&self, item_id: i64) -> Option<&MeasurementLine> {
        self.lines().find(|l| l.item_id == item_id)
    }

    /// The period's submission, as needed to reconcile this view again.
    #[must_use]
    pub fn entries(&self) -> Vec<CompletionEntry> {
        self.lines()
            .filter(|l| l.completed_quantity != 0.0)
            .map(|l| CompletionEntry {
                item_id: l.item_id,
                completed_quantity: l.completed_quantity,
            })
            .collect()
    }
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part * 100.0 / whole } else { 0.0 }
}

/// Reconciles a completion submission against a budget view.
///
/// Lines missing from `entries` completed nothing this period. When `previous`
/// is given its accumulated quantities become this period's starting point.
///
/// # Errors
/// - `InvalidAmount` if a completed quantity is negative or not finite
/// - `Validation` if a line is submitted more than once
/// - `NotFound` listing every submitted item that is not a line of the budget
pub fn reconcile(
    budget: &BudgetView,
    entries: &[CompletionEntry],
    previous: Option<&MeasurementView>,
) -> Result<MeasurementView> {
    let mut completed: HashMap<i64, f64> = HashMap::with_capacity(entries.len());
    let mut unknown = Vec::new();
    let mut seen = HashSet::new();
    for entry in entries {
        if !entry.completed_quantity.is_finite() || entry.completed_quantity < 0.0 {
            return Err(Error::InvalidAmount {
                amount: entry.completed_quantity,
            });
        }
        if !seen.insert(entry.item_id) {
            return Err(Error::validation(format!(
                "Budget line {} is submitted more than once",
                entry.item_id
            )));
        }
        if budget.line(entry.item_id).is_none() {
            unknown.push(entry.item_id.to_string());
        }
        completed.insert(entry.item_id, entry.completed_quantity);
    }
    if !unknown.is_empty() {
        return Err(Error::NotFound {
            entity: "Budget line",
            reference: unknown.join(", "),
        });
    }

    let mut completed_total = 0.0;
    let mut accumulated_total = 0.0;
    let groups = budget
        .groups
        .iter()
        .map(|group| {
            let lines: Vec<MeasurementLine> = group
                .lines
                .iter()
                .map(|line| {
                    let previous_quantity = previous
                        .and_then(|p| p.line(line.item_id))
                        .map_or(0.0, |l| l.accumulated_quantity);
                    let completed_quantity =
                        completed.get(&line.item_id).copied().unwrap_or(0.0);
                    let accumulated_quantity = previous_quantity + completed_quantity;
                    MeasurementLine {
                        item_id: line.item_id,
                        codigo: line.codigo.clone(),
                        nombre: line.nombre.clone(),
                        unidad: line.unidad.clone(),
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                        line_total: line.line_total,
                        previous_quantity,
                        completed_quantity,
                        accumulated_quantity,
                        completed_amount: completed_quantity * line.unit_price,
                        accumulated_amount: accumulated_quantity * line.unit_price,
                    }
                })
                .collect();

            let group_completed: f64 = lines.iter().map(|l| l.completed_amount).sum();
            let group_accumulated: f64 = lines.iter().map(|l| l.accumulated_amount).sum();
            completed_total += group_completed;
            accumulated_total += group_accumulated;

            MeasurementGroup {
                rubro: group.rubro.clone(),
                lines,
                completed_total: group_completed,
                accumulated_total: group_accumulated,
            }
        })
        .collect();

    Ok(MeasurementView {
        groups,
        grand_total: budget.grand_total,
        completed_total,
        completed_percentage: percent_of(completed_total, budget.grand_total),
        accumulated_total,
        accumulated_percentage: percent_of(accumulated_total, budget.grand_total),
    })
}

/// A persisted measurement with its decoded view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// Primary key
    pub id: i64,
    /// Budget being measured
    pub presupuesto_id: i64,
    /// First day of the measured month
    pub periodo: NaiveDate,
    /// Certificate of an earlier period this measurement follows
    pub certificado_anterior_id: Option<i64>,
    /// Reconciled per-line progress
    pub view: MeasurementView,
    /// When the row was created
    pub created_at: DateTime<Utc>,
    /// When the row was last reconciled
    pub updated_at: DateTime<Utc>,
}

impl Measurement {
    /// Decodes the stored view of a medicion row.
    pub fn from_model(model: medicion::Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            presupuesto_id: model.presupuesto_id,
            periodo: model.periodo,
            certificado_anterior_id: model.certificado_anterior_id,
            view: serde_json::from_value(model.data)?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Measurement listing entry without the per-line payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSummary {
    /// Primary key
    pub id: i64,
    /// Budget being measured
    pub presupuesto_id: i64,
    /// First day of the measured month
    pub periodo: NaiveDate,
    /// Amount completed this period
    pub total_completado: f64,
    /// Percentage of the budget completed this period
    pub avance_medicion: f64,
    /// Amount completed up to and including this period
    pub total_acumulado: f64,
    /// Percentage of the budget completed so far
    pub avance_acumulado: f64,
    /// Certificate of an earlier period this measurement follows
    pub certificado_anterior_id: Option<i64>,
}

impl From<medicion::Model> for MeasurementSummary {
    fn from(model: medicion::Model) -> Self {
        Self {
            id: model.id,
            presupuesto_id: model.presupuesto_id,
            periodo: model.periodo,
            total_completado: model.total_completado,
            avance_medicion: model.avance_medicion,
            total_acumulado: model.total_acumulado,
            avance_acumulado: model.avance_acumulado,
            certificado_anterior_id: model.certificado_anterior_id,
        }
    }
}

/// Request to record a period's progress.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeasurement {
    /// Any day of the measured month
    pub periodo: NaiveDate,
    /// Quantities completed this period
    pub entries: Vec<CompletionEntry>,
    /// Certificate of the previous period this measurement follows
    #[serde(default)]
    pub certificado_anterior_id: Option<i64>,
}

/// Replacement submission for an existing measurement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementUpdate {
    /// Quantities completed this period, replacing the stored ones
    pub entries: Vec<CompletionEntry>,
    /// Moves the measurement to another month when present
    #[serde(default)]
    pub periodo: Option<NaiveDate>,
    /// Absent keeps the link, `null` clears it
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub certificado_anterior_id: Option<Option<i64>>,
}

/// Normalizes a date to the first day of its month.
pub fn month_start(date: NaiveDate) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .ok_or_else(|| Error::validation(format!("Invalid periodo: {date}")))
}

async fn ensure_period_free<C>(
    db: &C,
    presupuesto_id: i64,
    periodo: NaiveDate,
    except_id: Option<i64>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = Medicion::find()
        .filter(medicion::Column::PresupuestoId.eq(presupuesto_id))
        .filter(medicion::Column::Periodo.eq(periodo));
    if let Some(id) = except_id {
        query = query.filter(medicion::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::validation(format!(
            "Presupuesto {presupuesto_id} already has a medición for {}",
            periodo.format("%Y-%m")
        )));
    }
    Ok(())
}

/// The linked certificate must belong to the budget and certify an earlier month.
async fn ensure_certificate_precedes<C>(
    db: &C,
    presupuesto_id: i64,
    periodo: NaiveDate,
    certificado_id: Option<i64>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let Some(id) = certificado_id else {
        return Ok(());
    };

    let certificado = Certificado::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Certificado", id))?;
    if certificado.presupuesto_id != presupuesto_id {
        return Err(Error::validation(format!(
            "Certificado {id} does not belong to presupuesto {presupuesto_id}"
        )));
    }
    if certificado.periodo >= periodo {
        return Err(Error::validation(format!(
            "Certificado {id} ({}) is not earlier than {}",
            certificado.periodo.format("%Y-%m"),
            periodo.format("%Y-%m")
        )));
    }
    Ok(())
}

async fn previous_view<C>(
    db: &C,
    presupuesto_id: i64,
    periodo: NaiveDate,
) -> Result<Option<MeasurementView>>
where
    C: ConnectionTrait,
{
    Medicion::find()
        .filter(medicion::Column::PresupuestoId.eq(presupuesto_id))
        .filter(medicion::Column::Periodo.lt(periodo))
        .order_by_desc(medicion::Column::Periodo)
        .one(db)
        .await?
        .map(|m| serde_json::from_value(m.data).map_err(Into::into))
        .transpose()
}

async fn find_in_budget<C>(db: &C, presupuesto_id: i64, medicion_id: i64) -> Result<medicion::Model>
where
    C: ConnectionTrait,
{
    Medicion::find_by_id(medicion_id)
        .filter(medicion::Column::PresupuestoId.eq(presupuesto_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Medicion", medicion_id))
}

fn store_view(model: &mut medicion::ActiveModel, view: &MeasurementView) -> Result<()> {
    model.data = Set(serde_json::to_value(view)?);
    model.total_completado = Set(view.completed_total);
    model.avance_medicion = Set(view.completed_percentage);
    model.total_acumulado = Set(view.accumulated_total);
    model.avance_acumulado = Set(view.accumulated_percentage);
    Ok(())
}

/// Reconciles every measurement after `periodo` again, oldest first, so each
/// one carries forward the accumulated quantities of the one before it.
async fn refresh_later<C>(
    db: &C,
    presupuesto_id: i64,
    budget: &BudgetView,
    periodo: NaiveDate,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let later = Medicion::find()
        .filter(medicion::Column::PresupuestoId.eq(presupuesto_id))
        .filter(medicion::Column::Periodo.gt(periodo))
        .order_by_asc(medicion::Column::Periodo)
        .all(db)
        .await?;
    let Some(first) = later.first() else {
        return Ok(());
    };

    let mut previous = previous_view(db, presupuesto_id, first.periodo).await?;
    let count = later.len();
    for model in later {
        let stored: MeasurementView = serde_json::from_value(model.data.clone())?;
        let view = reconcile(budget, &stored.entries(), previous.as_ref())?;

        let mut active: medicion::ActiveModel = model.into();
        store_view(&mut active, &view)?;
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        previous = Some(view);
    }

    tracing::debug!(
        "Re-reconciled {} mediciones of presupuesto {} after {}",
        count,
        presupuesto_id,
        periodo.format("%Y-%m")
    );
    Ok(())
}

/// Reconciles and stores a new measurement for a budget.
///
/// Measurements of later periods are reconciled again in the same transaction.
pub async fn create_measurement(
    db: &DatabaseConnection,
    presupuesto_id: i64,
    new_measurement: NewMeasurement,
) -> Result<Measurement> {
    let periodo = month_start(new_measurement.periodo)?;
    let txn = db.begin().await?;
    let budget = budget::get_budget(&txn, presupuesto_id).await?;

    ensure_period_free(&txn, presupuesto_id, periodo, None).await?;
    ensure_certificate_precedes(
        &txn,
        presupuesto_id,
        periodo,
        new_measurement.certificado_anterior_id,
    )
    .await?;

    let previous = previous_view(&txn, presupuesto_id, periodo).await?;
    let view = reconcile(&budget.view, &new_measurement.entries, previous.as_ref())?;

    let now = Utc::now();
    let mut model = medicion::ActiveModel {
        presupuesto_id: Set(presupuesto_id),
        periodo: Set(periodo),
        certificado_anterior_id: Set(new_measurement.certificado_anterior_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    store_view(&mut model, &view)?;

    let inserted = model.insert(&txn).await?;
    refresh_later(&txn, presupuesto_id, &budget.view, periodo).await?;
    txn.commit().await?;

    tracing::info!(
        "Created medicion {} for presupuesto {} ({}): {:.2}% this period",
        inserted.id,
        presupuesto_id,
        periodo.format("%Y-%m"),
        inserted.avance_medicion
    );
    Measurement::from_model(inserted)
}

/// Lists a budget's measurements, most recent period first.
pub async fn list_measurements(
    db: &DatabaseConnection,
    presupuesto_id: i64,
) -> Result<Vec<MeasurementSummary>> {
    Presupuesto::find_by_id(presupuesto_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Presupuesto", presupuesto_id))?;

    Ok(Medicion::find()
        .filter(medicion::Column::PresupuestoId.eq(presupuesto_id))
        .order_by_desc(medicion::Column::Periodo)
        .all(db)
        .await?
        .into_iter()
        .map(MeasurementSummary::from)
        .collect())
}

/// Lists the measurements of every budget of an obra, most recent period first.
pub async fn list_measurements_for_obra(
    db: &DatabaseConnection,
    obra_id: i64,
) -> Result<Vec<MeasurementSummary>> {
    Obra::find_by_id(obra_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Obra", obra_id))?;

    Ok(Medicion::find()
        .join(JoinType::InnerJoin, medicion::Relation::Presupuesto.def())
        .filter(presupuesto::Column::ObraId.eq(obra_id))
        .order_by_desc(medicion::Column::Periodo)
        .order_by_asc(medicion::Column::PresupuestoId)
        .all(db)
        .await?
        .into_iter()
        .map(MeasurementSummary::from)
        .collect())
}

/// Retrieves one measurement of a budget.
pub async fn get_measurement(
    db: &DatabaseConnection,
    presupuesto_id: i64,
    medicion_id: i64,
) -> Result<Measurement> {
    Measurement::from_model(find_in_budget(db, presupuesto_id, medicion_id).await?)
}

/// Replaces a measurement's submission and reconciles it again, along with
/// every measurement from the earlier of its old and new periods onwards.
pub async fn update_measurement(
    db: &DatabaseConnection,
    presupuesto_id: i64,
    medicion_id: i64,
    update: MeasurementUpdate,
) -> Result<Measurement> {
    let txn = db.begin().await?;
    let existing = find_in_budget(&txn, presupuesto_id, medicion_id).await?;
    let old_periodo = existing.periodo;
    let periodo = match update.periodo {
        Some(periodo) => month_start(periodo)?,
        None => old_periodo,
    };
    let certificado_anterior_id = update
        .certificado_anterior_id
        .unwrap_or(existing.certificado_anterior_id);

    let budget = budget::get_budget(&txn, presupuesto_id).await?;
    ensure_period_free(&txn, presupuesto_id, periodo, Some(medicion_id)).await?;
    ensure_certificate_precedes(&txn, presupuesto_id, periodo, certificado_anterior_id).await?;

    let previous = previous_view(&txn, presupuesto_id, periodo).await?;
    let view = reconcile(&budget.view, &update.entries, previous.as_ref())?;

    let mut model: medicion::ActiveModel = existing.into();
    model.periodo = Set(periodo);
    model.certificado_anterior_id = Set(certificado_anterior_id);
    model.updated_at = Set(Utc::now());
    store_view(&mut model, &view)?;
    model.update(&txn).await?;

    refresh_later(&txn, presupuesto_id, &budget.view, old_periodo.min(periodo)).await?;
    // Moving to a later month re-reconciles this row too
    let updated = find_in_budget(&txn, presupuesto_id, medicion_id).await?;
    txn.commit().await?;

    tracing::info!("Updated medicion {}", medicion_id);
    Measurement::from_model(updated)
}

/// Deletes one measurement of a budget and reconciles the later ones again.
pub async fn delete_measurement(
    db: &DatabaseConnection,
    presupuesto_id: i64,
    medicion_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;
    let existing = find_in_budget(&txn, presupuesto_id, medicion_id).await?;
    let budget = budget::get_budget(&txn, presupuesto_id).await?;

    Medicion::delete_by_id(medicion_id).exec(&txn).await?;
    refresh_later(&txn, presupuesto_id, &budget.view, existing.periodo).await?;
    txn.commit().await?;

    tracing::info!("Deleted medicion {}", medicion_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::budget::{BudgetSelection, assemble_budget};
    use crate::core::catalog::CatalogItem;
    use crate::core::pricing::add_price;
    use crate::test_utils::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(item_id: i64, completed_quantity: f64) -> CompletionEntry {
        CompletionEntry {
            item_id,
            completed_quantity,
        }
    }

    /// Budget of 100: item 1 = 10 × 6, item 2 = 4 × 10 in another rubro.
    fn hundred_budget() -> BudgetView {
        let catalog: HashMap<i64, CatalogItem> = [(1, "materiales", 6.0), (2, "jornales", 10.0)]
            .into_iter()
            .map(|(id, rubro, precio)| {
                (
                    id,
                    CatalogItem {
                        id,
                        codigo: format!("C-{id}"),
                        nombre: format!("Item {id}"),
                        unidad: "u".to_string(),
                        categoria: rubro.to_string(),
                        precio,
                        fecha_precio: None,
                    },
                )
            })
            .collect();
        assemble_budget(
            &[
                BudgetSelection {
                    item_id: 1,
                    quantity: 10.0,
                },
                BudgetSelection {
                    item_id: 2,
                    quantity: 4.0,
                },
            ],
            &catalog,
        )
        .unwrap()
    }

    #[test]
    fn test_completed_percentage_of_grand_total() {
        let budget = hundred_budget();
        assert_eq!(budget.grand_total, 100.0);

        // 2 × 6 + 2.8 × 10 = 40
        let view = reconcile(&budget, &[entry(1, 2.0), entry(2, 2.8)], None).unwrap();
        assert!((view.completed_total - 40.0).abs() < 1e-9);
        assert!((view.completed_percentage - 40.0).abs() < 1e-9);
        assert_eq!(view.completed_total, view.accumulated_total);
    }

    #[test]
    fn test_missing_lines_complete_nothing() {
        let budget = hundred_budget();
        let view = reconcile(&budget, &[entry(2, 1.0)], None).unwrap();

        let first = view.line(1).unwrap();
        assert_eq!(first.completed_quantity, 0.0);
        assert_eq!(first.completed_amount, 0.0);
        assert_eq!(view.completed_total, 10.0);
        assert_eq!(view.groups.len(), budget.groups.len());
    }

    #[test]
    fn test_previous_period_is_carried_forward() {
        let budget = hundred_budget();
        let march = reconcile(&budget, &[entry(1, 5.0)], None).unwrap();
        let april = reconcile(&budget, &[entry(1, 2.0), entry(2, 1.0)], Some(&march)).unwrap();

        let line = april.line(1).unwrap();
        assert_eq!(line.previous_quantity, 5.0);
        assert_eq!(line.completed_quantity, 2.0);
        assert_eq!(line.accumulated_quantity, 7.0);

        assert_eq!(april.completed_total, 22.0);
        assert_eq!(april.completed_percentage, 22.0);
        assert_eq!(april.accumulated_total, 52.0);
        assert_eq!(april.accumulated_percentage, 52.0);
    }

    #[test]
    fn test_unknown_lines_are_all_reported() {
        let budget = hundred_budget();
        let result = reconcile(&budget, &[entry(3, 1.0), entry(1, 1.0), entry(8, 1.0)], None);
        match result {
            Err(Error::NotFound { entity, reference }) => {
                assert_eq!(entity, "Budget line");
                assert_eq!(reference, "3, 8");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_submissions_are_rejected() {
        let budget = hundred_budget();
        assert!(matches!(
            reconcile(&budget, &[entry(1, -2.0)], None),
            Err(Error::InvalidAmount { amount: -2.0 })
        ));
        assert!(matches!(
            reconcile(&budget, &[entry(1, f64::NAN)], None),
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            reconcile(&budget, &[entry(1, 1.0), entry(1, 1.0)], None),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_zero_grand_total_gives_zero_percentage() {
        let empty = assemble_budget(&[], &HashMap::new()).unwrap();
        let view = reconcile(&empty, &[], None).unwrap();
        assert_eq!(view.completed_percentage, 0.0);
        assert_eq!(view.accumulated_percentage, 0.0);
    }

    #[test]
    fn test_month_start() {
        assert_eq!(month_start(date(2024, 3, 17)).unwrap(), date(2024, 3, 1));
    }

    async fn budget_of_hundred(db: &DatabaseConnection) -> Result<(i64, i64, i64)> {
        let obra = create_test_obra(db, "Escuela").await?;
        let a = create_test_item(db, "Hormigón", "materiales").await?;
        let b = create_test_item(db, "Oficial", "jornales").await?;
        add_price(db, a.id, 6.0, date(2024, 1, 1)).await?;
        add_price(db, b.id, 10.0, date(2024, 1, 1)).await?;
        let budget = create_test_budget(
            db,
            obra.id,
            &[
                BudgetSelection {
                    item_id: a.id,
                    quantity: 10.0,
                },
                BudgetSelection {
                    item_id: b.id,
                    quantity: 4.0,
                },
            ],
        )
        .await?;
        Ok((budget.id, a.id, b.id))
    }

    #[tokio::test]
    async fn test_create_measurement_chains_periods_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let (budget_id, a, b) = budget_of_hundred(&db).await?;

        let march = create_measurement(
            &db,
            budget_id,
            NewMeasurement {
                periodo: date(2024, 3, 15),
                entries: vec![entry(a, 5.0)],
                certificado_anterior_id: None,
            },
        )
        .await?;
        assert_eq!(march.periodo, date(2024, 3, 1));
        assert_eq!(march.view.completed_percentage, 30.0);

        let april = create_measurement(
            &db,
            budget_id,
            NewMeasurement {
                periodo: date(2024, 4, 1),
                entries: vec![entry(a, 1.0), entry(b, 1.0)],
                certificado_anterior_id: None,
            },
        )
        .await?;
        assert_eq!(april.view.completed_total, 16.0);
        assert_eq!(april.view.accumulated_total, 46.0);
        assert_eq!(april.view.line(a).unwrap().previous_quantity, 5.0);

        let listed = list_measurements(&db, budget_id).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, april.id);
        assert_eq!(listed[0].avance_acumulado, 46.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_measurement_rejects_duplicate_period_and_unknown_lines() -> Result<()> {
        let db = setup_test_db().await?;
        let (budget_id, a, _) = budget_of_hundred(&db).await?;

        create_measurement(
            &db,
            budget_id,
            NewMeasurement {
                periodo: date(2024, 3, 1),
                entries: vec![entry(a, 1.0)],
                certificado_anterior_id: None,
            },
        )
        .await?;

        let duplicate = create_measurement(
            &db,
            budget_id,
            NewMeasurement {
                periodo: date(2024, 3, 28),
                entries: vec![],
                certificado_anterior_id: None,
            },
        )
        .await;
        assert!(matches!(duplicate, Err(Error::Validation { .. })));

        let unknown = create_measurement(
            &db,
            budget_id,
            NewMeasurement {
                periodo: date(2024, 4, 1),
                entries: vec![entry(9999, 1.0)],
                certificado_anterior_id: None,
            },
        )
        .await;
        assert!(matches!(unknown, Err(Error::NotFound { .. })));

        let missing_budget = create_measurement(
            &db,
            4242,
            NewMeasurement {
                periodo: date(2024, 4, 1),
                entries: vec![],
                certificado_anterior_id: None,
            },
        )
        .await;
        assert!(matches!(
            missing_budget,
            Err(Error::NotFound {
                entity: "Presupuesto",
                ..
            })
        ));

        let missing_certificate = create_measurement(
            &db,
            budget_id,
            NewMeasurement {
                periodo: date(2024, 5, 1),
                entries: vec![],
                certificado_anterior_id: Some(31337),
            },
        )
        .await;
        assert!(matches!(
            missing_certificate,
            Err(Error::NotFound {
                entity: "Certificado",
                ..
            })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_measurement_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let (budget_id, a, b) = budget_of_hundred(&db).await?;

        let measurement = create_measurement(
            &db,
            budget_id,
            NewMeasurement {
                periodo: date(2024, 3, 1),
                entries: vec![entry(a, 1.0)],
                certificado_anterior_id: None,
            },
        )
        .await?;

        let updated = update_measurement(
            &db,
            budget_id,
            measurement.id,
            MeasurementUpdate {
                entries: vec![entry(b, 2.0)],
                periodo: None,
                certificado_anterior_id: None,
            },
        )
        .await?;
        assert_eq!(updated.view.completed_total, 20.0);
        assert_eq!(updated.view.line(a).unwrap().completed_quantity, 0.0);

        let fetched = get_measurement(&db, budget_id, measurement.id).await?;
        assert_eq!(fetched.view, updated.view);

        // Measurement ids are scoped to their budget
        assert!(matches!(
            get_measurement(&db, budget_id + 1, measurement.id).await,
            Err(Error::NotFound { .. })
        ));

        delete_measurement(&db, budget_id, measurement.id).await?;
        assert!(list_measurements(&db, budget_id).await?.is_empty());
        Ok(())
    }

    async fn record(
        db: &DatabaseConnection,
        budget_id: i64,
        periodo: NaiveDate,
        entries: Vec<CompletionEntry>,
    ) -> Result<Measurement> {
        create_measurement(
            db,
            budget_id,
            NewMeasurement {
                periodo,
                entries,
                certificado_anterior_id: None,
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_later_periods_follow_earlier_changes_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let (budget_id, a, _) = budget_of_hundred(&db).await?;

        let march = record(&db, budget_id, date(2024, 3, 1), vec![entry(a, 5.0)]).await?;
        let april = record(&db, budget_id, date(2024, 4, 1), vec![entry(a, 1.0)]).await?;

        update_measurement(
            &db,
            budget_id,
            march.id,
            MeasurementUpdate {
                entries: vec![entry(a, 2.0)],
                periodo: None,
                certificado_anterior_id: None,
            },
        )
        .await?;
        let reread = get_measurement(&db, budget_id, april.id).await?;
        let line = reread.view.line(a).unwrap();
        assert_eq!(line.previous_quantity, 2.0);
        assert_eq!(line.accumulated_quantity, 3.0);
        assert_eq!(reread.view.accumulated_total, 18.0);
        assert_eq!(reread.view.completed_total, 6.0);

        // A back-dated period pushes into every later one
        let february = record(&db, budget_id, date(2024, 2, 1), vec![entry(a, 4.0)]).await?;
        assert_eq!(february.view.line(a).unwrap().previous_quantity, 0.0);
        let reread = get_measurement(&db, budget_id, march.id).await?;
        assert_eq!(reread.view.line(a).unwrap().previous_quantity, 4.0);
        assert_eq!(reread.view.line(a).unwrap().accumulated_quantity, 6.0);

        let listed = list_measurements(&db, budget_id).await?;
        assert_eq!(listed[0].id, april.id);
        assert_eq!(listed[0].total_acumulado, 42.0);
        assert_eq!(listed[0].avance_acumulado, 42.0);

        delete_measurement(&db, budget_id, march.id).await?;
        let reread = get_measurement(&db, budget_id, april.id).await?;
        assert_eq!(reread.view.line(a).unwrap().previous_quantity, 4.0);
        assert_eq!(reread.view.accumulated_total, 30.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_moving_a_period_reorders_carry_forward_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let (budget_id, a, _) = budget_of_hundred(&db).await?;

        let march = record(&db, budget_id, date(2024, 3, 1), vec![entry(a, 5.0)]).await?;
        let april = record(&db, budget_id, date(2024, 4, 1), vec![entry(a, 1.0)]).await?;

        let moved = update_measurement(
            &db,
            budget_id,
            march.id,
            MeasurementUpdate {
                entries: vec![entry(a, 5.0)],
                periodo: Some(date(2024, 5, 10)),
                certificado_anterior_id: None,
            },
        )
        .await?;
        assert_eq!(moved.periodo, date(2024, 5, 1));
        assert_eq!(moved.view.line(a).unwrap().previous_quantity, 1.0);
        assert_eq!(moved.view.line(a).unwrap().accumulated_quantity, 6.0);

        let reread = get_measurement(&db, budget_id, april.id).await?;
        assert_eq!(reread.view.line(a).unwrap().previous_quantity, 0.0);
        assert_eq!(reread.view.accumulated_total, 6.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_certificate_link_must_precede_and_can_be_cleared_integration() -> Result<()> {
        use crate::core::certificate::{NewCertificate, create_certificate};

        let db = setup_test_db().await?;
        let (budget_id, a, _) = budget_of_hundred(&db).await?;
        let march_certificate = create_certificate(
            &db,
            NewCertificate {
                presupuesto_id: budget_id,
                periodo: date(2024, 3, 1),
                medicion_id: None,
                certificado_anterior_id: None,
                documento: None,
            },
        )
        .await?;

        let same_month = create_measurement(
            &db,
            budget_id,
            NewMeasurement {
                periodo: date(2024, 3, 20),
                entries: vec![],
                certificado_anterior_id: Some(march_certificate.id),
            },
        )
        .await;
        assert!(matches!(same_month, Err(Error::Validation { .. })));

        let april = create_measurement(
            &db,
            budget_id,
            NewMeasurement {
                periodo: date(2024, 4, 1),
                entries: vec![entry(a, 1.0)],
                certificado_anterior_id: Some(march_certificate.id),
            },
        )
        .await?;
        assert_eq!(april.certificado_anterior_id, Some(march_certificate.id));

        // Leaving the link out keeps it
        let kept = update_measurement(
            &db,
            budget_id,
            april.id,
            MeasurementUpdate {
                entries: vec![entry(a, 2.0)],
                periodo: None,
                certificado_anterior_id: None,
            },
        )
        .await?;
        assert_eq!(kept.certificado_anterior_id, Some(march_certificate.id));

        // Moving before the certificate's month is refused
        let too_early = update_measurement(
            &db,
            budget_id,
            april.id,
            MeasurementUpdate {
                entries: vec![],
                periodo: Some(date(2024, 2, 1)),
                certificado_anterior_id: None,
            },
        )
        .await;
        assert!(matches!(too_early, Err(Error::Validation { .. })));

        let cleared: MeasurementUpdate =
            serde_json::from_value(serde_json::json!({"entries": [], "certificadoAnteriorId": null}))?;
        assert_eq!(cleared.certificado_anterior_id, Some(None));
        let cleared = update_measurement(&db, budget_id, april.id, cleared).await?;
        assert_eq!(cleared.certificado_anterior_id, None);

        let absent: MeasurementUpdate = serde_json::from_value(serde_json::json!({"entries": []}))?;
        assert_eq!(absent.certificado_anterior_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_measurements_for_obra_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let (budget_id, a, _) = budget_of_hundred(&db).await?;
        let budget = budget::get_budget(&db, budget_id).await?;
        let other_obra = create_test_obra(&db, "Otra").await?;

        create_measurement(
            &db,
            budget_id,
            NewMeasurement {
                periodo: date(2024, 3, 1),
                entries: vec![entry(a, 1.0)],
                certificado_anterior_id: None,
            },
        )
        .await?;

        let listed = list_measurements_for_obra(&db, budget.obra_id).await?;
        assert_eq!(listed.len(), 1);
        assert!(list_measurements_for_obra(&db, other_obra.id).await?.is_empty());
        Ok(())
    }
}
