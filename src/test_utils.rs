//! Shared test utilities for `obrador`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        budget::{self, Budget, BudgetSelection, NewBudget},
        catalog::{self, NewItem},
        obra::{self, NewObra},
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test item with sensible defaults.
///
/// # Defaults
/// * `codigo`: the name upper-cased with spaces replaced by dashes
/// * `unidad`: "u"
pub async fn create_test_item(
    db: &DatabaseConnection,
    nombre: &str,
    categoria: &str,
) -> Result<entities::item::Model> {
    catalog::create_item(
        db,
        NewItem {
            codigo: nombre.to_uppercase().replace(' ', "-"),
            nombre: nombre.to_string(),
            unidad: "u".to_string(),
            categoria: categoria.to_string(),
        },
    )
    .await
}

/// Creates a test obra with only a name set.
pub async fn create_test_obra(db: &DatabaseConnection, nombre: &str) -> Result<entities::obra::Model> {
    obra::create_obra(
        db,
        NewObra {
            nombre: nombre.to_string(),
            ..NewObra::default()
        },
    )
    .await
}

/// Creates a test budget for an obra, priced at today's date.
///
/// # Defaults
/// * `nombre`: "Presupuesto de prueba"
pub async fn create_test_budget(
    db: &DatabaseConnection,
    obra_id: i64,
    selecciones: &[BudgetSelection],
) -> Result<Budget> {
    budget::create_budget(
        db,
        NewBudget {
            obra_id,
            nombre: "Presupuesto de prueba".to_string(),
            selecciones: selecciones.to_vec(),
            fecha_precios: None,
        },
    )
    .await
}
