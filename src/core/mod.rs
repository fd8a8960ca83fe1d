//! Framework-agnostic business logic. Every operation takes a database
//! connection and returns `errors::Result`, so the HTTP layer only maps
//! requests and errors.

/// Budget assembly and persistence
pub mod budget;
/// Item catalog reader and item maintenance
pub mod catalog;
/// Monthly certificate chain
pub mod certificate;
/// Empresas, inspectores and proyectistas
pub mod directory;
/// Measurement reconciliation and persistence
pub mod measurement;
/// Obras and their budgets
pub mod obra;
/// Price history and resolution at a date
pub mod pricing;
