//! Directory of people and companies referenced by obras: contractors
//! (empresas), inspectors and designers (proyectistas).

use crate::{
    entities::{Empresa, Inspector, Proyectista, empresa, inspector, proyectista},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Fields required to register a company.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEmpresa {
    /// Registered company name
    pub nombre: String,
    /// Tax identifier
    #[serde(default)]
    pub cuit: Option<String>,
}

/// Fields required to register an inspector.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInspector {
    /// Full name
    pub nombre: String,
    /// Contact address
    #[serde(default)]
    pub email: Option<String>,
}

/// Fields required to register a designer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProyectista {
    /// Full name
    pub nombre: String,
    /// Professional registration number
    #[serde(default)]
    pub matricula: Option<String>,
}

fn required_nombre(nombre: &str) -> Result<String> {
    let trimmed = nombre.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Missing required field: nombre"));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lists all companies alphabetically.
pub async fn list_empresas(db: &DatabaseConnection) -> Result<Vec<empresa::Model>> {
    Empresa::find()
        .order_by_asc(empresa::Column::Nombre)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Registers a company.
pub async fn create_empresa(db: &DatabaseConnection, new: NewEmpresa) -> Result<empresa::Model> {
    let model = empresa::ActiveModel {
        nombre: Set(required_nombre(&new.nombre)?),
        cuit: Set(optional_text(new.cuit)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Lists all inspectors alphabetically.
pub async fn list_inspectores(db: &DatabaseConnection) -> Result<Vec<inspector::Model>> {
    Inspector::find()
        .order_by_asc(inspector::Column::Nombre)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Registers an inspector.
pub async fn create_inspector(
    db: &DatabaseConnection,
    new: NewInspector,
) -> Result<inspector::Model> {
    let model = inspector::ActiveModel {
        nombre: Set(required_nombre(&new.nombre)?),
        email: Set(optional_text(new.email)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Lists all designers alphabetically.
pub async fn list_proyectistas(db: &DatabaseConnection) -> Result<Vec<proyectista::Model>> {
    Proyectista::find()
        .order_by_asc(proyectista::Column::Nombre)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Registers a designer.
pub async fn create_proyectista(
    db: &DatabaseConnection,
    new: NewProyectista,
) -> Result<proyectista::Model> {
    let model = proyectista::ActiveModel {
        nombre: Set(required_nombre(&new.nombre)?),
        matricula: Set(optional_text(new.matricula)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_directory_requires_nombre() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_empresa(
            &db,
            NewEmpresa {
                nombre: String::new(),
                cuit: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_inspector(
            &db,
            NewInspector {
                nombre: "  ".to_string(),
                email: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_directory_lists_alphabetically_integration() -> Result<()> {
        let db = setup_test_db().await?;

        for nombre in ["Zapata", "Alvarez", "Moreno"] {
            create_proyectista(
                &db,
                NewProyectista {
                    nombre: nombre.to_string(),
                    matricula: Some(" ".to_string()),
                },
            )
            .await?;
        }

        let listed = list_proyectistas(&db).await?;
        let names: Vec<&str> = listed.iter().map(|p| p.nombre.as_str()).collect();
        assert_eq!(names, vec!["Alvarez", "Moreno", "Zapata"]);
        // Blank optional text is stored as NULL
        assert!(listed.iter().all(|p| p.matricula.is_none()));

        create_inspector(
            &db,
            NewInspector {
                nombre: "Ing. Pérez".to_string(),
                email: Some("perez@example.com".to_string()),
            },
        )
        .await?;
        let inspectores = list_inspectores(&db).await?;
        assert_eq!(inspectores.len(), 1);
        assert_eq!(inspectores[0].email.as_deref(), Some("perez@example.com"));

        assert!(list_empresas(&db).await?.is_empty());
        Ok(())
    }
}
