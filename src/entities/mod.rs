//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod certificado;
pub mod empresa;
pub mod inspector;
pub mod item;
pub mod medicion;
pub mod obra;
pub mod precio;
pub mod presupuesto;
pub mod proyectista;

// Re-export specific types to avoid conflicts
pub use certificado::{
    Column as CertificadoColumn, Entity as Certificado, Model as CertificadoModel,
};
pub use empresa::{Column as EmpresaColumn, Entity as Empresa, Model as EmpresaModel};
pub use inspector::{Column as InspectorColumn, Entity as Inspector, Model as InspectorModel};
pub use item::{Column as ItemColumn, Entity as Item, Model as ItemModel};
pub use medicion::{Column as MedicionColumn, Entity as Medicion, Model as MedicionModel};
pub use obra::{Column as ObraColumn, Entity as Obra, Model as ObraModel};
pub use precio::{Column as PrecioColumn, Entity as Precio, Model as PrecioModel};
pub use presupuesto::{
    Column as PresupuestoColumn, Entity as Presupuesto, Model as PresupuestoModel,
};
pub use proyectista::{
    Column as ProyectistaColumn, Entity as Proyectista, Model as ProyectistaModel,
};
