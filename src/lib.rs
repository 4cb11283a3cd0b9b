//! # Tabula
//!
//! Abstract, dialect-neutral schema migrations.
//!
//! Tabula provides:
//! - Table and field descriptors independent of any SQL dialect
//! - Type translation for MySQL, SQL Server and PostgreSQL
//! - Create, update and drop of tables, one at a time or in batches
//! - Labels, picklists and validation rules stored next to the schema
//!
//! ## Quick Start
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), MigrationError> {
//! let engine = SchemaEngine::new(MemoryConnection::new(Dialect::Postgres));
//! engine.install().await?;
//!
//! let users = TableDescriptor::new("users")
//!     .label("User", "Users")
//!     .field(FieldDescriptor::new("id", "id"))
//!     .field(FieldDescriptor::new("email", "string").length(190).unique());
//!
//! engine.create_table(&users, true, false).await?;
//! let description = engine.describe_table("users").await?;
//! assert_eq!(description.fields.len(), 2);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The schema migration engine.
pub mod migrate {
    pub use tabula_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tabula_migrate::{
        BatchEntry, BatchOptions, Dialect, EngineConfig, FieldDescriptor, MemoryConnection,
        MigrateResult, MigrationError, SchemaConnection, SchemaEngine, TableDescriptor,
        TableInput,
    };
}

// Re-export key types at the crate root
pub use tabula_migrate::{Dialect, MigrateResult, MigrationError, SchemaEngine};
