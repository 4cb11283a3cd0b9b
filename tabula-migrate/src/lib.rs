//! # tabula-migrate
//!
//! Abstract schema migration engine for Tabula.
//!
//! This crate provides functionality for:
//! - Translating dialect-neutral field descriptors into MySQL, SQL Server and
//!   PostgreSQL column definitions
//! - Planning column creates, alters and drops against an existing table
//! - Applying derived foreign keys and indexes
//! - Storing labels, picklists and validation rules in a metadata table
//! - Creating, updating and dropping tables one at a time or in batches
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────────┐
//! │ Descriptors  │────▶│ FieldPlanner   │────▶│ ColumnPlan       │
//! └──────────────┘     └────────────────┘     └──────────────────┘
//!                              │                   │        │
//!                              ▼                   ▼        ▼
//!                      ┌────────────────┐   ┌───────────┐ ┌────────────┐
//!                      │ TypeTranslator │   │ Table DDL │ │ Constraints│
//!                      └────────────────┘   └───────────┘ │ + Labels   │
//!                                                         └────────────┘
//! ```
//!
//! Column DDL failures abort the operation. Constraint and label failures are
//! logged and reported, and never fail the table they belong to.
//!
//! ## Example
//!
//! ```rust
//! use tabula_migrate::{
//!     BatchOptions, Dialect, FieldDescriptor, MemoryConnection, SchemaEngine, TableDescriptor,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tabula_migrate::MigrationError> {
//! let engine = SchemaEngine::new(MemoryConnection::new(Dialect::MySql));
//! engine.install().await?;
//!
//! let widgets = TableDescriptor::new("widgets")
//!     .field(FieldDescriptor::new("id", "id"))
//!     .field(FieldDescriptor::new("name", "string").length(128).not_null());
//!
//! let results = engine.update_tables(widgets, BatchOptions::new()).await?;
//! assert_eq!(results[0].name(), Some("widgets"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Every statement of a call is awaited in order on one connection. The
//! [`SchemaCache`] assumes a single writer per database; schema changes made
//! by other processes are only seen after [`SchemaCache::invalidate`].

pub mod batch;
pub mod cache;
pub mod config;
pub mod connection;
pub mod constraint;
pub mod definition;
pub mod describe;
pub mod descriptor;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod introspect;
pub mod label;
pub mod logging;
pub mod memory;
pub mod plan;
pub mod planner;
pub mod sql;
pub mod table;
pub mod translate;
pub mod types;

// Re-exports
pub use batch::{BatchEntry, BatchOptions, BatchReport};
pub use cache::{CacheStats, SchemaCache};
pub use config::{EngineConfig, TabulaConfig};
pub use connection::SchemaConnection;
pub use constraint::{ConstraintAction, ConstraintApplier, ConstraintOutcome};
pub use definition::ColumnDefinition;
pub use describe::{FieldDescription, TableDescription};
pub use descriptor::{FieldDescriptor, Picklist, TableDescriptor, TableInput};
pub use dialect::{Dialect, DialectLimits};
pub use engine::{DeferredOutcome, SchemaEngine};
pub use error::{ErrorBody, MigrateResult, MigrationError};
pub use introspect::{ColumnSchema, TableSchema};
pub use label::{LabelOutcome, LabelStore};
pub use memory::MemoryConnection;
pub use plan::{ColumnPlan, ForeignKeyConstraint, IndexConstraint, LabelRecord};
pub use planner::FieldPlanner;
pub use sql::DdlGenerator;
pub use table::{TableOutcome, TableRef};
pub use translate::{TypeTranslator, translate};
pub use types::{AbstractType, FieldCategory, IntKind};
