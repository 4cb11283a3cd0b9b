//! Integration tests for table migrations.
//!
//! These tests drive the engine end to end against the in-memory connection
//! and check both the resulting schema and the statements that were issued.

use pretty_assertions::assert_eq;
use serde_json::json;
use tabula::migrate::{
    BatchEntry, BatchOptions, Dialect, EngineConfig, FieldCategory, FieldDescriptor,
    MemoryConnection, SchemaEngine, TableDescriptor, TableInput, translate,
};

async fn engine(dialect: Dialect) -> SchemaEngine<MemoryConnection> {
    let engine = SchemaEngine::new(MemoryConnection::new(dialect));
    engine.install().await.expect("install metadata table");
    engine
}

fn users() -> TableDescriptor {
    TableDescriptor::new("users")
        .field(FieldDescriptor::new("id", "id"))
        .field(FieldDescriptor::new("email", "string").length(190).not_null())
}

fn widgets() -> TableDescriptor {
    serde_json::from_value(json!({
        "name": "widgets",
        "field": [
            { "name": "id", "type": "id" },
            { "name": "name", "type": "string", "length": 128, "allow_null": false },
            { "name": "price", "type": "decimal", "length": 10, "scale": 2 },
            { "name": "owner_id", "type": "reference", "ref_table": "users", "ref_fields": "id" }
        ]
    }))
    .expect("valid descriptor")
}

/// The reference example: columns, one foreign key, `{name}` result.
#[tokio::test]
async fn test_widgets_example() {
    let engine = engine(Dialect::MySql).await;
    engine.create_table(&users(), true, false).await.unwrap();

    let results = engine
        .update_tables(widgets(), BatchOptions::new())
        .await
        .unwrap();
    assert_eq!(serde_json::to_value(&results).unwrap(), json!([{ "name": "widgets" }]));

    let description = engine.describe_table("widgets").await.unwrap();
    let types: Vec<(&str, &str, bool)> = description
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.db_type.as_str(), f.allow_null))
        .collect();
    assert_eq!(
        types,
        vec![
            ("id", "int", false),
            ("name", "varchar(128)", false),
            ("price", "decimal(10,2)", true),
            ("owner_id", "int", true),
        ]
    );

    let owner = description.field("owner_id").unwrap();
    assert!(owner.is_foreign_key);
    assert_eq!(owner.ref_table.as_deref(), Some("users"));
    assert_eq!(engine.connection().foreign_key_names(), vec!["fk_widgets_owner_id"]);
}

/// A failing table in continue mode leaves its neighbours applied.
#[tokio::test]
async fn test_batch_continue_on_error() {
    let engine = engine(Dialect::SqlServer).await;
    let second = TableDescriptor::new("second")
        .field(FieldDescriptor::new("a", "integer").primary_key())
        .field(FieldDescriptor::new("b", "integer").primary_key());

    let results = engine
        .update_tables(
            vec![users(), second, widgets()],
            BatchOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(matches!(&results[0], BatchEntry::Applied(t) if t.name == "users"));
    assert_eq!(results[1].error().map(|e| e.code), Some(400));
    assert!(matches!(&results[2], BatchEntry::Applied(t) if t.name == "widgets"));

    assert!(engine.table_exists("users").await.unwrap());
    assert!(engine.table_exists("widgets").await.unwrap());
    assert!(!engine.table_exists("second").await.unwrap());
}

/// Rollback mode drops what the call created and surfaces the error.
#[tokio::test]
async fn test_batch_rollback() {
    let engine = engine(Dialect::Postgres).await;
    let broken = TableDescriptor::new("broken").field(FieldDescriptor::new("x", "reference"));

    let err = engine
        .update_tables(
            vec![users(), widgets(), broken],
            BatchOptions::new().rollback(true),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), 400);
    assert!(!engine.table_exists("users").await.unwrap());
    assert!(!engine.table_exists("widgets").await.unwrap());
    assert_eq!(engine.table_names().await.unwrap(), vec!["_tabula_labels"]);
}

/// Describing a fresh table returns one field per input with matching categories.
#[tokio::test]
async fn test_describe_round_trip() {
    for dialect in Dialect::ALL {
        let engine = engine(dialect).await;
        let table = TableDescriptor::new("profiles")
            .field(FieldDescriptor::new("id", "id"))
            .field(FieldDescriptor::new("nickname", "string").length(40))
            .field(FieldDescriptor::new("verified", "boolean").not_null())
            .field(FieldDescriptor::new("joined_at", "datetime"))
            .field(FieldDescriptor::new("visits", "bigint"));
        engine.create_table(&table, true, false).await.unwrap();

        let description = engine.describe_table("Profiles").await.unwrap();
        let categories: Vec<FieldCategory> =
            description.fields.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![
                FieldCategory::Integer,
                FieldCategory::String,
                FieldCategory::Boolean,
                FieldCategory::DateTime,
                FieldCategory::Integer,
            ],
            "{dialect}"
        );
    }
}

/// Saving the same labels twice keeps one row per (table, field).
#[tokio::test]
async fn test_label_upsert_idempotence() {
    let engine = engine(Dialect::MySql).await;
    let table = TableDescriptor::new("products")
        .label("Product", "Products")
        .field(FieldDescriptor::new("id", "id"))
        .field(
            FieldDescriptor::new("status", "string")
                .length(16)
                .label("Status")
                .picklist(["draft", "live"]),
        );

    engine.create_table(&table, true, false).await.unwrap();
    engine
        .update_tables(table.clone(), BatchOptions::new().allow_merge(true))
        .await
        .unwrap();

    let labels = engine.connection().labels();
    assert_eq!(labels.len(), 2);
    let status = labels.iter().find(|l| l.field == "status").unwrap();
    assert_eq!(status.picklist.as_deref(), Some("draft\nlive"));
}

/// Omitted columns survive unless deletion is allowed.
#[tokio::test]
async fn test_allow_delete() {
    let engine = engine(Dialect::MySql).await;
    engine.create_table(&widgets(), true, false).await.unwrap();
    let slim = TableDescriptor::new("widgets").field(FieldDescriptor::new("name", "string").length(128));

    engine
        .update_tables(slim.clone(), BatchOptions::new().allow_merge(true))
        .await
        .unwrap();
    assert_eq!(engine.describe_table("widgets").await.unwrap().fields.len(), 4);

    engine
        .update_tables(slim, BatchOptions::new().allow_merge(true).allow_delete(true))
        .await
        .unwrap();
    let remaining: Vec<String> = engine
        .describe_table("widgets")
        .await
        .unwrap()
        .fields
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(remaining, vec!["name"]);
}

/// Table lookups ignore case.
#[tokio::test]
async fn test_case_insensitive_existence() {
    let engine = engine(Dialect::MySql).await;
    engine.create_table(&users(), true, false).await.unwrap();

    assert!(engine.table_exists("Users").await.unwrap());
    assert!(engine.table_exists("USERS").await.unwrap());
    assert_eq!(
        engine.table_exists("Users").await.unwrap(),
        engine.table_exists("users").await.unwrap()
    );
}

/// Two primary keys are rejected before anything reaches the database.
#[tokio::test]
async fn test_two_primary_keys_issue_nothing() {
    let engine = engine(Dialect::MySql).await;
    engine.create_table(&users(), true, false).await.unwrap();
    engine.connection().clear_statements();

    let table = TableDescriptor::new("users")
        .field(FieldDescriptor::new("code", "string").length(8).primary_key());
    let err = engine
        .update_tables(table, BatchOptions::new().allow_merge(true))
        .await
        .unwrap_err();

    assert_eq!(err.code(), 400);
    assert!(engine.connection().statements().is_empty());
}

/// Precision and scale are bounded per dialect.
#[test]
fn test_decimal_bounds() {
    for dialect in [Dialect::MySql, Dialect::SqlServer] {
        let too_wide = FieldDescriptor::new("n", "decimal").precision(100, 2);
        assert_eq!(translate(&too_wide, dialect).unwrap_err().code(), 400);

        let inverted = FieldDescriptor::new("n", "decimal").precision(4, 6);
        assert_eq!(translate(&inverted, dialect).unwrap_err().code(), 400);

        let float = FieldDescriptor::new("n", "float").precision(200, 2);
        assert_eq!(translate(&float, dialect).unwrap_err().code(), 400);
    }
}

/// A custom configuration flows through to the issued statements.
#[tokio::test]
async fn test_custom_configuration() {
    let config = EngineConfig::new(Dialect::MySql)
        .metadata_table("field_meta")
        .system_user_table("accounts", "account_id")
        .default_string_length(100);
    let engine = SchemaEngine::with_config(MemoryConnection::new(Dialect::MySql), config).unwrap();
    engine.install().await.unwrap();

    let accounts = TableDescriptor::new("accounts")
        .field(FieldDescriptor::new("account_id", "id"));
    let notes = TableDescriptor::new("notes")
        .label("Note", "Notes")
        .field(FieldDescriptor::new("id", "id"))
        .field(FieldDescriptor::new("title", "string"))
        .field(FieldDescriptor::new("author", "user_id"));

    let input: TableInput = vec![accounts, notes].into();
    let report = engine.migrate_batch(input, BatchOptions::new()).await.unwrap();
    assert!(!report.has_failures());
    assert!(report.deferred.is_ok());

    let conn = engine.connection();
    assert!(conn.has_table("field_meta"));
    assert!(conn.statements().iter().any(|s| s.contains("`title` varchar(100) NULL")));
    assert!(
        conn.statements()
            .iter()
            .any(|s| s.contains("REFERENCES `accounts` (`account_id`)"))
    );
}
