// Registry-driven migrations against a real PostgreSQL schema

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::TestDatabase;
use service_layout::db::migrations::{self, MigrationStep};
use service_layout::db::{ColumnDef, ModelRegistry, SqlType, TableDef};
use service_layout::modules::model_registry;

static NOTES: TableDef = TableDef {
    name: "notes",
    columns: &[
        ColumnDef::primary_key("id"),
        ColumnDef::new("name", SqlType::Text).not_null(),
    ],
};

static BROKEN: TableDef = TableDef {
    name: "broken",
    columns: &[
        ColumnDef::primary_key("id"),
        ColumnDef::new("name", SqlType::Text).default("no_such_function()"),
    ],
};

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_upgrade_creates_schema_once() {
    let db = TestDatabase::new().await;
    let registry = model_registry().unwrap();

    let applied = migrations::upgrade(&db.pool, &registry).await.unwrap();
    assert_eq!(applied.len(), 3);

    let pending = migrations::pending(&db.pool, &registry).await.unwrap();
    assert!(pending.is_empty());

    let again = migrations::upgrade(&db.pool, &registry).await.unwrap();
    assert!(again.is_empty());

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_upgrade_adds_missing_columns() {
    let db = TestDatabase::new().await;
    sqlx::query("CREATE TABLE tickets (id BIGSERIAL PRIMARY KEY, name VARCHAR(255) NOT NULL)")
        .execute(&db.pool)
        .await
        .unwrap();
    let registry = model_registry().unwrap();

    let applied = migrations::upgrade(&db.pool, &registry).await.unwrap();

    let added: Vec<&str> = applied
        .steps()
        .iter()
        .filter_map(|step| match step {
            MigrationStep::AddColumn { column, .. } => Some(column.name),
            _ => None,
        })
        .collect();
    assert_eq!(
        added,
        vec!["status", "description", "priority", "created_at", "updated_at"]
    );
    assert!(migrations::pending(&db.pool, &registry)
        .await
        .unwrap()
        .is_empty());

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_failed_upgrade_applies_nothing() {
    let db = TestDatabase::new().await;
    let mut registry = ModelRegistry::new();
    registry.register_table(&NOTES).unwrap();
    registry.register_table(&BROKEN).unwrap();

    assert!(migrations::upgrade(&db.pool, &registry).await.is_err());

    let mut only_notes = ModelRegistry::new();
    only_notes.register_table(&NOTES).unwrap();
    let pending = migrations::pending(&db.pool, &only_notes).await.unwrap();
    assert_eq!(pending.steps(), &[MigrationStep::CreateTable(&NOTES)]);

    db.cleanup().await;
}
