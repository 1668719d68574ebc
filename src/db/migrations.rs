//! Schema migrations computed from the model registry.
//!
//! The live schema is introspected, diffed against the registered table
//! definitions, and the missing tables, columns and indexes are created.
//! Nothing is ever dropped or altered in place.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sqlx::{PgConnection, PgPool};

use crate::core::Result;
use crate::db::registry::{quote_ident, ColumnDef, ModelRegistry, TableDef};

/// Tables, columns and index names found in the current schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSchema {
    tables: BTreeMap<String, BTreeSet<String>>,
    indexes: BTreeSet<String>,
}

impl LiveSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(&mut self, table: impl Into<String>, column: impl Into<String>) {
        self.tables
            .entry(table.into())
            .or_default()
            .insert(column.into());
    }

    pub fn add_index(&mut self, name: impl Into<String>) {
        self.indexes.insert(name.into());
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|columns| columns.contains(column))
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains(name)
    }
}

/// Read the live schema visible through `conn`
pub async fn introspect(conn: &mut PgConnection) -> Result<LiveSchema> {
    let columns: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT table_name::TEXT, column_name::TEXT
        FROM information_schema.columns
        WHERE table_schema = current_schema()
        ORDER BY table_name, ordinal_position
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let indexes: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT indexname::TEXT
        FROM pg_indexes
        WHERE schemaname = current_schema()
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut live = LiveSchema::new();
    for (table, column) in columns {
        live.add_column(table, column);
    }
    for (name,) in indexes {
        live.add_index(name);
    }
    Ok(live)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    CreateTable(&'static TableDef),
    AddColumn {
        table: &'static str,
        column: &'static ColumnDef,
    },
    CreateIndex {
        table: &'static str,
        column: &'static str,
    },
}

impl MigrationStep {
    pub fn to_sql(&self) -> String {
        match self {
            MigrationStep::CreateTable(table) => {
                let columns: Vec<String> = table
                    .columns
                    .iter()
                    .map(|c| format!("    {}", c.to_sql()))
                    .collect();
                format!(
                    "CREATE TABLE {} (\n{}\n)",
                    quote_ident(table.name),
                    columns.join(",\n")
                )
            }
            MigrationStep::AddColumn { table, column } => format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quote_ident(table),
                column.to_sql()
            ),
            MigrationStep::CreateIndex { table, column } => format!(
                "CREATE INDEX {} ON {} ({})",
                quote_ident(&index_name(table, column)),
                quote_ident(table),
                quote_ident(column)
            ),
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStep::CreateTable(table) => write!(f, "create table {}", table.name),
            MigrationStep::AddColumn { table, column } => {
                write!(f, "add column {}.{}", table, column.name)
            }
            MigrationStep::CreateIndex { table, column } => {
                write!(f, "create index {}", index_name(table, column))
            }
        }
    }
}

/// `ix_<table>_<column>`
pub fn index_name(table: &str, column: &str) -> String {
    format!("ix_{}_{}", table, column)
}

/// Ordered steps bringing the live schema up to the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whole plan as a SQL script
    pub fn to_sql(&self) -> String {
        self.steps
            .iter()
            .map(|step| format!("-- {}\n{};\n", step, step.to_sql()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Diff the registry against the live schema
pub fn plan(registry: &ModelRegistry, live: &LiveSchema) -> MigrationPlan {
    let mut steps = Vec::new();

    for &table in registry.tables() {
        if live.has_table(table.name) {
            for column in table.columns {
                if !live.has_column(table.name, column.name) {
                    steps.push(MigrationStep::AddColumn {
                        table: table.name,
                        column,
                    });
                }
            }
        } else {
            steps.push(MigrationStep::CreateTable(table));
        }

        for column in table.columns.iter().filter(|c| c.index) {
            if !live.has_index(&index_name(table.name, column.name)) {
                steps.push(MigrationStep::CreateIndex {
                    table: table.name,
                    column: column.name,
                });
            }
        }
    }

    MigrationPlan { steps }
}

/// Plan against the database without applying anything
pub async fn pending(pool: &PgPool, registry: &ModelRegistry) -> Result<MigrationPlan> {
    let mut conn = pool.acquire().await?;
    let live = introspect(&mut conn).await?;
    Ok(plan(registry, &live))
}

/// Apply every pending step inside one transaction
pub async fn upgrade(pool: &PgPool, registry: &ModelRegistry) -> Result<MigrationPlan> {
    let mut tx = pool.begin().await?;

    let live = introspect(&mut tx).await?;
    let plan = plan(registry, &live);

    for step in plan.steps() {
        tracing::info!(step = %step, "Applying migration step");
        sqlx::query(&step.to_sql()).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    tracing::info!(steps = plan.len(), "Schema is up to date");
    Ok(plan)
}

/// Write the plan as `<dir>/<timestamp>_<slug>.sql`
pub fn write_revision(dir: &Path, message: &str, plan: &MigrationPlan) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(format!(
        "{}_{}.sql",
        Utc::now().format("%Y%m%d%H%M%S"),
        slugify(message)
    ));
    let body = format!(
        "-- {}\n-- Generated at {}\n\n{}",
        message,
        Utc::now().to_rfc3339(),
        plan.to_sql()
    );
    std::fs::write(&path, body)?;

    tracing::info!(path = %path.display(), steps = plan.len(), "Revision written");
    Ok(path)
}

fn slugify(message: &str) -> String {
    let slug = message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    if slug.is_empty() {
        "revision".to_string()
    } else {
        slug
    }
}
