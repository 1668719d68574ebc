//! Declarative table definitions and the registry the migration runner reads.
//!
//! Every persistent type describes its table with a `const` [`TableDef`] and
//! implements [`Entity`]. The application builds one [`ModelRegistry`] at
//! startup, registers each entity, and hands the registry to whoever needs
//! schema metadata. Registration needs `&mut`, so a shared registry is
//! effectively frozen.

use std::fmt;

use sqlx::{postgres::PgRow, FromRow};

use crate::core::{AppError, Result};

/// Name of the identifier column every entity table carries
pub const PRIMARY_KEY: &str = "id";

/// PostgreSQL column types supported by model definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    BigSerial,
    BigInt,
    Integer,
    Boolean,
    Text,
    Varchar(u32),
    DoublePrecision,
    Timestamptz,
    Jsonb,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::BigSerial => f.write_str("BIGSERIAL"),
            SqlType::BigInt => f.write_str("BIGINT"),
            SqlType::Integer => f.write_str("INTEGER"),
            SqlType::Boolean => f.write_str("BOOLEAN"),
            SqlType::Text => f.write_str("TEXT"),
            SqlType::Varchar(len) => write!(f, "VARCHAR({})", len),
            SqlType::DoublePrecision => f.write_str("DOUBLE PRECISION"),
            SqlType::Timestamptz => f.write_str("TIMESTAMPTZ"),
            SqlType::Jsonb => f.write_str("JSONB"),
        }
    }
}

impl SqlType {
    /// Whether a text parameter can be compared or assigned without a cast
    pub fn is_textual(&self) -> bool {
        matches!(self, SqlType::Text | SqlType::Varchar(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub index: bool,
    pub default: Option<&'static str>,
}

impl ColumnDef {
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: true,
            primary_key: false,
            unique: false,
            index: false,
            default: None,
        }
    }

    /// `BIGSERIAL PRIMARY KEY`
    pub const fn primary_key(name: &'static str) -> Self {
        Self {
            name,
            sql_type: SqlType::BigSerial,
            nullable: false,
            primary_key: true,
            unique: false,
            index: false,
            default: None,
        }
    }

    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn index(mut self) -> Self {
        self.index = true;
        self
    }

    /// Server-side default, as a raw SQL expression
    pub const fn default(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self
    }

    /// Column clause for `CREATE TABLE` / `ADD COLUMN`
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(self.name), self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(expr) = self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(expr);
        }
        sql
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Fail with `UnknownField` for any key that is not a column
    pub fn check_fields<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for field in fields {
            if !self.has_column(field) {
                return Err(AppError::unknown_field(self.name, field));
            }
        }
        Ok(())
    }

    /// Comma-separated, quoted column list for SELECT/RETURNING
    pub fn select_list(&self) -> String {
        self.column_names()
            .map(quote_ident)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A persistent record type bound to one table
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + 'static {
    const TABLE: &'static TableDef;

    fn id(&self) -> i64;
}

/// Central collection of table definitions
#[derive(Debug, Default)]
pub struct ModelRegistry {
    tables: Vec<&'static TableDef>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Entity>(&mut self) -> Result<&mut Self> {
        self.register_table(E::TABLE)
    }

    pub fn register_table(&mut self, table: &'static TableDef) -> Result<&mut Self> {
        if self.table(table.name).is_some() {
            return Err(AppError::configuration(format!(
                "Table '{}' is registered twice",
                table.name
            )));
        }
        if !table.has_column(PRIMARY_KEY) {
            return Err(AppError::configuration(format!(
                "Table '{}' has no '{}' column",
                table.name, PRIMARY_KEY
            )));
        }
        self.tables.push(table);
        Ok(self)
    }

    /// Tables in registration order
    pub fn tables(&self) -> &[&'static TableDef] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&'static TableDef> {
        self.tables.iter().copied().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Double-quote an identifier for PostgreSQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
