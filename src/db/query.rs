//! SQL builders behind the generic repository.

use sqlx::{Postgres, QueryBuilder};

use crate::core::Result;
use crate::db::registry::{quote_ident, ColumnDef, SqlType, TableDef, PRIMARY_KEY};
use crate::db::value::{Attributes, FieldValue, Filters};

/// Filtered, newest-first query over one table.
///
/// Filters whose key is listed as a search field become case-insensitive
/// substring predicates and are removed from the equality set. A `Null`
/// filter stays an `IS NULL` predicate even on a search field.
#[derive(Debug, Clone)]
pub struct ListQuery {
    table: &'static TableDef,
    searches: Vec<(&'static str, String)>,
    equals: Vec<(&'static ColumnDef, FieldValue)>,
}

impl ListQuery {
    pub fn new(table: &'static TableDef, filters: Filters, search_fields: &[&str]) -> Result<Self> {
        table.check_fields(filters.keys())?;
        table.check_fields(search_fields.iter().copied())?;

        let mut filters = filters;
        let mut searches = Vec::new();
        for field in search_fields {
            if filters.get(field).map_or(true, FieldValue::is_null) {
                continue;
            }
            if let (Some(column), Some(value)) = (table.column(field), filters.remove(field)) {
                searches.push((column.name, like_pattern(&value.to_string())));
            }
        }

        let equals = filters
            .into_iter()
            .filter_map(|(field, value)| table.column(&field).map(|c| (c, value)))
            .collect();

        Ok(Self {
            table,
            searches,
            equals,
        })
    }

    pub fn table(&self) -> &'static TableDef {
        self.table
    }

    /// All matches, ordered by id descending
    pub fn select(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM {}",
            self.table.select_list(),
            quote_ident(self.table.name)
        ));
        self.push_where(&mut qb);
        qb.push(format!(" ORDER BY {} DESC", quote_ident(PRIMARY_KEY)));
        qb
    }

    /// One page of matches
    pub fn select_page(&self, limit: i64, offset: i64) -> QueryBuilder<'static, Postgres> {
        let mut qb = self.select();
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);
        qb
    }

    /// The match with the highest id
    pub fn select_first(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = self.select();
        qb.push(" LIMIT 1");
        qb
    }

    pub fn count(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT COUNT(*) FROM {}",
            quote_ident(self.table.name)
        ));
        self.push_where(&mut qb);
        qb
    }

    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        let mut separator = " WHERE ";

        for (column, pattern) in &self.searches {
            qb.push(separator);
            qb.push(format!("CAST({} AS TEXT) ILIKE ", quote_ident(column)));
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\'");
            separator = " AND ";
        }

        for (column, value) in &self.equals {
            qb.push(separator);
            if value.is_null() {
                qb.push(format!("{} IS NULL", quote_ident(column.name)));
            } else {
                qb.push(format!("{} = ", quote_ident(column.name)));
                push_value(qb, column, value);
            }
            separator = " AND ";
        }
    }
}

/// `INSERT ... RETURNING id`; attribute keys must already be validated
pub fn insert(table: &TableDef, attributes: &Attributes) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("INSERT INTO {}", quote_ident(table.name)));

    if attributes.is_empty() {
        qb.push(" DEFAULT VALUES");
    } else {
        let columns: Vec<String> = attributes.keys().map(quote_ident).collect();
        qb.push(format!(" ({}) VALUES (", columns.join(", ")));
        let mut separated = false;
        for (field, value) in attributes {
            if separated {
                qb.push(", ");
            }
            push_column_value(&mut qb, table, field, value);
            separated = true;
        }
        qb.push(")");
    }

    qb.push(format!(" RETURNING {}", quote_ident(PRIMARY_KEY)));
    qb
}

/// `UPDATE ... WHERE id = $n`; attribute keys must already be validated
pub fn update(table: &TableDef, id: i64, attributes: &Attributes) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", quote_ident(table.name)));

    let mut separated = false;
    for (field, value) in attributes {
        if separated {
            qb.push(", ");
        }
        qb.push(format!("{} = ", quote_ident(field)));
        push_column_value(&mut qb, table, field, value);
        separated = true;
    }

    qb.push(format!(" WHERE {} = ", quote_ident(PRIMARY_KEY)));
    qb.push_bind(id);
    qb
}

/// Reload one row by id
pub fn refresh(table: &TableDef, id: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {} FROM {} WHERE {} = ",
        table.select_list(),
        quote_ident(table.name),
        quote_ident(PRIMARY_KEY)
    ));
    qb.push_bind(id);
    qb
}

/// Bind `value` for `column`, casting text parameters aimed at non-text columns
fn push_value(qb: &mut QueryBuilder<'static, Postgres>, column: &ColumnDef, value: &FieldValue) {
    match value {
        FieldValue::Text(_) if !column.sql_type.is_textual() => {
            let target = match column.sql_type {
                SqlType::BigSerial => SqlType::BigInt,
                other => other,
            };
            qb.push("CAST(");
            value.push_bind(qb);
            qb.push(format!(" AS {})", target));
        }
        _ => value.push_bind(qb),
    }
}

fn push_column_value(
    qb: &mut QueryBuilder<'static, Postgres>,
    table: &TableDef,
    field: &str,
    value: &FieldValue,
) {
    match table.column(field) {
        Some(column) => push_value(qb, column, value),
        None => value.push_bind(qb),
    }
}

/// `%value%` with LIKE metacharacters escaped
pub fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
