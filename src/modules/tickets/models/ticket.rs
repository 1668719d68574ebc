use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::{ColumnDef, Entity, SqlType, TableDef};

/// Allowed values of `tickets.status`
pub const TICKET_STATUSES: [&str; 3] = ["open", "in_progress", "closed"];

/// A support ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub description: Option<String>,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Ticket {
    const TABLE: &'static TableDef = &TableDef {
        name: "tickets",
        columns: &[
            ColumnDef::primary_key("id"),
            ColumnDef::new("name", SqlType::Varchar(255)).not_null().index(),
            ColumnDef::new("status", SqlType::Varchar(32))
                .not_null()
                .default("'open'")
                .index(),
            ColumnDef::new("description", SqlType::Text),
            ColumnDef::new("priority", SqlType::Integer)
                .not_null()
                .default("0"),
            ColumnDef::new("created_at", SqlType::Timestamptz)
                .not_null()
                .default("now()"),
            ColumnDef::new("updated_at", SqlType::Timestamptz)
                .not_null()
                .default("now()"),
        ],
    };

    fn id(&self) -> i64 {
        self.id
    }
}

impl Ticket {
    pub fn is_closed(&self) -> bool {
        self.status == "closed"
    }
}
