// src/lookup.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::BookingError;

/// Resolves list entries (regions) to their display text.
#[async_trait]
pub trait RegionLookup: Send + Sync {
    async fn resolve_list_entry(&self, entry_id: i32) -> Result<Option<String>, BookingError>;
}

/// Reads the shared `list_entry` table.
#[derive(Clone)]
pub struct PgRegionLookup {
    pool: PgPool,
}

impl PgRegionLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegionLookup for PgRegionLookup {
    async fn resolve_list_entry(&self, entry_id: i32) -> Result<Option<String>, BookingError> {
        let text: Option<String> = sqlx::query_scalar(
            r#"
            SELECT text
            FROM list_entry
            WHERE entry_id = $1
            "#,
        )
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(text)
    }
}

/// Fixed entries held in memory.
#[derive(Debug, Default, Clone)]
pub struct StaticRegionLookup {
    entries: HashMap<i32, String>,
}

impl StaticRegionLookup {
    pub fn from_entries(entries: impl IntoIterator<Item = (i32, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

#[async_trait]
impl RegionLookup for StaticRegionLookup {
    async fn resolve_list_entry(&self, entry_id: i32) -> Result<Option<String>, BookingError> {
        Ok(self.entries.get(&entry_id).cloned())
    }
}
