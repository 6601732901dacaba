//! Product store: batched idempotent upsert
//!
//! One call per batch, atomic at the database. Conflicts on `unique_key`
//! overwrite exactly the mutable descriptive columns and refresh
//! `updated_at`; the key and `created_at` are never touched.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use crate::ingest::batch::ProductSink;
use crate::models::ProductDraft;

#[derive(Debug, Clone)]
pub struct ProductStore {
    pool: PgPool,
}

impl ProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Collapse repeated keys, keeping each key's last value.
///
/// Postgres rejects the same conflict key twice within one
/// `ON CONFLICT DO UPDATE` statement, so in-batch repeats are collapsed
/// here; last-write-wins matches the row-order semantics of the run.
fn collapse_duplicates(rows: &[ProductDraft]) -> Vec<&ProductDraft> {
    let mut deduped: Vec<&ProductDraft> = Vec::with_capacity(rows.len());
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(rows.len());

    for row in rows {
        match positions.get(row.unique_key.as_str()) {
            Some(&i) => deduped[i] = row,
            None => {
                positions.insert(row.unique_key.as_str(), deduped.len());
                deduped.push(row);
            },
        }
    }

    deduped
}

#[async_trait]
impl ProductSink for ProductStore {
    async fn upsert_batch(&self, rows: &[ProductDraft]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let deduped = collapse_duplicates(rows);

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO products \
                (unique_key, product_title, product_description, style_no, \
                 mainframe_color, size, color_name, piece_price) ",
        );
        builder.push_values(deduped, |mut b, row| {
            b.push_bind(&row.unique_key)
                .push_bind(&row.product_title)
                .push_bind(&row.product_description)
                .push_bind(&row.style_no)
                .push_bind(&row.mainframe_color)
                .push_bind(&row.size)
                .push_bind(&row.color_name)
                .push_bind(&row.piece_price);
        });
        builder.push(
            " ON CONFLICT (unique_key) DO UPDATE SET \
                 product_title = EXCLUDED.product_title, \
                 product_description = EXCLUDED.product_description, \
                 style_no = EXCLUDED.style_no, \
                 mainframe_color = EXCLUDED.mainframe_color, \
                 size = EXCLUDED.size, \
                 color_name = EXCLUDED.color_name, \
                 piece_price = EXCLUDED.piece_price, \
                 updated_at = NOW()",
        );

        builder
            .build()
            .execute(&self.pool)
            .await
            .context("Failed to upsert product batch")?;

        // Submitted count is pre-collapse: every buffered row was handed
        // to this call.
        Ok(rows.len())
    }
}
