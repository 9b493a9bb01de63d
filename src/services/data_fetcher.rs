use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;
use sqlx::SqlitePool;
use std::env;

use crate::db::upsert_match;
use crate::models::{ImportSummary, MatchRecord};

/// Pulls match records from the managed backend's REST endpoint
/// (a PostgREST-style `GET` returning a JSON array of rows).
pub struct DataFetcher {
    client: Client,
    source_url: Option<String>,
    api_key: Option<String>,
}

impl DataFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            source_url: env::var("WINMIX_SOURCE_URL").ok(),
            api_key: env::var("WINMIX_SOURCE_KEY").ok(),
        }
    }

    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn has_source(&self) -> bool {
        self.source_url.is_some()
    }

    /// Raw rows; each one is decoded separately by [`store_records`].
    pub async fn fetch_records(&self) -> Result<Vec<Value>> {
        let url = self.source_url.as_ref()
            .ok_or_else(|| anyhow!("WINMIX_SOURCE_URL not set"))?;

        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("match source returned {}", response.status()));
        }

        let rows: Vec<Value> = response.json().await?;
        tracing::info!("Fetched {} match records from {}", rows.len(), url);
        Ok(rows)
    }

    /// Fetch, validate and upsert. Invalid rows are logged and skipped.
    pub async fn import_from_source(&self, pool: &SqlitePool) -> Result<ImportSummary> {
        let rows = self.fetch_records().await?;
        store_records(pool, rows).await
    }
}

/// Decode, fill, validate and upsert one batch in a single transaction.
///
/// Rows that fail to decode or validate are logged and counted as skipped;
/// a storage error rolls the whole batch back.
pub async fn store_records(pool: &SqlitePool, rows: Vec<Value>) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut tx = pool.begin().await?;

    for (index, row) in rows.into_iter().enumerate() {
        let mut record = match serde_json::from_value::<MatchRecord>(row) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping row {}: {}", index, e);
                summary.skipped += 1;
                continue;
            }
        };

        if record.id.trim().is_empty() {
            record.id = uuid::Uuid::new_v4().to_string();
        }
        record.fill_derived();

        if let Err(e) = record.validate() {
            tracing::warn!(
                "Skipping match {} ({} vs {}): {}",
                record.id,
                record.home_team,
                record.away_team,
                e
            );
            summary.skipped += 1;
            continue;
        }

        upsert_match(&mut *tx, &record).await?;
        summary.imported += 1;
    }

    tx.commit().await?;

    tracing::info!("Imported {} matches, skipped {}", summary.imported, summary.skipped);
    Ok(summary)
}
