use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{
    clear_saved_filters, delete_saved_filter, get_saved_filter, insert_saved_filter, list_saved_filters,
    update_saved_filter,
};
use crate::models::{MatchFilters, SavedFilter};

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("filter name must not be empty")]
    EmptyName,

    #[error("no saved filter with id {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

fn clean_name(name: &str) -> Result<String, PresetError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PresetError::EmptyName);
    }
    Ok(name.to_string())
}

/// Named filter presets, persisted in the match store.
pub struct PresetStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PresetStore<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, name: &str, filters: MatchFilters) -> Result<SavedFilter, PresetError> {
        let preset = SavedFilter {
            id: Uuid::new_v4().to_string(),
            name: clean_name(name)?,
            filters,
            created_at: Utc::now(),
        };
        insert_saved_filter(self.pool, &preset).await?;
        tracing::info!("Saved filter preset '{}' ({})", preset.name, preset.id);
        Ok(preset)
    }

    pub async fn list(&self) -> Result<Vec<SavedFilter>, PresetError> {
        Ok(list_saved_filters(self.pool).await?)
    }

    pub async fn get(&self, id: &str) -> Result<SavedFilter, PresetError> {
        get_saved_filter(self.pool, id)
            .await?
            .ok_or_else(|| PresetError::NotFound(id.to_string()))
    }

    pub async fn update(&self, id: &str, name: &str, filters: &MatchFilters) -> Result<(), PresetError> {
        let name = clean_name(name)?;
        if !update_saved_filter(self.pool, id, &name, filters).await? {
            return Err(PresetError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), PresetError> {
        if !delete_saved_filter(self.pool, id).await? {
            return Err(PresetError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<u64, PresetError> {
        let removed = clear_saved_filters(self.pool).await?;
        tracing::info!("Cleared {} saved filter presets", removed);
        Ok(removed)
    }
}
