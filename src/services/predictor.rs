use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::fetch_matches;
use crate::models::{MatchFilters, PairPrediction, PairStatistics, TeamPair};
use crate::services::stats_aggregator::{compute_prediction_quality, compute_statistics};

pub const MAX_PAIRS: usize = 8;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("no valid match pairs: choose both a home and an away team")]
    NoValidPairs,

    #[error("at most {max} match pairs can be predicted at once, got {got}")]
    TooManyPairs { max: usize, got: usize },

    #[error("prediction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Head-to-head "predictions": historical aggregates for chosen team pairs.
pub struct PredictionEngine {
    max_pairs: usize,
}

impl PredictionEngine {
    pub fn new() -> Self {
        Self { max_pairs: MAX_PAIRS }
    }

    /// Evaluate every complete pair concurrently, strongest BTTS first.
    ///
    /// A pair whose history is empty, or whose fetch fails, comes back with
    /// `stats: None` instead of failing the batch.
    pub async fn predict_pairs(
        &self,
        pool: &SqlitePool,
        pairs: &[TeamPair],
    ) -> Result<Vec<PairPrediction>, PredictionError> {
        let valid: Vec<TeamPair> = pairs.iter().filter(|p| p.is_complete()).cloned().collect();

        if valid.is_empty() {
            return Err(PredictionError::NoValidPairs);
        }
        if valid.len() > self.max_pairs {
            return Err(PredictionError::TooManyPairs {
                max: self.max_pairs,
                got: valid.len(),
            });
        }

        let handles: Vec<_> = valid
            .into_iter()
            .map(|pair| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    let stats = evaluate_pair(&pool, &pair).await;
                    PairPrediction { pair, stats }
                })
            })
            .collect();

        let mut predictions = Vec::with_capacity(handles.len());
        for handle in handles {
            predictions.push(handle.await?);
        }

        // stable: equal BTTS keeps the order the pairs were given in
        predictions.sort_by(|a, b| {
            b.btts_percentage()
                .partial_cmp(&a.btts_percentage())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        tracing::info!("Evaluated {} head-to-head pairs", predictions.len());
        Ok(predictions)
    }
}

async fn evaluate_pair(pool: &SqlitePool, pair: &TeamPair) -> Option<PairStatistics> {
    let filters = MatchFilters::for_pair(&pair.home_team, &pair.away_team);

    let records = match fetch_matches(pool, &filters).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(
                "Error calculating stats for {} vs {}: {}",
                pair.home_team,
                pair.away_team,
                e
            );
            return None;
        }
    };

    if records.is_empty() {
        tracing::debug!("No history for {} vs {}", pair.home_team, pair.away_team);
        return None;
    }

    let stats = compute_statistics(&records);
    let prediction_quality = compute_prediction_quality(&stats);

    tracing::debug!(
        "{} vs {}: {} matches, {} ({})",
        pair.home_team,
        pair.away_team,
        stats.total_matches,
        prediction_quality.recommendation,
        prediction_quality.confidence
    );

    Some(PairStatistics {
        stats,
        prediction_quality,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, upsert_match};
    use crate::models::{Confidence, MatchRecord};
    use chrono::{Duration, TimeZone, Utc};

    fn pair(home: &str, away: &str) -> TeamPair {
        TeamPair {
            home_team: home.to_string(),
            away_team: away.to_string(),
        }
    }

    async fn history(pool: &SqlitePool, home: &str, away: &str, scores: &[(u32, u32)]) {
        let start = Utc.with_ymd_and_hms(2023, 8, 1, 18, 0, 0).unwrap();
        for (i, score) in scores.iter().enumerate() {
            let record = MatchRecord::from_scores(home, away, *score, None, start + Duration::days(i as i64 * 7));
            upsert_match(pool, &record).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_pairs_sorted_by_btts() {
        let pool = test_pool().await;
        history(&pool, "Paks", "Debrecen", &[(1, 0), (2, 0), (0, 0)]).await;
        history(&pool, "Ferencváros", "Újpest", &[(2, 1), (3, 1), (1, 1), (2, 0)]).await;

        let engine = PredictionEngine::new();
        let predictions = engine
            .predict_pairs(
                &pool,
                &[
                    pair("Paks", "Debrecen"),
                    pair("", "Újpest"),
                    pair("Ferencváros", "Újpest"),
                    pair("Kisvárda", "Paks"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[0].pair, pair("Ferencváros", "Újpest"));
        assert_eq!(predictions[1].pair, pair("Paks", "Debrecen"));
        assert_eq!(predictions[2].pair, pair("Kisvárda", "Paks"));
        assert!(predictions[2].stats.is_none());

        let ferencvaros = predictions[0].stats.as_ref().unwrap();
        assert_eq!(ferencvaros.stats.total_matches, 4);
        assert_eq!(ferencvaros.stats.btts_percentage, 75.0);
        assert_eq!(ferencvaros.prediction_quality.confidence, Confidence::High);
        assert_eq!(ferencvaros.prediction_quality.recommendation, "Home win + BTTS");

        let paks = predictions[1].stats.as_ref().unwrap();
        assert_eq!(paks.stats.home_win_percentage, 66.7);
        assert_eq!(paks.prediction_quality.recommendation, "Home win");
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized_batches() {
        let pool = test_pool().await;
        let engine = PredictionEngine::new();

        let err = engine.predict_pairs(&pool, &[pair("", "")]).await.unwrap_err();
        assert!(matches!(err, PredictionError::NoValidPairs));

        let too_many: Vec<TeamPair> = (0..9).map(|i| pair(&format!("Home {}", i), "Away")).collect();
        let err = engine.predict_pairs(&pool, &too_many).await.unwrap_err();
        assert!(matches!(err, PredictionError::TooManyPairs { max: 8, got: 9 }));
    }
}
