use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;

use crate::db::upsert_match;
use crate::models::MatchRecord;

const TEAMS: [&str; 8] = [
    "Ferencváros",
    "Paks",
    "Puskás Akadémia",
    "Debrecen",
    "Fehérvár",
    "Kecskemét",
    "Újpest",
    "Zalaegerszeg",
];

const SEASONS: [i32; 2] = [2022, 2023];

/// Deterministic scoreline for a fixture, halftime included unless every
/// ninth fixture, which is left without halftime data.
fn scoreline(home: usize, away: usize, season: usize, fixture: usize) -> ((u32, u32), Option<(u32, u32)>) {
    let mix = (home * 31 + away * 17 + season * 7 + fixture * 3) as u32;
    let full_time = (mix % 4, (mix / 4) % 3);
    let half_time = (full_time.0 / 2, full_time.1.div_ceil(2));

    if fixture % 9 == 8 {
        (full_time, None)
    } else {
        (full_time, Some(half_time))
    }
}

fn season_fixtures(season_index: usize, opening_day: DateTime<Utc>) -> Vec<MatchRecord> {
    let mut fixtures = Vec::new();
    let mut fixture = 0;

    for (home, home_team) in TEAMS.iter().enumerate() {
        for (away, away_team) in TEAMS.iter().enumerate() {
            if home == away {
                continue;
            }

            let (full_time, half_time) = scoreline(home, away, season_index, fixture);
            // four fixtures per matchday, a week apart
            let kickoff = opening_day
                + Duration::weeks((fixture / 4) as i64)
                + Duration::hours((fixture % 4) as i64 * 2);

            let mut record = MatchRecord::from_scores(home_team, away_team, full_time, half_time, kickoff);
            record.id = format!("seed-{}-{}-{}", SEASONS[season_index], home, away);
            fixtures.push(record);
            fixture += 1;
        }
    }

    fixtures
}

pub async fn seed_data(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matches")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        tracing::info!("Database already seeded ({} matches found), skipping.", count);
        return Ok(());
    }

    tracing::info!("Seeding database with demo fixtures...");

    let mut total = 0;
    for (season_index, year) in SEASONS.iter().enumerate() {
        let opening_day = Utc.with_ymd_and_hms(*year, 7, 29, 15, 0, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("invalid opening day for season {}", year))?;

        for record in season_fixtures(season_index, opening_day) {
            upsert_match(pool, &record).await?;
            total += 1;
        }
    }

    tracing::info!("Database seeded successfully with {} matches.", total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_matches, fetch_teams, test_pool};
    use crate::models::MatchFilters;

    #[test]
    fn test_halftime_never_exceeds_full_time() {
        for season in 0..SEASONS.len() {
            let opening = Utc.with_ymd_and_hms(2023, 7, 29, 15, 0, 0).unwrap();
            for record in season_fixtures(season, opening) {
                if let (Some(h), Some(a)) = (record.half_time_home_goals, record.half_time_away_goals) {
                    assert!(h <= record.full_time_home_goals);
                    assert!(a <= record.full_time_away_goals);
                }
                assert!(record.validate().is_ok());
            }
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let pool = test_pool().await;
        seed_data(&pool).await.unwrap();
        seed_data(&pool).await.unwrap();

        let expected = (TEAMS.len() * (TEAMS.len() - 1) * SEASONS.len()) as u64;
        assert_eq!(count_matches(&pool, &MatchFilters::default()).await.unwrap(), expected);
        assert_eq!(fetch_teams(&pool).await.unwrap().len(), TEAMS.len());
    }
}
