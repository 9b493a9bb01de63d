use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use sqlx::SqlitePool;

use crate::db::{clear_all_data, create_pool, fetch_matches, fetch_teams, init_database_with_pool, seed_data};
use crate::models::{MatchFilters, MatchResult, MatchStatistics, TeamPair};
use crate::services::{
    compute_advanced_analytics, compute_prediction_quality, compute_statistics, write_csv,
    DataFetcher, PredictionEngine, PresetStore,
};
use crate::utils::suggest_teams;

/// Match filters shared by the query commands.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Home team name
    #[arg(long)]
    pub home: Option<String>,
    /// Away team name
    #[arg(long)]
    pub away: Option<String>,
    /// Only matches where both teams scored (true/false)
    #[arg(long)]
    pub btts: Option<bool>,
    /// Only comeback matches (true/false)
    #[arg(long)]
    pub comeback: Option<bool>,
    /// Final result: H, D or A
    #[arg(long, value_parser = parse_result)]
    pub result: Option<MatchResult>,
    /// Earliest kickoff (RFC 3339)
    #[arg(long)]
    pub from: Option<DateTime<Utc>>,
    /// Latest kickoff (RFC 3339)
    #[arg(long)]
    pub to: Option<DateTime<Utc>>,
}

impl FilterArgs {
    pub fn into_filters(self) -> MatchFilters {
        MatchFilters {
            home_team: self.home,
            away_team: self.away,
            btts_computed: self.btts,
            comeback_computed: self.comeback,
            result_computed: self.result,
            date_from: self.from,
            date_to: self.to,
        }
        .normalized()
    }
}

fn parse_result(value: &str) -> Result<MatchResult, String> {
    MatchResult::from_code(&value.trim().to_uppercase())
        .ok_or_else(|| format!("unknown result '{}': use H, D or A", value))
}

/// Split a `HOME:AWAY` argument into a pair.
fn parse_pair(value: &str) -> Result<TeamPair> {
    let (home, away) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("invalid pair '{}': expected HOME:AWAY", value))?;

    Ok(TeamPair {
        home_team: home.trim().to_string(),
        away_team: away.trim().to_string(),
    })
}

async fn open_store() -> Result<SqlitePool> {
    let pool = create_pool().await?;
    init_database_with_pool(&pool).await?;
    Ok(pool)
}

/// Print "did you mean" hints for filter teams the store has never seen.
async fn suggest_unknown_teams(pool: &SqlitePool, filters: &MatchFilters) -> Result<()> {
    let teams = fetch_teams(pool).await?;

    for team in [filters.home_team.as_deref(), filters.away_team.as_deref()]
        .into_iter()
        .flatten()
    {
        if teams.iter().any(|t| t == team) {
            continue;
        }

        let suggestions = suggest_teams(team, &teams, 3);
        if suggestions.is_empty() {
            println!("❓ Unknown team '{}'", team);
        } else {
            println!("❓ Unknown team '{}'. Did you mean: {}?", team, suggestions.join(", "));
        }
    }

    Ok(())
}

fn print_statistics(stats: &MatchStatistics) {
    println!("   Matches: {}", stats.total_matches);
    println!(
        "   Home win: {:.1}% ({}) | Draw: {:.1}% ({}) | Away win: {:.1}% ({})",
        stats.home_win_percentage,
        stats.home_wins,
        stats.draw_percentage,
        stats.draws,
        stats.away_win_percentage,
        stats.away_wins
    );
    println!(
        "   BTTS: {:.1}% ({}) | Comebacks: {:.1}% ({})",
        stats.btts_percentage, stats.btts_count, stats.comeback_percentage, stats.comeback_count
    );
    println!(
        "   Goals per match: {:.1} (home {:.1}, away {:.1})",
        stats.avg_goals, stats.home_avg_goals, stats.away_avg_goals
    );
    println!("   Halftime transformations: {}", stats.halftime_transformations);

    if !stats.most_frequent_results.is_empty() {
        println!("   Most frequent results:");
        for result in &stats.most_frequent_results {
            println!("     • {} x{} ({:.1}%)", result.score, result.count, result.percentage);
        }
    }
}

pub async fn import_data(url: Option<String>) -> Result<()> {
    let pool = open_store().await?;

    let mut fetcher = DataFetcher::new();
    if let Some(url) = url {
        fetcher = fetcher.with_source(url);
    }
    if !fetcher.has_source() {
        println!("❌ No match source configured. Set WINMIX_SOURCE_URL or pass --url");
        return Ok(());
    }

    println!("📥 Importing matches...");
    let summary = fetcher.import_from_source(&pool).await?;
    println!("✅ Imported {} matches ({} skipped)", summary.imported, summary.skipped);

    Ok(())
}

pub async fn seed(fresh: bool) -> Result<()> {
    let pool = open_store().await?;

    if fresh {
        println!("🧹 Clearing existing data...");
        clear_all_data(&pool).await?;
    }

    println!("🌱 Seeding demo fixtures...");
    seed_data(&pool).await?;
    println!("✅ Done");

    Ok(())
}

pub async fn show_stats(filters: MatchFilters) -> Result<()> {
    let pool = open_store().await?;
    suggest_unknown_teams(&pool, &filters).await?;

    let records = fetch_matches(&pool, &filters).await?;
    if records.is_empty() {
        println!("📭 No matches found for these filters.");
        println!("💡 Load data first with: winmix seed  or  winmix import");
        return Ok(());
    }

    let stats = compute_statistics(&records);
    let quality = compute_prediction_quality(&stats);

    println!("📊 Match statistics:");
    print_statistics(&stats);
    println!(
        "\n🎯 Recommendation: {} (confidence: {}, {:.1}%)",
        quality.recommendation, quality.confidence, quality.confidence_level
    );

    Ok(())
}

pub async fn show_analytics(filters: MatchFilters) -> Result<()> {
    let pool = open_store().await?;
    suggest_unknown_teams(&pool, &filters).await?;

    let records = fetch_matches(&pool, &filters).await?;
    let Some(analytics) = compute_advanced_analytics(&records) else {
        println!("📭 No matches found for these filters.");
        return Ok(());
    };

    let goals = &analytics.goals_trend;
    println!("📈 Goals:");
    println!(
        "   Over 2.5: {:.1}% ({}) | Under 2.5: {:.1}% ({})",
        goals.over_25_percentage, goals.over_25_goals, goals.under_25_percentage, goals.under_25_goals
    );

    let btts = &analytics.btts_analysis;
    println!("\n⚽ BTTS: {:.1}% ({} of {})", btts.btts_percentage, btts.btts_true, btts.btts_true + btts.btts_false);
    for month in &btts.monthly_trend {
        println!("   {}  {:.1}% ({} matches)", month.month, month.btts_rate, month.matches);
    }

    println!("\n📅 By weekday:");
    for day in &analytics.weekly_results {
        println!(
            "   {:<9} {} matches | {:.1} goals | BTTS {:.1}%",
            day.day, day.matches, day.avg_goals, day.btts_rate
        );
    }

    let comebacks = &analytics.comeback_analysis;
    println!(
        "\n🔄 Comebacks: {} ({:.1}%)",
        comebacks.total_comebacks, comebacks.comeback_percentage
    );
    for scenario in &comebacks.by_scoreline {
        println!("   {}  x{} ({:.1}%)", scenario.scenario, scenario.count, scenario.percentage);
    }

    let halftime = &analytics.halftime_vs_fulltime;
    println!("\n⏱️  Halftime result held to full time: {:.1}%", halftime.correlation_rate);
    for scenario in &halftime.scenarios {
        println!(
            "   HT {} → FT {}  x{} ({:.1}%)",
            scenario.halftime, scenario.fulltime, scenario.count, scenario.percentage
        );
    }

    println!("\n🏆 Most common results:");
    for result in &analytics.most_common_results {
        println!("   {}  x{} ({:.1}%)", result.result, result.count, result.percentage);
    }

    println!("\n🗓️  Monthly trend:");
    for month in &analytics.seasonal_trends {
        println!(
            "   {}  {:.1} goals | BTTS {:.1}% | comebacks {:.1}%",
            month.month, month.avg_goals, month.btts_rate, month.comeback_rate
        );
    }

    Ok(())
}

pub async fn predict(pairs: &[String]) -> Result<()> {
    let pool = open_store().await?;

    let pairs = pairs.iter().map(|p| parse_pair(p)).collect::<Result<Vec<_>>>()?;

    println!("🔮 Evaluating {} head-to-head pairs...\n", pairs.len());
    let predictions = PredictionEngine::new().predict_pairs(&pool, &pairs).await?;

    for (i, prediction) in predictions.iter().enumerate() {
        println!("{}. {} vs {}:", i + 1, prediction.pair.home_team, prediction.pair.away_team);

        match &prediction.stats {
            Some(pair_stats) => {
                print_statistics(&pair_stats.stats);
                println!(
                    "   🎯 {} (confidence: {})\n",
                    pair_stats.prediction_quality.recommendation,
                    pair_stats.prediction_quality.confidence
                );
            }
            None => {
                println!("   No previous meetings found\n");
                suggest_unknown_teams(
                    &pool,
                    &MatchFilters::for_pair(&prediction.pair.home_team, &prediction.pair.away_team),
                )
                .await?;
            }
        }
    }

    Ok(())
}

pub async fn export(filters: MatchFilters, out: &Path) -> Result<()> {
    let pool = open_store().await?;

    let records = fetch_matches(&pool, &filters).await?;
    let file = File::create(out)?;
    write_csv(&records, BufWriter::new(file))?;

    println!("💾 Exported {} matches to {}", records.len(), out.display());
    Ok(())
}

pub async fn list_teams() -> Result<()> {
    let pool = open_store().await?;
    let teams = fetch_teams(&pool).await?;

    if teams.is_empty() {
        println!("📭 No teams yet. Try: winmix seed");
        return Ok(());
    }

    println!("🏟️  {} teams:\n", teams.len());
    for team in teams {
        println!("   • {}", team);
    }

    Ok(())
}

pub async fn list_presets() -> Result<()> {
    let pool = open_store().await?;
    let presets = PresetStore::new(&pool).list().await?;

    if presets.is_empty() {
        println!("📭 No saved filters.");
        return Ok(());
    }

    println!("🔖 Saved filters:\n");
    for preset in presets {
        println!(
            "   {}  {}  ({})",
            preset.id,
            preset.name,
            preset.created_at.format("%Y-%m-%d %H:%M")
        );
        println!("      {}", serde_json::to_string(&preset.filters)?);
    }

    Ok(())
}

pub async fn save_preset(name: &str, filters: MatchFilters) -> Result<()> {
    let pool = open_store().await?;
    let preset = PresetStore::new(&pool).save(name, filters).await?;
    println!("✅ Saved filter '{}' ({})", preset.name, preset.id);
    Ok(())
}

pub async fn delete_preset(id: &str) -> Result<()> {
    let pool = open_store().await?;
    PresetStore::new(&pool).delete(id).await?;
    println!("🗑️  Deleted filter {}", id);
    Ok(())
}

pub async fn clear_presets() -> Result<()> {
    let pool = open_store().await?;
    let removed = PresetStore::new(&pool).clear().await?;
    println!("🧹 Removed {} saved filters", removed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        let pair = parse_pair(" Paks : Debrecen ").unwrap();
        assert_eq!(pair.home_team, "Paks");
        assert_eq!(pair.away_team, "Debrecen");
        assert!(parse_pair("Paks Debrecen").is_err());
    }

    #[test]
    fn test_parse_result_codes() {
        assert_eq!(parse_result("h"), Ok(MatchResult::Home));
        assert_eq!(parse_result("A"), Ok(MatchResult::Away));
        assert!(parse_result("X").is_err());
    }

    #[test]
    fn test_blank_team_args_are_dropped() {
        let filters = FilterArgs {
            home: Some("  ".to_string()),
            away: Some("Paks".to_string()),
            btts: Some(true),
            ..FilterArgs::default()
        }
        .into_filters();

        assert_eq!(filters.home_team, None);
        assert_eq!(filters.away_team.as_deref(), Some("Paks"));
        assert_eq!(filters.btts_computed, Some(true));
    }
}
