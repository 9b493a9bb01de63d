use std::collections::HashMap;

use crate::models::{
    Confidence, MatchRecord, MatchResult, MatchStatistics, PredictionQuality, ScoreFrequency,
};
use crate::utils::{average, percentage};

const TOP_RESULTS: usize = 5;

const HIGH_CONFIDENCE_PCT: f64 = 65.0;
const MEDIUM_CONFIDENCE_PCT: f64 = 50.0;
const QUALIFIED_PCT: f64 = 65.0;
const DRAW_HIGHLIGHT_PCT: f64 = 30.0;
const BTTS_QUALIFIED_PCT: f64 = 55.0;

/// Aggregate a record set into dashboard statistics.
///
/// Total over its input: an empty slice yields the all-zero value.
pub fn compute_statistics(records: &[MatchRecord]) -> MatchStatistics {
    if records.is_empty() {
        return MatchStatistics::default();
    }

    let total_matches = records.len() as u32;
    let mut stats = MatchStatistics {
        total_matches,
        ..MatchStatistics::default()
    };

    let mut home_goals: u64 = 0;
    let mut away_goals: u64 = 0;

    for record in records {
        match record.result_computed {
            Some(MatchResult::Home) => stats.home_wins += 1,
            Some(MatchResult::Draw) => stats.draws += 1,
            Some(MatchResult::Away) => stats.away_wins += 1,
            None => {}
        }

        if record.is_btts() {
            stats.btts_count += 1;
        }
        if record.is_comeback() {
            stats.comeback_count += 1;
        }

        home_goals += u64::from(record.full_time_home_goals);
        away_goals += u64::from(record.full_time_away_goals);

        if is_halftime_transformation(record) {
            stats.halftime_transformations += 1;
        }
    }

    stats.avg_goals = average(home_goals + away_goals, total_matches);
    stats.home_avg_goals = average(home_goals, total_matches);
    stats.away_avg_goals = average(away_goals, total_matches);

    stats.home_win_percentage = percentage(stats.home_wins, total_matches);
    stats.draw_percentage = percentage(stats.draws, total_matches);
    stats.away_win_percentage = percentage(stats.away_wins, total_matches);
    stats.btts_percentage = percentage(stats.btts_count, total_matches);
    stats.comeback_percentage = percentage(stats.comeback_count, total_matches);

    stats.most_frequent_results = most_frequent_results(records, total_matches);

    stats
}

/// Records without both halftime scores never count. A record whose
/// `result_computed` is absent counts whenever it has halftime data.
fn is_halftime_transformation(record: &MatchRecord) -> bool {
    match record.halftime_winner() {
        Some(halftime) => record.result_computed != Some(halftime),
        None => false,
    }
}

/// Final scores ranked by count; equal counts keep first-seen order.
fn most_frequent_results(records: &[MatchRecord], total_matches: u32) -> Vec<ScoreFrequency> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, u32)> = Vec::new();

    for record in records {
        let score = format!("{}:{}", record.full_time_home_goals, record.full_time_away_goals);
        match index.get(&score) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(score.clone(), counts.len());
                counts.push((score, 1));
            }
        }
    }

    // sort_by is stable, which is what gives the first-seen tie-break
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .take(TOP_RESULTS)
        .map(|(score, count)| ScoreFrequency {
            score,
            count,
            percentage: percentage(count, total_matches),
        })
        .collect()
}

/// Classify a head-to-head aggregate into a confidence bucket and a recommendation.
///
/// Works on the already-rounded percentages. When outcomes tie at the maximum,
/// home is preferred over away, and away over draw.
pub fn compute_prediction_quality(stats: &MatchStatistics) -> PredictionQuality {
    let home = stats.home_win_percentage;
    let away = stats.away_win_percentage;
    let draw = stats.draw_percentage;
    let btts = stats.btts_percentage;

    let max_pct = home.max(away).max(draw);

    let leader = if home == max_pct {
        MatchResult::Home
    } else if away == max_pct {
        MatchResult::Away
    } else {
        MatchResult::Draw
    };

    let (confidence, mut recommendation) = if max_pct >= HIGH_CONFIDENCE_PCT {
        let text = match leader {
            MatchResult::Home => "Home win",
            MatchResult::Away => "Away win",
            MatchResult::Draw => "Draw (highlighted)",
        };
        (Confidence::High, text.to_string())
    } else if max_pct >= MEDIUM_CONFIDENCE_PCT {
        let text = match leader {
            MatchResult::Home => "Home win (medium confidence)",
            MatchResult::Away => "Away win (medium confidence)",
            MatchResult::Draw => "Draw (medium confidence)",
        };
        (Confidence::Medium, text.to_string())
    } else {
        (Confidence::Low, "Uncertain outcome".to_string())
    };

    if btts >= BTTS_QUALIFIED_PCT {
        recommendation.push_str(" + BTTS");
    }

    PredictionQuality {
        home_qualified: home >= QUALIFIED_PCT,
        away_qualified: away >= QUALIFIED_PCT,
        draw_highlighted: draw > DRAW_HIGHLIGHT_PCT,
        btts_qualified: btts >= BTTS_QUALIFIED_PCT,
        confidence_level: max_pct,
        confidence,
        recommendation,
    }
}
