use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;

use crate::models::{
    AdvancedAnalytics, BttsAnalysis, ComebackAnalysis, GoalsTrend, HalftimeScenario,
    HalftimeVsFulltime, MatchRecord, MatchResult, MonthlyBtts, MonthlyTrend, ResultCount,
    ScenarioCount, WeekdayResults,
};
use crate::utils::{average, percentage};

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Counts keyed by label, remembering first-seen order for tie-breaks.
#[derive(Default)]
struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<(String, u32)>,
}

impl Tally {
    fn add(&mut self, key: String) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    fn top(mut self, limit: usize) -> Vec<(String, u32)> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries.truncate(limit);
        self.entries
    }
}

#[derive(Default)]
struct MonthBucket {
    total: u32,
    goals: u64,
    btts: u32,
    comebacks: u32,
}

#[derive(Default)]
struct DayBucket {
    matches: u32,
    goals: u64,
    btts: u32,
}

/// Extended breakdowns behind the charts panel. `None` for an empty record set.
pub fn compute_advanced_analytics(records: &[MatchRecord]) -> Option<AdvancedAnalytics> {
    if records.is_empty() {
        return None;
    }

    let total = records.len() as u32;

    let mut results = Tally::default();
    let mut comeback_scenarios = Tally::default();
    let mut htft_scenarios = Tally::default();
    let mut months: BTreeMap<String, MonthBucket> = BTreeMap::new();
    let mut days: [DayBucket; 7] = Default::default();

    let mut over_25 = 0u32;
    let mut btts_true = 0u32;
    let mut total_comebacks = 0u32;
    let mut correlated = 0u32;

    for record in records {
        results.add(format!(
            "{}-{}",
            record.full_time_home_goals, record.full_time_away_goals
        ));

        if record.total_goals() >= 3 {
            over_25 += 1;
        }
        if record.is_btts() {
            btts_true += 1;
        }
        if record.is_comeback() {
            total_comebacks += 1;
        }

        let month = months
            .entry(record.match_time.format("%Y-%m").to_string())
            .or_default();
        month.total += 1;
        month.goals += u64::from(record.total_goals());
        month.btts += u32::from(record.is_btts());
        month.comebacks += u32::from(record.is_comeback());

        let day = &mut days[record.match_time.weekday().num_days_from_monday() as usize];
        day.matches += 1;
        day.goals += u64::from(record.total_goals());
        day.btts += u32::from(record.is_btts());

        if let Some(halftime) = record.halftime_winner() {
            let fulltime = record.result_computed.unwrap_or(MatchResult::Draw);

            if record.is_comeback() {
                comeback_scenarios.add(format!("{} → {}", halftime, fulltime));
            }

            htft_scenarios.add(format!(
                "{}-{} → {}-{}",
                record.half_time_home_goals.unwrap_or(0),
                record.half_time_away_goals.unwrap_or(0),
                record.full_time_home_goals,
                record.full_time_away_goals
            ));

            if halftime == fulltime {
                correlated += 1;
            }
        }
    }

    let most_common_results = results
        .top(10)
        .into_iter()
        .map(|(result, count)| ResultCount {
            result,
            count,
            percentage: percentage(count, total),
        })
        .collect();

    let under_25 = total - over_25;
    let goals_trend = GoalsTrend {
        over_25_goals: over_25,
        under_25_goals: under_25,
        over_25_percentage: percentage(over_25, total),
        under_25_percentage: percentage(under_25, total),
    };

    let monthly_trend = last_n(
        months
            .iter()
            .map(|(month, bucket)| MonthlyBtts {
                month: month.clone(),
                btts_rate: percentage(bucket.btts, bucket.total),
                matches: bucket.total,
            })
            .collect(),
        6,
    );

    let btts_analysis = BttsAnalysis {
        btts_true,
        btts_false: total - btts_true,
        btts_percentage: percentage(btts_true, total),
        monthly_trend,
    };

    let weekly_results = WEEKDAYS
        .iter()
        .zip(days.iter())
        .map(|(name, bucket)| WeekdayResults {
            day: name.to_string(),
            matches: bucket.matches,
            avg_goals: average(bucket.goals, bucket.matches),
            btts_rate: percentage(bucket.btts, bucket.matches),
        })
        .collect();

    let comeback_analysis = ComebackAnalysis {
        total_comebacks,
        comeback_percentage: percentage(total_comebacks, total),
        by_scoreline: comeback_scenarios
            .top(5)
            .into_iter()
            .map(|(scenario, count)| ScenarioCount {
                scenario,
                count,
                percentage: percentage(count, total_comebacks),
            })
            .collect(),
    };

    let halftime_vs_fulltime = HalftimeVsFulltime {
        correlation_rate: percentage(correlated, total),
        scenarios: htft_scenarios
            .top(10)
            .into_iter()
            .map(|(scenario, count)| {
                let (halftime, fulltime) = scenario
                    .split_once(" → ")
                    .map(|(h, f)| (h.to_string(), f.to_string()))
                    .unwrap_or_else(|| (scenario.clone(), String::new()));
                HalftimeScenario {
                    halftime,
                    fulltime,
                    count,
                    percentage: percentage(count, total),
                }
            })
            .collect(),
    };

    let seasonal_trends = last_n(
        months
            .iter()
            .map(|(month, bucket)| MonthlyTrend {
                month: month.clone(),
                avg_goals: average(bucket.goals, bucket.total),
                btts_rate: percentage(bucket.btts, bucket.total),
                comeback_rate: percentage(bucket.comebacks, bucket.total),
            })
            .collect(),
        12,
    );

    Some(AdvancedAnalytics {
        most_common_results,
        goals_trend,
        btts_analysis,
        weekly_results,
        comeback_analysis,
        halftime_vs_fulltime,
        seasonal_trends,
    })
}

fn last_n<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    let skip = items.len().saturating_sub(n);
    items.drain(..skip);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn played(year: i32, month: u32, day: u32, full_time: (u32, u32), half_time: Option<(u32, u32)>) -> MatchRecord {
        MatchRecord::from_scores(
            "Kisvárda",
            "Mezőkövesd",
            full_time,
            half_time,
            Utc.with_ymd_and_hms(year, month, day, 17, 30, 0).unwrap(),
        )
    }

    #[test]
    fn test_empty_input_has_no_analytics() {
        assert!(compute_advanced_analytics(&[]).is_none());
    }

    #[test]
    fn test_goals_trend_and_btts() {
        let records = vec![
            played(2024, 3, 2, (2, 1), Some((1, 0))),
            played(2024, 3, 9, (0, 0), Some((0, 0))),
            played(2024, 3, 16, (1, 0), None),
            played(2024, 3, 23, (3, 3), Some((0, 2))),
        ];
        let analytics = compute_advanced_analytics(&records).unwrap();

        assert_eq!(analytics.goals_trend.over_25_goals, 2);
        assert_eq!(analytics.goals_trend.under_25_goals, 2);
        assert_eq!(analytics.goals_trend.over_25_percentage, 50.0);
        assert_eq!(analytics.btts_analysis.btts_true, 2);
        assert_eq!(analytics.btts_analysis.btts_false, 2);
        assert_eq!(analytics.btts_analysis.monthly_trend.len(), 1);
        assert_eq!(analytics.btts_analysis.monthly_trend[0].month, "2024-03");
        assert_eq!(analytics.btts_analysis.monthly_trend[0].btts_rate, 50.0);
    }

    #[test]
    fn test_weekly_results_cover_every_day() {
        // 2024-03-02 is a Saturday
        let records = vec![
            played(2024, 3, 2, (2, 2), None),
            played(2024, 3, 9, (1, 0), None),
        ];
        let analytics = compute_advanced_analytics(&records).unwrap();

        assert_eq!(analytics.weekly_results.len(), 7);
        let saturday = &analytics.weekly_results[5];
        assert_eq!(saturday.day, "Saturday");
        assert_eq!(saturday.matches, 2);
        assert_eq!(saturday.avg_goals, 2.5);
        assert_eq!(saturday.btts_rate, 50.0);
        assert_eq!(analytics.weekly_results[0].matches, 0);
        assert_eq!(analytics.weekly_results[0].avg_goals, 0.0);
    }

    #[test]
    fn test_comeback_scenarios() {
        let records = vec![
            played(2024, 4, 6, (2, 1), Some((0, 1))),
            played(2024, 4, 13, (1, 1), Some((0, 1))),
            played(2024, 4, 20, (3, 2), Some((1, 2))),
            played(2024, 4, 27, (1, 0), Some((1, 0))),
        ];
        let analytics = compute_advanced_analytics(&records).unwrap();
        let comebacks = &analytics.comeback_analysis;

        assert_eq!(comebacks.total_comebacks, 3);
        assert_eq!(comebacks.comeback_percentage, 75.0);
        assert_eq!(comebacks.by_scoreline[0].scenario, "A → H");
        assert_eq!(comebacks.by_scoreline[0].count, 2);
        assert_eq!(comebacks.by_scoreline[0].percentage, 66.7);
        assert_eq!(comebacks.by_scoreline[1].scenario, "A → D");
    }

    #[test]
    fn test_halftime_vs_fulltime_uses_total_as_denominator() {
        let records = vec![
            played(2024, 4, 6, (2, 0), Some((1, 0))),
            played(2024, 4, 13, (2, 0), Some((1, 0))),
            played(2024, 4, 20, (0, 1), Some((1, 0))),
            played(2024, 4, 27, (1, 1), None),
        ];
        let analytics = compute_advanced_analytics(&records).unwrap();
        let htft = &analytics.halftime_vs_fulltime;

        assert_eq!(htft.correlation_rate, 50.0);
        assert_eq!(htft.scenarios[0].halftime, "1-0");
        assert_eq!(htft.scenarios[0].fulltime, "2-0");
        assert_eq!(htft.scenarios[0].count, 2);
        assert_eq!(htft.scenarios[0].percentage, 50.0);
        assert_eq!(htft.scenarios.len(), 2);
    }

    #[test]
    fn test_seasonal_trends_keep_last_twelve_months() {
        let mut records = Vec::new();
        for month in 1..=12 {
            records.push(played(2023, month, 10, (1, 0), None));
        }
        records.push(played(2024, 1, 10, (4, 1), None));
        records.push(played(2024, 2, 10, (0, 0), None));

        let analytics = compute_advanced_analytics(&records).unwrap();
        let trends = &analytics.seasonal_trends;
        assert_eq!(trends.len(), 12);
        assert_eq!(trends.first().unwrap().month, "2023-03");
        assert_eq!(trends.last().unwrap().month, "2024-02");
        assert_eq!(trends[10].avg_goals, 5.0);
        assert_eq!(analytics.btts_analysis.monthly_trend.len(), 6);
    }
}
