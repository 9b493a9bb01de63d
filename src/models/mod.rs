use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Full-time (or half-time) outcome code as stored upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "A")]
    Away,
}

impl MatchResult {
    pub fn code(self) -> &'static str {
        match self {
            MatchResult::Home => "H",
            MatchResult::Draw => "D",
            MatchResult::Away => "A",
        }
    }

    /// Unrecognized codes map to `None` rather than an error.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "H" => Some(MatchResult::Home),
            "D" => Some(MatchResult::Draw),
            "A" => Some(MatchResult::Away),
            _ => None,
        }
    }

    pub fn from_goals(home: u32, away: u32) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => MatchResult::Home,
            std::cmp::Ordering::Less => MatchResult::Away,
            std::cmp::Ordering::Equal => MatchResult::Draw,
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One historical match as delivered by the match store.
///
/// Default-fill rules live here and nowhere else:
/// * absent or `null` full-time goals read as `0`;
/// * an unrecognized `result_computed` code reads as absent;
/// * absent halftime goals stay `None` and exclude the record from halftime analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(default)]
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default, deserialize_with = "goals_or_zero")]
    pub full_time_home_goals: u32,
    #[serde(default, deserialize_with = "goals_or_zero")]
    pub full_time_away_goals: u32,
    #[serde(default)]
    pub half_time_home_goals: Option<u32>,
    #[serde(default)]
    pub half_time_away_goals: Option<u32>,
    #[serde(default, deserialize_with = "lenient_result")]
    pub result_computed: Option<MatchResult>,
    #[serde(default)]
    pub btts_computed: Option<bool>,
    #[serde(default)]
    pub comeback_computed: Option<bool>,
    pub match_time: DateTime<Utc>,
}

fn goals_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}

fn lenient_result<'de, D>(deserializer: D) -> Result<Option<MatchResult>, D::Error>
where
    D: Deserializer<'de>,
{
    let code = Option::<String>::deserialize(deserializer)?;
    Ok(code.as_deref().and_then(MatchResult::from_code))
}

impl MatchRecord {
    /// Build a record from raw scores, deriving result, BTTS and comeback flags.
    pub fn from_scores(
        home_team: &str,
        away_team: &str,
        full_time: (u32, u32),
        half_time: Option<(u32, u32)>,
        match_time: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            id: uuid::Uuid::new_v4().to_string(),
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            full_time_home_goals: full_time.0,
            full_time_away_goals: full_time.1,
            half_time_home_goals: half_time.map(|(h, _)| h),
            half_time_away_goals: half_time.map(|(_, a)| a),
            result_computed: None,
            btts_computed: None,
            comeback_computed: None,
            match_time,
        };
        record.fill_derived();
        record
    }

    /// Fill in any absent precomputed flag from the goals.
    pub fn fill_derived(&mut self) {
        let (home, away) = (self.full_time_home_goals, self.full_time_away_goals);
        if self.result_computed.is_none() {
            self.result_computed = Some(MatchResult::from_goals(home, away));
        }
        if self.btts_computed.is_none() {
            self.btts_computed = Some(home > 0 && away > 0);
        }
        if self.comeback_computed.is_none() {
            let comeback = match (self.half_time_home_goals, self.half_time_away_goals) {
                (Some(ht_home), Some(ht_away)) if ht_home < ht_away => home >= away,
                (Some(ht_home), Some(ht_away)) if ht_away < ht_home => away >= home,
                _ => false,
            };
            self.comeback_computed = Some(comeback);
        }
    }

    /// Winner at half time; `None` when either halftime score is unknown.
    pub fn halftime_winner(&self) -> Option<MatchResult> {
        match (self.half_time_home_goals, self.half_time_away_goals) {
            (Some(home), Some(away)) => Some(MatchResult::from_goals(home, away)),
            _ => None,
        }
    }

    pub fn total_goals(&self) -> u32 {
        self.full_time_home_goals + self.full_time_away_goals
    }

    pub fn is_btts(&self) -> bool {
        self.btts_computed == Some(true)
    }

    pub fn is_comeback(&self) -> bool {
        self.comeback_computed == Some(true)
    }

    pub fn validate(&self) -> Result<(), InvalidRecord> {
        if self.home_team.trim().is_empty() {
            return Err(InvalidRecord::EmptyTeam("home_team"));
        }
        if self.away_team.trim().is_empty() {
            return Err(InvalidRecord::EmptyTeam("away_team"));
        }
        if let Some(recorded) = self.result_computed {
            let expected = MatchResult::from_goals(self.full_time_home_goals, self.full_time_away_goals);
            if recorded != expected {
                return Err(InvalidRecord::InconsistentResult { recorded, expected });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRecord {
    #[error("{0} must not be empty")]
    EmptyTeam(&'static str),

    #[error("result_computed is {recorded} but the score says {expected}")]
    InconsistentResult {
        recorded: MatchResult,
        expected: MatchResult,
    },
}

// Aggregation output

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFrequency {
    pub score: String,
    pub count: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub total_matches: u32,
    pub home_wins: u32,
    pub draws: u32,
    pub away_wins: u32,
    pub btts_count: u32,
    pub comeback_count: u32,
    pub avg_goals: f64,
    pub home_avg_goals: f64,
    pub away_avg_goals: f64,
    pub home_win_percentage: f64,
    pub draw_percentage: f64,
    pub away_win_percentage: f64,
    pub btts_percentage: f64,
    pub comeback_percentage: f64,
    pub most_frequent_results: Vec<ScoreFrequency>,
    pub halftime_transformations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionQuality {
    pub home_qualified: bool,
    pub away_qualified: bool,
    pub draw_highlighted: bool,
    pub btts_qualified: bool,
    pub confidence_level: f64,
    pub confidence: Confidence,
    pub recommendation: String,
}

// Filtering and paging

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchFilters {
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub btts_computed: Option<bool>,
    pub comeback_computed: Option<bool>,
    pub result_computed: Option<MatchResult>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl MatchFilters {
    pub fn for_pair(home_team: &str, away_team: &str) -> Self {
        Self {
            home_team: Some(home_team.to_string()),
            away_team: Some(away_team.to_string()),
            ..Self::default()
        }
    }

    /// Empty team strings behave as "no filter", like an unselected dropdown.
    pub fn normalized(mut self) -> Self {
        self.home_team = self.home_team.filter(|t| !t.trim().is_empty());
        self.away_team = self.away_team.filter(|t| !t.trim().is_empty());
        self
    }

    /// In-memory counterpart of the store's SQL filter.
    #[cfg(test)]
    pub fn matches(&self, record: &MatchRecord) -> bool {
        self.home_team.as_deref().map_or(true, |t| record.home_team == t)
            && self.away_team.as_deref().map_or(true, |t| record.away_team == t)
            && self.btts_computed.map_or(true, |b| record.btts_computed == Some(b))
            && self.comeback_computed.map_or(true, |c| record.comeback_computed == Some(c))
            && self.result_computed.map_or(true, |r| record.result_computed == Some(r))
            && self.date_from.map_or(true, |from| record.match_time >= from)
            && self.date_to.map_or(true, |to| record.match_time <= to)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    MatchTime,
    HomeTeam,
    AwayTeam,
    TotalGoals,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
    pub page_numbers: Vec<u64>,
}

// Presets and layout

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFilter {
    pub id: String,
    pub name: String,
    pub filters: MatchFilters,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetSize {
    Small,
    Medium,
    Large,
}

impl WidgetSize {
    pub fn as_str(self) -> &'static str {
        match self {
            WidgetSize::Small => "small",
            WidgetSize::Medium => "medium",
            WidgetSize::Large => "large",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "small" => Some(WidgetSize::Small),
            "medium" => Some(WidgetSize::Medium),
            "large" => Some(WidgetSize::Large),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardWidget {
    pub id: String,
    pub component: String,
    pub position: u32,
    pub visible: bool,
    pub size: Option<WidgetSize>,
}

// Head-to-head predictions

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPair {
    pub home_team: String,
    pub away_team: String,
}

impl TeamPair {
    pub fn is_complete(&self) -> bool {
        !self.home_team.trim().is_empty() && !self.away_team.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairStatistics {
    #[serde(flatten)]
    pub stats: MatchStatistics,
    pub prediction_quality: PredictionQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairPrediction {
    pub pair: TeamPair,
    pub stats: Option<PairStatistics>,
}

impl PairPrediction {
    pub fn btts_percentage(&self) -> f64 {
        self.stats.as_ref().map_or(0.0, |s| s.stats.btts_percentage)
    }
}

// Extended analytics

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultCount {
    pub result: String,
    pub count: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalsTrend {
    pub over_25_goals: u32,
    pub under_25_goals: u32,
    pub over_25_percentage: f64,
    pub under_25_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBtts {
    pub month: String,
    pub btts_rate: f64,
    pub matches: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BttsAnalysis {
    pub btts_true: u32,
    pub btts_false: u32,
    pub btts_percentage: f64,
    pub monthly_trend: Vec<MonthlyBtts>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayResults {
    pub day: String,
    pub matches: u32,
    pub avg_goals: f64,
    pub btts_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCount {
    pub scenario: String,
    pub count: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComebackAnalysis {
    pub total_comebacks: u32,
    pub comeback_percentage: f64,
    pub by_scoreline: Vec<ScenarioCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalftimeScenario {
    pub halftime: String,
    pub fulltime: String,
    pub count: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalftimeVsFulltime {
    pub correlation_rate: f64,
    pub scenarios: Vec<HalftimeScenario>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub month: String,
    pub avg_goals: f64,
    pub btts_rate: f64,
    pub comeback_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedAnalytics {
    pub most_common_results: Vec<ResultCount>,
    pub goals_trend: GoalsTrend,
    pub btts_analysis: BttsAnalysis,
    pub weekly_results: Vec<WeekdayResults>,
    pub comeback_analysis: ComebackAnalysis,
    pub halftime_vs_fulltime: HalftimeVsFulltime,
    pub seasonal_trends: Vec<MonthlyTrend>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_from_scores_derives_flags() {
        let record = MatchRecord::from_scores("Ferencváros", "Újpest", (2, 1), Some((0, 1)), kickoff());
        assert_eq!(record.result_computed, Some(MatchResult::Home));
        assert_eq!(record.btts_computed, Some(true));
        assert_eq!(record.comeback_computed, Some(true));

        let record = MatchRecord::from_scores("Ferencváros", "Újpest", (1, 0), None, kickoff());
        assert_eq!(record.btts_computed, Some(false));
        assert_eq!(record.comeback_computed, Some(false));
    }

    #[test]
    fn test_trailing_side_drawing_is_a_comeback() {
        let record = MatchRecord::from_scores("Paks", "Debrecen", (1, 1), Some((1, 0)), kickoff());
        assert_eq!(record.comeback_computed, Some(true));
        assert_eq!(record.result_computed, Some(MatchResult::Draw));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let json = r#"{
            "home_team": "Paks",
            "away_team": "Debrecen",
            "full_time_home_goals": null,
            "full_time_away_goals": 2,
            "result_computed": "X",
            "match_time": "2024-03-09T15:00:00Z"
        }"#;
        let record: MatchRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.full_time_home_goals, 0);
        assert_eq!(record.full_time_away_goals, 2);
        assert_eq!(record.result_computed, None);
        assert_eq!(record.half_time_home_goals, None);
        assert_eq!(record.btts_computed, None);
    }

    #[test]
    fn test_validate() {
        let mut record = MatchRecord::from_scores("Paks", "Debrecen", (3, 0), None, kickoff());
        assert_eq!(record.validate(), Ok(()));

        record.result_computed = Some(MatchResult::Away);
        assert_eq!(
            record.validate(),
            Err(InvalidRecord::InconsistentResult {
                recorded: MatchResult::Away,
                expected: MatchResult::Home,
            })
        );

        record.home_team = "  ".to_string();
        assert_eq!(record.validate(), Err(InvalidRecord::EmptyTeam("home_team")));
    }

    #[test]
    fn test_filters_match() {
        let record = MatchRecord::from_scores("Paks", "Debrecen", (2, 2), Some((0, 2)), kickoff());
        assert!(MatchFilters::default().matches(&record));
        assert!(MatchFilters::for_pair("Paks", "Debrecen").matches(&record));
        assert!(!MatchFilters::for_pair("Debrecen", "Paks").matches(&record));

        let filters = MatchFilters {
            btts_computed: Some(true),
            comeback_computed: Some(true),
            result_computed: Some(MatchResult::Draw),
            date_from: Some(kickoff()),
            date_to: Some(kickoff()),
            ..MatchFilters::default()
        };
        assert!(filters.matches(&record));

        let filters = MatchFilters {
            result_computed: Some(MatchResult::Home),
            ..MatchFilters::default()
        };
        assert!(!filters.matches(&record));
    }

    #[test]
    fn test_normalized_drops_blank_teams() {
        let filters = MatchFilters {
            home_team: Some(" ".to_string()),
            away_team: Some("Paks".to_string()),
            ..MatchFilters::default()
        }
        .normalized();
        assert_eq!(filters.home_team, None);
        assert_eq!(filters.away_team.as_deref(), Some("Paks"));
    }
}
