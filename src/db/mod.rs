pub mod seed;
pub use seed::seed_data;

use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::env;
use std::str::FromStr;

use crate::models::*;
use crate::services::layout::default_layout;
use crate::utils::{page_numbers, total_pages};

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 500;

pub async fn clear_all_data(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM matches").execute(pool).await?;
    sqlx::query("DELETE FROM saved_filters").execute(pool).await?;
    sqlx::query("DELETE FROM dashboard_layout").execute(pool).await?;
    tracing::info!("All data cleared");
    Ok(())
}

pub async fn create_pool() -> Result<SqlitePool> {
    let database_url = env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:data/winmix.db".to_string());

    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(&database_url);

    if let Some(parent) = std::path::Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
    }

    let options = SqliteConnectOptions::from_str(&database_url)?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database() -> Result<()> {
    let pool = create_pool().await?;
    init_database_with_pool(&pool).await
}

/// Called from the server so schema creation shares the main pool.
pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id TEXT PRIMARY KEY,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            full_time_home_goals INTEGER NOT NULL DEFAULT 0,
            full_time_away_goals INTEGER NOT NULL DEFAULT 0,
            half_time_home_goals INTEGER,
            half_time_away_goals INTEGER,
            result_computed TEXT,
            btts_computed INTEGER,
            comeback_computed INTEGER,
            match_time TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS saved_filters (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            filters TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dashboard_layout (
            id TEXT PRIMARY KEY,
            component TEXT NOT NULL,
            position INTEGER NOT NULL,
            visible INTEGER NOT NULL DEFAULT 1,
            size TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_time ON matches(match_time)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_teams ON matches(home_team, away_team)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn decode_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn goals(row: &SqliteRow, column: &str) -> Option<u32> {
    row.get::<Option<i64>, _>(column)
        .and_then(|g| u32::try_from(g).ok())
}

fn record_from_row(row: &SqliteRow) -> Result<MatchRecord> {
    Ok(MatchRecord {
        id: row.get("id"),
        home_team: row.get("home_team"),
        away_team: row.get("away_team"),
        full_time_home_goals: goals(row, "full_time_home_goals").unwrap_or(0),
        full_time_away_goals: goals(row, "full_time_away_goals").unwrap_or(0),
        half_time_home_goals: goals(row, "half_time_home_goals"),
        half_time_away_goals: goals(row, "half_time_away_goals"),
        result_computed: row
            .get::<Option<String>, _>("result_computed")
            .as_deref()
            .and_then(MatchResult::from_code),
        btts_computed: row.get("btts_computed"),
        comeback_computed: row.get("comeback_computed"),
        match_time: decode_time(&row.get::<String, _>("match_time"))?,
    })
}

// Match operations

/// Accepts the pool or an open transaction.
pub async fn upsert_match<'e, E>(executor: E, record: &MatchRecord) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO matches
        (id, home_team, away_team, full_time_home_goals, full_time_away_goals,
         half_time_home_goals, half_time_away_goals, result_computed,
         btts_computed, comeback_computed, match_time)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.home_team)
    .bind(&record.away_team)
    .bind(i64::from(record.full_time_home_goals))
    .bind(i64::from(record.full_time_away_goals))
    .bind(record.half_time_home_goals.map(i64::from))
    .bind(record.half_time_away_goals.map(i64::from))
    .bind(record.result_computed.map(|r| r.code()))
    .bind(record.btts_computed)
    .bind(record.comeback_computed)
    .bind(encode_time(&record.match_time))
    .execute(executor)
    .await?;

    Ok(())
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &MatchFilters) {
    builder.push(" WHERE 1=1");

    if let Some(team) = &filters.home_team {
        builder.push(" AND home_team = ").push_bind(team.clone());
    }
    if let Some(team) = &filters.away_team {
        builder.push(" AND away_team = ").push_bind(team.clone());
    }
    if let Some(btts) = filters.btts_computed {
        builder.push(" AND btts_computed = ").push_bind(btts);
    }
    if let Some(comeback) = filters.comeback_computed {
        builder.push(" AND comeback_computed = ").push_bind(comeback);
    }
    if let Some(result) = filters.result_computed {
        builder.push(" AND result_computed = ").push_bind(result.code());
    }
    if let Some(from) = &filters.date_from {
        builder.push(" AND match_time >= ").push_bind(encode_time(from));
    }
    if let Some(to) = &filters.date_to {
        builder.push(" AND match_time <= ").push_bind(encode_time(to));
    }
}

fn order_clause(sort_by: SortField, direction: SortDirection) -> String {
    let column = match sort_by {
        SortField::MatchTime => "match_time",
        SortField::HomeTeam => "home_team",
        SortField::AwayTeam => "away_team",
        SortField::TotalGoals => "(full_time_home_goals + full_time_away_goals)",
    };
    let direction = match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    format!(" ORDER BY {} {}, id ASC", column, direction)
}

pub async fn count_matches(pool: &SqlitePool, filters: &MatchFilters) -> Result<u64> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM matches");
    push_filters(&mut builder, filters);

    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count.max(0) as u64)
}

/// Every match satisfying `filters`, newest first. Feeds the aggregators.
pub async fn fetch_matches(pool: &SqlitePool, filters: &MatchFilters) -> Result<Vec<MatchRecord>> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM matches");
    push_filters(&mut builder, filters);
    builder.push(order_clause(SortField::MatchTime, SortDirection::Desc));

    let rows = builder.build().fetch_all(pool).await?;
    rows.iter().map(record_from_row).collect()
}

/// One page of matches for the results table.
pub async fn query_matches(
    pool: &SqlitePool,
    filters: &MatchFilters,
    page: u64,
    page_size: u64,
    sort_by: SortField,
    direction: SortDirection,
) -> Result<Page<MatchRecord>> {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

    let total_count = count_matches(pool, filters).await?;
    let total_pages = total_pages(total_count, page_size);
    // requests past the end land on the last page
    let page = page.clamp(1, total_pages.max(1));
    let offset = i64::try_from((page - 1).saturating_mul(page_size)).unwrap_or(i64::MAX);

    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM matches");
    push_filters(&mut builder, filters);
    builder.push(order_clause(sort_by, direction));
    builder
        .push(" LIMIT ")
        .push_bind(page_size as i64)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = builder.build().fetch_all(pool).await?;
    let items = rows.iter().map(record_from_row).collect::<Result<Vec<_>>>()?;

    Ok(Page {
        items,
        total_count,
        total_pages,
        current_page: page,
        page_size,
        page_numbers: page_numbers(page, total_pages),
    })
}

/// Distinct team names appearing on either side, sorted.
pub async fn fetch_teams(pool: &SqlitePool) -> Result<Vec<String>> {
    let teams = sqlx::query_scalar::<_, String>(
        "SELECT home_team FROM matches UNION SELECT away_team FROM matches ORDER BY 1",
    )
    .fetch_all(pool)
    .await?;
    Ok(teams)
}

// Saved filter operations

fn saved_filter_from_row(row: &SqliteRow) -> Result<SavedFilter> {
    Ok(SavedFilter {
        id: row.get("id"),
        name: row.get("name"),
        filters: serde_json::from_str(&row.get::<String, _>("filters"))?,
        created_at: decode_time(&row.get::<String, _>("created_at"))?,
    })
}

pub async fn insert_saved_filter(pool: &SqlitePool, filter: &SavedFilter) -> Result<()> {
    sqlx::query("INSERT INTO saved_filters (id, name, filters, created_at) VALUES (?, ?, ?, ?)")
        .bind(&filter.id)
        .bind(&filter.name)
        .bind(serde_json::to_string(&filter.filters)?)
        .bind(filter.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_saved_filters(pool: &SqlitePool) -> Result<Vec<SavedFilter>> {
    let rows = sqlx::query("SELECT * FROM saved_filters ORDER BY created_at ASC, rowid ASC")
        .fetch_all(pool)
        .await?;
    rows.iter().map(saved_filter_from_row).collect()
}

pub async fn get_saved_filter(pool: &SqlitePool, id: &str) -> Result<Option<SavedFilter>> {
    let row = sqlx::query("SELECT * FROM saved_filters WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(saved_filter_from_row).transpose()
}

/// Returns `false` when no preset has that id.
pub async fn update_saved_filter(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    filters: &MatchFilters,
) -> Result<bool> {
    let result = sqlx::query("UPDATE saved_filters SET name = ?, filters = ? WHERE id = ?")
        .bind(name)
        .bind(serde_json::to_string(filters)?)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_saved_filter(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM saved_filters WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear_saved_filters(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM saved_filters").execute(pool).await?;
    Ok(result.rows_affected())
}

// Dashboard layout operations

/// Stored widget order; the default layout when nothing has been saved.
pub async fn load_layout(pool: &SqlitePool) -> Result<Vec<DashboardWidget>> {
    let rows = sqlx::query("SELECT * FROM dashboard_layout ORDER BY position ASC, id ASC")
        .fetch_all(pool)
        .await?;

    if rows.is_empty() {
        return Ok(default_layout());
    }

    rows.iter()
        .map(|row| {
            let position: i64 = row.get("position");
            Ok(DashboardWidget {
                id: row.get("id"),
                component: row.get("component"),
                position: u32::try_from(position)
                    .map_err(|_| anyhow!("invalid widget position {}", position))?,
                visible: row.get("visible"),
                size: row
                    .get::<Option<String>, _>("size")
                    .as_deref()
                    .and_then(WidgetSize::parse),
            })
        })
        .collect()
}

/// Replace the stored layout in a single transaction.
pub async fn save_layout(pool: &SqlitePool, widgets: &[DashboardWidget]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM dashboard_layout")
        .execute(&mut *tx)
        .await?;

    for widget in widgets {
        sqlx::query(
            "INSERT INTO dashboard_layout (id, component, position, visible, size) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&widget.id)
        .bind(&widget.component)
        .bind(i64::from(widget.position))
        .bind(widget.visible)
        .bind(widget.size.map(WidgetSize::as_str))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // A single connection keeps every query on the same in-memory database.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_database_with_pool(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn on_day(day: u32, home: &str, away: &str, full_time: (u32, u32), half_time: Option<(u32, u32)>) -> MatchRecord {
        MatchRecord::from_scores(
            home,
            away,
            full_time,
            half_time,
            Utc.with_ymd_and_hms(2024, 2, day, 19, 0, 0).unwrap(),
        )
    }

    async fn seeded_pool() -> SqlitePool {
        let pool = test_pool().await;
        let records = vec![
            on_day(1, "Paks", "Debrecen", (2, 1), Some((0, 1))),
            on_day(2, "Paks", "Debrecen", (0, 0), Some((0, 0))),
            on_day(3, "Debrecen", "Paks", (1, 3), None),
            on_day(4, "Ferencváros", "Paks", (4, 0), Some((2, 0))),
            on_day(5, "Paks", "Ferencváros", (1, 1), Some((1, 0))),
        ];
        for record in &records {
            upsert_match(&pool, record).await.unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn test_round_trip_preserves_record() {
        let pool = test_pool().await;
        let mut record = on_day(7, "Paks", "Zalaegerszeg", (3, 2), None);
        record.btts_computed = None;
        upsert_match(&pool, &record).await.unwrap();

        let stored = fetch_matches(&pool, &MatchFilters::default()).await.unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[tokio::test]
    async fn test_filters_apply_every_predicate() {
        let pool = seeded_pool().await;

        let pair = fetch_matches(&pool, &MatchFilters::for_pair("Paks", "Debrecen")).await.unwrap();
        assert_eq!(pair.len(), 2);
        assert!(pair.iter().all(|m| m.home_team == "Paks" && m.away_team == "Debrecen"));
        // newest first
        assert!(pair[0].match_time > pair[1].match_time);

        let btts = MatchFilters {
            btts_computed: Some(true),
            ..MatchFilters::default()
        };
        assert_eq!(count_matches(&pool, &btts).await.unwrap(), 3);

        let comeback_draws = MatchFilters {
            comeback_computed: Some(true),
            result_computed: Some(MatchResult::Draw),
            ..MatchFilters::default()
        };
        let found = fetch_matches(&pool, &comeback_draws).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].home_team, "Paks");
        assert_eq!(found[0].away_team, "Ferencváros");

        let window = MatchFilters {
            date_from: Some(Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap()),
            date_to: Some(Utc.with_ymd_and_hms(2024, 2, 4, 19, 0, 0).unwrap()),
            ..MatchFilters::default()
        };
        assert_eq!(count_matches(&pool, &window).await.unwrap(), 3);

        let everything = fetch_matches(&pool, &MatchFilters::default()).await.unwrap();
        for filters in [btts, comeback_draws, window] {
            let expected = everything.iter().filter(|m| filters.matches(m)).count() as u64;
            assert_eq!(count_matches(&pool, &filters).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_query_matches_pages_and_sorts() {
        let pool = seeded_pool().await;

        let page = query_matches(&pool, &MatchFilters::default(), 2, 2, SortField::MatchTime, SortDirection::Desc)
            .await
            .unwrap();
        assert_eq!(page.total_count, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.page_numbers, vec![1, 2, 3]);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].match_time.format("%d").to_string(), "03");

        let by_goals = query_matches(&pool, &MatchFilters::default(), 1, 50, SortField::TotalGoals, SortDirection::Desc)
            .await
            .unwrap();
        assert_eq!(by_goals.items[0].total_goals(), 4);
        assert_eq!(by_goals.items.last().unwrap().total_goals(), 0);
    }

    #[tokio::test]
    async fn test_query_matches_clamps_page_past_the_end() {
        let pool = seeded_pool().await;

        let page = query_matches(&pool, &MatchFilters::default(), u64::MAX, 2, SortField::MatchTime, SortDirection::Desc)
            .await
            .unwrap();
        assert_eq!(page.current_page, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page_numbers, vec![1, 2, 3]);

        let empty = query_matches(&test_pool().await, &MatchFilters::default(), 7, 50, SortField::MatchTime, SortDirection::Desc)
            .await
            .unwrap();
        assert_eq!(empty.current_page, 1);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_teams_is_distinct_and_sorted() {
        let pool = seeded_pool().await;
        let teams = fetch_teams(&pool).await.unwrap();
        assert_eq!(teams, vec!["Debrecen", "Ferencváros", "Paks"]);
    }

    #[tokio::test]
    async fn test_saved_filter_crud() {
        let pool = test_pool().await;
        let filter = SavedFilter {
            id: "preset-1".to_string(),
            name: "Paks BTTS".to_string(),
            filters: MatchFilters {
                home_team: Some("Paks".to_string()),
                btts_computed: Some(true),
                ..MatchFilters::default()
            },
            created_at: Utc::now(),
        };
        insert_saved_filter(&pool, &filter).await.unwrap();

        let listed = list_saved_filters(&pool).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filters, filter.filters);

        let renamed = update_saved_filter(&pool, "preset-1", "Paks home", &MatchFilters::default())
            .await
            .unwrap();
        assert!(renamed);
        let stored = get_saved_filter(&pool, "preset-1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Paks home");
        assert_eq!(stored.filters, MatchFilters::default());

        assert!(!update_saved_filter(&pool, "missing", "x", &MatchFilters::default()).await.unwrap());
        assert!(delete_saved_filter(&pool, "preset-1").await.unwrap());
        assert!(!delete_saved_filter(&pool, "preset-1").await.unwrap());
        assert!(list_saved_filters(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_layout_defaults_then_persists() {
        let pool = test_pool().await;
        let layout = load_layout(&pool).await.unwrap();
        assert_eq!(layout, default_layout());

        let mut changed = layout.clone();
        changed.reverse();
        for (position, widget) in changed.iter_mut().enumerate() {
            widget.position = position as u32;
        }
        changed[0].visible = false;
        save_layout(&pool, &changed).await.unwrap();

        assert_eq!(load_layout(&pool).await.unwrap(), changed);
    }
}
