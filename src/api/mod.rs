use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::{
    create_pool, fetch_matches, fetch_teams, init_database_with_pool, load_layout, query_matches,
    save_layout, DEFAULT_PAGE_SIZE,
};
use crate::models::{
    AdvancedAnalytics, ApiResponse, DashboardWidget, ImportSummary, MatchFilters, MatchRecord,
    MatchStatistics, Page, PairPrediction, SavedFilter, SortDirection, SortField, TeamPair,
};
use crate::services::{
    compute_advanced_analytics, compute_statistics, default_layout, move_widget, to_csv_string,
    toggle_visibility, visible_widgets, DataFetcher, PredictionEngine, PredictionError,
    PresetError, PresetStore,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl From<PresetError> for ApiError {
    fn from(err: PresetError) -> Self {
        match err {
            PresetError::EmptyName => ApiError::BadRequest(err.to_string()),
            PresetError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PresetError::Store(e) => ApiError::Internal(e),
        }
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::Task(e) => ApiError::Internal(e.into()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub async fn serve(port: u16) -> anyhow::Result<()> {
    let pool = create_pool().await?;
    init_database_with_pool(&pool).await?;

    let app = create_router().with_state(pool);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("WinMix API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<SqlitePool> {
    Router::new()
        .route("/health", get(health_check))
        .route("/matches", get(list_matches_handler))
        .route("/matches/stats", get(match_stats_handler))
        .route("/matches/analytics", get(match_analytics_handler))
        .route("/matches/export", get(export_matches_handler))
        .route("/teams", get(list_teams_handler))
        .route("/predictions", post(predictions_handler))
        .route(
            "/filters",
            get(list_filters_handler)
                .post(save_filter_handler)
                .delete(clear_filters_handler),
        )
        .route(
            "/filters/{id}",
            put(update_filter_handler).delete(delete_filter_handler),
        )
        .route("/filters/{id}/stats", get(filter_stats_handler))
        .route("/layout", get(get_layout_handler).put(put_layout_handler))
        .route("/layout/visible", get(visible_layout_handler))
        .route("/layout/move", post(move_widget_handler))
        .route("/layout/{id}/toggle", post(toggle_widget_handler))
        .route("/layout/reset", post(reset_layout_handler))
        .route("/data/import", post(import_data_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("WinMix API is running"))
}

// GET /matches - one page of the results table
#[derive(Debug, Default, Deserialize)]
struct PageParams {
    page: Option<u64>,
    page_size: Option<u64>,
    sort_by: Option<SortField>,
    sort_dir: Option<SortDirection>,
}

async fn list_matches_handler(
    State(pool): State<SqlitePool>,
    Query(filters): Query<MatchFilters>,
    Query(params): Query<PageParams>,
) -> ApiResult<Page<MatchRecord>> {
    let page = query_matches(
        &pool,
        &filters.normalized(),
        params.page.unwrap_or(1),
        params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        params.sort_by.unwrap_or_default(),
        params.sort_dir.unwrap_or_default(),
    )
    .await?;

    Ok(Json(ApiResponse::success(page)))
}

// GET /matches/stats - aggregate statistics over every filtered match
async fn match_stats_handler(
    State(pool): State<SqlitePool>,
    Query(filters): Query<MatchFilters>,
) -> ApiResult<MatchStatistics> {
    let records = fetch_matches(&pool, &filters.normalized()).await?;
    Ok(Json(ApiResponse::success(compute_statistics(&records))))
}

// GET /matches/analytics - trends and scenario breakdowns
async fn match_analytics_handler(
    State(pool): State<SqlitePool>,
    Query(filters): Query<MatchFilters>,
) -> ApiResult<Option<AdvancedAnalytics>> {
    let records = fetch_matches(&pool, &filters.normalized()).await?;
    Ok(Json(ApiResponse::success(compute_advanced_analytics(&records))))
}

// GET /matches/export - filtered matches as CSV
async fn export_matches_handler(
    State(pool): State<SqlitePool>,
    Query(filters): Query<MatchFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let records = fetch_matches(&pool, &filters.normalized()).await?;
    let body = to_csv_string(&records)?;
    let filename = format!("winmix_matches_{}.csv", chrono::Utc::now().format("%Y-%m-%d"));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}

// GET /teams - every team name seen on either side
async fn list_teams_handler(State(pool): State<SqlitePool>) -> ApiResult<Vec<String>> {
    Ok(Json(ApiResponse::success(fetch_teams(&pool).await?)))
}

// POST /predictions - head-to-head aggregates for up to eight pairs
#[derive(Debug, Deserialize)]
struct PredictionRequest {
    pairs: Vec<TeamPair>,
}

async fn predictions_handler(
    State(pool): State<SqlitePool>,
    Json(request): Json<PredictionRequest>,
) -> ApiResult<Vec<PairPrediction>> {
    let predictions = PredictionEngine::new()
        .predict_pairs(&pool, &request.pairs)
        .await?;
    Ok(Json(ApiResponse::success(predictions)))
}

// Saved filter presets
#[derive(Debug, Deserialize)]
struct FilterPresetRequest {
    name: String,
    #[serde(default)]
    filters: MatchFilters,
}

async fn list_filters_handler(State(pool): State<SqlitePool>) -> ApiResult<Vec<SavedFilter>> {
    Ok(Json(ApiResponse::success(PresetStore::new(&pool).list().await?)))
}

async fn save_filter_handler(
    State(pool): State<SqlitePool>,
    Json(request): Json<FilterPresetRequest>,
) -> ApiResult<SavedFilter> {
    let preset = PresetStore::new(&pool)
        .save(&request.name, request.filters.normalized())
        .await?;
    Ok(Json(ApiResponse::success(preset)))
}

async fn update_filter_handler(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
    Json(request): Json<FilterPresetRequest>,
) -> ApiResult<SavedFilter> {
    let store = PresetStore::new(&pool);
    store
        .update(&id, &request.name, &request.filters.normalized())
        .await?;
    Ok(Json(ApiResponse::success(store.get(&id).await?)))
}

async fn delete_filter_handler(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> ApiResult<String> {
    PresetStore::new(&pool).delete(&id).await?;
    Ok(Json(ApiResponse::success(format!("Deleted filter {}", id))))
}

async fn clear_filters_handler(State(pool): State<SqlitePool>) -> ApiResult<u64> {
    Ok(Json(ApiResponse::success(PresetStore::new(&pool).clear().await?)))
}

// GET /filters/{id}/stats - apply a preset
async fn filter_stats_handler(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> ApiResult<MatchStatistics> {
    let preset = PresetStore::new(&pool).get(&id).await?;
    let records = fetch_matches(&pool, &preset.filters).await?;
    Ok(Json(ApiResponse::success(compute_statistics(&records))))
}

// Dashboard layout
#[derive(Debug, Deserialize)]
struct MoveWidgetRequest {
    widget_id: String,
    target_position: usize,
}

async fn get_layout_handler(State(pool): State<SqlitePool>) -> ApiResult<Vec<DashboardWidget>> {
    Ok(Json(ApiResponse::success(load_layout(&pool).await?)))
}

async fn visible_layout_handler(State(pool): State<SqlitePool>) -> ApiResult<Vec<DashboardWidget>> {
    let layout = load_layout(&pool).await?;
    Ok(Json(ApiResponse::success(visible_widgets(&layout))))
}

async fn put_layout_handler(
    State(pool): State<SqlitePool>,
    Json(widgets): Json<Vec<DashboardWidget>>,
) -> ApiResult<Vec<DashboardWidget>> {
    if widgets.is_empty() {
        return Err(ApiError::BadRequest("layout must contain at least one widget".to_string()));
    }
    save_layout(&pool, &widgets).await?;
    Ok(Json(ApiResponse::success(load_layout(&pool).await?)))
}

async fn move_widget_handler(
    State(pool): State<SqlitePool>,
    Json(request): Json<MoveWidgetRequest>,
) -> ApiResult<Vec<DashboardWidget>> {
    let layout = load_layout(&pool).await?;
    if !layout.iter().any(|w| w.id == request.widget_id) {
        return Err(ApiError::NotFound(format!("no widget with id {}", request.widget_id)));
    }

    let moved = move_widget(&layout, &request.widget_id, request.target_position);
    save_layout(&pool, &moved).await?;
    Ok(Json(ApiResponse::success(moved)))
}

async fn toggle_widget_handler(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> ApiResult<Vec<DashboardWidget>> {
    let layout = load_layout(&pool).await?;
    let toggled = toggle_visibility(&layout, &id)
        .ok_or_else(|| ApiError::NotFound(format!("no widget with id {}", id)))?;

    save_layout(&pool, &toggled).await?;
    Ok(Json(ApiResponse::success(toggled)))
}

async fn reset_layout_handler(State(pool): State<SqlitePool>) -> ApiResult<Vec<DashboardWidget>> {
    let layout = default_layout();
    save_layout(&pool, &layout).await?;
    Ok(Json(ApiResponse::success(layout)))
}

// POST /data/import - pull records from the configured match source
#[derive(Debug, Default, Deserialize)]
struct ImportRequest {
    #[serde(default)]
    url: Option<String>,
}

async fn import_data_handler(
    State(pool): State<SqlitePool>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<ImportSummary> {
    let mut fetcher = DataFetcher::new();
    if let Some(url) = request.url {
        fetcher = fetcher.with_source(url);
    }
    if !fetcher.has_source() {
        return Err(ApiError::BadRequest(
            "no match source configured: set WINMIX_SOURCE_URL or pass a url".to_string(),
        ));
    }

    let summary = fetcher.import_from_source(&pool).await?;
    Ok(Json(ApiResponse::success(summary)))
}
