use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::aggregate::{get_constituencies, get_total_results, ConstituencySummary, PartyTotals};
use crate::config::Config;
use crate::error::ElectionError;
use crate::ingest::{ensure_csv_filename, ingest_csv, IngestReport};
use crate::storage::ResultStore;

const UPLOAD_FIELD: &str = "file";
const UPLOAD_SUCCESS: &str = "Data saved successfully !";

#[derive(Clone)]
pub struct ApiState {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl ApiState {
    pub fn new(db_path: PathBuf, busy_timeout: Duration) -> Self {
        Self {
            db_path,
            busy_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.resolved_db_path(), config.busy_timeout())
    }
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    detail: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl From<ElectionError> for ApiError {
    fn from(error: ElectionError) -> Self {
        match error {
            ElectionError::InvalidInput(message) => Self::bad_request(message),
            ElectionError::NotFound => Self {
                status: StatusCode::NOT_FOUND,
                message: error.to_string(),
            },
            ElectionError::Storage(_) => Self::internal(error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            detail: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    detail: &'static str,
    report: IngestReport,
}

pub fn router(state: ApiState, config: &Config) -> Router {
    let origins = config
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/upload/", post(upload))
        .route("/results", get(results))
        .route("/constituencies", get(constituencies))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.upload.max_bytes))
        .layer(cors)
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let state = ApiState::from_config(&config);
    // Fail at startup rather than on the first request if the database is unusable.
    ResultStore::open(&state.db_path, state.busy_timeout)?;
    let app = router(state, &config);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn upload(State(state): State<ApiState>, mut multipart: Multipart) -> ApiResult<UploadResponse> {
    info!("upload requested");
    let mut contents = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError {
        status: e.status(),
        message: e.body_text(),
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if let Err(error) = ensure_csv_filename(&filename) {
            warn!(%filename, "rejected upload: not a CSV file");
            return Err(error.into());
        }
        let bytes = field.bytes().await.map_err(|e| ApiError {
            status: e.status(),
            message: e.body_text(),
        })?;
        contents = Some(bytes);
        break;
    }

    let Some(contents) = contents else {
        warn!("rejected upload: no file field");
        return Err(ApiError::bad_request("File must be a CSV."));
    };

    let report = with_store(&state, move |store| ingest_csv(store, &contents)).await?;
    info!("data saved successfully");
    Ok(Json(UploadResponse {
        detail: UPLOAD_SUCCESS,
        report,
    }))
}

async fn results(State(state): State<ApiState>) -> ApiResult<BTreeMap<String, PartyTotals>> {
    let totals = with_store(&state, get_total_results).await?;
    if totals.is_empty() {
        info!("no results found");
        return Err(ElectionError::NotFound.into());
    }
    Ok(Json(totals))
}

async fn constituencies(State(state): State<ApiState>) -> ApiResult<Vec<ConstituencySummary>> {
    let summaries = with_store(&state, get_constituencies).await?;
    if summaries.is_empty() {
        info!("no constituencies found");
        return Err(ElectionError::NotFound.into());
    }
    Ok(Json(summaries))
}

/// Opens a store for this request and runs `work` on the blocking pool, so
/// SQLite lock waits and per-row commits stay off the async workers.
async fn with_store<T, F>(state: &ApiState, work: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ResultStore) -> crate::error::Result<T> + Send + 'static,
{
    let db_path = state.db_path.clone();
    let busy_timeout = state.busy_timeout;
    tokio::task::spawn_blocking(move || {
        let store = ResultStore::open(&db_path, busy_timeout).map_err(ApiError::internal)?;
        work(&store).map_err(ApiError::from)
    })
    .await
    .map_err(ApiError::internal)?
}
