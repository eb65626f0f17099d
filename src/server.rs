//! HTTP boundary: routes requests into the [`GraphDatabase`] and encodes
//! the results as JSON.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use graph_engine::{GraphDatabase, NewTransaction, TransactionFilter};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const MISSING_FILTER: &str = "Please provide sender_id or receiver_id as query parameter";
const GRAPHML_CONTENT_TYPE: &str = "application/graphml+xml";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    db: Arc<GraphDatabase>,
    index_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(db: Arc<GraphDatabase>, index_path: &Path) -> Self {
        Self {
            db,
            index_path: Arc::new(index_path.to_path_buf()),
        }
    }
}

/// Engine or request failure, reported as `400 {"error": ...}`
#[derive(Debug)]
struct ApiError(String);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("Rejected request: {}", self.0);

        (StatusCode::BAD_REQUEST, Json(ErrorBody { error: self.0 })).into_response()
    }
}

impl<E: std::error::Error> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.to_string())
    }
}

/// Fixed acknowledgement for a recorded transaction; not a computed score
#[derive(Debug, Serialize)]
struct FraudVerdict {
    fraud: bool,
    fraud_probability: f64,
}

#[derive(Debug, Deserialize)]
struct TransactionQuery {
    sender_id: Option<String>,
    receiver_id: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/accounts", get(accounts))
        .route("/transactions", get(transactions))
        .route("/transactions/new", post(new_transaction))
        .route("/graphml", get(graphml))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }

    info!("Shutting down");
}

async fn home(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(state.index_path.as_path()).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            warn!("Failed to read {}: {e}", state.index_path.display());

            (StatusCode::NOT_FOUND, "Front-end page not found").into_response()
        }
    }
}

async fn accounts(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.db.list_accounts())
}

async fn transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Response, ApiError> {
    if query.sender_id.is_none() && query.receiver_id.is_none() {
        return Ok((StatusCode::BAD_REQUEST, MISSING_FILTER).into_response());
    }

    let filter = TransactionFilter::new(query.sender_id.as_deref(), query.receiver_id.as_deref());
    let transactions = state.db.query_transactions(&filter)?;

    Ok(Json(transactions).into_response())
}

async fn new_transaction(
    State(state): State<AppState>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<Json<FraudVerdict>, ApiError> {
    let Json(tx) = payload?;

    state
        .db
        .record_transaction(&tx.sender_id, &tx.receiver_id, tx.total_amount)?;

    Ok(Json(FraudVerdict {
        fraud: true,
        fraud_probability: 0.0,
    }))
}

async fn graphml(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, GRAPHML_CONTENT_TYPE)],
        state.db.export_graphml(),
    )
}
