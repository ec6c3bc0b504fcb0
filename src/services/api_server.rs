// src/services/api_server.rs
//! API Server for the diploma registry
//!
//! This module exposes the registry session to a front end over REST:
//! - Session status (connected account, admin, role) and reconnection
//! - Diploma lookup with optional search filtering
//! - Diploma creation, update and deletion (registry admin only)
//! - Certificate export bindings for a single diploma
//!
//! Every failure is answered with the HTTP status of its error kind and a
//! JSON body carrying the user-facing message.

use crate::error::DiplomaError;
use crate::models::diploma::{filter_records, DiplomaDraft};
use crate::services::command_processor::CommandOutcome;
use crate::services::registry_service::DiplomaRegistryService;
use anyhow::Context;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use chrono::{Local, NaiveDate};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

type ApiResponse = (StatusCode, Json<Value>);

/// Query string for diploma lookups
#[derive(Deserialize, Default)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

/// Optional body for export requests
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ExportRequest {
    /// Date printed on the document; today when absent
    issue_date: Option<NaiveDate>,
}

/// API server state
#[derive(Clone)]
pub struct ApiServer {
    /// Registry session shared by all handlers
    service: Arc<DiplomaRegistryService>,
}

impl ApiServer {
    pub fn new(service: Arc<DiplomaRegistryService>) -> Self {
        ApiServer { service }
    }

    /// Builds the route table.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/session", get(Self::session_handler).post(Self::reconnect_handler))
            .route("/diplomas/:address", get(Self::lookup_handler).post(Self::create_handler))
            .route(
                "/diplomas/:address/:index",
                put(Self::update_handler).delete(Self::delete_handler),
            )
            .route("/diplomas/:address/:index/export", post(Self::export_handler))
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and serves requests until the listener fails
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    ///
    /// # Errors
    /// Returns error if the address cannot be bound or the server stops abnormally.
    pub async fn run(&self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind {}", addr))?;
        info!("diploma registry API listening on {}", addr);

        axum::serve(listener, self.router()).await.context("API server stopped")?;
        Ok(())
    }

    // =====================
    // Session Handlers
    // =====================

    /// Reports the session state
    ///
    /// # Endpoint
    /// GET /session
    async fn session_handler(State(state): State<Arc<ApiServer>>) -> ApiResponse {
        let status = state.service.status().await;
        (StatusCode::OK, Json(json!(status)))
    }

    /// Drops the current session and resolves the wallet's account again
    ///
    /// # Endpoint
    /// POST /session
    ///
    /// # Responses
    /// - 200 OK: New session status
    /// - 500 Internal Server Error: No wallet configured
    /// - 502 Bad Gateway: Wallet or admin lookup failed; the session stays disconnected
    async fn reconnect_handler(State(state): State<Arc<ApiServer>>) -> ApiResponse {
        match state.service.account_changed().await {
            Ok(status) => (StatusCode::OK, Json(json!(status))),
            Err(e) => error_response(e),
        }
    }

    // =====================
    // Diploma Handlers
    // =====================

    /// Lists a holder's diplomas, optionally filtered by `q`
    ///
    /// # Endpoint
    /// GET /diplomas/:address?q=
    ///
    /// # Responses
    /// - 200 OK: Matching diplomas with their positions
    /// - 400 Bad Request: Invalid address
    /// - 403 Forbidden: Student reading another address
    async fn lookup_handler(
        Path(address): Path<String>,
        Query(params): Query<SearchParams>,
        State(state): State<Arc<ApiServer>>,
    ) -> ApiResponse {
        match state.service.processor().lookup(&address).await {
            Ok(outcome) => {
                let matches = filter_records(&outcome.records, &params.q);
                (
                    StatusCode::OK,
                    Json(json!({
                        "holder": outcome.holder,
                        "total": outcome.records.len(),
                        "records": matches,
                    })),
                )
            }
            Err(e) => error_response(e),
        }
    }

    /// Records a new diploma
    ///
    /// # Endpoint
    /// POST /diplomas/:address
    ///
    /// # Request Body
    /// `{ "name", "title", "institution", "year" }`
    async fn create_handler(
        Path(address): Path<String>,
        State(state): State<Arc<ApiServer>>,
        Json(draft): Json<DiplomaDraft>,
    ) -> ApiResponse {
        outcome_response(state.service.processor().create(&address, &draft).await)
    }

    /// Replaces the diploma at `index`
    ///
    /// # Endpoint
    /// PUT /diplomas/:address/:index
    async fn update_handler(
        Path((address, index)): Path<(String, usize)>,
        State(state): State<Arc<ApiServer>>,
        Json(draft): Json<DiplomaDraft>,
    ) -> ApiResponse {
        let processor = state.service.processor();
        let result = async {
            state.service.ensure_loaded(&address).await?;
            processor.begin_edit(&address, index).await?;
            processor.set_draft(draft).await?;
            processor.submit_edit().await
        }
        .await;
        outcome_response(result)
    }

    /// Removes the diploma at `index`
    ///
    /// # Endpoint
    /// DELETE /diplomas/:address/:index
    async fn delete_handler(
        Path((address, index)): Path<(String, usize)>,
        State(state): State<Arc<ApiServer>>,
    ) -> ApiResponse {
        let result = async {
            state.service.ensure_loaded(&address).await?;
            state.service.processor().delete(&address, index).await
        }
        .await;
        outcome_response(result)
    }

    /// Binds a fresh certificate to the diploma at `index`
    ///
    /// # Endpoint
    /// POST /diplomas/:address/:index/export
    ///
    /// # Responses
    /// - 200 OK: File name, document lines, certificate and QR options
    async fn export_handler(
        Path((address, index)): Path<(String, usize)>,
        State(state): State<Arc<ApiServer>>,
        body: Option<Json<ExportRequest>>,
    ) -> ApiResponse {
        let request = body.map(|Json(request)| request).unwrap_or_default();
        let issue_date = request.issue_date.unwrap_or_else(|| Local::now().date_naive());

        match state.service.export(&address, index, issue_date).await {
            Ok(binding) => (
                StatusCode::OK,
                Json(json!({
                    "fileName": binding.file_name,
                    "lines": binding.lines(),
                    "shortFingerprint": binding.certificate.short_fingerprint(),
                    "qrOptions": state.service.exporter().qr_options(),
                    "binding": binding,
                })),
            ),
            Err(e) => error_response(e),
        }
    }
}

fn outcome_response(result: Result<CommandOutcome, DiplomaError>) -> ApiResponse {
    match result {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "message": outcome.message(),
                "outcome": outcome,
            })),
        ),
        Err(e) => error_response(e),
    }
}

/// HTTP status for each error kind.
fn status_for(err: &DiplomaError) -> StatusCode {
    match err {
        DiplomaError::Validation(_) | DiplomaError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        DiplomaError::Authorization(_) => StatusCode::FORBIDDEN,
        DiplomaError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        DiplomaError::Ledger(_) => StatusCode::BAD_GATEWAY,
        DiplomaError::NoWallet | DiplomaError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: DiplomaError) -> ApiResponse {
    let status = status_for(&err);
    warn!("request failed with {}: {}", status, err);
    (
        status,
        Json(json!({
            "error": err.to_string(),
            "recoverable": err.is_recoverable(),
        })),
    )
}
