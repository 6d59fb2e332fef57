use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use stress_core::{Network, RemoteSet, SingleFlightGuard, StressError, WalletId};
use stress_workflows::{StatusMonitor, StressStatus};
use thiserror::Error;
use tracing::{info, warn};

/// Shared state behind the monitoring endpoint.
#[derive(Clone)]
pub struct AppState {
    monitor: StatusMonitor,
    guard: SingleFlightGuard,
    network: Arc<dyn Network>,
    remotes: RemoteSet,
}

impl AppState {
    #[must_use]
    pub fn new(
        monitor: StatusMonitor,
        guard: SingleFlightGuard,
        network: Arc<dyn Network>,
        remotes: RemoteSet,
    ) -> Self {
        Self {
            monitor,
            guard,
            network,
            remotes,
        }
    }
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error(transparent)]
    Stress(#[from] StressError),
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        let Self::Stress(err) = &self;
        let status = match err {
            StressError::DuplicateJob { .. } => StatusCode::CONFLICT,
            StressError::InvalidKey { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn status_app(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/wallets/:id/pull", post(pull_wallet))
        .with_state(state)
}

async fn status(State(state): State<AppState>) -> Json<StressStatus> {
    Json(state.monitor.snapshot())
}

/// Pulls one wallet out of band. At most one pull per wallet runs at a time.
async fn pull_wallet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StatusError> {
    let wallet = WalletId::new(id);
    let network = Arc::clone(&state.network);
    let remotes = state.remotes.clone();
    let target = wallet.clone();

    let handle = state
        .guard
        .submit(wallet.as_str(), async move {
            network.pull(&target, &remotes).await
        })
        .inspect_err(|err| warn!(wallet = %wallet, %err, "on-demand pull refused"))?;

    info!(wallet = %wallet, "on-demand pull dispatched");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "wallet": handle.key() })),
    ))
}
