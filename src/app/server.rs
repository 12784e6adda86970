use crate::adapters::http_provider::build_providers;
use crate::core::{ConfigProvider, LookupKey, RaceCoordinator};
use crate::domain::model::AddressResult;
use crate::utils::error::{CepError, RaceError, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

pub struct AppState {
    pub coordinator: RaceCoordinator,
}

impl AppState {
    pub fn new(coordinator: RaceCoordinator) -> Self {
        Self { coordinator }
    }
}

/// 對外的錯誤回應，每一種都對應固定的 HTTP status
#[derive(Debug)]
pub enum ApiError {
    InvalidKey(CepError),
    Race(RaceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            ApiError::Race(RaceError::Timeout(_)) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Race(RaceError::AllFailed { .. }) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::InvalidKey(e) => e.user_friendly_message(),
            ApiError::Race(e) => e.to_string(),
        };
        let body = Json(serde_json::json!({ "error": message }));
        (self.status(), body).into_response()
    }
}

async fn get_cep(
    Path(cep): Path<String>,
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<AddressResult>, ApiError> {
    // 長度不對就不發出任何上游請求
    let key = LookupKey::parse(&cep).map_err(|e| {
        tracing::debug!("Rejected lookup key '{}': {}", cep, e);
        ApiError::InvalidKey(e)
    })?;

    let address = state.coordinator.resolve(&key).await.map_err(ApiError::Race)?;
    Ok(Json(address))
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{cep}", get(get_cep))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

/// 依照配置組出 coordinator：adapters 建 providers，core 只負責比賽
pub fn build_coordinator<C: ConfigProvider>(config: &C) -> Result<RaceCoordinator> {
    let providers = build_providers(config)?;
    Ok(RaceCoordinator::new(providers, config.race_timeout())
        .with_abort_losers(config.abort_losers()))
}

/// 綁定 listen address 並服務到收到 Ctrl-C 為止
pub async fn serve<C: ConfigProvider>(config: &C) -> Result<()> {
    let coordinator = build_coordinator(config)?;
    tracing::info!(
        "🏁 Racing providers [{}] with a {:?} deadline",
        coordinator.provider_names().join(", "),
        coordinator.deadline()
    );

    let router = app_router(Arc::new(AppState::new(coordinator)));
    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    tracing::info!("🚀 Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // 收不到訊號就一直服務下去
        std::future::pending::<()>().await;
    }
}
