// Axum router — binds gateway routes to the locator, converter and streamer.

use std::net::SocketAddr;
use std::path::{Component, Path as FsPath};
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use super::extract::RoutePath;
use crate::config::GatewayConfig;
use crate::convert::{ConversionService, Converter, ExternalConverter};
use crate::error::{ConversionError, GatewayError, GatewayResult};
use crate::resource::{Locator, ResourceId, ResourceLayout};
use crate::stream::{open_asset, parse_range_header, Framing};

/// Everything a request handler needs; built once and shared read-only.
pub struct AppState {
    config: GatewayConfig,
    locator: Arc<Locator>,
    conversions: ConversionService,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// State backed by the configured external converter.
    pub fn from_config(config: GatewayConfig) -> GatewayResult<Self> {
        let converter = Arc::new(ExternalConverter::from_config(&config));
        Self::with_converter(config, converter)
    }

    pub fn with_converter(
        config: GatewayConfig,
        converter: Arc<dyn Converter>,
    ) -> GatewayResult<Self> {
        let locator = Arc::new(Locator::new(
            &config.storage_root,
            ResourceLayout::default(),
        )?);
        let conversions = ConversionService::new(Arc::clone(&locator), converter);
        Ok(Self {
            config,
            locator,
            conversions,
        })
    }
}

/// Build the gateway router with CORS restricted to the configured origin.
pub fn router(state: SharedState) -> GatewayResult<Router> {
    let origin = HeaderValue::from_str(&state.config.cors_origin).map_err(|_| {
        GatewayError::Config(format!("invalid CORS origin {:?}", state.config.cors_origin))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    Ok(Router::new()
        .route("/assets/{*path}", get(asset_handler))
        .route("/splats/{*rest}", get(spa_shell_handler))
        .route("/ksplats/{id}", post(convert_handler))
        .route("/api/v1/splats/{id}", get(download_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

pub struct GatewayServer {
    addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl GatewayServer {
    /// Bind the configured host/port and start serving in the background.
    /// Port 0 picks a free port; see [`GatewayServer::port`].
    pub async fn start(state: AppState) -> Result<Self> {
        let listener = TcpListener::bind(state.config.listen_addr()?).await?;
        let addr = listener.local_addr()?;

        let app = router(Arc::new(state))?;
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                error!("server error: {}", e);
            }
        });

        info!("gateway listening on http://{}", addr);

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Absolute URL for a route path such as `/api/v1/splats/abc`.
    pub fn url_for(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stop accepting connections and wait for in-flight requests to drain.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub message: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Route path a converted artifact can be downloaded from.
pub fn download_route(id: &ResourceId) -> String {
    format!("/api/v1/splats/{}", id)
}

fn requested_range(headers: &HeaderMap) -> Option<crate::stream::ParsedRange> {
    headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range_header)
}

/// GET /assets/{*path} — bundle files, typed by extension.
async fn asset_handler(
    State(state): State<SharedState>,
    RoutePath(rel): RoutePath<String>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let rel_path = FsPath::new(&rel);
    if rel_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        debug!("rejecting asset path {:?}", rel);
        return Err(GatewayError::NotFound(rel));
    }

    let path = state.config.assets_dir().join(rel_path);
    let asset = open_asset(&path, state.config.file_open_timeout).await?;
    asset
        .respond(requested_range(&headers), &Framing::inline(&path))
        .await
}

/// GET /splats/{*rest} — the SPA shell; the front end routes the rest.
async fn spa_shell_handler(State(state): State<SharedState>) -> Result<Response, GatewayError> {
    let index = state.config.index_html();
    let asset = open_asset(&index, state.config.file_open_timeout).await?;
    asset.respond(None, &Framing::inline(&index)).await
}

/// POST /ksplats/{id} — convert `<id>.ply` into `<id>.ksplat`.
async fn convert_handler(
    State(state): State<SharedState>,
    RoutePath(raw_id): RoutePath<String>,
) -> Result<Json<ConvertResponse>, GatewayError> {
    let id = ResourceId::parse(&raw_id)?;
    state.conversions.convert(&id).await?;
    Ok(Json(ConvertResponse {
        message: "Ksplat created successfully".to_string(),
        path: download_route(&id),
    }))
}

/// GET /api/v1/splats/{id} — stream the converted artifact.
async fn download_handler(
    State(state): State<SharedState>,
    RoutePath(raw_id): RoutePath<String>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let id = ResourceId::parse(&raw_id)?;
    let path = state.locator.artifact(&id).await?;
    let asset = open_asset(&path, state.config.file_open_timeout)
        .await
        .map_err(|e| match e {
            // Removed between lookup and open.
            GatewayError::NotFound(_) => GatewayError::ArtifactNotFound(id.to_string()),
            other => other,
        })?;
    let framing = Framing::download(state.locator.layout().output_name(&id));
    asset.respond(requested_range(&headers), &framing).await
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) | GatewayError::InvalidIdentifier(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::DirectoryNotFound(_)
            | GatewayError::InputNotFound { .. }
            | GatewayError::ArtifactNotFound(_)
            | GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::ConversionInProgress(_) => StatusCode::CONFLICT,
            GatewayError::Conversion(ConversionError::TimedOut(_)) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Conversion(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::OpenTimedOut(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            GatewayError::Config(_) | GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short message safe to hand to clients.
    fn public_message(&self) -> String {
        match self {
            GatewayError::Conversion(ConversionError::TimedOut(_)) => {
                "Conversion timed out".to_string()
            }
            GatewayError::Conversion(_) => "Conversion failed".to_string(),
            GatewayError::OpenTimedOut(_) => "File temporarily unavailable".to_string(),
            GatewayError::Config(_) | GatewayError::Io(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed status={} err={}", status.as_u16(), self);
        } else {
            debug!("request rejected status={} err={}", status.as_u16(), self);
        }

        let body = Json(ErrorBody {
            error: self.public_message(),
        });

        match self {
            GatewayError::RangeNotSatisfiable { total } => (
                status,
                [(header::CONTENT_RANGE, format!("bytes */{}", total))],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::BadRequest("bad path".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::InvalidIdentifier("..".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::DirectoryNotFound("a".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::ConversionInProgress("a".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            GatewayError::from(ConversionError::ExitStatus(Some(1))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::from(ConversionError::TimedOut(Duration::from_secs(1))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_range_error_carries_content_range() {
        let resp = GatewayError::RangeNotSatisfiable { total: 42 }.into_response();
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()[header::CONTENT_RANGE], "bytes */42");
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let err = GatewayError::Io(std::io::Error::other("disk on fire at /secret/path"));
        assert_eq!(err.public_message(), "Internal server error");
    }
}
