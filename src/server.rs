use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::services::proxy_service::{ProxyRequest, ProxyService};
use crate::utils::cors::cors_headers;

pub const ROUTE_PREFIX: &str = "/api/football";

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ProxyService>,
}

pub fn build_router(state: AppState) -> Router {
    let football = Router::new()
        .route(ROUTE_PREFIX, football_methods())
        .route(&format!("{}/", ROUTE_PREFIX), football_methods())
        .route(&format!("{}/*rest", ROUTE_PREFIX), football_methods())
        .layer(middleware::from_fn(cors_headers));

    football
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// `get` would also route HEAD, which upstream answers without a JSON body.
fn football_methods() -> MethodRouter<AppState> {
    on(MethodFilter::GET.or(MethodFilter::POST), forward).options(preflight)
}

/// Splits an inbound URI into the upstream path (prefix removed) and raw
/// query string.
pub fn strip_prefix(uri: &Uri) -> (String, Option<String>) {
    let path = uri.path();
    let rest = path.strip_prefix(ROUTE_PREFIX).unwrap_or(path);
    (rest.to_string(), uri.query().map(str::to_string))
}

async fn forward(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let (path, query) = strip_prefix(&uri);
    let request = ProxyRequest::new(method, path, query);

    match state.proxy.forward(&request).await {
        Ok(response) => (response.status, Json(response.body)).into_response(),
        Err(err) => {
            error!("Forwarding {} {} failed: {}", request.method, uri, err);
            err.into_response()
        }
    }
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn serve(addr: SocketAddr, router: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_prefix_keeps_query_verbatim() {
        let uri: Uri = "/api/football/matches?dateTo=2024-01-07&dateFrom=2024-01-01"
            .parse()
            .unwrap();
        assert_eq!(
            strip_prefix(&uri),
            (
                "/matches".to_string(),
                Some("dateTo=2024-01-07&dateFrom=2024-01-01".to_string())
            )
        );
    }

    #[test]
    fn strip_prefix_on_bare_prefix_is_empty() {
        let uri: Uri = "/api/football".parse().unwrap();
        assert_eq!(strip_prefix(&uri), (String::new(), None));
    }

    #[test]
    fn strip_prefix_on_trailing_slash_is_root() {
        let uri: Uri = "/api/football/?areas=2072".parse().unwrap();
        assert_eq!(
            strip_prefix(&uri),
            ("/".to_string(), Some("areas=2072".to_string()))
        );
    }

    #[test]
    fn strip_prefix_only_removes_leading_prefix() {
        let uri: Uri = "/api/football/teams/api/football".parse().unwrap();
        assert_eq!(strip_prefix(&uri).0, "/teams/api/football");
    }
}
