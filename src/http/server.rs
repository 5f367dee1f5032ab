//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, request ID, CORS)
//! - Bound each request by the configured deadline
//! - Bind server to listener
//! - Dispatch requests through the route table and resource pipeline
//! - Observability (metrics, correlation IDs)

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::http::request::{MakeRequestUuid, ProxyRequest, X_REQUEST_ID};
use crate::http::response::{cors_preflight, error_response, success_response};
use crate::observability::metrics;
use crate::resources::Pipeline;
use crate::routing::RouteTable;
use crate::upstream::{Clock, SystemClock, UpstreamClient};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub pipeline: Arc<Pipeline>,
    /// Deadline for one request, upstream call included.
    pub request_timeout: Duration,
}

/// HTTP server for the media proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> ProxyResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a server whose cache and schedule window read time from `clock`.
    pub fn with_clock(config: ProxyConfig, clock: Arc<dyn Clock>) -> ProxyResult<Self> {
        let routes = Arc::new(RouteTable::new(&config.listener.base_path));
        let client = UpstreamClient::new(
            &config.upstreams,
            &config.timeouts,
            &config.cache,
            clock.clone(),
        )?;
        let pipeline = Arc::new(Pipeline::new(
            client,
            config.upstreams.clone(),
            config.editorial.clone(),
            clock,
        ));

        let state = AppState {
            routes,
            pipeline,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };
        let router = Self::build_router(state.clone());
        Ok(Self {
            router,
            config,
            state,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(middleware::from_fn(cors_preflight))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = ?self.state.routes.paths(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Single entry point for every non-preflight request.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = request.method().clone();
    let proxy_request = ProxyRequest::from_request(&request);
    let path = proxy_request.path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Handling request"
    );

    let mut route = "none";
    let result = async {
        let endpoint = state
            .routes
            .match_path(&path)
            .ok_or_else(|| ProxyError::RouteNotFound(path.clone()))?;
        route = endpoint.segment();

        if method != Method::GET && method != Method::HEAD {
            return Err(ProxyError::MethodNotAllowed(method.to_string()));
        }

        let operation = state.pipeline.resolve(endpoint, &proxy_request)?;
        route = operation.label();
        tokio::time::timeout(state.request_timeout, state.pipeline.execute(&operation))
            .await
            .map_err(|_| ProxyError::Timeout {
                secs: state.request_timeout.as_secs(),
            })?
    }
    .await;

    match result {
        Ok(body) => {
            tracing::info!(
                request_id = %request_id,
                route,
                status = 200,
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Request served"
            );
            metrics::record_request(route, 200, start_time);
            success_response(body)
        }
        Err(err) => {
            let status = err.status().as_u16();
            if err.is_upstream() {
                tracing::error!(request_id = %request_id, route, status, error = %err, "Upstream failure");
            } else {
                tracing::warn!(request_id = %request_id, route, path = %path, status, error = %err, "Request rejected");
            }
            metrics::record_request(route, status, start_time);
            let operation = (route != "none").then_some(route);
            error_response(&err, operation)
        }
    }
}
