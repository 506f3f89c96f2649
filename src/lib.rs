pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::middleware::request_id::{REQUEST_ID_HEADER, request_id_middleware};
use crate::config::AnalyzerConfig;
use crate::services::analysis::AnalysisService;
use crate::services::heuristics::TestBattery;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
    middleware::from_fn,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<AnalysisService>,
    pub config: AnalyzerConfig,
}

impl AppState {
    pub fn new(config: AnalyzerConfig) -> Self {
        let battery = if config.extended_heuristics {
            TestBattery::extended()
        } else {
            TestBattery::standard()
        };
        Self {
            analysis: Arc::new(AnalysisService::new(&config, battery)),
            config,
        }
    }
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// Every method and path goes to the analysis handler, which decides
/// whether the path is acceptable.
///
/// The request id layer wraps tracing, so spans see the minted id.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .fallback(api::handlers::analyze::analyze_image)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(|response: &Response<_>, latency: Duration, _span: &Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
