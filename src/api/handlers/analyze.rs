use crate::AppState;
use crate::api::error::response_status;
use crate::models::{UploadRequest, Verdict};
use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Uri, header},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

/// Analyzes one uploaded image.
///
/// Mounted as the router fallback so that every path reaches the validator;
/// the single path segment is the echoed filename and the body is the raw
/// image. The body is always a [`Verdict`].
pub async fn analyze_image(
    State(state): State<AppState>,
    client: Option<ConnectInfo<SocketAddr>>,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let declared_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let client = client
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    tracing::info!(
        "Request from {} of {} bytes",
        client,
        declared_length.map_or_else(|| "unknown".to_string(), |len| len.to_string())
    );

    let request = UploadRequest {
        path: uri.path().to_string(),
        declared_length,
        content_type,
        body,
    };

    let analysis = state.analysis.analyze(request).await;
    let status = response_status(analysis.error.as_ref(), state.config.strict_status);

    if analysis.verdict.is_valid {
        tracing::info!(
            "Verdict for {}: {} tests run",
            analysis.verdict.name.as_deref().unwrap_or_default(),
            analysis.verdict.tests.len()
        );
    }

    (status, Json::<Verdict>(analysis.verdict)).into_response()
}
