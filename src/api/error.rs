use crate::services::analysis::AnalysisError;
use crate::utils::validation::RejectReason;
use axum::http::StatusCode;

impl AnalysisError {
    /// Status used when strict status reporting is on.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::InvalidRequest(RejectReason::UnknownLength) => StatusCode::LENGTH_REQUIRED,
            AnalysisError::InvalidRequest(RejectReason::TooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            AnalysisError::InvalidRequest(RejectReason::ContentType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AnalysisError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AnalysisError::Staging(_) | AnalysisError::Worker(_) => {
                tracing::error!("Internal error: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AnalysisError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalysisError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Picks the response status: always 200 unless `strict` is set.
pub fn response_status(error: Option<&AnalysisError>, strict: bool) -> StatusCode {
    match error {
        Some(e) if strict => e.status_code(),
        _ => StatusCode::OK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::metadata::{ContainerType, ExtractError};
    use std::time::Duration;

    #[test]
    fn test_legacy_mode_always_ok() {
        let err = AnalysisError::InvalidRequest(RejectReason::TooLarge(1 << 30));
        assert_eq!(response_status(Some(&err), false), StatusCode::OK);
        assert_eq!(response_status(None, false), StatusCode::OK);
        assert_eq!(response_status(None, true), StatusCode::OK);
    }

    #[test]
    fn test_strict_mode_statuses() {
        let cases = [
            (
                AnalysisError::InvalidRequest(RejectReason::PathShape(0)),
                StatusCode::BAD_REQUEST,
            ),
            (
                AnalysisError::InvalidRequest(RejectReason::UnknownLength),
                StatusCode::LENGTH_REQUIRED,
            ),
            (
                AnalysisError::InvalidRequest(RejectReason::TooLarge(1 << 30)),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                AnalysisError::InvalidRequest(RejectReason::ContentType("image/jpeg".into())),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                AnalysisError::Extraction(ExtractError::UnsupportedContainer(ContainerType::Png)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AnalysisError::Timeout(Duration::from_secs(1)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                AnalysisError::Worker("panicked".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(response_status(Some(&err), true), status, "{err}");
        }
    }
}
