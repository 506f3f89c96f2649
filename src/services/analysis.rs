use crate::config::AnalyzerConfig;
use crate::models::{TestResults, UploadRequest, Verdict};
use crate::services::heuristics::TestBattery;
use crate::services::metadata::{self, ContainerType, ExtractError};
use crate::services::staging::{StagedFile, StagingError};
use crate::utils::validation::{RejectReason, validate_request};
use axum::body::Body;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The only container the battery is run against
pub const ACCEPTED_CONTAINER: ContainerType = ContainerType::Jpeg;

/// Why an analysis ended without a valid verdict.
///
/// Callers only ever see `{"is_valid": false}`; the variant is for logs and
/// for the optional strict status mapping.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RejectReason),

    #[error("staging failed: {0}")]
    Staging(#[from] StagingError),

    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("analysis worker failed: {0}")]
    Worker(String),
}

impl AnalysisError {
    /// Short label for log fields.
    pub fn cause(&self) -> &'static str {
        match self {
            AnalysisError::InvalidRequest(_) => "invalid_request",
            AnalysisError::Staging(_) => "staging",
            AnalysisError::Extraction(e) => e.cause(),
            AnalysisError::Timeout(_) => "timeout",
            AnalysisError::Worker(_) => "worker",
        }
    }
}

/// Outcome of one request: the verdict to send plus the internal reason it
/// is negative, if it is.
#[derive(Debug)]
pub struct Analysis {
    pub verdict: Verdict,
    pub error: Option<AnalysisError>,
}

impl Analysis {
    fn succeeded(verdict: Verdict) -> Self {
        Self {
            verdict,
            error: None,
        }
    }

    fn failed(verdict: Verdict, error: AnalysisError) -> Self {
        tracing::warn!(cause = error.cause(), "Analysis failed: {}", error);
        Self {
            verdict,
            error: Some(error),
        }
    }
}

/// Runs validate, stage, extract, type check and the test battery for one
/// upload. Holds no per-request state, so one instance serves all requests.
pub struct AnalysisService {
    staging_dir: PathBuf,
    timeout: Duration,
    battery: Arc<TestBattery>,
}

impl AnalysisService {
    pub fn new(config: &AnalyzerConfig, battery: TestBattery) -> Self {
        Self {
            staging_dir: config.staging_dir.clone(),
            timeout: config.request_timeout(),
            battery: Arc::new(battery),
        }
    }

    pub fn battery(&self) -> &TestBattery {
        &self.battery
    }

    pub async fn analyze(&self, req: UploadRequest) -> Analysis {
        let name = match validate_request(&req) {
            Ok(name) => name,
            Err(reason) => return Analysis::failed(Verdict::invalid(), reason.into()),
        };
        // validation guarantees a declared length
        let declared_length = req.declared_length.unwrap_or_default();

        let pipeline = self.stage_and_test(req.body, declared_length);
        match tokio::time::timeout(self.timeout, pipeline).await {
            Ok(Ok(tests)) => Analysis::succeeded(Verdict::valid(name, tests)),
            Ok(Err(e)) => Analysis::failed(Verdict::invalid_named(name), e),
            Err(_) => Analysis::failed(
                Verdict::invalid_named(name),
                AnalysisError::Timeout(self.timeout),
            ),
        }
    }

    async fn stage_and_test(
        &self,
        body: Body,
        declared_length: u64,
    ) -> Result<TestResults, AnalysisError> {
        let staged = StagedFile::stage(&self.staging_dir, body, declared_length).await?;
        let battery = Arc::clone(&self.battery);

        // The staged file moves into the blocking task, so it is removed there
        // even if this future is dropped first.
        tokio::task::spawn_blocking(move || {
            let outcome = inspect(staged.path(), &battery);
            staged.remove();
            outcome
        })
        .await
        .map_err(|e| AnalysisError::Worker(e.to_string()))?
    }
}

/// Extraction, container check and battery over a staged file.
pub fn inspect(path: &Path, battery: &TestBattery) -> Result<TestResults, AnalysisError> {
    let (metadata, container) = metadata::extract(path)?;

    if container != ACCEPTED_CONTAINER {
        return Err(ExtractError::UnsupportedContainer(container).into());
    }

    Ok(battery.run(&metadata))
}
