use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the analysis service
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Listen port (default: 8080)
    pub port: u16,

    /// Listen address (default: "0.0.0.0")
    pub bind_address: String,

    /// Directory for staged uploads (default: OS temp dir)
    pub staging_dir: PathBuf,

    /// Upper bound on one analysis in seconds (default: 30)
    pub request_timeout_secs: u64,

    /// Report failures with distinct HTTP statuses instead of always 200 (default: false)
    pub strict_status: bool,

    /// Run the edit-history heuristics as well (default: false)
    pub extended_heuristics: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            staging_dir: env::temp_dir(),
            request_timeout_secs: 30,
            strict_status: false,
            extended_heuristics: false,
        }
    }
}

fn flag(value: String) -> bool {
    let value = value.to_lowercase();
    value != "false" && value != "0" && !value.is_empty()
}

impl AnalyzerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            bind_address: env::var("BIND_ADDRESS").unwrap_or(default.bind_address),

            staging_dir: env::var("STAGING_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(default.request_timeout_secs),

            strict_status: env::var("STRICT_STATUS")
                .map(flag)
                .unwrap_or(default.strict_status),

            extended_heuristics: env::var("EXTENDED_HEURISTICS")
                .map(flag)
                .unwrap_or(default.extended_heuristics),
        }
    }

    /// Config for tests: everything staged under `staging_dir`
    pub fn for_staging_dir(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
