use axum::body::Body;
use futures::StreamExt;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

const STAGED_PREFIX: &str = "picserver.";

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("failed to create staged file in {dir}: {source}")]
    Create {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write staged file: {0}")]
    Write(#[source] io::Error),

    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("request body exceeds declared length of {declared} bytes")]
    LengthExceeded { declared: u64 },
}

/// A uniquely named transient copy of one request body.
///
/// The file is removed when this value is dropped, so every early exit
/// (including a cancelled request future) cleans up after itself.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    len: u64,
}

impl StagedFile {
    /// Streams `body` into a fresh file under `dir`, refusing more than
    /// `declared_length` bytes.
    pub async fn stage(dir: &Path, body: Body, declared_length: u64) -> Result<Self, StagingError> {
        let file = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .tempfile_in(dir)
            .map_err(|source| StagingError::Create {
                dir: dir.to_path_buf(),
                source,
            })?;

        let handle = file.as_file().try_clone().map_err(StagingError::Write)?;
        let mut writer = tokio::fs::File::from_std(handle);
        let mut stream = body.into_data_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(StagingError::Body)?;
            written += chunk.len() as u64;
            if written > declared_length {
                return Err(StagingError::LengthExceeded {
                    declared: declared_length,
                });
            }
            writer.write_all(&chunk).await.map_err(StagingError::Write)?;
        }
        writer.flush().await.map_err(StagingError::Write)?;

        tracing::debug!("Staged {} bytes at {:?}", written, file.path());

        Ok(Self { file, len: written })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Deletes the file now, logging instead of failing if that does not work.
    pub fn remove(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            tracing::warn!("Failed to remove staged file {:?}: {}", path, e);
        }
    }
}
