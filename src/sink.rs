//! Destination for exported `.pbix` binaries. The export operation treats
//! this as a replaceable collaborator so the local-directory default can be
//! swapped for object storage without touching the handlers.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write exported file to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[async_trait::async_trait]
pub trait BlobSink: Send + Sync {
    /// Stores the bytes under the given file name and returns a locator the
    /// caller can hand back to the client.
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, SinkError>;
}

pub struct LocalDirSink {
    directory: PathBuf,
}

impl LocalDirSink {
    pub fn new(directory: impl AsRef<Path>) -> LocalDirSink {
        LocalDirSink {
            directory: directory.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl BlobSink for LocalDirSink {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, SinkError> {
        let path = self.directory.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| SinkError::WriteFailed {
                path: path.clone(),
                source,
            })?;
        info!("Export written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_sink_writes_bytes_and_returns_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalDirSink::new(dir.path());

        let path = sink.store("export.pbix", b"PBIX").await.unwrap();

        assert_eq!(path, dir.path().join("export.pbix"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PBIX");
    }

    #[tokio::test]
    async fn write_into_a_missing_directory_reports_the_target_path() {
        let sink = LocalDirSink::new("/nonexistent/prefix/for/pbigate");
        let err = sink.store("export.pbix", b"PBIX").await.unwrap_err();
        let SinkError::WriteFailed { path, .. } = err;
        assert!(path.ends_with("export.pbix"));
    }
}
