//! Artifact retrieval: fetch the compiled bundle and hand it to a save sink.
//!
//! Download failures go to the shared error slot with the download prefix and
//! never touch the processing state; a failed download does not invalidate a
//! result that already succeeded.

use crate::config::ClientConfig;
use crate::error::CompilaError;
use crate::http::{HttpClient, OutboundRequest};
use crate::state::ErrorSlot;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Host save mechanism: store `blob` under a suggested filename.
pub trait ArtifactSink: Send + Sync {
    /// Returns where the artifact ended up.
    fn save(&self, blob: &[u8], suggested_filename: &str) -> Result<PathBuf, CompilaError>;
}

/// Saves artifacts into a directory, atomically (temp file + rename).
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn save(&self, blob: &[u8], suggested_filename: &str) -> Result<PathBuf, CompilaError> {
        let target = self.dir.join(suggested_filename);
        let fail = |source: std::io::Error| CompilaError::SaveFailed {
            path: target.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(fail)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".compila-")
            .suffix(".part")
            .tempfile_in(&self.dir)
            .map_err(fail)?;
        tmp.write_all(blob).map_err(fail)?;
        tmp.persist(&target).map_err(|e| fail(e.error))?;
        Ok(target)
    }
}

/// Where a downloaded artifact was saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Fetches the server-held bundle on demand.
pub struct ArtifactRetriever {
    client: Arc<dyn HttpClient>,
    config: ClientConfig,
    sink: Arc<dyn ArtifactSink>,
    errors: ErrorSlot,
}

impl ArtifactRetriever {
    pub fn new(
        client: Arc<dyn HttpClient>,
        config: ClientConfig,
        sink: Arc<dyn ArtifactSink>,
        errors: ErrorSlot,
    ) -> Self {
        Self {
            client,
            config,
            sink,
            errors,
        }
    }

    /// `GET {base}/download/{name}`. Only a 200 counts as available.
    pub async fn fetch_artifact(&self, name: &str) -> Result<Vec<u8>, CompilaError> {
        let request = OutboundRequest::get(
            self.config.download_url(name),
            Duration::from_secs(self.config.download_timeout_secs),
        );
        let response = self
            .client
            .execute(&request)
            .await
            .map_err(|e| CompilaError::ArtifactTransport(e.message))?;

        if response.status != 200 {
            return Err(CompilaError::ArtifactUnavailable {
                name: name.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }

    /// Fetch the configured artifact and save it under the suggested filename.
    ///
    /// Clears the error slot when it starts; on failure writes the flattened
    /// message there and returns the typed error.
    pub async fn download(&self) -> Result<SavedArtifact, CompilaError> {
        self.errors.clear();
        match self.fetch_and_save().await {
            Ok(saved) => {
                info!("Saved {} bytes to {}", saved.bytes, saved.path.display());
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_download_complete(&saved.path, saved.bytes);
                }
                Ok(saved)
            }
            Err(e) => {
                let message = e.display_message();
                warn!("{}", message);
                self.errors.set(message.clone());
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_download_error(&message);
                }
                Err(e)
            }
        }
    }

    async fn fetch_and_save(&self) -> Result<SavedArtifact, CompilaError> {
        let blob = self.fetch_artifact(&self.config.artifact_name).await?;
        let bytes = blob.len();
        let sink = Arc::clone(&self.sink);
        let filename = self.config.save_filename.clone();
        let fallback = PathBuf::from(&filename);

        let path = tokio::task::spawn_blocking(move || sink.save(&blob, &filename))
            .await
            .map_err(|e| CompilaError::SaveFailed {
                path: fallback,
                source: std::io::Error::other(e.to_string()),
            })??;

        Ok(SavedArtifact { path, bytes })
    }
}
