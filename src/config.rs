//! Configuration for talking to the barcode-matching service.
//!
//! Every knob lives in [`ClientConfig`], built via [`ClientConfigBuilder`].
//! Callers set only what they care about and rely on the defaults below,
//! which match the hosted service.

use crate::error::CompilaError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Default service root; `/process`, `/download/{name}` and `/health` hang off it.
pub const DEFAULT_BASE_URL: &str = "https://compila-pdf.onrender.com/api/barcode";

/// Server-side name of the compiled bundle.
pub const DEFAULT_ARTIFACT_NAME: &str = "resultados.zip";

/// Filename suggested to the host save mechanism.
pub const DEFAULT_SAVE_FILENAME: &str = "resultados_correspondencias.zip";

/// Client configuration.
///
/// # Example
/// ```rust
/// use compila_pdf::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://localhost:3000/api/barcode")
///     .request_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.process_url(), "http://localhost:3000/api/barcode/process");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Service root without a trailing slash.
    pub base_url: String,

    /// Timeout for the `/process` round trip in seconds. Default: 300.
    ///
    /// The service decodes every page of every upload before answering, so a
    /// few dozen scanned PDFs can take minutes.
    pub request_timeout_secs: u64,

    /// Timeout for artifact downloads and health probes in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Server-side artifact name fetched by the download action.
    pub artifact_name: String,

    /// Filename handed to the save mechanism.
    pub save_filename: String,

    /// Optional observer for state transitions and download events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 300,
            download_timeout_secs: 120,
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            save_filename: DEFAULT_SAVE_FILENAME.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("artifact_name", &self.artifact_name)
            .field("save_filename", &self.save_filename)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn SubmissionProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn process_url(&self) -> String {
        format!("{}/process", self.base_url)
    }

    pub fn download_url(&self, artifact_name: &str) -> String {
        format!("{}/download/{}", self.base_url, artifact_name)
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn artifact_name(mut self, name: impl Into<String>) -> Self {
        self.config.artifact_name = name.into();
        self
    }

    pub fn save_filename(mut self, name: impl Into<String>) -> Self {
        self.config.save_filename = name.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, CompilaError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(CompilaError::InvalidConfig(format!(
                "base URL must be http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.request_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(CompilaError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.artifact_name.is_empty() || c.artifact_name.contains('/') {
            return Err(CompilaError::InvalidConfig(format!(
                "artifact name must be a single path segment, got '{}'",
                c.artifact_name
            )));
        }
        if c.save_filename.is_empty() {
            return Err(CompilaError::InvalidConfig(
                "save filename must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hosted_service() {
        let c = ClientConfig::default();
        assert_eq!(c.process_url(), format!("{DEFAULT_BASE_URL}/process"));
        assert_eq!(
            c.download_url(&c.artifact_name),
            format!("{DEFAULT_BASE_URL}/download/resultados.zip")
        );
        assert_eq!(c.save_filename, "resultados_correspondencias.zip");
        assert_ne!(c.save_filename, c.artifact_name);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let c = ClientConfig::builder()
            .base_url("http://localhost:3000/api/barcode/")
            .build()
            .unwrap();
        assert_eq!(c.health_url(), "http://localhost:3000/api/barcode/health");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = ClientConfig::builder()
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, CompilaError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(ClientConfig::builder()
            .request_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn rejects_nested_artifact_name() {
        assert!(ClientConfig::builder()
            .artifact_name("../etc/passwd")
            .build()
            .is_err());
    }
}
