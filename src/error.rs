//! Error types for the compila-pdf client.
//!
//! [`CompilaError`] keeps the failure taxonomy typed while it travels through
//! the library. It is flattened into a single operator-facing string only at
//! the error-display boundary, via [`CompilaError::display_message`].
//!
//! * `Validation` never reaches the network.
//! * `Service` carries the message the remote service reported, verbatim.
//! * `Transport` covers no-response failures, malformed bodies and error
//!   payloads that could not be parsed.
//! * `ArtifactUnavailable` / `ArtifactTransport` belong to the download path
//!   and never alter the processing state.

use std::path::PathBuf;
use thiserror::Error;

/// Message shown when one or both roles have no accepted PDF.
pub const VALIDATION_MESSAGE: &str =
    "Please upload at least one PDF of each type (guias and comprovantes).";

/// Substituted when a non-2xx response carries no readable `error` field.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to process files";

/// Prefix for download failures written to the error-display slot.
pub const DOWNLOAD_FAILURE_PREFIX: &str = "Failed to download files: ";

/// All errors returned by the compila-pdf library.
#[derive(Debug, Error)]
pub enum CompilaError {
    // ── Submission errors ─────────────────────────────────────────────────
    /// A local precondition failed (missing files for a role).
    #[error("{0}")]
    Validation(String),

    /// The service answered with a non-2xx status.
    ///
    /// `message` is the service's own `error` field, or
    /// [`GENERIC_FAILURE_MESSAGE`] when the body had none.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// No response was received, or a response body could not be decoded.
    #[error("{0}")]
    Transport(String),

    /// A submission or a download is still outstanding; only one request
    /// may be in flight at a time.
    #[error("Another request is still in progress; wait for it to settle")]
    RequestInFlight,

    // ── Download errors ───────────────────────────────────────────────────
    /// The download endpoint answered with a non-200 status.
    #[error("artifact '{name}' is not available (HTTP {status})")]
    ArtifactUnavailable { name: String, status: u16 },

    /// The download request failed before a response was received.
    #[error("{0}")]
    ArtifactTransport(String),

    /// The current state does not offer a download (no matches yet).
    #[error("No compiled files are available for download")]
    DownloadNotOffered,

    /// The host save mechanism could not store the artifact.
    #[error("Failed to save '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Input / config errors ─────────────────────────────────────────────
    /// A candidate file could not be read from disk.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CompilaError {
    /// Flatten the error into the string stored in the error-display slot.
    ///
    /// Service messages are surfaced verbatim; download failures carry the
    /// download prefix so the operator can tell them apart from processing
    /// failures sharing the same slot.
    pub fn display_message(&self) -> String {
        match self {
            CompilaError::ArtifactUnavailable { .. }
            | CompilaError::ArtifactTransport(_)
            | CompilaError::SaveFailed { .. } => {
                format!("{DOWNLOAD_FAILURE_PREFIX}{self}")
            }
            other => other.to_string(),
        }
    }

    /// `true` for failures detected on the download path.
    pub fn is_artifact_error(&self) -> bool {
        matches!(
            self,
            CompilaError::ArtifactUnavailable { .. }
                | CompilaError::ArtifactTransport(_)
                | CompilaError::SaveFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_message_is_verbatim() {
        let e = CompilaError::Service {
            status: 500,
            message: "decode failure".into(),
        };
        assert_eq!(e.display_message(), "decode failure");
    }

    #[test]
    fn validation_message_is_verbatim() {
        let e = CompilaError::Validation(VALIDATION_MESSAGE.into());
        assert_eq!(e.display_message(), VALIDATION_MESSAGE);
    }

    #[test]
    fn artifact_errors_carry_download_prefix() {
        let e = CompilaError::ArtifactUnavailable {
            name: "resultados.zip".into(),
            status: 404,
        };
        let msg = e.display_message();
        assert!(msg.starts_with(DOWNLOAD_FAILURE_PREFIX), "got: {msg}");
        assert!(msg.contains("404"));
        assert!(e.is_artifact_error());
    }

    #[test]
    fn in_flight_is_not_an_artifact_error() {
        assert!(!CompilaError::RequestInFlight.is_artifact_error());
    }
}
