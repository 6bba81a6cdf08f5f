//! Progress-callback trait for submission and download events.
//!
//! Inject an [`Arc<dyn SubmissionProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to observe the
//! session as it moves through its states. The CLI drives a terminal spinner
//! from it; a GUI front end would re-render its view instead.
//!
//! # Example
//!
//! ```rust
//! use compila_pdf::{ClientConfig, ProcessingState, SubmissionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     transitions: AtomicUsize,
//! }
//!
//! impl SubmissionProgressCallback for CountingCallback {
//!     fn on_state_change(&self, _state: &ProcessingState) {
//!         self.transitions.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { transitions: AtomicUsize::new(0) });
//! let config = ClientConfig::builder()
//!     .progress_callback(cb as Arc<dyn SubmissionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::state::ProcessingState;
use std::path::Path;
use std::sync::Arc;

/// Called by the session as submissions and downloads progress.
///
/// All methods have default no-op implementations. Implementations must be
/// `Send + Sync`; calls never happen while an internal lock is held.
pub trait SubmissionProgressCallback: Send + Sync {
    /// Called once a submission passed validation, before the request is sent.
    ///
    /// # Arguments
    /// * `guias`: number of guia files in the request
    /// * `comprovantes`: number of comprovante files in the request
    fn on_submit_start(&self, guias: usize, comprovantes: usize) {
        let _ = (guias, comprovantes);
    }

    /// Called after every state replacement, including the terminal one.
    fn on_state_change(&self, state: &ProcessingState) {
        let _ = state;
    }

    /// Called once when the submission reaches `Succeeded` or `Failed`.
    fn on_settled(&self, state: &ProcessingState) {
        let _ = state;
    }

    /// Called when a downloaded artifact has been handed to the save sink.
    fn on_download_complete(&self, saved_to: &Path, bytes: usize) {
        let _ = (saved_to, bytes);
    }

    /// Called when a download fails; `message` is what the error slot shows.
    fn on_download_error(&self, message: &str) {
        let _ = message;
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopProgressCallback;

impl SubmissionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn SubmissionProgressCallback>;
