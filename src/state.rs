//! Processing state and the result payload it carries.
//!
//! [`ProcessingState`] is the single source of truth a front end renders.
//! It is replaced wholesale on every transition; a [`MatchReport`] exists only
//! inside `Succeeded` and is dropped as soon as the next submission starts.
//!
//! ```text
//! Idle ──submit──▶ Validating ──empty role──▶ Failed(validation)
//!                      │
//!                      ▼
//!                 Submitting ──▶ AwaitingResult ──2xx──▶ Succeeded(report)
//!                                       └──non-2xx / transport──▶ Failed(msg)
//!
//! Succeeded | Failed ──submit──▶ Validating …   (prior result discarded)
//! ```

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ProcessingState {
    #[default]
    Idle,
    Validating,
    Submitting,
    AwaitingResult,
    Succeeded(MatchReport),
    Failed(String),
}

impl ProcessingState {
    /// `true` while a submission is between validation and settlement.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ProcessingState::Validating
                | ProcessingState::Submitting
                | ProcessingState::AwaitingResult
        )
    }

    /// `true` for `Succeeded` and `Failed`.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ProcessingState::Succeeded(_) | ProcessingState::Failed(_)
        )
    }

    pub fn report(&self) -> Option<&MatchReport> {
        match self {
            ProcessingState::Succeeded(report) => Some(report),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            ProcessingState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingState::Idle => write!(f, "idle"),
            ProcessingState::Validating => write!(f, "validating"),
            ProcessingState::Submitting => write!(f, "submitting"),
            ProcessingState::AwaitingResult => write!(f, "awaiting result"),
            ProcessingState::Succeeded(r) => write!(f, "succeeded ({} matches)", r.total_matches),
            ProcessingState::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// Outcome of one successful `/process` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub total_matches: u32,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub unmatched_guias: Vec<String>,
    #[serde(default)]
    pub unmatched_comprovantes: Vec<String>,
}

impl MatchReport {
    /// A compiled bundle only exists when at least one pair matched.
    pub fn has_matches(&self) -> bool {
        self.total_matches > 0
    }

    pub fn has_unmatched(&self) -> bool {
        !self.unmatched_guias.is_empty() || !self.unmatched_comprovantes.is_empty()
    }
}

/// One guia/comprovante pair and the compiled file produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    #[serde(rename = "guia")]
    pub guia_name: String,
    #[serde(rename = "comprovante")]
    pub comprovante_name: String,
    #[serde(rename = "output")]
    pub output_name: String,
    pub guia_barcode: String,
    pub comprovante_barcode: String,
}

/// Body of a 2xx `/process` response. Only `results` is required.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProcessResponse {
    pub results: MatchReport,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Body of a non-2xx response, when the service provides one.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ServiceErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// The one error-display channel shared by submissions and downloads.
///
/// Holds at most one flattened message. An attempt clears it when it starts;
/// a failure overwrites it. Clones share the same cell.
#[derive(Debug, Clone, Default)]
pub struct ErrorSlot(Arc<Mutex<Option<String>>>);

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.0.lock().clone()
    }

    pub fn set(&self, message: impl Into<String>) {
        *self.0.lock() = Some(message.into());
    }

    pub fn clear(&self) {
        *self.0.lock() = None;
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok") || self.status.eq_ignore_ascii_case("healthy")
    }
}
