//! Submission controller: validate, send, settle.
//!
//! The controller owns the session's [`ProcessingState`] together with the
//! download claim. Both live in one `parking_lot::Mutex` that is never held
//! across an `.await`, so a front end can read [`SubmissionController::state`]
//! while a request is outstanding.
//!
//! Only one request is in flight at a time. A `submit` or a download claim
//! that finds a submission in flight, or a download pending, returns
//! [`CompilaError::RequestInFlight`] without touching state or the error
//! slot.

use crate::config::ClientConfig;
use crate::error::{CompilaError, GENERIC_FAILURE_MESSAGE, VALIDATION_MESSAGE};
use crate::http::{HttpClient, HttpResponse, MultipartPart, OutboundRequest};
use crate::intake::{RoleSet, PDF_CONTENT_TYPE};
use crate::state::{ErrorSlot, MatchReport, ProcessResponse, ProcessingState, ServiceErrorBody};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Settled message when a submit future is dropped before the service answered.
pub const INTERRUPTED_MESSAGE: &str = "Submission was interrupted before the service answered";

#[derive(Debug, Default)]
struct Lifecycle {
    state: ProcessingState,
    downloading: bool,
}

impl Lifecycle {
    fn busy(&self) -> bool {
        self.downloading || self.state.is_in_flight()
    }
}

/// Drives one submission at a time through the processing lifecycle.
pub struct SubmissionController {
    client: Arc<dyn HttpClient>,
    config: ClientConfig,
    lifecycle: Mutex<Lifecycle>,
    errors: ErrorSlot,
}

impl SubmissionController {
    pub fn new(client: Arc<dyn HttpClient>, config: ClientConfig, errors: ErrorSlot) -> Self {
        Self {
            client,
            config,
            lifecycle: Mutex::new(Lifecycle::default()),
            errors,
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ProcessingState {
        self.lifecycle.lock().state.clone()
    }

    /// `false` while a submission is in flight or a download is pending.
    pub fn can_submit(&self) -> bool {
        !self.lifecycle.lock().busy()
    }

    pub fn download_pending(&self) -> bool {
        self.lifecycle.lock().downloading
    }

    /// Claim the request slot for a download of the current result.
    ///
    /// The claim is released when the returned guard drops.
    ///
    /// # Errors
    /// [`CompilaError::RequestInFlight`] while anything else is outstanding,
    /// [`CompilaError::DownloadNotOffered`] unless the state is `Succeeded`
    /// with at least one match.
    pub fn claim_download(&self) -> Result<DownloadClaim<'_>, CompilaError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.busy() {
            warn!("Rejected download: another request is outstanding");
            return Err(CompilaError::RequestInFlight);
        }
        if !lifecycle.state.report().is_some_and(|r| r.has_matches()) {
            debug!("Download requested but not offered in state {}", lifecycle.state);
            return Err(CompilaError::DownloadNotOffered);
        }
        lifecycle.downloading = true;
        Ok(DownloadClaim {
            lifecycle: &self.lifecycle,
        })
    }

    /// Submit both role sets and return the settled state.
    ///
    /// # Errors
    /// Only [`CompilaError::RequestInFlight`]. Every other failure is a
    /// normal outcome and is returned as `Ok(ProcessingState::Failed(_))`.
    pub async fn submit(
        &self,
        guias: &RoleSet,
        comprovantes: &RoleSet,
    ) -> Result<ProcessingState, CompilaError> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.busy() {
                warn!(
                    "Rejected submit: state is {}, download pending: {}",
                    lifecycle.state, lifecycle.downloading
                );
                return Err(CompilaError::RequestInFlight);
            }
            lifecycle.state = ProcessingState::Validating;
        }
        self.errors.clear();
        self.notify(&ProcessingState::Validating);

        // Settles the state if this future is dropped before completion.
        let mut guard = InterruptGuard {
            controller: self,
            armed: true,
        };

        let started = Instant::now();
        let settled = match self.run(guias, comprovantes).await {
            Ok(report) => {
                info!(
                    "Processing succeeded: {} matches, {} unmatched guias, {} unmatched comprovantes ({}ms)",
                    report.total_matches,
                    report.unmatched_guias.len(),
                    report.unmatched_comprovantes.len(),
                    started.elapsed().as_millis()
                );
                ProcessingState::Succeeded(report)
            }
            Err(e) => {
                let message = e.display_message();
                warn!("Processing failed: {}", message);
                ProcessingState::Failed(message)
            }
        };
        guard.armed = false;

        self.settle(settled.clone());
        Ok(settled)
    }

    async fn run(
        &self,
        guias: &RoleSet,
        comprovantes: &RoleSet,
    ) -> Result<MatchReport, CompilaError> {
        if guias.is_empty() || comprovantes.is_empty() {
            return Err(CompilaError::Validation(VALIDATION_MESSAGE.to_string()));
        }

        self.transition(ProcessingState::Submitting);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_submit_start(guias.len(), comprovantes.len());
        }
        let request = build_process_request(&self.config, guias, comprovantes);
        info!(
            "Submitting {} guias and {} comprovantes to {}",
            guias.len(),
            comprovantes.len(),
            request.url
        );

        self.transition(ProcessingState::AwaitingResult);
        let response = self
            .client
            .execute(&request)
            .await
            .map_err(|e| CompilaError::Transport(e.message))?;

        interpret_process_response(response)
    }

    /// Apply a terminal state; a failure also lands in the error slot.
    fn settle(&self, settled: ProcessingState) {
        if let Some(message) = settled.failure() {
            self.errors.set(message);
        }
        self.transition(settled.clone());
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_settled(&settled);
        }
    }

    fn transition(&self, next: ProcessingState) {
        debug!("State -> {}", next);
        self.lifecycle.lock().state = next.clone();
        self.notify(&next);
    }

    fn notify(&self, state: &ProcessingState) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_state_change(state);
        }
    }
}

/// Holds the request slot for one download; releases it on drop.
#[must_use = "the download claim is released as soon as it is dropped"]
pub struct DownloadClaim<'a> {
    lifecycle: &'a Mutex<Lifecycle>,
}

impl Drop for DownloadClaim<'_> {
    fn drop(&mut self) {
        self.lifecycle.lock().downloading = false;
    }
}

struct InterruptGuard<'a> {
    controller: &'a SubmissionController,
    armed: bool,
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("{}", INTERRUPTED_MESSAGE);
            self.controller
                .settle(ProcessingState::Failed(INTERRUPTED_MESSAGE.to_string()));
        }
    }
}

/// Build the multipart `/process` request: one part per file, `guias` first.
pub fn build_process_request(
    config: &ClientConfig,
    guias: &RoleSet,
    comprovantes: &RoleSet,
) -> OutboundRequest {
    let parts = [guias, comprovantes]
        .into_iter()
        .flat_map(|set| {
            let field = set.role().field_name();
            set.files().iter().map(move |f| MultipartPart {
                field: field.to_string(),
                file_name: f.name().to_string(),
                content_type: PDF_CONTENT_TYPE.to_string(),
                payload: Arc::clone(f.payload()),
            })
        })
        .collect();

    OutboundRequest::multipart(
        config.process_url(),
        parts,
        Duration::from_secs(config.request_timeout_secs),
    )
}

/// Map a `/process` response onto a report or a typed failure.
///
/// * 2xx with a `results` object → the report.
/// * 2xx with anything else → `Transport` (malformed body).
/// * non-2xx with `{"error": "..."}` → `Service`, message verbatim.
/// * non-2xx without a readable message → `Transport` with the generic text.
pub fn interpret_process_response(response: HttpResponse) -> Result<MatchReport, CompilaError> {
    if response.is_success() {
        let parsed: ProcessResponse = serde_json::from_slice(&response.body).map_err(|e| {
            CompilaError::Transport(format!("Malformed response from the service: {e}"))
        })?;
        if let Some(url) = parsed.download_url {
            debug!("Service published compiled bundle at {}", url);
        }
        return Ok(parsed.results);
    }

    let message = serde_json::from_slice::<ServiceErrorBody>(&response.body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty());

    match message {
        Some(message) => Err(CompilaError::Service {
            status: response.status,
            message,
        }),
        None => {
            debug!(
                "HTTP {} without a readable error payload ({} bytes)",
                response.status,
                response.body.len()
            );
            Err(CompilaError::Transport(GENERIC_FAILURE_MESSAGE.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;
    use crate::intake::{CandidateFile, FileIntake, Role};

    fn intake(guias: &[&str], comprovantes: &[&str]) -> FileIntake {
        let mut intake = FileIntake::new();
        let to_candidates = |names: &[&str]| {
            names
                .iter()
                .map(|n| CandidateFile::new(*n, PDF_CONTENT_TYPE, b"%PDF".to_vec()))
                .collect::<Vec<_>>()
        };
        intake.select_files(Role::Guias, to_candidates(guias));
        intake.select_files(Role::Comprovantes, to_candidates(comprovantes));
        intake
    }

    #[test]
    fn request_repeats_fields_in_selection_order() {
        let intake = intake(&["alice.pdf", "bob.pdf"], &["001.pdf", "002.pdf"]);
        let req = build_process_request(
            &ClientConfig::default(),
            intake.guias(),
            intake.comprovantes(),
        );
        let guias: Vec<&str> = req.parts_for("guias").map(|p| p.file_name.as_str()).collect();
        let comps: Vec<&str> = req
            .parts_for("comprovantes")
            .map(|p| p.file_name.as_str())
            .collect();
        assert_eq!(guias, vec!["alice.pdf", "bob.pdf"]);
        assert_eq!(comps, vec!["001.pdf", "002.pdf"]);
        assert!(req.url.ends_with("/process"));
        assert_eq!(req.timeout, Duration::from_secs(300));
    }

    #[test]
    fn service_error_is_verbatim() {
        let err = interpret_process_response(HttpResponse::new(500, r#"{"error":"decode failure"}"#))
            .unwrap_err();
        assert_eq!(err.display_message(), "decode failure");
        assert!(matches!(err, CompilaError::Service { status: 500, .. }));
    }

    #[test]
    fn unreadable_error_body_gets_generic_message() {
        for body in ["<html>Bad Gateway</html>", "{}", r#"{"error":""}"#, ""] {
            let err = interpret_process_response(HttpResponse::new(502, body)).unwrap_err();
            assert!(matches!(err, CompilaError::Transport(_)), "{body}");
            assert_eq!(err.display_message(), GENERIC_FAILURE_MESSAGE);
        }
    }

    #[test]
    fn malformed_success_body_is_transport_error() {
        let err = interpret_process_response(HttpResponse::new(200, "not json")).unwrap_err();
        assert!(matches!(err, CompilaError::Transport(ref m) if m.starts_with("Malformed")));
    }

    #[test]
    fn success_body_yields_report() {
        let body = r#"{"results":{"total_matches":0,"matches":[],"unmatched_guias":["a.pdf"],"unmatched_comprovantes":[]}}"#;
        let report = interpret_process_response(HttpResponse::new(200, body)).unwrap();
        assert_eq!(report.total_matches, 0);
        assert_eq!(report.unmatched_guias, vec!["a.pdf"]);
    }

    const ONE_MATCH: &str = r#"{"results":{"total_matches":1,"matches":[{"guia":"alice.pdf","comprovante":"001.pdf","output":"alice_compilado.pdf","guia_barcode":"1","comprovante_barcode":"1"}]}}"#;

    fn controller(mock: &MockHttpClient) -> SubmissionController {
        let config = ClientConfig::builder()
            .base_url("http://svc/api/barcode")
            .build()
            .unwrap();
        SubmissionController::new(Arc::new(mock.clone()), config, ErrorSlot::new())
    }

    #[test]
    fn download_claim_requires_matches() {
        let mock = MockHttpClient::new();
        let ctl = controller(&mock);
        assert!(matches!(
            ctl.claim_download(),
            Err(CompilaError::DownloadNotOffered)
        ));
        assert!(!ctl.download_pending());
    }

    #[tokio::test]
    async fn download_claim_blocks_other_requests_until_dropped() {
        let mock = MockHttpClient::new();
        mock.add_response(
            "POST http://svc/api/barcode/process",
            Ok(HttpResponse::new(200, ONE_MATCH)),
        );
        let ctl = controller(&mock);
        let intake = intake(&["alice.pdf"], &["001.pdf"]);
        ctl.submit(intake.guias(), intake.comprovantes()).await.unwrap();

        let claim = ctl.claim_download().unwrap();
        assert!(ctl.download_pending());
        assert!(!ctl.can_submit());
        assert!(matches!(
            ctl.claim_download(),
            Err(CompilaError::RequestInFlight)
        ));
        let rejected = ctl.submit(intake.guias(), intake.comprovantes()).await;
        assert!(matches!(rejected, Err(CompilaError::RequestInFlight)));
        assert!(matches!(ctl.state(), ProcessingState::Succeeded(_)));
        assert_eq!(mock.call_count(), 1);

        drop(claim);
        assert!(ctl.can_submit());
        assert!(!ctl.download_pending());
    }
}
