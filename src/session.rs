//! One operator session: intake, controller, retriever and the error slot.
//!
//! `Session` is the object a front end drives. It takes `&self` everywhere,
//! so it can sit behind an `Arc` and be observed (via [`Session::view`]) while
//! a submission is outstanding.

use crate::config::ClientConfig;
use crate::controller::SubmissionController;
use crate::error::{CompilaError, GENERIC_FAILURE_MESSAGE};
use crate::http::{HttpClient, OutboundRequest, ReqwestHttpClient};
use crate::intake::{CandidateFile, FileIntake, Role, RoleSet};
use crate::presenter::{self, ViewModel};
use crate::retriever::{ArtifactRetriever, ArtifactSink, DirectorySink, SavedArtifact};
use crate::state::{ErrorSlot, HealthStatus, ProcessingState, ServiceErrorBody};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct Session {
    config: ClientConfig,
    client: Arc<dyn HttpClient>,
    intake: Mutex<FileIntake>,
    controller: SubmissionController,
    retriever: ArtifactRetriever,
    errors: ErrorSlot,
}

impl Session {
    pub fn new(
        config: ClientConfig,
        client: Arc<dyn HttpClient>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        let errors = ErrorSlot::new();
        let controller =
            SubmissionController::new(Arc::clone(&client), config.clone(), errors.clone());
        let retriever = ArtifactRetriever::new(
            Arc::clone(&client),
            config.clone(),
            sink,
            errors.clone(),
        );
        Self {
            config,
            client,
            intake: Mutex::new(FileIntake::new()),
            controller,
            retriever,
            errors,
        }
    }

    /// Production session: reqwest transport, downloads saved into `save_dir`.
    pub fn with_reqwest(config: ClientConfig, save_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            config,
            Arc::new(ReqwestHttpClient::new()),
            Arc::new(DirectorySink::new(save_dir)),
        )
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Intake ────────────────────────────────────────────────────────────

    /// Replace the set for `role`; returns a snapshot of the new set.
    pub fn select_files(&self, role: Role, raw: Vec<CandidateFile>) -> RoleSet {
        self.intake.lock().select_files(role, raw).clone()
    }

    /// Read `paths` from disk and select them for `role`.
    ///
    /// A file that cannot be read aborts the selection and leaves the
    /// previous set in place.
    pub async fn select_paths<P: AsRef<Path>>(
        &self,
        role: Role,
        paths: &[P],
    ) -> Result<RoleSet, CompilaError> {
        let mut candidates = Vec::with_capacity(paths.len());
        for path in paths {
            candidates.push(CandidateFile::from_path(path).await?);
        }
        Ok(self.select_files(role, candidates))
    }

    pub fn role_set(&self, role: Role) -> RoleSet {
        self.intake.lock().role_set(role).clone()
    }

    // ── Processing ────────────────────────────────────────────────────────

    /// Submit the currently selected sets. See [`SubmissionController::submit`].
    ///
    /// Refused with [`CompilaError::RequestInFlight`] while a download is pending.
    pub async fn submit(&self) -> Result<ProcessingState, CompilaError> {
        let (guias, comprovantes) = {
            let intake = self.intake.lock();
            (intake.guias().clone(), intake.comprovantes().clone())
        };
        self.controller.submit(&guias, &comprovantes).await
    }

    pub fn state(&self) -> ProcessingState {
        self.controller.state()
    }

    pub fn can_submit(&self) -> bool {
        self.controller.can_submit()
    }

    // ── Download ──────────────────────────────────────────────────────────

    /// `true` when the current state is `Succeeded` with at least one match.
    pub fn download_offered(&self) -> bool {
        self.controller
            .state()
            .report()
            .is_some_and(|r| r.has_matches())
    }

    /// Download the compiled bundle, if the current result offers one.
    ///
    /// Returns [`CompilaError::DownloadNotOffered`] when it does not, and
    /// [`CompilaError::RequestInFlight`] while a submission or another
    /// download is outstanding. Neither touches the network or the error slot.
    /// While the download runs, [`Session::submit`] is refused.
    pub async fn download(&self) -> Result<SavedArtifact, CompilaError> {
        let _claim = self.controller.claim_download()?;
        self.retriever.download().await
    }

    pub fn download_pending(&self) -> bool {
        self.controller.download_pending()
    }

    // ── Health ────────────────────────────────────────────────────────────

    /// Probe `GET {base}/health`. Does not affect state or the error slot.
    pub async fn check_health(&self) -> Result<HealthStatus, CompilaError> {
        let request = OutboundRequest::get(
            self.config.health_url(),
            Duration::from_secs(self.config.download_timeout_secs),
        );
        let response = self
            .client
            .execute(&request)
            .await
            .map_err(|e| CompilaError::Transport(e.message))?;

        if !response.is_success() {
            let message = serde_json::from_slice::<ServiceErrorBody>(&response.body)
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            return Err(CompilaError::Service {
                status: response.status,
                message,
            });
        }

        let status: HealthStatus = serde_json::from_slice(&response.body).map_err(|e| {
            CompilaError::Transport(format!("Malformed health response: {e}"))
        })?;
        info!("Service health: {}", status.status);
        Ok(status)
    }

    // ── View ──────────────────────────────────────────────────────────────

    /// Contents of the error-display slot.
    pub fn error_message(&self) -> Option<String> {
        self.errors.get()
    }

    pub fn view(&self) -> ViewModel {
        let state = self.controller.state();
        let error = self.errors.get();
        let downloading = self.controller.download_pending();
        let intake = self.intake.lock();
        let mut view = presenter::present(&state, &intake, error.as_deref());
        view.submit_enabled &= !downloading;
        view
    }
}
