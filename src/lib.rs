//! # compila-pdf
//!
//! Client for a barcode-matching service that pairs two collections of PDFs:
//! **guias** (named after a person) and **comprovantes** (receipts carrying a
//! barcode). The service decodes the barcodes, matches the pairs and compiles
//! each pair into a single PDF; this crate drives the operator side of that
//! exchange.
//!
//! ## Workflow
//!
//! ```text
//! select guias ─┐
//!               ├─▶ submit ─▶ POST /process ─▶ Succeeded(report) ─▶ download
//! select comps ─┘      │                            │                GET /download/resultados.zip
//!                      └─▶ Failed(message) ◀────────┘
//! ```
//!
//! 1. **Intake**     keep only `application/pdf` files per role
//! 2. **Submit**     validate both roles, send one multipart request
//! 3. **Present**    map the settled state to a view (matches, warnings)
//! 4. **Retrieve**   fetch the compiled bundle when there is at least one match
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use compila_pdf::{ClientConfig, Role, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::with_reqwest(ClientConfig::default(), ".");
//!     session.select_paths(Role::Guias, &["alice.pdf", "bob.pdf"]).await?;
//!     session.select_paths(Role::Comprovantes, &["001.pdf", "002.pdf"]).await?;
//!
//!     session.submit().await?;
//!     println!("{}", session.view());
//!
//!     if session.download_offered() {
//!         let saved = session.download().await?;
//!         eprintln!("saved to {}", saved.path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `compila-pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod intake;
pub mod presenter;
pub mod progress;
pub mod retriever;
pub mod session;
pub mod state;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder};
pub use controller::SubmissionController;
pub use error::CompilaError;
pub use intake::{CandidateFile, FileIntake, FileRef, Role, RoleSet, PDF_CONTENT_TYPE};
pub use presenter::{present, present_error, present_report, ViewModel};
pub use progress::{NoopProgressCallback, ProgressCallback, SubmissionProgressCallback};
pub use retriever::{ArtifactRetriever, ArtifactSink, DirectorySink, SavedArtifact};
pub use session::Session;
pub use state::{HealthStatus, Match, MatchReport, ProcessingState};
