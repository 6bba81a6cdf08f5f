//! Result presentation: pure mappings from session state to view data.
//!
//! Nothing here performs I/O. A front end renders a [`ViewModel`] either via
//! its `Display` impl (terminal) or its `Serialize` impl (JSON).

use crate::intake::{FileIntake, RoleSet};
use crate::state::{Match, MatchReport, ProcessingState};
use serde::Serialize;
use std::fmt;

/// Everything a front end needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub intake: IntakeView,
    /// Whether the submit trigger should be enabled.
    pub submit_enabled: bool,
    pub body: BodyView,
    /// Contents of the error-display slot.
    pub error: Option<ErrorView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BodyView {
    Idle,
    Busy(BusyView),
    Results(ResultsView),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusyView {
    pub label: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsView {
    pub headline: String,
    pub total_matches: u32,
    pub matches: Vec<Match>,
    /// Offer the download trigger (`total_matches > 0`).
    pub offer_download: bool,
    /// Rendered only when at least one unmatched list is non-empty.
    pub warnings: Option<WarningsView>,
}

/// Comma-joined unmatched names; a line is `None` when its list is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarningsView {
    pub unmatched_guias: Option<String>,
    pub unmatched_comprovantes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeView {
    pub guias: Vec<FileLine>,
    pub comprovantes: Vec<FileLine>,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileLine {
    pub name: String,
    pub size: String,
}

/// Map a report to its results section.
pub fn present_report(report: &MatchReport) -> ResultsView {
    let warnings = if report.has_unmatched() {
        Some(WarningsView {
            unmatched_guias: join_names(&report.unmatched_guias),
            unmatched_comprovantes: join_names(&report.unmatched_comprovantes),
        })
    } else {
        None
    };

    ResultsView {
        headline: format!("{} match(es) found", report.total_matches),
        total_matches: report.total_matches,
        matches: report.matches.clone(),
        offer_download: report.has_matches(),
        warnings,
    }
}

/// Map an error-slot message to its view.
pub fn present_error(message: &str) -> ErrorView {
    ErrorView {
        message: message.to_string(),
    }
}

/// Map the intake sets to the file lists shown under each role.
pub fn present_intake(intake: &FileIntake) -> IntakeView {
    let lines = |set: &RoleSet| -> Vec<FileLine> {
        set.files()
            .iter()
            .map(|f| FileLine {
                name: f.name().to_string(),
                size: f.size_label(),
            })
            .collect()
    };
    IntakeView {
        guias: lines(intake.guias()),
        comprovantes: lines(intake.comprovantes()),
        rejected: intake.guias().rejected_count() + intake.comprovantes().rejected_count(),
    }
}

/// Compose the full view for one frame.
pub fn present(state: &ProcessingState, intake: &FileIntake, error: Option<&str>) -> ViewModel {
    let body = match state {
        ProcessingState::Idle | ProcessingState::Failed(_) => BodyView::Idle,
        ProcessingState::Validating => BodyView::Busy(BusyView {
            label: "Validating selection…".to_string(),
            detail: "Checking that both roles have files".to_string(),
        }),
        ProcessingState::Submitting | ProcessingState::AwaitingResult => {
            BodyView::Busy(BusyView {
                label: "Processing files…".to_string(),
                detail: "Extracting barcodes and matching…".to_string(),
            })
        }
        ProcessingState::Succeeded(report) => BodyView::Results(present_report(report)),
    };

    ViewModel {
        intake: present_intake(intake),
        submit_enabled: !state.is_in_flight()
            && !intake.guias().is_empty()
            && !intake.comprovantes().is_empty(),
        body,
        error: error.map(present_error),
    }
}

fn join_names(names: &[String]) -> Option<String> {
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

impl fmt::Display for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref e) = self.error {
            writeln!(f, "Error: {}", e.message)?;
        }
        match &self.body {
            BodyView::Idle => Ok(()),
            BodyView::Busy(b) => writeln!(f, "{} {}", b.label, b.detail),
            BodyView::Results(r) => write!(f, "{r}"),
        }
    }
}

impl fmt::Display for ResultsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.headline)?;
        for m in &self.matches {
            writeln!(f, "  Guia: {}", m.guia_name)?;
            writeln!(f, "    Comprovante:       {}", m.comprovante_name)?;
            writeln!(f, "    Output file:       {}", m.output_name)?;
            writeln!(f, "    Guia barcode:      {}", m.guia_barcode)?;
            writeln!(f, "    Comprovante code:  {}", m.comprovante_barcode)?;
        }
        if let Some(ref w) = self.warnings {
            writeln!(f, "Files without a match")?;
            if let Some(ref g) = w.unmatched_guias {
                writeln!(f, "  Guias without match: {g}")?;
            }
            if let Some(ref c) = w.unmatched_comprovantes {
                writeln!(f, "  Comprovantes without match: {c}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{CandidateFile, Role, PDF_CONTENT_TYPE};

    fn m(guia: &str, comp: &str) -> Match {
        Match {
            guia_name: guia.into(),
            comprovante_name: comp.into(),
            output_name: format!("{}_compilado.pdf", guia.trim_end_matches(".pdf")),
            guia_barcode: "123".into(),
            comprovante_barcode: "123".into(),
        }
    }

    fn report(n: usize, guias: &[&str], comps: &[&str]) -> MatchReport {
        MatchReport {
            total_matches: n as u32,
            matches: (0..n).map(|i| m(&format!("g{i}.pdf"), &format!("{i:03}.pdf"))).collect(),
            unmatched_guias: guias.iter().map(|s| s.to_string()).collect(),
            unmatched_comprovantes: comps.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn download_offered_iff_matches() {
        for n in 0..4 {
            let view = present_report(&report(n, &[], &[]));
            assert_eq!(view.matches.len(), n);
            assert_eq!(view.offer_download, n > 0);
        }
    }

    #[test]
    fn empty_unmatched_lists_render_no_section() {
        let view = present_report(&report(2, &[], &[]));
        assert!(view.warnings.is_none());
        let text = view.to_string();
        assert!(!text.contains("without"), "{text}");
    }

    #[test]
    fn only_non_empty_list_renders() {
        let view = present_report(&report(0, &["bob.pdf", "carol.pdf"], &[]));
        let w = view.warnings.unwrap();
        assert_eq!(w.unmatched_guias.as_deref(), Some("bob.pdf, carol.pdf"));
        assert_eq!(w.unmatched_comprovantes, None);
    }

    #[test]
    fn names_render_once_in_order() {
        let view = present_report(&report(0, &[], &["003.pdf", "001.pdf", "002.pdf"]));
        let text = view.to_string();
        let line = text
            .lines()
            .find(|l| l.contains("Comprovantes without match"))
            .unwrap();
        assert!(line.ends_with("003.pdf, 001.pdf, 002.pdf"));
        assert_eq!(text.matches("001.pdf").count(), 1);
    }

    #[test]
    fn headline_counts_matches() {
        assert_eq!(present_report(&report(1, &[], &[])).headline, "1 match(es) found");
    }

    #[test]
    fn busy_states_disable_submit() {
        let mut intake = FileIntake::new();
        let pdf = |n: &str| CandidateFile::new(n, PDF_CONTENT_TYPE, vec![0u8; 2048]);
        intake.select_files(Role::Guias, vec![pdf("alice.pdf")]);
        intake.select_files(Role::Comprovantes, vec![pdf("001.pdf")]);

        for state in [ProcessingState::Submitting, ProcessingState::AwaitingResult] {
            let view = present(&state, &intake, None);
            assert!(!view.submit_enabled);
            assert!(matches!(view.body, BodyView::Busy(_)));
        }
        let idle = present(&ProcessingState::Idle, &intake, None);
        assert!(idle.submit_enabled);
        assert_eq!(idle.intake.guias[0].size, "2.0 KB");
    }

    #[test]
    fn submit_disabled_with_empty_role() {
        let view = present(&ProcessingState::Idle, &FileIntake::new(), None);
        assert!(!view.submit_enabled);
        assert!(view.error.is_none());
    }

    #[test]
    fn failed_state_shows_error_slot() {
        let state = ProcessingState::Failed("decode failure".into());
        let view = present(&state, &FileIntake::new(), Some("decode failure"));
        assert_eq!(view.error.as_ref().unwrap().message, "decode failure");
        assert_eq!(view.body, BodyView::Idle);
        assert!(view.to_string().starts_with("Error: decode failure"));
    }
}
