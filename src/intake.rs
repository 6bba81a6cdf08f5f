//! File intake: hold the two role sets the operator selected.
//!
//! A selection replaces the role's set wholesale. Candidates whose declared
//! content type is not `application/pdf` are dropped without error; only the
//! rejected count survives, for logging and the CLI summary.

use crate::error::CompilaError;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// The only content type a role set accepts.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Which side of the correspondence a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Files named after the person they belong to.
    Guias,
    /// Numbered receipts carrying the barcode.
    Comprovantes,
}

impl Role {
    /// Multipart field name used by the service.
    pub fn field_name(self) -> &'static str {
        match self {
            Role::Guias => "guias",
            Role::Comprovantes => "comprovantes",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A raw selection item, before content-type filtering.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub content_type: String,
    pub payload: Arc<[u8]>,
}

impl CandidateFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        payload: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            payload: payload.into(),
        }
    }

    /// Read a file from disk, declaring its content type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CompilaError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| CompilaError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(
            name,
            content_type_for(path),
            Arc::<[u8]>::from(bytes),
        ))
    }
}

/// Declared content type for a path, as a file picker would report it.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_CONTENT_TYPE,
        _ => "application/octet-stream",
    }
}

/// An accepted PDF. Immutable once captured.
#[derive(Debug, Clone)]
pub struct FileRef {
    name: String,
    size_bytes: u64,
    payload: Arc<[u8]>,
}

impl FileRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn payload(&self) -> &Arc<[u8]> {
        &self.payload
    }

    /// Size in kibibytes with one decimal, e.g. `"12.3 KB"`.
    pub fn size_label(&self) -> String {
        format!("{:.1} KB", self.size_bytes as f64 / 1024.0)
    }
}

/// Ordered PDFs for one role.
#[derive(Debug, Clone)]
pub struct RoleSet {
    role: Role,
    files: Vec<FileRef>,
    rejected: usize,
}

impl RoleSet {
    pub fn empty(role: Role) -> Self {
        Self {
            role,
            files: Vec::new(),
            rejected: 0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn files(&self) -> &[FileRef] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Candidates dropped by the selection that produced this set.
    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }
}

/// Holds the guias and comprovantes sets for one session.
#[derive(Debug, Clone)]
pub struct FileIntake {
    guias: RoleSet,
    comprovantes: RoleSet,
}

impl Default for FileIntake {
    fn default() -> Self {
        Self::new()
    }
}

impl FileIntake {
    pub fn new() -> Self {
        Self {
            guias: RoleSet::empty(Role::Guias),
            comprovantes: RoleSet::empty(Role::Comprovantes),
        }
    }

    /// Replace the set for `role` with the PDF members of `raw`, in order.
    pub fn select_files(&mut self, role: Role, raw: Vec<CandidateFile>) -> &RoleSet {
        let offered = raw.len();
        let files: Vec<FileRef> = raw
            .into_iter()
            .filter(|c| c.content_type == PDF_CONTENT_TYPE)
            .map(|c| FileRef {
                size_bytes: c.payload.len() as u64,
                name: c.name,
                payload: c.payload,
            })
            .collect();
        let rejected = offered - files.len();

        debug!(
            "{} selection: {} accepted, {} rejected",
            role,
            files.len(),
            rejected
        );

        let slot = self.slot_mut(role);
        *slot = RoleSet {
            role,
            files,
            rejected,
        };
        slot
    }

    pub fn role_set(&self, role: Role) -> &RoleSet {
        match role {
            Role::Guias => &self.guias,
            Role::Comprovantes => &self.comprovantes,
        }
    }

    pub fn guias(&self) -> &RoleSet {
        &self.guias
    }

    pub fn comprovantes(&self) -> &RoleSet {
        &self.comprovantes
    }

    fn slot_mut(&mut self, role: Role) -> &mut RoleSet {
        match role {
            Role::Guias => &mut self.guias,
            Role::Comprovantes => &mut self.comprovantes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str) -> CandidateFile {
        CandidateFile::new(name, PDF_CONTENT_TYPE, b"%PDF-1.4".to_vec())
    }

    fn other(name: &str, ct: &str) -> CandidateFile {
        CandidateFile::new(name, ct, b"hello".to_vec())
    }

    #[test]
    fn keeps_only_pdfs_in_input_order() {
        let mut intake = FileIntake::new();
        let set = intake.select_files(
            Role::Guias,
            vec![
                pdf("carol.pdf"),
                other("notes.txt", "text/plain"),
                pdf("alice.pdf"),
                other("scan.png", "image/png"),
                pdf("bob.pdf"),
            ],
        );
        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, vec!["carol.pdf", "alice.pdf", "bob.pdf"]);
        assert_eq!(set.rejected_count(), 2);
        assert_eq!(set.role(), Role::Guias);
    }

    #[test]
    fn output_never_longer_than_input() {
        let inputs = vec![
            vec![],
            vec![pdf("a.pdf")],
            vec![other("a", "text/plain")],
            vec![pdf("a.pdf"), pdf("b.pdf"), other("c", "application/zip")],
        ];
        for raw in inputs {
            let n = raw.len();
            let mut intake = FileIntake::new();
            let set = intake.select_files(Role::Comprovantes, raw);
            assert!(set.len() <= n);
            assert!(set.files().iter().all(|f| f.payload().starts_with(b"%PDF")));
        }
    }

    #[test]
    fn empty_selection_clears_prior_set() {
        let mut intake = FileIntake::new();
        intake.select_files(Role::Comprovantes, vec![pdf("001.pdf"), pdf("002.pdf")]);
        assert_eq!(intake.comprovantes().len(), 2);

        intake.select_files(Role::Comprovantes, vec![other("x.doc", "application/msword")]);
        assert!(intake.comprovantes().is_empty());

        intake.select_files(Role::Comprovantes, Vec::new());
        assert!(intake.comprovantes().is_empty());
        assert_eq!(intake.comprovantes().rejected_count(), 0);
    }

    #[test]
    fn selection_replaces_rather_than_appends() {
        let mut intake = FileIntake::new();
        intake.select_files(Role::Guias, vec![pdf("alice.pdf")]);
        intake.select_files(Role::Guias, vec![pdf("bob.pdf")]);
        let names: Vec<&str> = intake.guias().names().collect();
        assert_eq!(names, vec!["bob.pdf"]);
    }

    #[test]
    fn roles_are_independent() {
        let mut intake = FileIntake::new();
        intake.select_files(Role::Guias, vec![pdf("alice.pdf")]);
        intake.select_files(Role::Comprovantes, Vec::new());
        assert_eq!(intake.guias().len(), 1);
    }

    #[test]
    fn content_type_is_case_sensitive_match() {
        let mut intake = FileIntake::new();
        let set = intake.select_files(Role::Guias, vec![other("a.pdf", "application/PDF ")]);
        assert!(set.is_empty());
    }

    #[test]
    fn size_label_uses_one_decimal_kib() {
        let mut intake = FileIntake::new();
        let c = CandidateFile::new("a.pdf", PDF_CONTENT_TYPE, vec![0u8; 1536]);
        let set = intake.select_files(Role::Guias, vec![c]);
        assert_eq!(set.files()[0].size_label(), "1.5 KB");
        assert_eq!(set.files()[0].size_bytes(), 1536);
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for(Path::new("a/b/Alice.PDF")), PDF_CONTENT_TYPE);
        assert_eq!(content_type_for(Path::new("scan.png")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn from_path_reads_bytes_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001.pdf");
        std::fs::write(&path, b"%PDF-1.7 test").unwrap();

        let c = CandidateFile::from_path(&path).await.unwrap();
        assert_eq!(c.name, "001.pdf");
        assert_eq!(c.content_type, PDF_CONTENT_TYPE);
        assert_eq!(&*c.payload, b"%PDF-1.7 test");
    }

    #[tokio::test]
    async fn from_path_missing_file_is_file_read_error() {
        let err = CandidateFile::from_path("/definitely/not/here.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, CompilaError::FileRead { .. }));
    }
}
