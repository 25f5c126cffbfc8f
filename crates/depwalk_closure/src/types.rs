use std::path::PathBuf;

use depwalk_core::{Diagnostic, DiagnosticKind};

#[derive(Debug, Clone)]
pub struct ClosureReport {
    /// Entry file, relative to the workspace root
    pub entry: String,
    pub workspace_root: PathBuf,
    /// Every file in the closure, workspace-relative and sorted
    pub files: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub files_parsed: usize,
}

impl ClosureReport {
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }
}
