use std::{
    fmt,
    path::{Path, PathBuf},
};

/// A dependency reference found in one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceCandidate {
    pub specifier: String,
    pub kind: RefKind,
}

impl ReferenceCandidate {
    pub fn new(specifier: impl Into<String>, kind: RefKind) -> Self {
        Self { specifier: specifier.into(), kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefKind {
    /// `import`, `export … from`, `import()` or `require()` with a literal source
    ExplicitImport,
    /// Component used as a tag in the markup section
    TagUsage,
    /// Convention-named helper or state container used in code
    ConventionUsage,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefKind::ExplicitImport => "import",
            RefKind::TagUsage => "tag",
            RefKind::ConventionUsage => "convention",
        };
        f.write_str(s)
    }
}

/// Where a reference is being resolved from.
///
/// Built once per visited node; children get a fresh context via [`ResolutionContext::for_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    pub current_file: PathBuf,
    pub package_root: PathBuf,
    pub workspace_root: PathBuf,
}

impl ResolutionContext {
    /// Context for `file`, with the package root recomputed from the file's location.
    pub fn for_file(file: &Path, workspace_root: &Path) -> Self {
        Self {
            current_file: file.to_path_buf(),
            package_root: crate::package::find_package_root(file, workspace_root),
            workspace_root: workspace_root.to_path_buf(),
        }
    }

    /// Directory of the current file, used as the base for relative specifiers
    pub fn current_dir(&self) -> &Path {
        self.current_file.parent().unwrap_or(&self.workspace_root)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// File could not be read
    Io,
    /// A section could not be parsed cleanly; extraction was degraded
    Parse,
    /// No resolution strategy matched a reference
    ResolutionMiss,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::Io => "io",
            DiagnosticKind::Parse => "parse",
            DiagnosticKind::ResolutionMiss => "unresolved",
        };
        f.write_str(s)
    }
}

/// A recoverable problem attached to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub file: PathBuf,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, file: &Path, message: impl Into<String>) -> Self {
        Self { kind, file: file.to_path_buf(), message: message.into() }
    }
}
