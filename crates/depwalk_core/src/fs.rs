//! Path probing and classification helpers shared by the resolver and the walker.

use dashmap::DashMap;
use ignore::WalkBuilder;
use log::trace;
use path_clean::clean;
use std::{
    fs,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use crate::constants::{DEPENDENCY_STORE_DIR, GENERATED_DIRS, INDEX_FILES, RESOLVE_EXTENSIONS};

/// Canonical form of `p`, or its lexically cleaned form when it does not exist.
pub fn canonical(p: &Path) -> PathBuf {
    p.canonicalize().unwrap_or_else(|_| clean(p))
}

/// Probes `p` as a file, then with each resolve extension appended, then as a
/// directory containing an index file.
pub fn probe_file(p: &Path) -> Option<PathBuf> {
    if p.is_file() {
        return Some(canonical(p));
    }

    for ext in RESOLVE_EXTENSIONS {
        let mut s = p.as_os_str().to_os_string();
        s.push(".");
        s.push(ext);
        let candidate = PathBuf::from(s);
        if candidate.is_file() {
            return Some(canonical(&candidate));
        }
    }

    probe_index(p)
}

/// Probes `dir` for one of the index files.
pub fn probe_index(dir: &Path) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }
    INDEX_FILES.iter().map(|index| dir.join(index)).find(|c| c.is_file()).map(|c| canonical(&c))
}

/// True if any component of `p` is a dependency store directory.
pub fn is_in_dependency_store(p: &Path) -> bool {
    p.components().any(|c| matches!(c, Component::Normal(n) if n == DEPENDENCY_STORE_DIR))
}

/// True if `p` lies in a build-output or generated directory below the workspace root.
pub fn is_generated(p: &Path, workspace_root: &Path) -> bool {
    let rel = p.strip_prefix(workspace_root).unwrap_or(p);
    rel.components().any(|c| match c {
        Component::Normal(n) => n.to_str().is_some_and(|n| GENERATED_DIRS.contains(&n)),
        _ => false,
    })
}

/// Path of `p` relative to `root`, or `p` itself when it lies elsewhere.
pub fn workspace_relative(p: &Path, root: &Path) -> String {
    p.strip_prefix(root).unwrap_or(p).to_string_lossy().to_string()
}

/// Directory listings cached for the lifetime of one run.
///
/// Listings are sorted by path so that every lookup built on them is deterministic.
#[derive(Debug, Default)]
pub struct ListingCache {
    recursive: DashMap<PathBuf, Arc<Vec<PathBuf>>>,
    shallow: DashMap<PathBuf, Arc<Vec<PathBuf>>>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// All files below `dir`, skipping hidden, ignored, dependency-store and generated entries.
    pub fn files_under(&self, dir: &Path) -> Arc<Vec<PathBuf>> {
        if let Some(v) = self.recursive.get(dir) {
            trace!("Cache hit for listing: {}", dir.display());
            return Arc::clone(&v);
        }

        let mut files = Vec::new();
        if dir.is_dir() {
            let walker = WalkBuilder::new(dir)
                .hidden(true)
                .git_ignore(true)
                .sort_by_file_path(|a, b| a.cmp(b))
                .filter_entry(|e| {
                    e.file_name().to_str().is_none_or(|n| {
                        n != DEPENDENCY_STORE_DIR && !GENERATED_DIRS.contains(&n)
                    })
                })
                .build();
            for dent in walker.filter_map(|e| e.ok()) {
                if dent.file_type().is_some_and(|t| t.is_file()) {
                    files.push(dent.into_path());
                }
            }
        }
        trace!("Listed {} files under {}", files.len(), dir.display());

        let files = Arc::new(files);
        self.recursive.insert(dir.to_path_buf(), Arc::clone(&files));
        files
    }

    /// Immediate children of `dir` (files and directories), sorted.
    pub fn entries_of(&self, dir: &Path) -> Arc<Vec<PathBuf>> {
        if let Some(v) = self.shallow.get(dir) {
            return Arc::clone(&v);
        }

        let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(rd) => rd.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        };
        entries.sort();

        let entries = Arc::new(entries);
        self.shallow.insert(dir.to_path_buf(), Arc::clone(&entries));
        entries
    }
}
