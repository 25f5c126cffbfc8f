use log::{debug, trace, warn};
use rayon::prelude::*;
use std::{
    collections::{BTreeSet, HashSet},
    path::{Path, PathBuf},
};

use depwalk_core::{
    Diagnostic, DiagnosticKind, ModuleResolver, ReferenceExtractor, ResolutionContext,
    SourceFormat, canonical, is_generated, is_ignored, is_in_dependency_store, workspace_relative,
};

/// Everything one walk accumulates. Created fresh per run.
#[derive(Debug, Default)]
pub struct WalkState {
    /// Canonical paths already claimed; each is processed at most once
    pub visited: HashSet<PathBuf>,
    /// Workspace-relative paths in the closure
    pub results: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub files_parsed: usize,
}

impl WalkState {
    /// Sorted result list.
    pub fn files(&self) -> Vec<String> {
        self.results.iter().cloned().collect()
    }
}

enum Claim {
    /// Already visited, generated, or outside the workspace
    Skip,
    /// Recorded but not expanded
    Fringe,
    Expand(PathBuf),
}

/// What reading one file produced.
struct Expansion {
    children: Vec<PathBuf>,
    diagnostics: Vec<Diagnostic>,
    parsed: bool,
}

/// Follows references from an entry file until no new files turn up.
///
/// Files inside the dependency store are recorded but never read, so the
/// closure contains external packages as a one-level fringe.
pub struct GraphWalker {
    resolver: ModuleResolver,
    extractor: ReferenceExtractor,
}

impl GraphWalker {
    pub fn new(resolver: ModuleResolver) -> Self {
        Self { resolver, extractor: ReferenceExtractor::default() }
    }

    pub fn with_extractor(mut self, extractor: ReferenceExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    fn root(&self) -> &Path {
        self.resolver.workspace_root()
    }

    /// Depth-first walk on the calling thread.
    pub fn walk(&self, entry: &Path) -> WalkState {
        let mut state = WalkState::default();
        let mut stack = Vec::new();
        if let Claim::Expand(p) = self.claim(entry, &mut state) {
            stack.push(p);
        }

        while let Some(cur) = stack.pop() {
            let expansion = self.expand(&cur);
            for child in self.absorb(expansion, &mut state).into_iter().rev() {
                trace!("Adding to stack: {}", child.display());
                stack.push(child);
            }
        }

        debug!("Walked {} files from {}", state.visited.len(), entry.display());
        state
    }

    /// Breadth-first walk that expands each frontier level on the rayon pool.
    ///
    /// Claims are made on the calling thread between levels, so the visited
    /// set has a single writer and the result matches [`GraphWalker::walk`].
    pub fn walk_parallel(&self, entry: &Path) -> WalkState {
        let mut state = WalkState::default();
        let mut frontier = Vec::new();
        if let Claim::Expand(p) = self.claim(entry, &mut state) {
            frontier.push(p);
        }

        let mut level = 0;
        while !frontier.is_empty() {
            debug!("Expanding level {} ({} files)", level, frontier.len());
            let expansions: Vec<Expansion> = frontier.par_iter().map(|p| self.expand(p)).collect();
            frontier = expansions
                .into_iter()
                .flat_map(|expansion| self.absorb(expansion, &mut state))
                .collect();
            level += 1;
        }

        debug!("Walked {} files from {} in {} levels", state.visited.len(), entry.display(), level);
        state
    }

    /// Merges an expansion into `state`, returning the children that still need expanding.
    fn absorb(&self, expansion: Expansion, state: &mut WalkState) -> Vec<PathBuf> {
        if expansion.parsed {
            state.files_parsed += 1;
        }
        state.diagnostics.extend(expansion.diagnostics);
        expansion
            .children
            .iter()
            .filter_map(|child| match self.claim(child, state) {
                Claim::Expand(p) => Some(p),
                Claim::Skip | Claim::Fringe => None,
            })
            .collect()
    }

    fn claim(&self, file: &Path, state: &mut WalkState) -> Claim {
        let path = canonical(file);
        if state.visited.contains(&path) {
            trace!("Already visited: {}", path.display());
            return Claim::Skip;
        }

        let in_store = is_in_dependency_store(&path);
        if is_generated(&path, self.root()) && !in_store {
            debug!("Skipping generated file: {}", path.display());
            return Claim::Skip;
        }
        if !path.starts_with(self.root()) && !in_store {
            debug!("Skipping file outside the workspace: {}", path.display());
            return Claim::Skip;
        }

        state.visited.insert(path.clone());
        state.results.insert(workspace_relative(&path, self.root()));

        if in_store {
            debug!("Visiting {} (dependency store, not expanded)", path.display());
            Claim::Fringe
        } else {
            debug!("Visiting {}", path.display());
            Claim::Expand(path)
        }
    }

    /// Reads one file and resolves its references. Touches no shared walk state.
    fn expand(&self, file: &Path) -> Expansion {
        let mut expansion =
            Expansion { children: Vec::new(), diagnostics: Vec::new(), parsed: false };

        let extraction = match self.extractor.references_for(file) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Skipping {}: {:#}", file.display(), e);
                expansion.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Io,
                    file,
                    format!("{:#}", e),
                ));
                return expansion;
            }
        };
        expansion.parsed = SourceFormat::from_path(file).is_parsable();
        expansion.diagnostics.extend(
            extraction
                .diagnostics
                .into_iter()
                .map(|message| Diagnostic::new(DiagnosticKind::Parse, file, message)),
        );

        let ctx = ResolutionContext::for_file(file, self.root());
        for candidate in &extraction.candidates {
            if is_ignored(&candidate.specifier) {
                trace!("Ignoring {} '{}'", candidate.kind, candidate.specifier);
                continue;
            }
            match self.resolver.resolve(&candidate.specifier, &ctx) {
                Some(resolved) => {
                    trace!("{} '{}' -> {}", candidate.kind, candidate.specifier, resolved.display());
                    expansion.children.push(resolved);
                }
                None => {
                    debug!(
                        "Unresolved {} '{}' in {}",
                        candidate.kind,
                        candidate.specifier,
                        file.display()
                    );
                    expansion.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::ResolutionMiss,
                        file,
                        format!("{} '{}'", candidate.kind, candidate.specifier),
                    ));
                }
            }
        }
        expansion
    }
}
