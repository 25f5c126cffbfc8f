use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{debug, info, warn};
use std::{collections::HashMap, env, path::PathBuf};

use depwalk_core::{ConfigError, find_workspace_root, read_tsconfig_paths};

#[derive(Debug, Clone, Parser)]
#[command(name = "closure")]
#[command(about = "List every workspace file an entry file transitively depends on")]
pub struct Config {
    /// Entry source file (absolute, or relative to the working directory or the workspace root)
    pub entry: PathBuf,

    /// Workspace root (defaults to the nearest workspace manifest above the working directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Extra directory searched for convention-named components and helpers (repeatable)
    #[arg(long = "extra-root")]
    pub extra_roots: Vec<PathBuf>,

    /// Expand each level of the graph on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Print unresolved references, unreadable files and degraded parses
    #[arg(long)]
    pub diagnostics: bool,

    /// Print absolute paths instead of workspace-relative ones
    #[arg(long)]
    pub absolute: bool,

    #[clap(skip)]
    pub tsconfig_paths: HashMap<String, Vec<String>>,
}

impl Config {
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
            root: None,
            extra_roots: Vec::new(),
            parallel: false,
            diagnostics: false,
            absolute: false,
            tsconfig_paths: HashMap::new(),
        }
    }

    /// Resolves the workspace root, the entry file and extra roots, and loads tsconfig paths.
    ///
    /// A missing root or entry is reported as a [`ConfigError`].
    pub fn initialize(&mut self) -> Result<()> {
        let cwd = env::current_dir().context("Failed to read the working directory")?;

        let root = if let Some(r) = self.root.take() {
            debug!("Using provided root directory: {:?}", r);
            let r = if r.is_absolute() { r } else { cwd.join(r) };
            r.canonicalize().map_err(|_| ConfigError::MissingWorkspaceRoot(r.clone()))?
        } else {
            debug!("No root provided, searching for workspace root");
            let found = find_workspace_root(&cwd)?;
            found.canonicalize().unwrap_or(found)
        };
        info!("Using root directory: {}", root.display());

        let entry = if self.entry.is_absolute() {
            self.entry.clone()
        } else {
            [cwd.join(&self.entry), root.join(&self.entry)]
                .into_iter()
                .find(|p| p.is_file())
                .unwrap_or_else(|| root.join(&self.entry))
        };
        if !entry.is_file() {
            return Err(ConfigError::MissingEntry(entry).into());
        }
        let entry = entry.canonicalize().with_context(|| format!("Failed to read {:?}", entry))?;
        if !entry.starts_with(&root) {
            return Err(ConfigError::EntryOutsideWorkspace { entry, root }.into());
        }
        debug!("Entry file: {}", entry.display());

        let mut extra_roots = Vec::new();
        for extra in self.extra_roots.drain(..) {
            let extra = if extra.is_absolute() { extra } else { root.join(extra) };
            match extra.canonicalize() {
                Ok(p) if p.is_dir() => extra_roots.push(p),
                _ => warn!("Ignoring extra root {}: not a directory", extra.display()),
            }
        }
        self.extra_roots = extra_roots;

        debug!("Reading tsconfig paths");
        self.tsconfig_paths = read_tsconfig_paths(&root);
        debug!("Found {} tsconfig path aliases", self.tsconfig_paths.len());

        self.entry = entry;
        self.root = Some(root);
        Ok(())
    }

    /// Get the root directory, returning an error if not initialized
    pub fn root(&self) -> Result<&PathBuf> {
        self.root
            .as_ref()
            .ok_or_else(|| anyhow!("Config not initialized - call initialize() first"))
    }
}
