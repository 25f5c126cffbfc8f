use anyhow::Result;
use log::{debug, info};

use depwalk_core::{DiagnosticKind, ModuleResolver, workspace_relative};

use crate::{config::Config, types::ClosureReport, walker::GraphWalker};

pub fn run_closure(mut cfg: Config) -> Result<ClosureReport> {
    info!("Starting dependency closure walk");

    // Initialize config (resolve root and entry, load tsconfig paths)
    cfg.initialize()?;
    let root = cfg.root()?.clone();
    let entry = cfg.entry.clone();

    let resolver = ModuleResolver::new(&root)
        .with_tsconfig_paths(std::mem::take(&mut cfg.tsconfig_paths))
        .with_extra_roots(cfg.extra_roots.clone());
    let walker = GraphWalker::new(resolver);

    let state = if cfg.parallel {
        info!("Walking from {} in parallel", entry.display());
        walker.walk_parallel(&entry)
    } else {
        info!("Walking from {}", entry.display());
        walker.walk(&entry)
    };

    let report = ClosureReport {
        entry: workspace_relative(&entry, &root),
        workspace_root: root,
        files: state.files(),
        diagnostics: state.diagnostics,
        files_parsed: state.files_parsed,
    };

    info!(
        "Closure walk complete. Found {} files ({} parsed)",
        report.files.len(),
        report.files_parsed
    );
    debug!(
        "Diagnostics: io={}, parse={}, unresolved={}",
        report.count(DiagnosticKind::Io),
        report.count(DiagnosticKind::Parse),
        report.count(DiagnosticKind::ResolutionMiss)
    );

    Ok(report)
}
