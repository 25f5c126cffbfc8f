use std::{
    collections::BTreeMap,
    io::{self, Write},
};

use colored::{ColoredString, Colorize};
use log::debug;

use depwalk_core::{DiagnosticKind, workspace_relative};

use crate::{config::Config, types::ClosureReport};

/// Writes the closure, one path per line.
pub fn print_closure<W: Write>(
    writer: &mut W,
    report: &ClosureReport,
    cfg: &Config,
) -> io::Result<()> {
    debug!("Printing {} files", report.files.len());
    for file in &report.files {
        if cfg.absolute {
            writeln!(writer, "{}", report.workspace_root.join(file).display())?;
        } else {
            writeln!(writer, "{}", file)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes collected diagnostics grouped by file.
pub fn print_diagnostics<W: Write>(writer: &mut W, report: &ClosureReport) -> io::Result<()> {
    if report.diagnostics.is_empty() {
        writeln!(writer, "\n{} No diagnostics", "✓".green().bold())?;
        writer.flush()?;
        return Ok(());
    }

    let mut by_file: BTreeMap<String, Vec<_>> = BTreeMap::new();
    for d in &report.diagnostics {
        by_file.entry(workspace_relative(&d.file, &report.workspace_root)).or_default().push(d);
    }
    debug!("Grouped {} diagnostics into {} files", report.diagnostics.len(), by_file.len());

    writeln!(
        writer,
        "\n{} {} diagnostics ({} unresolved, {} unreadable, {} degraded)\n",
        "⚠".yellow().bold(),
        report.diagnostics.len().to_string().yellow(),
        report.count(DiagnosticKind::ResolutionMiss),
        report.count(DiagnosticKind::Io),
        report.count(DiagnosticKind::Parse),
    )?;

    for (file, diagnostics) in by_file {
        writeln!(writer, "{}", file.bold())?;
        for d in diagnostics {
            writeln!(writer, "  {} {}", label(d.kind), d.message)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn label(kind: DiagnosticKind) -> ColoredString {
    let text = format!("{:>10}", kind.to_string());
    match kind {
        DiagnosticKind::Io => text.red(),
        DiagnosticKind::Parse => text.yellow(),
        DiagnosticKind::ResolutionMiss => text.dimmed(),
    }
}
