use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use depwalk_closure::Config;
use log::{debug, info};
use std::io::{BufWriter, Write};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "depwalk")]
#[command(about = "Static dependency-graph tools for frontend workspaces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every workspace file an entry file transitively depends on
    Closure(Config),
}

fn main() -> Result<()> {
    env_logger::init();

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?}", cli.command);

    let start = Instant::now();

    match cli.command {
        Commands::Closure(cfg) => {
            let num_threads = if cfg.parallel { rayon::current_num_threads() } else { 1 };
            info!(
                "Running closure walk from {} (using {} threads)",
                cfg.entry.display(),
                num_threads
            );
            debug!("Config: root={:?}, extra_roots={:?}", cfg.root, cfg.extra_roots);

            let report = depwalk_closure::run_closure(cfg.clone())?;
            debug!("Found {} files", report.files.len());

            let elapsed_ms = start.elapsed().as_millis();

            depwalk_closure::print_closure(&mut stdout, &report, &cfg)?;
            if cfg.diagnostics {
                depwalk_closure::print_diagnostics(&mut stdout, &report)?;
            }

            stdout.flush()?;

            // The summary goes to stderr so the file list can be piped
            eprintln!(
                "\n{} Finished in {}ms: {} files in the closure of {} ({} parsed, using {} threads).",
                "●".bright_blue(),
                elapsed_ms.to_string().cyan(),
                report.files.len().to_string().cyan(),
                report.entry.cyan(),
                report.files_parsed.to_string().cyan(),
                num_threads.to_string().cyan()
            );

            Ok(())
        }
    }
}
