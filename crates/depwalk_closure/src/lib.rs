//! Dependency closure of a single entry file in a frontend workspace.
//!
//! Starting from one entry file, this crate follows explicit imports, component
//! tags and convention-named helper calls until no new workspace files turn up.
//! Packages found in the dependency store are listed but not followed.
//!
//! # Examples
//!
//! ```no_run
//! use depwalk_closure::{Config, run_closure};
//! use std::io::{BufWriter, Write};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut cfg = Config::new("apps/web/pages/index.vue");
//! cfg.root = Some(std::path::PathBuf::from("/path/to/workspace"));
//!
//! let report = run_closure(cfg.clone())?;
//!
//! let mut stdout = BufWriter::new(std::io::stdout());
//! depwalk_closure::print_closure(&mut stdout, &report, &cfg)?;
//! stdout.flush()?;
//! # Ok(())
//! # }
//! ```

mod checker;
mod config;
mod reporter;
mod types;
mod walker;

// Re-export public API
pub use checker::run_closure;
pub use config::Config;
pub use reporter::{print_closure, print_diagnostics};
pub use types::ClosureReport;
pub use walker::{GraphWalker, WalkState};
