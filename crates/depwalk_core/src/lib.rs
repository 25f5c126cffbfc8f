//! Core building blocks for walking the dependency closure of a frontend workspace.
//!
//! This crate provides:
//! - Splitting single-file components (`.vue`, `.svelte`, `.astro`) into logic and markup
//! - Extracting references: imports, component tags and convention-named helper calls
//! - Resolving references through aliases, relative paths, workspace packages,
//!   the dependency store and convention-based auto-discovery
//! - Workspace discovery (workspace root, `tsconfig.json` path aliases)

mod config;
mod constants;
mod convention;
mod extractor;
mod fs;
mod markup;
mod package;
mod resolver;
mod source;
mod types;

// Re-export public API
pub use config::{ConfigError, find_workspace_root, read_tsconfig_paths};
pub use constants::{
    COMBINED_EXTENSIONS, CONVENTION_DIRS, GENERATED_DIRS, INDEX_FILES, LOGIC_EXTENSIONS,
    RESOLVE_EXTENSIONS,
};
pub use convention::{
    ConventionDirs, ConventionLocator, ConventionMatch, MatchRank, name_key, name_variants,
};
pub use extractor::{
    ConventionStrategy, Extraction, ExtractionStrategy, ImportStrategy, ReferenceExtractor,
    StrategyOutcome, TagStrategy,
};
pub use fs::{
    ListingCache, canonical, is_generated, is_in_dependency_store, probe_file, workspace_relative,
};
pub use markup::{Attribute, Element, MarkupTree, is_builtin_tag, parse_markup};
pub use package::{PackageDescriptor, PackageManifest, find_package_root};
pub use resolver::{ModuleResolver, is_ignored};
pub use source::{ParsedSource, ScriptLang, SourceFormat, split_source};
pub use types::{Diagnostic, DiagnosticKind, RefKind, ReferenceCandidate, ResolutionContext};
