use dashmap::DashMap;
use log::{debug, trace};
use path_clean::clean;
use std::{
    cmp::Ordering,
    collections::HashMap,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use crate::{
    constants::{
        CONTENT_STORE_DIR, CONVENTION_SOURCE_DIRS, DEPENDENCY_STORE_DIR, FRAMEWORK_HELPERS,
        IGNORED_BUILTINS, IGNORED_PREFIXES, PACKAGE_MANIFEST, ROOT_ALIASES, VIRTUAL_MODULES,
        WORKSPACE_PACKAGE_DIRS,
    },
    convention::{ConventionDirs, ConventionLocator, name_variants},
    fs::{ListingCache, is_generated, is_in_dependency_store, probe_file},
    package::{PackageDescriptor, PackageManifest, resolve_subpath, split_package_specifier},
    types::ResolutionContext,
};

/// Turns a reference string into a file on disk.
///
/// One resolver serves one run: resolutions keyed by `(directory, specifier)`
/// and directory listings are cached for its lifetime.
pub struct ModuleResolver {
    workspace_root: PathBuf,
    tsconfig_paths: Vec<(String, Vec<String>)>,
    extra_roots: Vec<PathBuf>,
    cache: DashMap<(PathBuf, String), Option<PathBuf>>,
    listings: ListingCache,
    workspace_packages: OnceLock<HashMap<String, PathBuf>>,
    locator: Box<dyn ConventionLocator>,
}

impl ModuleResolver {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            tsconfig_paths: Vec::new(),
            extra_roots: Vec::new(),
            cache: DashMap::new(),
            listings: ListingCache::new(),
            workspace_packages: OnceLock::new(),
            locator: Box::new(ConventionDirs),
        }
    }

    /// Path aliases read from `tsconfig.json`; the longest alias is tried first.
    pub fn with_tsconfig_paths(mut self, paths: HashMap<String, Vec<String>>) -> Self {
        let mut paths: Vec<_> = paths.into_iter().collect();
        paths.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        self.tsconfig_paths = paths;
        self
    }

    /// Extra roots searched by convention discovery after the current package.
    pub fn with_extra_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.extra_roots = roots;
        self
    }

    pub fn with_locator(mut self, locator: Box<dyn ConventionLocator>) -> Self {
        self.locator = locator;
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Resolves `specifier` as seen from `ctx`, or `None` when nothing matches.
    ///
    /// Strategies run in order and the first hit wins: ignore list, aliases,
    /// relative paths, workspace packages, the dependency store, then
    /// convention discovery. Hits inside generated directories are rejected
    /// unless they also live in the dependency store.
    pub fn resolve(&self, specifier: &str, ctx: &ResolutionContext) -> Option<PathBuf> {
        let specifier = specifier.trim();
        if specifier.is_empty() || is_ignored(specifier) {
            trace!("Ignoring '{}'", specifier);
            return None;
        }

        let key = (ctx.current_dir().to_path_buf(), specifier.to_string());
        if let Some(v) = self.cache.get(&key) {
            trace!("Cache hit for resolve: '{}' from {}", specifier, key.0.display());
            return v.clone();
        }
        trace!("Resolving: '{}' from {}", specifier, ctx.current_file.display());

        let resolved = self.resolve_uncached(specifier, ctx).filter(|p| {
            let keep = !is_generated(p, &self.workspace_root) || is_in_dependency_store(p);
            if !keep {
                debug!("Rejecting generated file {} for '{}'", p.display(), specifier);
            }
            keep
        });

        self.cache.insert(key, resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, specifier: &str, ctx: &ResolutionContext) -> Option<PathBuf> {
        if let Some(p) = self.resolve_root_alias(specifier, ctx) {
            trace!("Resolved root alias '{}' to {}", specifier, p.display());
            return Some(p);
        }
        if let Some(p) = self.resolve_tsconfig_alias(specifier) {
            trace!("Resolved tsconfig alias '{}' to {}", specifier, p.display());
            return Some(p);
        }
        if is_relative(specifier) {
            let result = self.resolve_relative(specifier, ctx);
            trace!("Relative '{}' -> {:?}", specifier, result);
            return result;
        }
        if let Some((name, subpath)) = split_package_specifier(specifier) {
            if let Some(p) = self.resolve_workspace_package(name, subpath) {
                trace!("Resolved workspace package '{}' to {}", specifier, p.display());
                return Some(p);
            }
            if let Some(p) = self.resolve_dependency_store(name, subpath, ctx) {
                trace!("Resolved stored package '{}' to {}", specifier, p.display());
                return Some(p);
            }
        }
        if is_identifier(specifier) {
            let result = self.resolve_convention(specifier, ctx);
            trace!("Convention '{}' -> {:?}", specifier, result);
            return result;
        }
        None
    }

    /// `~/x`, `@/x`, `~~/x` and `@@/x` against the package root, then its `src/`.
    fn resolve_root_alias(&self, specifier: &str, ctx: &ResolutionContext) -> Option<PathBuf> {
        let rest = ROOT_ALIASES.iter().find_map(|alias| {
            let rest = specifier.strip_prefix(alias)?;
            if rest.is_empty() {
                Some("")
            } else {
                rest.strip_prefix('/')
            }
        })?;

        let roots = [ctx.package_root.clone(), ctx.package_root.join("src")];
        roots.iter().find_map(|base| {
            let candidate = if rest.is_empty() { base.clone() } else { clean(base.join(rest)) };
            trace!("Trying alias target {}", candidate.display());
            probe_file(&candidate)
        })
    }

    fn resolve_tsconfig_alias(&self, specifier: &str) -> Option<PathBuf> {
        for (alias, targets) in &self.tsconfig_paths {
            let Some(rest) = specifier.strip_prefix(alias.as_str()) else {
                continue;
            };
            if !rest.is_empty() && !rest.starts_with('/') && !alias.ends_with('/') {
                continue;
            }
            trace!("Matched alias '{}' for request '{}'", alias, specifier);
            let remainder = rest.trim_start_matches('/');
            for target in targets {
                let candidate = if remainder.is_empty() {
                    PathBuf::from(target)
                } else {
                    PathBuf::from(target).join(remainder)
                };
                if let Some(resolved) = probe_file(&clean(candidate)) {
                    return Some(resolved);
                }
            }
        }
        None
    }

    /// `./` and `../` against the current file's directory; `/x` as an absolute
    /// path first, then against the package root.
    fn resolve_relative(&self, specifier: &str, ctx: &ResolutionContext) -> Option<PathBuf> {
        let base = ctx.current_dir();
        if let Some(p) = probe_file(&clean(base.join(specifier))) {
            return Some(p);
        }
        let rooted = specifier.strip_prefix('/')?;
        probe_file(&clean(ctx.package_root.join(rooted)))
    }

    fn resolve_workspace_package(&self, name: &str, subpath: Option<&str>) -> Option<PathBuf> {
        let dir = self.workspace_packages().get(name)?;
        trace!("Workspace package '{}' lives in {}", name, dir.display());
        package_entry(dir, subpath)
    }

    /// Workspace member packages, keyed by manifest `name` and by directory name.
    fn workspace_packages(&self) -> &HashMap<String, PathBuf> {
        self.workspace_packages.get_or_init(|| {
            let mut by_name = HashMap::new();
            let mut by_dir = Vec::new();
            for group in WORKSPACE_PACKAGE_DIRS {
                let mut dirs: Vec<PathBuf> = Vec::new();
                for entry in self.listings.entries_of(&self.workspace_root.join(group)).iter() {
                    let is_scope = entry
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with('@'))
                        && !entry.join(PACKAGE_MANIFEST).is_file();
                    if is_scope {
                        dirs.extend(self.listings.entries_of(entry).iter().cloned());
                    } else {
                        dirs.push(entry.clone());
                    }
                }

                for dir in dirs.into_iter().filter(|d| d.join(PACKAGE_MANIFEST).is_file()) {
                    let dir_name = dir.file_name().and_then(|n| n.to_str()).map(str::to_string);
                    let name = PackageManifest::read(&dir).and_then(|m| m.name);
                    if let Some(name) = name.or_else(|| dir_name.clone()) {
                        by_name.entry(name).or_insert_with(|| dir.clone());
                    }
                    if let Some(dir_name) = dir_name {
                        by_dir.push((dir_name, dir));
                    }
                }
            }
            for (dir_name, dir) in by_dir {
                by_name.entry(dir_name).or_insert(dir);
            }
            debug!("Found {} workspace packages", by_name.len());
            by_name
        })
    }

    /// `node_modules/<name>` walking up to the workspace root, then the
    /// content-addressed store under each of those `node_modules`.
    fn resolve_dependency_store(
        &self,
        name: &str,
        subpath: Option<&str>,
        ctx: &ResolutionContext,
    ) -> Option<PathBuf> {
        let mut stores = Vec::new();
        let mut current = Some(ctx.current_dir());
        while let Some(dir) = current {
            let store = dir.join(DEPENDENCY_STORE_DIR);
            if store.is_dir() {
                let pkg = store.join(name);
                trace!("Checking dependency store at: {}", pkg.display());
                if pkg.is_dir()
                    && let Some(resolved) = package_entry(&pkg, subpath)
                {
                    return Some(resolved);
                }
                stores.push(store);
            }
            if dir == self.workspace_root.as_path() {
                break;
            }
            current = dir.parent();
        }

        let prefix = format!("{}@", name.replace('/', "+"));
        for store in stores {
            let content = store.join(CONTENT_STORE_DIR);
            let entries = self.listings.entries_of(&content);
            let Some(versioned) = entries
                .iter()
                .filter_map(|e| {
                    let version = e.file_name()?.to_str()?.strip_prefix(&prefix)?;
                    Some((version, e))
                })
                .max_by(|(a, _), (b, _)| compare_store_versions(a, b))
                .map(|(_, e)| e)
            else {
                continue;
            };
            let pkg = versioned.join(DEPENDENCY_STORE_DIR).join(name);
            trace!("Checking content store at: {}", pkg.display());
            if let Some(resolved) = package_entry(&pkg, subpath) {
                return Some(resolved);
            }
        }
        None
    }

    fn resolve_convention(&self, name: &str, ctx: &ResolutionContext) -> Option<PathBuf> {
        let mut roots: Vec<PathBuf> = Vec::new();
        for base in std::iter::once(&ctx.package_root).chain(&self.extra_roots) {
            for src in CONVENTION_SOURCE_DIRS {
                let root = if src.is_empty() { base.clone() } else { base.join(src) };
                if root.is_dir() && !roots.contains(&root) {
                    roots.push(root);
                }
            }
        }
        self.locator.locate(&name_variants(name), &roots, &self.listings)
    }
}

/// Orders content-store version suffixes (`1.10.0`, `1.2.0_react@18.2.0`)
/// segment by segment, numerically where both segments are numbers.
fn compare_store_versions(a: &str, b: &str) -> Ordering {
    let segments = |v: &str| -> Vec<String> {
        let version = v.split('_').next().unwrap_or(v);
        version.split(['.', '-', '+']).map(str::to_owned).collect()
    };
    let (a_segments, b_segments) = (segments(a), segments(b));
    for (x, y) in a_segments.iter().zip(&b_segments) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    // 1.0.0 ranks above its 1.0.0-beta prerelease
    match a_segments.len().cmp(&b_segments.len()) {
        Ordering::Equal => a.cmp(b),
        ord => ord.reverse(),
    }
}

fn package_entry(dir: &Path, subpath: Option<&str>) -> Option<PathBuf> {
    match subpath {
        Some(sub) => resolve_subpath(dir, sub),
        None => PackageDescriptor::load(dir).map(|d| d.entry_point),
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

/// A bare name such as `WidgetX`, `widget-x` or `useThing`.
fn is_identifier(specifier: &str) -> bool {
    let mut chars = specifier.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-'))
}

/// Specifiers that never resolve to a workspace file.
pub fn is_ignored(specifier: &str) -> bool {
    if IGNORED_PREFIXES.iter().any(|p| specifier.starts_with(p)) || specifier.ends_with(".d.ts") {
        return true;
    }
    if VIRTUAL_MODULES.iter().any(|m| {
        specifier.strip_prefix(m).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }) {
        return true;
    }
    let first_segment = specifier.split('/').next().unwrap_or(specifier);
    IGNORED_BUILTINS.contains(&first_segment) || FRAMEWORK_HELPERS.contains(&specifier)
}
