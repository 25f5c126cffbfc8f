use log::trace;
use serde::Deserialize;
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{constants::PACKAGE_MANIFEST, fs::probe_file};

/// The parts of a `package.json` the resolver cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    pub name: Option<String>,
    pub exports: Option<Value>,
    pub module: Option<String>,
    pub main: Option<String>,
    pub workspaces: Option<Value>,
}

impl PackageManifest {
    pub fn read(dir: &Path) -> Option<Self> {
        let txt = fs::read_to_string(dir.join(PACKAGE_MANIFEST)).ok()?;
        match serde_json::from_str(&txt) {
            Ok(m) => Some(m),
            Err(e) => {
                trace!("Ignoring malformed manifest in {}: {}", dir.display(), e);
                None
            }
        }
    }
}

/// A package root together with its resolved entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub root: PathBuf,
    pub entry_point: PathBuf,
}

impl PackageDescriptor {
    /// Reads the manifest in `root` (if any) and resolves its entry point.
    ///
    /// Entry fields are tried in order: `exports`, `module`, `main`, then a plain `index`.
    pub fn load(root: &Path) -> Option<Self> {
        let manifest = PackageManifest::read(root).unwrap_or_default();
        let entry_point = entry_from_manifest(root, &manifest)?;
        Some(Self { root: root.to_path_buf(), entry_point })
    }
}

fn entry_from_manifest(root: &Path, manifest: &PackageManifest) -> Option<PathBuf> {
    if let Some(exports) = &manifest.exports
        && let Some(target) = export_target(exports, ".")
        && let Some(resolved) = probe_file(&root.join(target.trim_start_matches("./")))
    {
        return Some(resolved);
    }

    for field in [&manifest.module, &manifest.main].into_iter().flatten() {
        if let Some(resolved) = probe_file(&root.join(field.trim_start_matches("./"))) {
            return Some(resolved);
        }
    }

    probe_file(&root.join("index"))
}

/// Resolves `subpath` (e.g. `./button`) inside a package, honouring the `exports` map first.
pub fn resolve_subpath(root: &Path, subpath: &str) -> Option<PathBuf> {
    let key = format!("./{}", subpath);
    if let Some(exports) = PackageManifest::read(root).and_then(|m| m.exports)
        && let Some(target) = export_target(&exports, &key)
        && let Some(resolved) = probe_file(&root.join(target.trim_start_matches("./")))
    {
        return Some(resolved);
    }
    probe_file(&root.join(subpath))
}

/// Picks the target for `key` out of an `exports` value.
///
/// Handles the string shorthand, subpath maps and condition objects, preferring
/// `import`, then `module`, `browser`, `require` and `default`.
fn export_target<'v>(exports: &'v Value, key: &str) -> Option<&'v str> {
    match exports {
        Value::String(s) if key == "." => Some(s.as_str()),
        Value::Object(obj) => {
            let is_subpath_map = obj.keys().any(|k| k.starts_with('.'));
            if is_subpath_map {
                obj.get(key).and_then(condition_target)
            } else if key == "." {
                condition_target(exports)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn condition_target(v: &Value) -> Option<&str> {
    match v {
        Value::String(s) => Some(s.as_str()),
        Value::Object(conditions) => ["import", "module", "browser", "require", "default"]
            .iter()
            .filter_map(|k| conditions.get(*k))
            .find_map(condition_target),
        Value::Array(items) => items.iter().find_map(condition_target),
        _ => None,
    }
}

/// Walks upward from `file` to the nearest directory holding a package manifest.
///
/// Never climbs above `workspace_root`; falls back to it when no manifest is found.
pub fn find_package_root(file: &Path, workspace_root: &Path) -> PathBuf {
    let mut current = file.parent();
    while let Some(dir) = current {
        if dir.join(PACKAGE_MANIFEST).is_file() {
            return dir.to_path_buf();
        }
        if dir == workspace_root {
            break;
        }
        current = dir.parent();
    }
    workspace_root.to_path_buf()
}

/// Splits a bare specifier into its package name and optional subpath.
///
/// `@scope/pkg/a/b` yields `("@scope/pkg", Some("a/b"))`; `pkg` yields `("pkg", None)`.
pub fn split_package_specifier(specifier: &str) -> Option<(&str, Option<&str>)> {
    let mut slashes = specifier.match_indices('/').map(|(i, _)| i);
    let name_end = if specifier.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };
    let (name, rest) = match name_end {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..])),
        None => (specifier, None),
    };
    if name.is_empty() || (name.starts_with('@') && !name.contains('/')) {
        return None;
    }
    Some((name, rest.filter(|r| !r.is_empty())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::canonical;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    #[test]
    fn test_split_package_specifier() {
        assert_eq!(split_package_specifier("left-pad"), Some(("left-pad", None)));
        assert_eq!(split_package_specifier("lodash/fp/map"), Some(("lodash", Some("fp/map"))));
        assert_eq!(split_package_specifier("@acme/ui"), Some(("@acme/ui", None)));
        assert_eq!(split_package_specifier("@acme/ui/button"), Some(("@acme/ui", Some("button"))));
        assert_eq!(split_package_specifier("@acme"), None);
        assert_eq!(split_package_specifier(""), None);
    }

    #[test]
    fn test_entry_prefers_exports_over_module_and_main() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(
            root,
            "package.json",
            r#"{ "exports": { ".": { "import": "./esm/index.mjs" } }, "module": "./mod.js", "main": "./main.js" }"#,
        );
        let esm = create_test_file(root, "esm/index.mjs", "");
        create_test_file(root, "mod.js", "");
        create_test_file(root, "main.js", "");

        let desc = PackageDescriptor::load(root).unwrap();
        assert_eq!(desc.entry_point, canonical(&esm));
    }

    #[test]
    fn test_entry_falls_back_to_module_then_main_then_index() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        create_test_file(root, "a/package.json", r#"{ "module": "lib/a.js", "main": "main.js" }"#);
        let a = create_test_file(root, "a/lib/a.js", "");
        create_test_file(root, "a/main.js", "");
        assert_eq!(PackageDescriptor::load(&root.join("a")).unwrap().entry_point, canonical(&a));

        create_test_file(root, "b/package.json", r#"{ "main": "./main" }"#);
        let b = create_test_file(root, "b/main.js", "");
        assert_eq!(PackageDescriptor::load(&root.join("b")).unwrap().entry_point, canonical(&b));

        create_test_file(root, "c/package.json", r#"{ "name": "c" }"#);
        let c = create_test_file(root, "c/index.ts", "");
        assert_eq!(PackageDescriptor::load(&root.join("c")).unwrap().entry_point, canonical(&c));
    }

    #[test]
    fn test_string_exports_and_subpaths() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(
            root,
            "package.json",
            r#"{ "exports": { ".": "./dist/index.js", "./button": { "default": "./src/button.ts" } } }"#,
        );
        let entry = create_test_file(root, "dist/index.js", "");
        let button = create_test_file(root, "src/button.ts", "");
        let other = create_test_file(root, "other/thing.ts", "");

        assert_eq!(PackageDescriptor::load(root).unwrap().entry_point, canonical(&entry));
        assert_eq!(resolve_subpath(root, "button"), Some(canonical(&button)));
        assert_eq!(resolve_subpath(root, "other/thing"), Some(canonical(&other)));
    }

    #[test]
    fn test_find_package_root_stops_at_workspace_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "packages/ui/package.json", "{}");
        let file = create_test_file(root, "packages/ui/src/components/Button.vue", "");
        let loose = create_test_file(root, "scripts/tool.ts", "");

        assert_eq!(find_package_root(&file, root), root.join("packages/ui"));
        assert_eq!(find_package_root(&loose, root), root.to_path_buf());
    }

    #[test]
    fn test_malformed_manifest_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", "{ not json");
        let index = create_test_file(root, "index.js", "");
        assert_eq!(PackageDescriptor::load(root).unwrap().entry_point, canonical(&index));
    }
}
