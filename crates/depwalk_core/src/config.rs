use ignore::WalkBuilder;
use log::{debug, trace};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::{
    constants::{DEPENDENCY_STORE_DIR, GENERATED_DIRS, PACKAGE_MANIFEST, WORKSPACE_MANIFESTS},
    package::PackageManifest,
};

/// Fatal setup problems; everything else is recovered during the walk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find a workspace root above {}", .0.display())]
    WorkspaceRootNotFound(PathBuf),
    #[error("workspace root {} does not exist", .0.display())]
    MissingWorkspaceRoot(PathBuf),
    #[error("entry file {} does not exist", .0.display())]
    MissingEntry(PathBuf),
    #[error("entry file {} lies outside the workspace root {}", entry.display(), root.display())]
    EntryOutsideWorkspace { entry: PathBuf, root: PathBuf },
}

/// Searches upward from `start` for the top of the workspace.
///
/// A directory qualifies if it holds one of [`WORKSPACE_MANIFESTS`] or a
/// `package.json` with a `workspaces` field. Packages may carry their own
/// manifest (a per-package `turbo.json`), so the outermost qualifying directory
/// at or below the enclosing `.git` directory wins. Failing that, the outermost
/// `package.json` in the same range is used.
pub fn find_workspace_root(start: &Path) -> Result<PathBuf, ConfigError> {
    debug!("Searching for workspace root from {}", start.display());
    let mut outermost_workspace = None;
    let mut outermost_package = None;
    let mut current = Some(start);

    while let Some(dir) = current {
        trace!("Checking for workspace manifests in: {}", dir.display());
        if let Some(manifest) = WORKSPACE_MANIFESTS.iter().find(|m| dir.join(m).is_file()) {
            trace!("Workspace manifest {} in {}", manifest, dir.display());
            outermost_workspace = Some(dir.to_path_buf());
        }
        if dir.join(PACKAGE_MANIFEST).is_file() {
            if PackageManifest::read(dir).is_some_and(|m| m.workspaces.is_some()) {
                trace!("package.json workspaces in {}", dir.display());
                outermost_workspace = Some(dir.to_path_buf());
            }
            outermost_package = Some(dir.to_path_buf());
        }
        if dir.join(".git").exists() {
            break;
        }
        current = dir.parent();
    }

    if let Some(root) = outermost_workspace {
        debug!("Found workspace root at {}", root.display());
        return Ok(root);
    }
    if let Some(root) = outermost_package {
        debug!("Falling back to outermost package root {}", root.display());
        return Ok(root);
    }

    debug!("Could not find a workspace root above {}", start.display());
    Err(ConfigError::WorkspaceRootNotFound(start.to_path_buf()))
}

/// Reads `compilerOptions.paths` from every `tsconfig.json` in the workspace.
///
/// Aliases and targets have their trailing `/*` removed and targets are made
/// absolute against `baseUrl`. When two files define the same alias the one
/// closest to `root` wins.
pub fn read_tsconfig_paths(root: &Path) -> HashMap<String, Vec<String>> {
    debug!("Reading tsconfig paths from root: {:?}", root);
    let mut paths = HashMap::new();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .filter_entry(|e| {
            e.file_name()
                .to_str()
                .is_none_or(|n| n != DEPENDENCY_STORE_DIR && !GENERATED_DIRS.contains(&n))
        })
        .build();

    let mut tsconfig_files: Vec<(usize, PathBuf)> = walker
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() == "tsconfig.json")
        .map(|e| (e.depth(), e.into_path()))
        .collect();
    tsconfig_files.sort();
    debug!("Found {} tsconfig.json files", tsconfig_files.len());

    for (_, tsconfig_path) in &tsconfig_files {
        let Ok(content) = fs::read_to_string(tsconfig_path) else {
            trace!("Could not read {:?}", tsconfig_path);
            continue;
        };
        let json = match serde_json::from_str::<serde_json::Value>(&strip_json_comments(&content)) {
            Ok(json) => json,
            Err(e) => {
                trace!("Skipping unparsable {:?}: {}", tsconfig_path, e);
                continue;
            }
        };
        let Some(compiler_options) = json.get("compilerOptions") else {
            continue;
        };
        let Some(paths_obj) = compiler_options.get("paths").and_then(|p| p.as_object()) else {
            continue;
        };

        let base_url = compiler_options.get("baseUrl").and_then(|b| b.as_str()).unwrap_or(".");
        let base_path = tsconfig_path.parent().unwrap_or(root).join(base_url);

        for (alias, targets) in paths_obj {
            let resolved_targets: Vec<String> = targets
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|t| t.as_str())
                .map(|t| {
                    path_clean::clean(base_path.join(t.trim_end_matches("/*")))
                        .to_string_lossy()
                        .to_string()
                })
                .collect();

            if !resolved_targets.is_empty() {
                let alias_key = alias.trim_end_matches("/*").to_string();
                trace!("Found tsconfig path alias: '{}' -> {:?}", alias_key, resolved_targets);
                paths.entry(alias_key).or_insert(resolved_targets);
            }
        }
    }

    debug!("Loaded {} tsconfig path aliases", paths.len());
    paths
}

/// Removes `//` and `/* */` comments outside of string literals.
fn strip_json_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn test_find_workspace_root_by_pnpm_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        create_test_file(root, "pnpm-workspace.yaml", "packages:\n  - packages/*\n");
        create_test_file(root, "packages/ui/package.json", r#"{ "name": "ui" }"#);
        let subdir = root.join("packages/ui/src/components");
        fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_workspace_root(&subdir).unwrap(), root);
    }

    #[test]
    fn test_find_workspace_root_skips_per_package_turbo_json() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        create_test_file(root, "pnpm-workspace.yaml", "packages:\n  - apps/*\n");
        create_test_file(root, "apps/web/package.json", r#"{ "name": "web" }"#);
        create_test_file(root, "apps/web/turbo.json", r#"{ "extends": ["//"] }"#);
        let subdir = root.join("apps/web/src");
        fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_workspace_root(&subdir).unwrap(), root);
    }

    #[test]
    fn test_find_workspace_root_by_workspaces_field() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        create_test_file(root, "package.json", r#"{ "name": "mono", "workspaces": ["packages/*"] }"#);
        create_test_file(root, "packages/ui/package.json", r#"{ "name": "ui" }"#);
        let subdir = root.join("packages/ui");

        assert_eq!(find_workspace_root(&subdir).unwrap(), root);
    }

    #[test]
    fn test_find_workspace_root_falls_back_to_git_bounded_package() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("repo/.git")).unwrap();
        create_test_file(root, "repo/package.json", r#"{ "name": "app" }"#);
        create_test_file(root, "repo/nested/package.json", r#"{ "name": "nested" }"#);
        let subdir = root.join("repo/nested/src");
        fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_workspace_root(&subdir).unwrap(), root.join("repo"));
    }

    #[test]
    fn test_find_workspace_root_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let subdir = temp_dir.path().join("nested").join("deep");
        fs::create_dir_all(&subdir).unwrap();
        fs::create_dir_all(temp_dir.path().join(".git")).unwrap();

        let result = find_workspace_root(&subdir);
        assert!(matches!(result, Err(ConfigError::WorkspaceRootNotFound(_))));
    }

    #[test]
    fn test_read_tsconfig_paths_simple() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let tsconfig_content = r#"
{
  "compilerOptions": {
    "baseUrl": ".",
    "paths": {
      "@components/*": ["src/components/*"],
      "@utils": ["src/utils"]
    }
  }
}
"#;
        create_test_file(root, "tsconfig.json", tsconfig_content);

        let paths = read_tsconfig_paths(root);
        assert_eq!(paths.len(), 2);
        assert!(paths.contains_key("@utils"));
        assert!(!paths.contains_key("@components/*"));

        let components_paths = paths.get("@components").unwrap();
        assert_eq!(components_paths.len(), 1);
        assert_eq!(PathBuf::from(&components_paths[0]), root.join("src/components"));
    }

    #[test]
    fn test_read_tsconfig_paths_with_base_url() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let tsconfig_content = r##"
{
  "compilerOptions": {
    "baseUrl": "src",
    "paths": {
      "#lib/*": ["lib/*", "fallback/*"]
    }
  }
}
"##;
        create_test_file(root, "apps/web/tsconfig.json", tsconfig_content);

        let paths = read_tsconfig_paths(root);
        let lib = paths.get("#lib").unwrap();
        assert_eq!(PathBuf::from(&lib[0]), root.join("apps/web/src/lib"));
        assert_eq!(PathBuf::from(&lib[1]), root.join("apps/web/src/fallback"));
    }

    #[test]
    fn test_read_tsconfig_paths_shallowest_definition_wins() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(
            root,
            "tsconfig.json",
            r#"{ "compilerOptions": { "paths": { "@shared/*": ["shared/*"] } } }"#,
        );
        create_test_file(
            root,
            "apps/tsconfig.json",
            r#"{ "compilerOptions": { "paths": { "@shared/*": ["other/*"], "@app/*": ["app/*"] } } }"#,
        );

        let paths = read_tsconfig_paths(root);
        assert_eq!(paths.len(), 2);
        assert_eq!(PathBuf::from(&paths["@shared"][0]), root.join("shared"));
        assert_eq!(PathBuf::from(&paths["@app"][0]), root.join("apps/app"));
    }

    #[test]
    fn test_read_tsconfig_paths_with_comments() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let tsconfig_content = r#"
{
  // This is a comment
  "compilerOptions": {
    /* block
       comment */
    "baseUrl": ".", // Another comment
    "paths": {
      "@components/*": ["src/components/*"], // Path comment
      "@cdn": ["vendor//cdn"]
    }
  }
}
"#;
        create_test_file(root, "tsconfig.json", tsconfig_content);

        let paths = read_tsconfig_paths(root);
        assert_eq!(paths.len(), 2);
        assert!(paths.contains_key("@components"));
        assert!(paths.contains_key("@cdn"));
    }

    #[test]
    fn test_read_tsconfig_paths_skips_dependency_store() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(
            root,
            "node_modules/lib/tsconfig.json",
            r#"{ "compilerOptions": { "paths": { "@lib/*": ["src/*"] } } }"#,
        );
        assert!(read_tsconfig_paths(root).is_empty());
    }

    #[test]
    fn test_read_tsconfig_paths_no_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "tsconfig.json", r#"{ "compilerOptions": { "target": "ES2020" } }"#);
        assert!(read_tsconfig_paths(root).is_empty());

        let empty = TempDir::new().unwrap();
        assert!(read_tsconfig_paths(empty.path()).is_empty());
    }

    #[test]
    fn test_strip_json_comments_keeps_strings() {
        let src = r#"{ "url": "https://example.com/*x*/", /* gone */ "a": 1 // gone
}"#;
        let stripped = strip_json_comments(src);
        let json: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(json["url"], "https://example.com/*x*/");
        assert_eq!(json["a"], 1);
    }
}
