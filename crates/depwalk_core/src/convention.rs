//! Convention-based auto-discovery of components, composables, stores and utilities.
//!
//! A reference such as `<LazyWidgetX/>` or `useCartStore()` has no import to
//! follow. Instead a handful of name variants is derived from it and the
//! conventional directories of the current package are searched for a file
//! carrying one of those names.

use log::trace;
use std::path::{Path, PathBuf};

use crate::{
    constants::{
        COMPONENT_MODE_SUFFIXES, CONVENTION_DIRS, CONVENTION_PREFIXES, CONVENTION_SUFFIXES,
        RESOLVE_EXTENSIONS,
    },
    fs::ListingCache,
    markup::to_kebab_case,
};

/// Finds the file a set of name variants refers to.
///
/// `roots` are searched in order; implementations must be deterministic for a
/// given filesystem state.
pub trait ConventionLocator: Send + Sync {
    fn locate(&self, variants: &[String], roots: &[PathBuf], listings: &ListingCache)
    -> Option<PathBuf>;
}

/// How well a file matched, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRank {
    /// `components/WidgetX.vue`
    BaseName,
    /// `components/WidgetX/index.vue`
    DirectoryIndex,
    /// `components/widget/X.vue` (path segments joined)
    PathPrefixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionMatch {
    pub path: PathBuf,
    pub rank: MatchRank,
}

/// Searches [`CONVENTION_DIRS`] under every root.
///
/// Ties are broken by match rank, then by variant order (the identity variant
/// first), then by nesting depth below the convention directory, then by root
/// order, directory order and sorted path order.
#[derive(Debug, Clone, Default)]
pub struct ConventionDirs;

impl ConventionDirs {
    pub fn best_match(
        &self,
        variants: &[String],
        roots: &[PathBuf],
        listings: &ListingCache,
    ) -> Option<ConventionMatch> {
        let keys: Vec<String> = variants.iter().map(|v| name_key(v)).collect();
        let mut best: Option<((MatchRank, usize, usize), PathBuf)> = None;

        for root in roots {
            for dir_name in CONVENTION_DIRS {
                let dir = root.join(dir_name);
                for file in listings.files_under(&dir).iter() {
                    let Some((rank, variant)) = rank_file(file, &dir, &keys) else {
                        continue;
                    };
                    trace!("Convention candidate {:?} for {:?}: {}", rank, variants, file.display());
                    // components/Button.vue before components/Admin/Button.vue
                    let depth = file.strip_prefix(&dir).map_or(usize::MAX, |r| r.iter().count());
                    let key = (rank, variant, depth);
                    if best.as_ref().is_none_or(|(b, _)| key < *b) {
                        best = Some((key, file.clone()));
                    }
                }
            }
        }

        best.map(|((rank, _, _), path)| ConventionMatch { path, rank })
    }
}

impl ConventionLocator for ConventionDirs {
    fn locate(
        &self,
        variants: &[String],
        roots: &[PathBuf],
        listings: &ListingCache,
    ) -> Option<PathBuf> {
        self.best_match(variants, roots, listings).map(|m| m.path)
    }
}

/// Ranks `file` (found under the convention directory `dir`) against the variant keys.
fn rank_file(file: &Path, dir: &Path, keys: &[String]) -> Option<(MatchRank, usize)> {
    let name = file.file_name()?.to_str()?;
    if name.ends_with(".d.ts") {
        return None;
    }
    let ext = file.extension()?.to_str()?;
    if !RESOLVE_EXTENSIONS.contains(&ext) || ext == "json" {
        return None;
    }
    let stem = strip_mode_suffix(file.file_stem()?.to_str()?);
    let position = |key: &str| keys.iter().position(|k| k == key);

    if stem != "index" {
        if let Some(i) = position(&name_key(stem)) {
            return Some((MatchRank::BaseName, i));
        }
    } else if let Some(parent) = file.parent().filter(|p| *p != dir)
        && let Some(parent_name) = parent.file_name().and_then(|n| n.to_str())
        && let Some(i) = position(&name_key(parent_name))
    {
        return Some((MatchRank::DirectoryIndex, i));
    }

    // components/base/Button.vue answers to BaseButton
    let rel = file.parent()?.strip_prefix(dir).ok()?;
    let mut joined: String = rel.iter().filter_map(|s| s.to_str()).collect();
    if stem != "index" {
        joined.push_str(stem);
    }
    if rel.as_os_str().is_empty() {
        return None;
    }
    position(&name_key(&joined)).map(|i| (MatchRank::PathPrefixed, i))
}

fn strip_mode_suffix(stem: &str) -> &str {
    COMPONENT_MODE_SUFFIXES.iter().find_map(|s| stem.strip_suffix(s)).unwrap_or(stem)
}

/// Comparison key for identifiers, tag names and file stems.
///
/// `widget-x`, `WidgetX`, `widget_x` and `widgetX` all share a key.
pub fn name_key(name: &str) -> String {
    name.chars().filter(|c| *c != '-' && *c != '_').flat_map(char::to_lowercase).collect()
}

/// Derives the name variants searched for `name`.
///
/// Order: identity, hyphenated, known prefix stripped, known suffix stripped, both stripped.
pub fn name_variants(name: &str) -> Vec<String> {
    let prefix_stripped = strip_known_prefix(name);
    let suffix_stripped = strip_known_suffix(name);
    let both = prefix_stripped.and_then(strip_known_suffix);

    let candidates = [
        Some(name.to_string()),
        Some(to_kebab_case(name)),
        prefix_stripped.map(str::to_string),
        suffix_stripped.map(str::to_string),
        both.map(str::to_string),
    ];

    let mut variants: Vec<String> = Vec::new();
    for v in candidates.into_iter().flatten() {
        if !v.is_empty() && !variants.contains(&v) {
            variants.push(v);
        }
    }
    variants
}

/// Strips a known prefix at a word boundary: `LazyWidget` -> `Widget`, `lazy-widget` -> `widget`.
fn strip_known_prefix(name: &str) -> Option<&str> {
    CONVENTION_PREFIXES.iter().find_map(|prefix| {
        let head = name.get(..prefix.len())?;
        let rest = name.get(prefix.len()..)?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        let boundary = rest.starts_with(|c: char| c.is_ascii_uppercase() || c == '-');
        let rest = rest.trim_start_matches('-');
        (boundary && !rest.is_empty()).then_some(rest)
    })
}

/// Strips a known suffix at a word boundary: `useCartStore` -> `useCart`, `cart-store` -> `cart`.
fn strip_known_suffix(name: &str) -> Option<&str> {
    CONVENTION_SUFFIXES.iter().find_map(|suffix| {
        let split = name.len().checked_sub(suffix.len())?;
        let head = name.get(..split)?;
        let tail = name.get(split..)?;
        if !tail.eq_ignore_ascii_case(suffix) {
            return None;
        }
        let boundary = tail.starts_with(|c: char| c.is_ascii_uppercase()) || head.ends_with('-');
        let head = head.trim_end_matches('-');
        (boundary && !head.is_empty()).then_some(head)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
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
    fn test_name_variants() {
        assert_eq!(
            name_variants("useCartStore"),
            vec!["useCartStore", "use-cart-store", "CartStore", "useCart", "Cart"]
        );
        assert_eq!(name_variants("LazyWidgetX"), vec!["LazyWidgetX", "lazy-widget-x", "WidgetX"]);
        assert_eq!(name_variants("lazy-widget-x"), vec!["lazy-widget-x", "widget-x"]);
        assert_eq!(name_variants("WidgetX"), vec!["WidgetX", "widget-x"]);
    }

    #[test]
    fn test_prefix_needs_word_boundary() {
        assert_eq!(strip_known_prefix("UserCard"), None);
        assert_eq!(strip_known_prefix("useThing"), Some("Thing"));
        assert_eq!(strip_known_prefix("Lazy"), None);
        assert_eq!(strip_known_suffix("Restore"), None);
        assert_eq!(strip_known_suffix("cart-store"), Some("cart"));
    }

    #[test]
    fn test_name_key() {
        assert_eq!(name_key("widget-x"), name_key("WidgetX"));
        assert_eq!(name_key("use_thing"), name_key("useThing"));
    }

    #[test]
    fn test_exact_match_beats_index_and_path_prefixed() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "components/form/Widget/index.vue", "");
        create_test_file(root, "components/Widget/index.vue", "");
        let exact = create_test_file(root, "components/z/Widget.vue", "");

        let m = ConventionDirs
            .best_match(&name_variants("Widget"), &[root.to_path_buf()], &ListingCache::new())
            .unwrap();
        assert_eq!(m.path, exact);
        assert_eq!(m.rank, MatchRank::BaseName);
    }

    #[test]
    fn test_direct_child_beats_nested_file_with_same_name() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "components/Admin/Button.vue", "");
        let direct = create_test_file(root, "components/Button.vue", "");

        let m = ConventionDirs
            .best_match(&name_variants("Button"), &[root.to_path_buf()], &ListingCache::new())
            .unwrap();
        assert_eq!(m.path, direct);
        assert_eq!(m.rank, MatchRank::BaseName);
    }

    #[test]
    fn test_directory_index_beats_path_prefixed() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "components/base/Button.vue", "");
        let index = create_test_file(root, "components/BaseButton/index.vue", "");

        let m = ConventionDirs
            .best_match(&name_variants("BaseButton"), &[root.to_path_buf()], &ListingCache::new())
            .unwrap();
        assert_eq!(m.path, index);
        assert_eq!(m.rank, MatchRank::DirectoryIndex);
    }

    #[test]
    fn test_path_prefixed_component() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let file = create_test_file(root, "components/base/Button.vue", "");

        let m = ConventionDirs
            .best_match(&name_variants("base-button"), &[root.to_path_buf()], &ListingCache::new())
            .unwrap();
        assert_eq!(m.path, file);
        assert_eq!(m.rank, MatchRank::PathPrefixed);
    }

    #[test]
    fn test_identity_variant_beats_stripped_variant() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "components/Thing.vue", "");
        let composable = create_test_file(root, "composables/useThing.ts", "");

        let found = ConventionDirs.locate(
            &name_variants("useThing"),
            &[root.to_path_buf()],
            &ListingCache::new(),
        );
        assert_eq!(found, Some(composable));
    }

    #[test]
    fn test_fixed_directory_priority_on_ties() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "utils/format.ts", "");
        let in_composables = create_test_file(root, "composables/format.ts", "");

        let found =
            ConventionDirs.locate(&name_variants("format"), &[root.to_path_buf()], &ListingCache::new());
        assert_eq!(found, Some(in_composables));
    }

    #[test]
    fn test_store_and_mode_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let store = create_test_file(root, "stores/cart.ts", "");
        let client = create_test_file(root, "components/Map.client.vue", "");
        create_test_file(root, "components/Map.d.ts", "");

        let listings = ListingCache::new();
        let roots = [root.to_path_buf()];
        assert_eq!(ConventionDirs.locate(&name_variants("useCartStore"), &roots, &listings), Some(store));
        assert_eq!(ConventionDirs.locate(&name_variants("LazyMap"), &roots, &listings), Some(client));
        assert_eq!(ConventionDirs.locate(&name_variants("Missing"), &roots, &listings), None);
    }

    #[test]
    fn test_earlier_root_wins() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let first = create_test_file(root, "app/components/Card.vue", "");
        create_test_file(root, "layer/components/Card.vue", "");

        let roots = [root.join("app"), root.join("layer")];
        assert_eq!(ConventionDirs.locate(&name_variants("Card"), &roots, &ListingCache::new()), Some(first));
    }
}
