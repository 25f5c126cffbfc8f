//! Dependency-reference extraction.
//!
//! Extraction runs an ordered list of independent strategies over the logic
//! and markup sections of one file:
//! - explicit imports, via the oxc parser with a regex fallback
//! - convention-named helpers (`useThing()`, `useCartStore()`)
//! - component tags in the markup section
//!
//! Each strategy returns a partial result. A strategy that hits malformed input
//! reports it as degraded and the others are unaffected.

use anyhow::{Context, Result};
use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{Parser as OxcParser, ParserReturn};
use regex::Regex;
use std::{collections::HashSet, fs, path::Path, sync::LazyLock};

use crate::{
    convention::name_key,
    markup::{Element, is_builtin_tag, parse_markup},
    source::{ParsedSource, SourceFormat, split_source},
    types::{RefKind, ReferenceCandidate},
};

/// What one strategy found in one file.
#[derive(Debug, Default)]
pub struct StrategyOutcome {
    pub candidates: Vec<ReferenceCandidate>,
    /// Names bound locally by the file (imported or declared)
    pub bindings: Vec<String>,
    /// Set when the strategy had to fall back or skip malformed input
    pub degraded: Option<String>,
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, parsed: &ParsedSource) -> StrategyOutcome;
}

/// Candidates for one file plus anything that went wrong while finding them.
#[derive(Debug, Default)]
pub struct Extraction {
    pub candidates: Vec<ReferenceCandidate>,
    pub diagnostics: Vec<String>,
}

pub struct ReferenceExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for ReferenceExtractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ImportStrategy),
            Box::new(ConventionStrategy),
            Box::new(TagStrategy),
        ])
    }
}

impl ReferenceExtractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Runs every strategy and merges the results.
    ///
    /// Tag and convention candidates that name a locally bound identifier are
    /// dropped, since an import (or the file itself) already accounts for them.
    pub fn extract(&self, parsed: &ParsedSource) -> Extraction {
        let mut diagnostics = parsed.diagnostics.clone();
        let mut bound: HashSet<String> = HashSet::new();
        let mut found = Vec::new();

        for strategy in &self.strategies {
            let outcome = strategy.extract(parsed);
            trace!("Strategy '{}' found {} candidates", strategy.name(), outcome.candidates.len());
            if let Some(reason) = outcome.degraded {
                diagnostics.push(format!("{}: {}", strategy.name(), reason));
            }
            bound.extend(outcome.bindings.iter().map(|b| name_key(b)));
            found.extend(outcome.candidates);
        }

        let mut seen = HashSet::new();
        let candidates = found
            .into_iter()
            .filter(|c| {
                c.kind == RefKind::ExplicitImport || !bound.contains(&name_key(&c.specifier))
            })
            .filter(|c| seen.insert(c.clone()))
            .collect();

        Extraction { candidates, diagnostics }
    }

    /// Reads `file`, splits it by format and extracts its references.
    pub fn references_for(&self, file: &Path) -> Result<Extraction> {
        trace!("Parsing file for references: {}", file.display());
        let format = SourceFormat::from_path(file);
        if !format.is_parsable() {
            trace!("Not a source file, skipping extraction: {}", file.display());
            return Ok(Extraction::default());
        }

        let src = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let parsed = split_source(&src, format);
        let extraction = self.extract(&parsed);
        debug!("Found {} references in {}", extraction.candidates.len(), file.display());
        Ok(extraction)
    }
}

/// Explicit `import`/`export … from`/`import()`/`require()` references.
pub struct ImportStrategy;

impl ExtractionStrategy for ImportStrategy {
    fn name(&self) -> &'static str {
        "imports"
    }

    fn extract(&self, parsed: &ParsedSource) -> StrategyOutcome {
        if parsed.logic.trim().is_empty() {
            return StrategyOutcome::default();
        }

        let allocator = Allocator::default();
        let ParserReturn { program, errors, panicked, .. } =
            OxcParser::new(&allocator, &parsed.logic, parsed.lang.source_type()).parse();

        let mut collector = ImportCollector::default();
        collector.visit_program(&program);
        let mut outcome = StrategyOutcome {
            candidates: collector
                .requests
                .into_iter()
                .map(|r| ReferenceCandidate::new(r, RefKind::ExplicitImport))
                .collect(),
            bindings: collector.bindings,
            degraded: None,
        };

        if panicked || !errors.is_empty() {
            let first = errors.first().map(|e| e.to_string()).unwrap_or_default();
            debug!("Lexical scan failed ({} errors), running regex fallback", errors.len());
            let fallback = scan_imports_with_regex(&parsed.logic);
            outcome.candidates.extend(fallback.candidates);
            outcome.bindings.extend(fallback.bindings);
            outcome.degraded = Some(format!("syntax error, used regex fallback: {}", first));
        }

        outcome
    }
}

#[derive(Default)]
struct ImportCollector {
    requests: Vec<String>,
    bindings: Vec<String>,
}

impl<'a> Visit<'a> for ImportCollector {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        // Skip type-only imports (import type { Foo } from 'bar')
        if decl.import_kind.is_type() {
            trace!("Skipping type-only import of '{}'", decl.source.value);
            return;
        }

        // import { type Foo } from 'bar' only counts with at least one runtime binding
        let has_runtime_import = match &decl.specifiers {
            Some(specifiers) => {
                let mut runtime = false;
                for spec in specifiers {
                    match spec {
                        ImportDeclarationSpecifier::ImportSpecifier(s) => {
                            if !s.import_kind.is_type() {
                                runtime = true;
                                self.bindings.push(s.local.name.to_string());
                            }
                        }
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            runtime = true;
                            self.bindings.push(s.local.name.to_string());
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            runtime = true;
                            self.bindings.push(s.local.name.to_string());
                        }
                    }
                }
                runtime || specifiers.is_empty()
            }
            // import 'side-effect'
            None => true,
        };

        if has_runtime_import {
            trace!("Found static import: '{}'", decl.source.value);
            self.requests.push(decl.source.value.to_string());
        }
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &decl.source
            && !decl.export_kind.is_type()
        {
            trace!("Found re-export: '{}'", source.value);
            self.requests.push(source.value.to_string());
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        if !decl.export_kind.is_type() {
            trace!("Found re-export: '{}'", decl.source.value);
            self.requests.push(decl.source.value.to_string());
        }
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Some(request) = literal_string(&expr.source) {
            trace!("Found dynamic import(): '{}'", request);
            self.requests.push(request);
        }
        walk::walk_import_expression(self, expr);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &call.callee
            && callee.name.as_str() == "require"
            && let Some(arg) = call.arguments.first().and_then(|a| a.as_expression())
            && let Some(request) = literal_string(arg)
        {
            trace!("Found require() call: '{}'", request);
            self.requests.push(request);
        }
        walk::walk_call_expression(self, call);
    }
}

/// The value of a string literal or an interpolation-free template literal.
fn literal_string(expr: &Expression<'_>) -> Option<String> {
    match expr {
        Expression::StringLiteral(sl) => Some(sl.value.to_string()),
        Expression::TemplateLiteral(tl) if tl.expressions.is_empty() => {
            tl.quasis.first().map(|q| q.value.raw.to_string())
        }
        _ => None,
    }
}

static IMPORT_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(import|export)\s+(type\s+)?(?:([\w$*{},\s]+?)\s+from\s+)?["']([^"'\n]+)["']"#,
    )
    .expect("static regex")
});

static DYNAMIC_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:import|require)\s*\(\s*["'`]([^"'`\n$]+)["'`]\s*\)"#).expect("static regex")
});

/// Line-oriented import scan used when the parser rejects the logic section.
fn scan_imports_with_regex(src: &str) -> StrategyOutcome {
    let mut outcome = StrategyOutcome::default();

    for caps in IMPORT_FROM_RE.captures_iter(src) {
        if caps.get(2).is_some() {
            continue;
        }
        let keyword = &caps[1];
        let clause = caps.get(3).map(|m| m.as_str());
        // `export const x = '...'` never matches, but `export 'x'` is not a re-export either
        if keyword == "export" && clause.is_none() {
            continue;
        }
        if keyword == "import" && let Some(clause) = clause {
            if is_type_only_clause(clause) {
                continue;
            }
            outcome.bindings.extend(clause_bindings(clause));
        }
        outcome.candidates.push(ReferenceCandidate::new(&caps[4], RefKind::ExplicitImport));
    }

    for caps in DYNAMIC_IMPORT_RE.captures_iter(src) {
        outcome.candidates.push(ReferenceCandidate::new(&caps[1], RefKind::ExplicitImport));
    }

    outcome
}

/// `{ type A, type B }`
fn is_type_only_clause(clause: &str) -> bool {
    let mut entries = clause.split([',', '{', '}']).map(str::trim).filter(|t| !t.is_empty());
    let mut any = false;
    let all_types = entries.all(|t| {
        any = true;
        t.starts_with("type ")
    });
    any && all_types
}

/// Local names bound by an import clause such as `A, { b as c, type D }`.
fn clause_bindings(clause: &str) -> Vec<String> {
    clause
        .split([',', '{', '}'])
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.starts_with("type "))
        .filter_map(|t| t.rsplit(char::is_whitespace).next())
        .filter(|t| *t != "*" && !t.is_empty())
        .map(str::to_string)
        .collect()
}

static CONVENTION_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^.\w$])(use[A-Z][\w$]*)\s*(?:<[^<>()]*>)?\s*\(").expect("static regex")
});

static CONVENTION_WRAPPED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:storeToRefs|toRefs|toRef|unref|toValue)\s*\(\s*(use[A-Z][\w$]*)\s*[,)]")
        .expect("static regex")
});

static CONVENTION_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:function\s*\*?\s*|(?:const|let|var)\s+)(use[A-Z][\w$]*)\b")
        .expect("static regex")
});

/// Auto-wired helpers and state containers following the `useXxx` naming convention.
pub struct ConventionStrategy;

impl ExtractionStrategy for ConventionStrategy {
    fn name(&self) -> &'static str {
        "conventions"
    }

    fn extract(&self, parsed: &ParsedSource) -> StrategyOutcome {
        let mut outcome = StrategyOutcome::default();
        let sections = std::iter::once(parsed.logic.as_str()).chain(parsed.markup.as_deref());

        for section in sections {
            for re in [&*CONVENTION_CALL_RE, &*CONVENTION_WRAPPED_RE] {
                for caps in re.captures_iter(section) {
                    trace!("Found convention usage: '{}'", &caps[1]);
                    outcome
                        .candidates
                        .push(ReferenceCandidate::new(&caps[1], RefKind::ConventionUsage));
                }
            }
            for caps in CONVENTION_DECL_RE.captures_iter(section) {
                outcome.bindings.push(caps[1].to_string());
            }
        }

        outcome
    }
}

/// Components used as tags in the markup section.
pub struct TagStrategy;

impl ExtractionStrategy for TagStrategy {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn extract(&self, parsed: &ParsedSource) -> StrategyOutcome {
        let Some(markup) = parsed.markup.as_deref() else {
            return StrategyOutcome::default();
        };

        let tree = parse_markup(markup);
        let mut outcome = StrategyOutcome::default();
        for el in tree.elements() {
            if !is_builtin_tag(el.name) {
                trace!("Found component tag: <{}>", el.name);
                outcome.candidates.push(ReferenceCandidate::new(el.name, RefKind::TagUsage));
            }
            if let Some(target) = is_binding_target(el) {
                trace!("Found dynamic component: <{} is='{}'>", el.name, target);
                outcome.candidates.push(ReferenceCandidate::new(target, RefKind::TagUsage));
            }
        }

        if !tree.errors.is_empty() {
            outcome.degraded = Some(tree.errors.join("; "));
        }
        outcome
    }
}

/// The component named by an `is` binding, when it is a literal.
///
/// `:is="'Foo'"` and `v-bind:is="'Foo'"` always count; a static `is="Foo"` only
/// counts on `<component>` or with a `vue:` prefix, since on native elements it
/// names a customized built-in element.
fn is_binding_target<'a>(el: &Element<'a>) -> Option<&'a str> {
    for attr in &el.attrs {
        let Some(value) = attr.value.map(str::trim) else {
            continue;
        };
        let target = match attr.name {
            ":is" | "v-bind:is" => unquote(value)?,
            "is" if value.starts_with("vue:") => &value[4..],
            "is" if el.name == "component" => value,
            _ => continue,
        };
        if !target.is_empty() && !is_builtin_tag(target) {
            return Some(target);
        }
    }
    None
}

fn unquote(value: &str) -> Option<&str> {
    let first = value.chars().next()?;
    if !matches!(first, '\'' | '"' | '`') || value.len() < 2 || !value.ends_with(first) {
        return None;
    }
    let inner = &value[1..value.len() - 1];
    if inner.contains(first) || (first == '`' && inner.contains("${")) {
        return None;
    }
    Some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ScriptLang;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn logic(src: &str) -> ParsedSource {
        split_source(src, SourceFormat::Logic(ScriptLang::Ts))
    }

    fn specifiers(extraction: &Extraction, kind: RefKind) -> Vec<&str> {
        extraction
            .candidates
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.specifier.as_str())
            .collect()
    }

    fn imports(src: &str) -> Vec<String> {
        let ex = ReferenceExtractor::default().extract(&logic(src));
        specifiers(&ex, RefKind::ExplicitImport).into_iter().map(str::to_string).collect()
    }

    fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let file_path = dir.join(name);
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    #[test]
    fn test_static_import_forms() {
        assert_eq!(imports("import foo from './foo';"), vec!["./foo"]);
        assert_eq!(imports("import { bar, baz } from './utils';"), vec!["./utils"]);
        assert_eq!(imports("import * as utils from './utils';"), vec!["./utils"]);
        assert_eq!(imports("import './polyfills';"), vec!["./polyfills"]);
    }

    #[test]
    fn test_reexports() {
        let found = imports("export * from './a';\nexport { b } from './b';\nexport const c = 1;");
        assert_eq!(found, vec!["./a", "./b"]);
    }

    #[test]
    fn test_dynamic_import_and_require_nested() {
        let found = imports(
            "const Lazy = defineAsyncComponent(() => import('./Lazy.vue'));\nfunction load() { return require(`./config`); }",
        );
        assert_eq!(found, vec!["./Lazy.vue", "./config"]);
    }

    #[test]
    fn test_computed_dynamic_import_is_ignored() {
        assert!(imports("const m = import(`./locales/${lang}.ts`);").is_empty());
    }

    #[test]
    fn test_type_only_imports_skipped() {
        assert!(imports("import type { Foo } from './types';").is_empty());
        assert!(imports("import { type Foo } from './types';").is_empty());
        assert!(imports("export type { Foo } from './types';").is_empty());
        // at least one runtime binding keeps the import
        assert_eq!(imports("import { type Foo, bar } from './utils';"), vec!["./utils"]);
    }

    #[test]
    fn test_duplicate_references_are_merged() {
        assert_eq!(imports("import a from './a';\nimport { b } from './a';"), vec!["./a"]);
    }

    #[test]
    fn test_regex_fallback_on_syntax_error() {
        let src = "import { a } from './a'\nimport B from \"./B.vue\"\nconst x = {{ broken\nimport type { T } from './t'\nimport { type U } from './u'";
        let ex = ReferenceExtractor::default().extract(&logic(src));
        let found = specifiers(&ex, RefKind::ExplicitImport);
        assert!(found.contains(&"./a"));
        assert!(found.contains(&"./B.vue"));
        assert!(!found.contains(&"./t"));
        assert!(!found.contains(&"./u"));
        assert!(ex.diagnostics.iter().any(|d| d.starts_with("imports:")));
    }

    #[test]
    fn test_clause_bindings() {
        assert_eq!(clause_bindings("A, { b as c, type D, e }"), vec!["A", "c", "e"]);
        assert_eq!(clause_bindings("* as ns"), vec!["ns"]);
    }

    #[test]
    fn test_convention_usage() {
        let src = "const thing = useThing()\nconst { items } = storeToRefs(useCartStore())\nconst r = router.useLater()\nconst q = useQuery<Item>({})";
        let ex = ReferenceExtractor::default().extract(&logic(src));
        let found = specifiers(&ex, RefKind::ConventionUsage);
        assert_eq!(found, vec!["useThing", "useCartStore", "useQuery"]);
    }

    #[test]
    fn test_locally_bound_conventions_are_dropped() {
        let src = "import { useToast } from 'toast-lib'\nfunction useLocal() {}\nconst useOther = () => 1\nuseToast(); useLocal(); useOther(); useRemote()";
        let ex = ReferenceExtractor::default().extract(&logic(src));
        assert_eq!(specifiers(&ex, RefKind::ConventionUsage), vec!["useRemote"]);
    }

    #[test]
    fn test_tag_usage_from_vue_file() {
        let src = r#"<template>
  <div>
    <WidgetX />
    <widget-y></widget-y>
    <ImportedCard />
    <component :is="'DynamicPanel'" />
    <component :is="current" />
    <RouterView />
  </div>
</template>
<script setup>
import ImportedCard from './ImportedCard.vue'
</script>"#;
        let ex = ReferenceExtractor::default().extract(&split_source(src, SourceFormat::Vue));
        assert_eq!(specifiers(&ex, RefKind::TagUsage), vec!["WidgetX", "widget-y", "DynamicPanel"]);
        assert_eq!(specifiers(&ex, RefKind::ExplicitImport), vec!["./ImportedCard.vue"]);
    }

    #[test]
    fn test_static_is_attribute() {
        let src = "<template><component is=\"Panel\"/><tr is=\"vue:RowItem\"/><button is=\"fancy-button\"/></template>";
        let ex = ReferenceExtractor::default().extract(&split_source(src, SourceFormat::Vue));
        assert_eq!(specifiers(&ex, RefKind::TagUsage), vec!["Panel", "RowItem"]);
    }

    #[test]
    fn test_markup_error_does_not_block_other_strategies() {
        let src = "<template><div><Card></template>\n<script>import a from './a'\nuseThing()</script>";
        let ex = ReferenceExtractor::default().extract(&split_source(src, SourceFormat::Vue));
        assert_eq!(specifiers(&ex, RefKind::ExplicitImport), vec!["./a"]);
        assert_eq!(specifiers(&ex, RefKind::ConventionUsage), vec!["useThing"]);
        assert_eq!(specifiers(&ex, RefKind::TagUsage), vec!["Card"]);
        assert!(ex.diagnostics.iter().any(|d| d.starts_with("tags:")));
    }

    #[test]
    fn test_references_for_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = create_test_file(temp_dir.path(), "test.jsx", "import React from 'react';");
        let ex = ReferenceExtractor::default().references_for(&file).unwrap();
        assert_eq!(specifiers(&ex, RefKind::ExplicitImport), vec!["react"]);
    }

    #[test]
    fn test_references_for_opaque_and_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        let css = create_test_file(temp_dir.path(), "a.css", "@import './b.css';");
        assert!(ReferenceExtractor::default().references_for(&css).unwrap().candidates.is_empty());
        assert!(ReferenceExtractor::default().references_for(&temp_dir.path().join("nope.ts")).is_err());
    }
}
