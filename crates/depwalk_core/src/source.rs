//! Splits raw file content into a logic section and an optional markup section.
//!
//! Combined formats (`.vue`, `.svelte`, `.astro`) are scanned for their
//! `<script>`, `<template>`, `<style>` blocks and frontmatter fences. Splitting
//! never fails: malformed input produces best-effort sections plus diagnostics.

use memchr::memmem;
use oxc_span::SourceType;
use std::path::Path;

use crate::{
    constants::LOGIC_EXTENSIONS,
    markup::{find_tag_end, parse_attributes},
};

/// Dialect of a logic section, used to pick the parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScriptLang {
    Js,
    Jsx,
    Ts,
    Tsx,
}

impl ScriptLang {
    fn from_extension(ext: &str) -> Self {
        match ext {
            "ts" | "mts" | "cts" => ScriptLang::Ts,
            "tsx" => ScriptLang::Tsx,
            "jsx" => ScriptLang::Jsx,
            _ => ScriptLang::Js,
        }
    }

    fn from_lang_attr(lang: Option<&str>) -> Self {
        Self::from_extension(lang.unwrap_or("js").trim())
    }

    /// Joins two dialects into one that can parse both.
    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (ScriptLang::Tsx, _) | (_, ScriptLang::Tsx) => ScriptLang::Tsx,
            (ScriptLang::Ts, ScriptLang::Jsx) | (ScriptLang::Jsx, ScriptLang::Ts) => {
                ScriptLang::Tsx
            }
            (a, b) => a.max(b),
        }
    }

    pub fn source_type(self) -> SourceType {
        let (ts, jsx) = match self {
            ScriptLang::Js => (false, false),
            ScriptLang::Jsx => (false, true),
            ScriptLang::Ts => (true, false),
            ScriptLang::Tsx => (true, true),
        };
        SourceType::default().with_module(true).with_typescript(ts).with_jsx(jsx)
    }
}

/// How a file's content is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Logic(ScriptLang),
    Vue,
    Svelte,
    Astro,
    /// Not a source file (stylesheets, JSON, assets); never parsed
    Opaque,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match ext {
            "vue" => SourceFormat::Vue,
            "svelte" => SourceFormat::Svelte,
            "astro" => SourceFormat::Astro,
            e if LOGIC_EXTENSIONS.contains(&e) => SourceFormat::Logic(ScriptLang::from_extension(e)),
            _ => SourceFormat::Opaque,
        }
    }

    pub fn is_parsable(self) -> bool {
        !matches!(self, SourceFormat::Opaque)
    }
}

/// The result of splitting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSource {
    pub logic: String,
    pub lang: ScriptLang,
    pub markup: Option<String>,
    pub diagnostics: Vec<String>,
}

impl ParsedSource {
    fn logic_only(content: &str, lang: ScriptLang) -> Self {
        Self { logic: content.to_string(), lang, markup: None, diagnostics: Vec::new() }
    }
}

/// Splits `content` according to `format`.
pub fn split_source(content: &str, format: SourceFormat) -> ParsedSource {
    match format {
        SourceFormat::Logic(lang) => ParsedSource::logic_only(content, lang),
        SourceFormat::Opaque => ParsedSource::logic_only("", ScriptLang::Js),
        SourceFormat::Vue => split_vue(content),
        SourceFormat::Svelte => split_svelte(content),
        SourceFormat::Astro => split_astro(content),
    }
}

/// A `<tag …>…</tag>` block located in a combined file.
#[derive(Debug)]
struct Block<'a> {
    attrs: &'a str,
    content: &'a str,
    /// Byte range of the whole block, opening tag to closing tag
    start: usize,
    end: usize,
}

impl Block<'_> {
    fn attr(&self, name: &str) -> Option<&str> {
        parse_attributes(self.attrs).into_iter().find(|a| a.name == name).and_then(|a| a.value)
    }
}

/// Finds `<tag` at or after `from`, requiring a delimiter after the name.
fn find_open(src: &str, tag: &str, from: usize) -> Option<usize> {
    let needle = format!("<{}", tag);
    let bytes = src.as_bytes();
    let mut pos = from;
    while let Some(off) = memmem::find(&bytes[pos..], needle.as_bytes()) {
        let at = pos + off;
        match bytes.get(at + needle.len()) {
            Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/') | None => return Some(at),
            _ => pos = at + needle.len(),
        }
    }
    None
}

/// Collects every non-nested `tag` block. Unclosed blocks run to the end of input.
fn find_blocks<'a>(src: &'a str, tag: &str, diagnostics: &mut Vec<String>) -> Vec<Block<'a>> {
    let bytes = src.as_bytes();
    let closing = format!("</{}", tag);
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_open(src, tag, pos) {
        let attrs_start = start + 1 + tag.len();
        let Some(tag_end) = find_tag_end(bytes, attrs_start) else {
            diagnostics.push(format!("unterminated <{}> tag at byte {}", tag, start));
            break;
        };
        let attrs = &src[attrs_start..tag_end];
        if attrs.trim_end().ends_with('/') {
            blocks.push(Block { attrs, content: "", start, end: tag_end + 1 });
            pos = tag_end + 1;
            continue;
        }

        let content_start = tag_end + 1;
        match memmem::find(&bytes[content_start..], closing.as_bytes()) {
            Some(off) => {
                let close_at = content_start + off;
                let end = find_tag_end(bytes, close_at).map(|e| e + 1).unwrap_or(bytes.len());
                blocks.push(Block { attrs, content: &src[content_start..close_at], start, end });
                pos = end;
            }
            None => {
                diagnostics.push(format!("unclosed <{}> block at byte {}", tag, start));
                blocks.push(Block { attrs, content: &src[content_start..], start, end: bytes.len() });
                break;
            }
        }
    }

    blocks
}

/// Locates the outermost `<template>` block, matching nested `<template>` tags.
fn find_template_block<'a>(src: &'a str, diagnostics: &mut Vec<String>) -> Option<Block<'a>> {
    let bytes = src.as_bytes();
    let start = find_open(src, "template", 0)?;
    let attrs_start = start + "<template".len();
    let Some(tag_end) = find_tag_end(bytes, attrs_start) else {
        diagnostics.push(format!("unterminated <template> tag at byte {}", start));
        return None;
    };
    let attrs = &src[attrs_start..tag_end];
    let content_start = tag_end + 1;

    let mut depth = 1usize;
    let mut pos = content_start;
    loop {
        let next_open = find_open(src, "template", pos);
        let next_close = memmem::find(&bytes[pos..], b"</template").map(|o| pos + o);
        match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => {
                let self_closing = find_tag_end(bytes, o)
                    .map(|e| src[o..e].trim_end().ends_with('/'))
                    .unwrap_or(false);
                if !self_closing {
                    depth += 1;
                }
                pos = o + "<template".len();
            }
            (_, Some(c)) => {
                depth -= 1;
                let end = find_tag_end(bytes, c).map(|e| e + 1).unwrap_or(bytes.len());
                if depth == 0 {
                    return Some(Block { attrs, content: &src[content_start..c], start, end });
                }
                pos = end;
            }
            (_, None) => {
                diagnostics.push(format!("unclosed <template> block at byte {}", start));
                return Some(Block { attrs, content: &src[content_start..], start, end: bytes.len() });
            }
        }
    }
}

/// Concatenates script blocks into one logic section.
fn join_scripts(blocks: &[Block<'_>]) -> (String, ScriptLang) {
    let mut lang = ScriptLang::Js;
    let mut logic = String::new();
    for block in blocks {
        lang = lang.merge(ScriptLang::from_lang_attr(block.attr("lang")));
        if !logic.is_empty() {
            logic.push('\n');
        }
        logic.push_str(block.content);
    }
    (logic, lang)
}

/// Copies `src` with the given byte ranges removed.
fn remove_ranges(src: &str, mut ranges: Vec<(usize, usize)>) -> String {
    ranges.sort();
    let mut out = String::with_capacity(src.len());
    let mut pos = 0;
    for (start, end) in ranges {
        if start >= pos {
            out.push_str(&src[pos..start]);
            out.push('\n');
            pos = end;
        }
    }
    out.push_str(&src[pos.min(src.len())..]);
    out
}

fn split_vue(src: &str) -> ParsedSource {
    let mut diagnostics = Vec::new();

    let template = find_template_block(src, &mut diagnostics);
    // scripts inside the template are not top-level blocks
    let scripts: Vec<Block<'_>> = find_blocks(src, "script", &mut diagnostics)
        .into_iter()
        .filter(|s| template.as_ref().is_none_or(|t| s.start < t.start || s.start >= t.end))
        .collect();
    let (logic, lang) = join_scripts(&scripts);

    let markup = match template {
        Some(t) => match t.attr("lang").map(str::trim) {
            None | Some("html") => Some(t.content.to_string()),
            Some(other) => {
                diagnostics.push(format!("unsupported template language '{}'", other));
                None
            }
        },
        None => None,
    };

    ParsedSource { logic, lang, markup, diagnostics }
}

fn split_svelte(src: &str) -> ParsedSource {
    let mut diagnostics = Vec::new();
    let scripts = find_blocks(src, "script", &mut diagnostics);
    let styles = find_blocks(src, "style", &mut diagnostics);
    let (logic, lang) = join_scripts(&scripts);

    let ranges = scripts.iter().chain(&styles).map(|b| (b.start, b.end)).collect();
    let markup = remove_ranges(src, ranges);

    ParsedSource { logic, lang, markup: Some(markup), diagnostics }
}

fn split_astro(src: &str) -> ParsedSource {
    let mut diagnostics = Vec::new();
    let mut lang = ScriptLang::Ts;
    let mut logic = String::new();

    let trimmed = src.trim_start();
    let lead = src.len() - trimmed.len();
    let body_start = if let Some(after) = trimmed.strip_prefix("---") {
        let fm_start = lead + 3;
        match memmem::find(after.as_bytes(), b"\n---") {
            Some(off) => {
                logic.push_str(&src[fm_start..fm_start + off]);
                let close = fm_start + off + 4;
                src[close..].find('\n').map(|n| close + n + 1).unwrap_or(src.len())
            }
            None => {
                diagnostics.push("unclosed frontmatter fence".to_string());
                logic.push_str(&src[fm_start..]);
                src.len()
            }
        }
    } else {
        0
    };

    let body = &src[body_start..];
    let scripts = find_blocks(body, "script", &mut diagnostics);
    let styles = find_blocks(body, "style", &mut diagnostics);
    if !scripts.is_empty() {
        let (script_logic, script_lang) = join_scripts(&scripts);
        lang = lang.merge(script_lang);
        if !logic.is_empty() {
            logic.push('\n');
        }
        logic.push_str(&script_logic);
    }

    let ranges = scripts.iter().chain(&styles).map(|b| (b.start, b.end)).collect();
    let markup = remove_ranges(body, ranges);

    ParsedSource { logic, lang, markup: Some(markup), diagnostics }
}
