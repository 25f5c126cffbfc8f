//! Tolerant tag-tree parser for markup sections.
//!
//! The parser only cares about element names and attributes. Text, comments,
//! interpolations and raw-text elements are skipped. Malformed markup never
//! fails: unbalanced tags are recorded as errors and the tree is closed off as
//! well as possible.

use memchr::{memchr2, memmem};

/// A parsed element with its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<'a> {
    pub name: &'a str,
    pub attrs: Vec<Attribute<'a>>,
    pub children: Vec<Element<'a>>,
}

impl<'a> Element<'a> {
    fn new(name: &'a str, attrs: Vec<Attribute<'a>>) -> Self {
        Self { name, attrs, children: Vec::new() }
    }

    pub fn attr(&self, name: &str) -> Option<&Attribute<'a>> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// Pre-order iteration over this element and all its descendants.
    pub fn descendants(&self) -> Vec<&Element<'a>> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(el.children.iter().rev());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    pub value: Option<&'a str>,
}

#[derive(Debug, Default)]
pub struct MarkupTree<'a> {
    pub roots: Vec<Element<'a>>,
    pub errors: Vec<String>,
}

impl<'a> MarkupTree<'a> {
    pub fn elements(&self) -> Vec<&Element<'a>> {
        self.roots.iter().flat_map(|r| r.descendants()).collect()
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

/// Parses `src` into a tag tree.
pub fn parse_markup(src: &str) -> MarkupTree<'_> {
    let bytes = src.as_bytes();
    let mut tree = MarkupTree::default();
    let mut stack: Vec<Element<'_>> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(off) = memchr2(b'<', b'{', &bytes[pos..]) else {
            break;
        };
        let at = pos + off;
        let rest = &src[at..];

        if rest.starts_with("{{") {
            pos = skip_past(src, at + 2, "}}").unwrap_or(bytes.len());
            continue;
        }
        if rest.starts_with('{') {
            pos = at + 1;
            continue;
        }
        if rest.starts_with("<!--") {
            pos = match skip_past(src, at + 4, "-->") {
                Some(p) => p,
                None => {
                    tree.errors.push(format!("unterminated comment at byte {}", at));
                    bytes.len()
                }
            };
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = find_tag_end(bytes, at + 2).map(|e| e + 1).unwrap_or(bytes.len());
            continue;
        }
        if let Some(after) = rest.strip_prefix("</") {
            let name_len = tag_name_len(after);
            let name = &after[..name_len];
            pos = find_tag_end(bytes, at + 2 + name_len).map(|e| e + 1).unwrap_or(bytes.len());
            if !name.is_empty() {
                close_element(&mut stack, &mut tree, name, at);
            }
            continue;
        }

        let name_len = tag_name_len(&rest[1..]);
        if name_len == 0 || !rest.as_bytes()[1].is_ascii_alphabetic() {
            pos = at + 1;
            continue;
        }
        let name = &src[at + 1..at + 1 + name_len];
        let attrs_start = at + 1 + name_len;
        let Some(tag_end) = find_tag_end(bytes, attrs_start) else {
            tree.errors.push(format!("unterminated tag <{}> at byte {}", name, at));
            break;
        };
        let attr_src = &src[attrs_start..tag_end];
        let self_closing = attr_src.trim_end().ends_with('/');
        let element = Element::new(name, parse_attributes(attr_src.trim_end_matches('/')));
        pos = tag_end + 1;

        let lower = name.to_ascii_lowercase();
        if self_closing || VOID_ELEMENTS.contains(&lower.as_str()) {
            attach(&mut stack, &mut tree, element);
            continue;
        }
        if RAW_TEXT_ELEMENTS.contains(&lower.as_str()) {
            let closing = format!("</{}", name);
            pos = match memmem::find(&bytes[pos..], closing.as_bytes()) {
                Some(p) => {
                    let close_at = pos + p;
                    find_tag_end(bytes, close_at).map(|e| e + 1).unwrap_or(bytes.len())
                }
                None => {
                    tree.errors.push(format!("unclosed <{}> at byte {}", name, at));
                    bytes.len()
                }
            };
            attach(&mut stack, &mut tree, element);
            continue;
        }
        stack.push(element);
    }

    if !stack.is_empty() {
        let names: Vec<&str> = stack.iter().map(|e| e.name).collect();
        tree.errors.push(format!("unclosed elements at end of markup: {}", names.join(", ")));
        while let Some(el) = stack.pop() {
            attach(&mut stack, &mut tree, el);
        }
    }

    tree
}

fn attach<'a>(stack: &mut [Element<'a>], tree: &mut MarkupTree<'a>, el: Element<'a>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None => tree.roots.push(el),
    }
}

fn close_element<'a>(
    stack: &mut Vec<Element<'a>>,
    tree: &mut MarkupTree<'a>,
    name: &str,
    at: usize,
) {
    let Some(idx) = stack.iter().rposition(|e| e.name.eq_ignore_ascii_case(name)) else {
        tree.errors.push(format!("unexpected closing tag </{}> at byte {}", name, at));
        return;
    };
    if idx + 1 != stack.len() {
        let skipped: Vec<&str> = stack[idx + 1..].iter().map(|e| e.name).collect();
        tree.errors.push(format!("implicitly closed {} by </{}>", skipped.join(", "), name));
    }
    while stack.len() > idx {
        if let Some(el) = stack.pop() {
            attach(stack, tree, el);
        }
    }
}

fn tag_name_len(s: &str) -> usize {
    s.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
        .count()
}

fn skip_past(src: &str, from: usize, needle: &str) -> Option<usize> {
    memmem::find(&src.as_bytes()[from..], needle.as_bytes()).map(|p| from + p + needle.len())
}

/// Finds the closing `>` of a tag, ignoring any inside quoted attribute values.
pub(crate) fn find_tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &byte) in bytes.get(start..)?.iter().enumerate() {
        match (quote, byte) {
            (None, b'"' | b'\'') => quote = Some(byte),
            (Some(q), b) if b == q => quote = None,
            (None, b'>') => return Some(start + i),
            _ => {}
        }
    }
    None
}

/// Parses the attribute list of an opening tag (the text between the name and `>`).
pub fn parse_attributes(s: &str) -> Vec<Attribute<'_>> {
    let bytes = s.as_bytes();
    let mut attrs = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'/' | b'"' | b'\'')
        {
            i += 1;
        }
        if i == name_start {
            i += 1;
            continue;
        }
        let name = &s[name_start..i];

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b'=' {
            attrs.push(Attribute { name, value: None });
            continue;
        }
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let value = match bytes.get(j).copied() {
            Some(q) if q == b'"' || q == b'\'' => {
                let start = j + 1;
                let end = memchr::memchr(q, &bytes[start..]).map(|p| start + p).unwrap_or(bytes.len());
                i = (end + 1).min(bytes.len());
                &s[start..end]
            }
            Some(_) => {
                let start = j;
                while j < bytes.len() && !bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                i = j;
                &s[start..j]
            }
            None => {
                i = j;
                ""
            }
        };
        attrs.push(Attribute { name, value: Some(value) });
    }

    attrs
}

const HTML_TAGS: &[&str] = &[
    "a", "abbr", "address", "area", "article", "aside", "audio", "b", "base", "bdi", "bdo",
    "blockquote", "body", "br", "button", "canvas", "caption", "cite", "code", "col", "colgroup",
    "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div", "dl", "dt", "em", "embed",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "head", "header", "hgroup", "hr", "html", "i", "iframe", "img", "input", "ins", "kbd", "label",
    "legend", "li", "link", "main", "map", "mark", "menu", "meta", "meter", "nav", "noscript",
    "object", "ol", "optgroup", "option", "output", "p", "param", "picture", "pre", "progress",
    "q", "rp", "rt", "ruby", "s", "samp", "script", "search", "section", "select", "slot", "small",
    "source", "span", "strong", "style", "sub", "summary", "sup", "table", "tbody", "td",
    "template", "textarea", "tfoot", "th", "thead", "time", "title", "tr", "track", "u", "ul",
    "var", "video", "wbr",
];

const SVG_TAGS: &[&str] = &[
    "svg", "animate", "animatemotion", "animatetransform", "circle", "clippath", "defs", "desc",
    "ellipse", "feblend", "fecolormatrix", "fecomposite", "feflood", "fegaussianblur", "feimage",
    "femerge", "femergenode", "feoffset", "filter", "foreignobject", "g", "image", "line",
    "lineargradient", "marker", "mask", "metadata", "mpath", "path", "pattern", "polygon",
    "polyline", "radialgradient", "rect", "set", "stop", "switch", "symbol", "text", "textpath",
    "tspan", "use", "view", "math", "mi", "mn", "mo", "mrow", "msup", "mfrac",
];

/// Framework-provided components, in kebab-case.
const FRAMEWORK_TAGS: &[&str] = &[
    "component",
    "transition",
    "transition-group",
    "keep-alive",
    "teleport",
    "suspense",
    "router-view",
    "router-link",
    "nuxt-link",
    "nuxt-page",
    "nuxt-layout",
    "nuxt-loading-indicator",
    "nuxt-error-boundary",
    "nuxt-route-announcer",
    "nuxt-island",
    "nuxt-client-fallback",
    "client-only",
    "dev-only",
    "server-placeholder",
    "fragment",
];

/// True for HTML, SVG/MathML and framework built-in tags.
///
/// PascalCase names are only built-in when they name a framework component;
/// `<Button>` is a user component while `<button>` is HTML.
pub fn is_builtin_tag(name: &str) -> bool {
    if name.contains(':') {
        // svelte:head, astro namespaced directives
        return true;
    }
    let kebab = to_kebab_case(name);
    if FRAMEWORK_TAGS.contains(&kebab.as_str()) {
        return true;
    }
    let has_upper = name.bytes().any(|b| b.is_ascii_uppercase());
    if has_upper && name.as_bytes()[0].is_ascii_uppercase() {
        return false;
    }
    let lower = name.to_ascii_lowercase();
    HTML_TAGS.contains(&lower.as_str()) || SVG_TAGS.contains(&lower.as_str())
}

/// `WidgetX` -> `widget-x`, `fooBar` -> `foo-bar`; kebab input is returned unchanged.
pub fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.char_indices() {
        if ch.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('-') {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else if ch == '_' {
            out.push('-');
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names<'a>(tree: &'a MarkupTree<'a>) -> Vec<&'a str> {
        tree.elements().iter().map(|e| e.name).collect()
    }

    #[test]
    fn test_nested_tree() {
        let tree = parse_markup("<div><WidgetX :a=\"1\"/><span>hi</span></div>");
        assert!(tree.errors.is_empty());
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.roots[0].children.len(), 2);
        assert_eq!(names(&tree), vec!["div", "WidgetX", "span"]);
    }

    #[test]
    fn test_attributes() {
        let attrs = parse_attributes(r#" :is="'Foo'" disabled class=big v-if="a > b" "#);
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs[0], Attribute { name: ":is", value: Some("'Foo'") });
        assert_eq!(attrs[1], Attribute { name: "disabled", value: None });
        assert_eq!(attrs[2], Attribute { name: "class", value: Some("big") });
        assert_eq!(attrs[3], Attribute { name: "v-if", value: Some("a > b") });
    }

    #[test]
    fn test_quoted_angle_bracket_does_not_end_tag() {
        let tree = parse_markup(r#"<MyList :filter="x => x > 1"><Item/></MyList>"#);
        assert!(tree.errors.is_empty());
        assert_eq!(names(&tree), vec!["MyList", "Item"]);
    }

    #[test]
    fn test_skips_comments_interpolation_and_raw_text() {
        let src = "<!-- <Hidden/> --><p>{{ a < b ? 1 : 2 }}</p><script>const x = '<Fake/>'</script>";
        let tree = parse_markup(src);
        assert_eq!(names(&tree), vec!["p", "script"]);
    }

    #[test]
    fn test_unbalanced_markup_is_tolerated() {
        let tree = parse_markup("<div><Card><p>text</div></Stray><Footer/>");
        assert!(!tree.errors.is_empty());
        let found = names(&tree);
        assert!(found.contains(&"Card"));
        assert!(found.contains(&"Footer"));
    }

    #[test]
    fn test_unterminated_tag_reports_error() {
        let tree = parse_markup("<div><Widget class=\"x\"");
        assert!(!tree.errors.is_empty());
        assert_eq!(names(&tree), vec!["div"]);
    }

    #[test]
    fn test_builtin_tags() {
        assert!(is_builtin_tag("div"));
        assert!(is_builtin_tag("svg"));
        assert!(is_builtin_tag("linearGradient"));
        assert!(is_builtin_tag("RouterView"));
        assert!(is_builtin_tag("router-link"));
        assert!(is_builtin_tag("NuxtLink"));
        assert!(is_builtin_tag("svelte:head"));
        assert!(!is_builtin_tag("Button"));
        assert!(!is_builtin_tag("WidgetX"));
        assert!(!is_builtin_tag("widget-x"));
    }

    #[test]
    fn test_to_kebab_case() {
        assert_eq!(to_kebab_case("WidgetX"), "widget-x");
        assert_eq!(to_kebab_case("useCartStore"), "use-cart-store");
        assert_eq!(to_kebab_case("widget-x"), "widget-x");
        assert_eq!(to_kebab_case("Base_Button"), "base-button");
    }
}
