//! Constants for file formats, probing order and workspace conventions.
//!
//! Everything the resolver and the walker treat as a "fixed list" lives here so
//! that probing order stays identical across relative, alias, package and
//! convention resolution.
//!
//! ## Source formats
//!
//! - **Logic files**: `.ts`, `.tsx`, `.mts`, `.cts`, `.js`, `.jsx`, `.mjs`, `.cjs`
//! - **Combined files**: `.vue`, `.svelte`, `.astro` (markup + logic sections)

/// Extensions of files whose whole content is a logic section
pub const LOGIC_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Extensions of files that combine a markup section with logic blocks
pub const COMBINED_EXTENSIONS: &[&str] = &["vue", "svelte", "astro"];

/// Extensions to try when resolving module imports (in priority order)
pub const RESOLVE_EXTENSIONS: &[&str] =
    &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "vue", "svelte", "astro", "json"];

/// Index file names to try when resolving directory imports
pub const INDEX_FILES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.mts",
    "index.cts",
    "index.js",
    "index.jsx",
    "index.mjs",
    "index.cjs",
    "index.vue",
    "index.svelte",
    "index.astro",
];

/// Manifest file that marks a package root
pub const PACKAGE_MANIFEST: &str = "package.json";

/// Manifest files that mark the workspace root, in lookup order
pub const WORKSPACE_MANIFESTS: &[&str] = &["pnpm-workspace.yaml", "lerna.json", "turbo.json"];

/// Workspace subdirectories that hold member packages
pub const WORKSPACE_PACKAGE_DIRS: &[&str] = &["packages", "apps", "libs", "modules", "layers"];

/// Directory name of the flattened dependency store
pub const DEPENDENCY_STORE_DIR: &str = "node_modules";

/// Content-addressed store directory nested inside `node_modules`
pub const CONTENT_STORE_DIR: &str = ".pnpm";

/// Build output and generated directories that never belong in the closure
pub const GENERATED_DIRS: &[&str] =
    &[".nuxt", ".output", ".next", ".svelte-kit", ".turbo", "dist", "build", "coverage"];

/// Root alias prefixes rewritten against the current package root
pub const ROOT_ALIASES: &[&str] = &["~~", "@@", "~", "@"];

/// Conventional auto-discovery directories, in search priority order
pub const CONVENTION_DIRS: &[&str] = &["components", "composables", "stores", "utils"];

/// Source directories under a package root that may host convention directories
pub const CONVENTION_SOURCE_DIRS: &[&str] = &["", "src"];

/// Name prefixes stripped when deriving convention name variants
pub const CONVENTION_PREFIXES: &[&str] = &["Lazy", "use"];

/// Name suffixes stripped when deriving convention name variants
pub const CONVENTION_SUFFIXES: &[&str] = &["Store"];

/// Mode suffixes on component file stems (`Widget.client.vue`)
pub const COMPONENT_MODE_SUFFIXES: &[&str] = &[".client", ".server", ".global"];

/// Runtime built-in modules; matched on the first path segment (`fs/promises` -> `fs`)
pub const IGNORED_BUILTINS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "crypto",
    "dgram",
    "dns",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

/// Specifier prefixes that never name a file on disk
pub const IGNORED_PREFIXES: &[&str] =
    &["node:", "virtual:", "http://", "https://", "//", "data:", "@types/", "\0"];

/// Framework virtual modules, matched exactly or followed by `/`
pub const VIRTUAL_MODULES: &[&str] =
    &["#imports", "#app", "#build", "#components", "#internal", "#head", "#vue-router"];

/// Helpers the framework injects at build time; usages resolve to nothing in the workspace
pub const FRAMEWORK_HELPERS: &[&str] = &[
    "useAppConfig",
    "useAsyncData",
    "useAttrs",
    "useCookie",
    "useCssModule",
    "useError",
    "useFetch",
    "useHead",
    "useHeadSafe",
    "useId",
    "useLazyAsyncData",
    "useLazyFetch",
    "useModel",
    "useNuxtApp",
    "useNuxtData",
    "useRequestEvent",
    "useRequestHeaders",
    "useRequestURL",
    "useRoute",
    "useRouter",
    "useRuntimeConfig",
    "useSeoMeta",
    "useServerSeoMeta",
    "useSlots",
    "useState",
    "useTemplateRef",
];
