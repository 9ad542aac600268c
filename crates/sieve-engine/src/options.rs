/// The byte-encoding a transform expects its input in, and produces its
/// output in. Since `Transform::process_string` always deals in `&[u8]`
/// / `Vec<u8>` regardless, this has no effect on the Rust type signature
/// — it exists so a host can document and log a filter's expectations,
/// matching the host-configurable `input_encoding`/`output_encoding`
/// knobs of the system this engine distills. `Utf8` is the default,
/// matching typical source-file transforms (JS, Markdown, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Binary,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Utf8
    }
}

/// Construction-time configuration for a [`crate::Engine`].
///
/// Mirrors the plain-struct options bag the teacher's own traversal
/// entry point takes, rather than a builder: every field has a sane
/// default and the set is small enough that positional construction
/// via `..Default::default()` reads fine at call sites.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// A human-readable name for this filter instance, used in log
    /// lines alongside `annotation`. Distinct from `Transform::name`,
    /// which identifies the transform implementation itself and feeds
    /// `cache_key`; this field identifies the configured instance.
    pub name: Option<String>,
    /// A free-form annotation surfaced alongside `name` in build logs;
    /// purely descriptive, e.g. "minify + sourcemap".
    pub annotation: Option<String>,
    /// File extensions (without the leading dot) this engine will hand
    /// to the transform. `None` means every file is processed in place.
    pub extensions: Option<Vec<String>>,
    /// Extension processed files are rewritten to. `None` keeps the
    /// original extension.
    pub target_extension: Option<String>,
    /// Enable the persistent, disk-backed cache layer (subject to the
    /// CI gate in `sieve_cache::persistence_enabled`).
    pub persist: bool,
    /// Track cross-file dependency declarations and reprocess
    /// dependents when a dependency changes.
    pub dependency_invalidation: bool,
    /// Explicit worker concurrency. `None` resolves via `JOBS` or
    /// `num_cpus::get() - 1`.
    pub concurrency: Option<usize>,
    /// Documented expectation for the bytes handed to `process_string`.
    pub input_encoding: Encoding,
    /// Documented expectation for the bytes `process_string` returns.
    pub output_encoding: Encoding,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            name: None,
            annotation: None,
            extensions: None,
            target_extension: None,
            persist: false,
            dependency_invalidation: false,
            concurrency: None,
            input_encoding: Encoding::default(),
            output_encoding: Encoding::default(),
        }
    }
}
