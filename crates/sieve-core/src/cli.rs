use clap::Parser;

/// sieve - an incremental, per-file transform engine
///
/// Mirrors an input directory into an output directory, applying a
/// per-file transform and re-running it only for files that actually
/// changed (by content) or whose declared dependencies changed.
#[derive(Parser, Debug)]
#[command(name = "sieve")]
#[command(about = "Incremental per-file transform engine")]
pub struct Args {
    // ========================================================================
    // Tree Options
    // ========================================================================
    /// Input directory to mirror and transform
    pub input_dir: String,

    /// Output directory the transformed tree is written to
    pub output_dir: String,

    // ========================================================================
    // Filter Options
    // ========================================================================
    /// Comma-separated source extensions to process (e.g. "js,md")
    #[arg(long, value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Extension to rewrite matched files to
    #[arg(long)]
    pub target_extension: Option<String>,

    /// Enable the persistent, disk-backed cache
    #[arg(long)]
    pub persist: bool,

    /// Enable cross-file dependency invalidation
    #[arg(long)]
    pub dependency_invalidation: bool,

    /// Worker pool concurrency (defaults to JOBS env or cpu_count - 1)
    #[arg(long)]
    pub concurrency: Option<usize>,

    // ========================================================================
    // Output & Display Options
    // ========================================================================
    /// Suppress the build summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Print a build summary (files processed, cache hits, patch counts, timings)
    #[arg(long)]
    pub stats: bool,

    /// Re-run the build loop repeatedly until interrupted
    #[arg(long)]
    pub watch: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}
