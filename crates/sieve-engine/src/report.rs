use std::time::Duration;

/// A summary of one `Engine::build` call, suitable for a `--stats` CLI
/// flag or a log line.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub mkdir: usize,
    pub rmdir: usize,
    pub unlink: usize,
    pub created: usize,
    pub changed: usize,
    pub process_string_calls: usize,
    pub post_process_calls: usize,
    pub persistent_cache_hits: usize,
    pub persistent_cache_primes: usize,
    pub duration: Duration,
}

impl BuildReport {
    pub fn total_patches(&self) -> usize {
        self.mkdir + self.rmdir + self.unlink + self.created + self.changed
    }

    pub fn is_noop(&self) -> bool {
        self.total_patches() == 0
    }
}

impl std::fmt::Display for BuildReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} patches ({} mkdir, {} rmdir, {} unlink, {} created, {} changed) in {:.2?}, \
             {} transform calls, {} post-process calls, {} cache hits, {} cache primes",
            self.total_patches(),
            self.mkdir,
            self.rmdir,
            self.unlink,
            self.created,
            self.changed,
            self.duration,
            self.process_string_calls,
            self.post_process_calls,
            self.persistent_cache_hits,
            self.persistent_cache_primes,
        )
    }
}
