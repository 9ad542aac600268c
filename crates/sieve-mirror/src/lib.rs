use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use sieve_cache::ProcessResult;
use sieve_core::{DependencyRecorder, SieveError, SieveResult};
use sieve_processor::{InstrumentationSink, Processor, Transform};

/// Writes/unlinks/symlinks/mkdirs on the output tree, mirroring an
/// input directory.
///
/// Tracks `output_links`: the set of relative paths currently
/// materialized as symlinks to the input (untouched files). A later
/// build that needs to *write* to one of those paths unlinks the
/// symlink first, so a real file never gets written through a stale
/// symlink into the input tree.
pub struct MirrorApplier {
    src_dir: PathBuf,
    dest_dir: PathBuf,
    extensions: Option<Vec<String>>,
    target_extension: Option<String>,
    output_links: Mutex<HashSet<String>>,
}

impl MirrorApplier {
    pub fn new(
        src_dir: impl Into<PathBuf>,
        dest_dir: impl Into<PathBuf>,
        extensions: Option<Vec<String>>,
        target_extension: Option<String>,
    ) -> Self {
        MirrorApplier {
            src_dir: src_dir.into(),
            dest_dir: dest_dir.into(),
            extensions,
            target_extension,
            output_links: Mutex::new(HashSet::new()),
        }
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// `None` for directories and for files whose extension isn't in
    /// `extensions`. When `extensions` is `None` every file is
    /// processed in place (no symlinking). When a file matches and
    /// `target_extension` is set, the suffix is rewritten.
    pub fn get_dest_file_path(&self, relative_path: &str) -> Option<String> {
        if relative_path.ends_with('/') {
            return None;
        }
        let Some(extensions) = &self.extensions else {
            return Some(relative_path.to_string());
        };
        let matched = extensions.iter().find(|ext| relative_path.ends_with(&format!(".{ext}")))?;
        match &self.target_extension {
            Some(target) => {
                let stem = &relative_path[..relative_path.len() - matched.len() - 1];
                Some(format!("{stem}.{target}"))
            }
            None => Some(relative_path.to_string()),
        }
    }

    pub fn can_process_file(&self, relative_path: &str) -> bool {
        self.get_dest_file_path(relative_path).is_some()
    }

    /// Forget all tracked output symlinks, for use after the output tree
    /// itself has been wiped out from under this applier (a build reset
    /// following a prior failure).
    pub fn clear_output_links(&self) {
        self.output_links.lock().clear();
    }

    pub fn mkdir(&self, relative_path: &str) -> SieveResult<()> {
        fs::create_dir_all(self.dest_dir.join(relative_path))?;
        Ok(())
    }

    pub fn rmdir(&self, relative_path: &str) -> SieveResult<()> {
        let path = self.dest_dir.join(relative_path);
        match fs::remove_dir_all(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove whatever is on disk at `relative_path`'s destination
    /// (processed output file or untouched-input symlink).
    pub fn unlink(&self, relative_path: &str) -> SieveResult<()> {
        let dest_rel = self.get_dest_file_path(relative_path).unwrap_or_else(|| relative_path.to_string());
        let dest_path = self.dest_dir.join(&dest_rel);
        self.output_links.lock().remove(relative_path);
        match fs::remove_file(&dest_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Symlink an unprocessed file straight through from input to
    /// output. `is_change` removes whatever is already at the
    /// destination first (it may be a symlink from a prior build, or a
    /// stale processed file if `extensions` configuration changed).
    pub fn symlink_unprocessed(&self, relative_path: &str, is_change: bool) -> SieveResult<()> {
        let dest_path = self.dest_dir.join(relative_path);
        if is_change {
            let _ = fs::remove_file(&dest_path);
        }
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let src_path = self.src_dir.join(relative_path);

        #[cfg(unix)]
        std::os::unix::fs::symlink(&src_path, &dest_path)?;
        #[cfg(windows)]
        std::os::windows::fs::symlink_file(&src_path, &dest_path)?;

        self.output_links.lock().insert(relative_path.to_string());
        Ok(())
    }

    /// Read `relative_path` from the input, run it through `processor`,
    /// and write the result to its mirrored destination — unless
    /// `is_change` and the new bytes are identical to what's already on
    /// disk, in which case the existing file (and its mtime) is left
    /// untouched entirely.
    pub async fn process_file(
        &self,
        processor: &Processor,
        transform: &dyn Transform,
        relative_path: &str,
        force_invalidate: bool,
        is_change: bool,
        deps: &dyn DependencyRecorder,
        sink: &dyn InstrumentationSink,
    ) -> SieveResult<()> {
        let src_path = self.src_dir.join(relative_path);
        let contents = fs::read(&src_path)?;

        let result: ProcessResult = processor
            .process_string(transform, &contents, relative_path, force_invalidate, deps, sink)
            .await
            .map_err(|source| SieveError::Transform {
                file: relative_path.to_string(),
                tree_dir: self.src_dir.clone(),
                source: anyhow::Error::new(source),
            })?;

        let dest_rel = self.get_dest_file_path(relative_path).ok_or_else(|| {
            SieveError::Invariant(format!(
                "can_process_file({relative_path}) was true but get_dest_file_path returned None"
            ))
        })?;
        let dest_path = self.dest_dir.join(&dest_rel);

        if self.output_links.lock().remove(relative_path) {
            let _ = fs::remove_file(&dest_path);
        }

        if is_change {
            if let Ok(existing) = fs::read(&dest_path) {
                if existing == result.output {
                    return Ok(());
                }
            }
        }

        self.write_with_parents(&dest_path, &result.output)
    }

    fn write_with_parents(&self, dest_path: &Path, bytes: &[u8]) -> SieveResult<()> {
        match fs::write(dest_path, bytes) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = dest_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(dest_path, bytes)?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sieve_processor::{Counters, ProcessOutput, ProcessorStrategy};
    use std::fs::{create_dir_all, write};

    struct Rot13;

    fn rot13(input: &[u8]) -> Vec<u8> {
        input
            .iter()
            .map(|&b| match b {
                b'a'..=b'z' => b'a' + (b - b'a' + 13) % 26,
                b'A'..=b'Z' => b'A' + (b - b'A' + 13) % 26,
                other => other,
            })
            .collect()
    }

    #[async_trait]
    impl Transform for Rot13 {
        async fn process_string(
            &self,
            contents: &[u8],
            _relative_path: &str,
            _deps: &dyn DependencyRecorder,
        ) -> SieveResult<ProcessOutput> {
            Ok(rot13(contents).into())
        }
    }

    fn applier(src: &Path, dest: &Path) -> MirrorApplier {
        MirrorApplier::new(
            src,
            dest,
            Some(vec!["js".into(), "md".into()]),
            Some("foo".into()),
        )
    }

    #[test]
    fn dest_path_rewrites_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let a = applier(tmp.path(), tmp.path());
        assert_eq!(a.get_dest_file_path("a/README.md").as_deref(), Some("a/README.foo"));
        assert_eq!(a.get_dest_file_path("a/foo.js").as_deref(), Some("a/foo.foo"));
        assert_eq!(a.get_dest_file_path("a/image.png"), None);
        assert_eq!(a.get_dest_file_path("a/"), None);
    }

    #[test]
    fn null_extensions_processes_every_file_unchanged_name() {
        let tmp = tempfile::tempdir().unwrap();
        let a = MirrorApplier::new(tmp.path(), tmp.path(), None, None);
        assert_eq!(a.get_dest_file_path("a/image.png").as_deref(), Some("a/image.png"));
    }

    #[tokio::test]
    async fn process_file_writes_transformed_bytes() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        create_dir_all(src.path().join("a")).unwrap();
        write(src.path().join("a/README.md"), b"Nicest cats in need of homes").unwrap();

        let a = applier(src.path(), dest.path());
        let processor = Processor::new(ProcessorStrategy::Default);
        let sink = Counters::new();

        a.process_file(&processor, &Rot13, "a/README.md", false, false, &sieve_core::NullRecorder, &sink).await.unwrap();

        let out = fs::read_to_string(dest.path().join("a/README.foo")).unwrap();
        assert_eq!(out, "Avprfg pngf va arrq bs ubzrf");
    }

    #[tokio::test]
    async fn process_file_skips_write_when_output_unchanged() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path().join("a.js"), b"same").unwrap();
        create_dir_all(dest.path()).unwrap();
        write(dest.path().join("a.foo"), rot13(b"same")).unwrap();

        let before = fs::metadata(dest.path().join("a.foo")).unwrap().modified().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));

        let a = applier(src.path(), dest.path());
        let processor = Processor::new(ProcessorStrategy::Default);
        let sink = Counters::new();
        a.process_file(&processor, &Rot13, "a.js", false, true, &sieve_core::NullRecorder, &sink).await.unwrap();

        let after = fs::metadata(dest.path().join("a.foo")).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn symlink_then_unlink_clears_output_links_bookkeeping() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path().join("a.png"), b"binary").unwrap();

        let a = applier(src.path(), dest.path());
        a.symlink_unprocessed("a.png", false).unwrap();
        assert!(a.output_links.lock().contains("a.png"));
        assert!(dest.path().join("a.png").symlink_metadata().is_ok());

        a.unlink("a.png").unwrap();
        assert!(!a.output_links.lock().contains("a.png"));
        assert!(dest.path().join("a.png").symlink_metadata().is_err());
    }
}
