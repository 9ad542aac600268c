//! A reference host for `sieve-engine`: the thin, long-lived process a
//! real pipeline would run `Engine::build` inside of.
//!
//! This crate is explicitly not the core of the specification — it is
//! the "surrounding pipeline host" the engine's own spec calls an
//! external collaborator — but it demonstrates the piece the engine
//! itself stays silent about: repeatedly driving builds, logging each
//! one with a timestamp, and shutting down cleanly on `Ctrl-C` between
//! builds rather than mid-write.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sieve_engine::{BuildReport, Engine, FilterOptions};
use sieve_processor::Transform;

/// Errors a `Driver` can surface, layered over the engine's own
/// `SieveError` with the one extra failure mode this crate adds:
/// failing to install the `Ctrl-C` handler.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to install Ctrl-C handler: {0}")]
    SignalInstall(#[from] ctrlc::Error),
    #[error(transparent)]
    Engine(#[from] sieve_core::SieveError),
}

/// Wraps one `Engine` with a repeat-until-signalled build loop.
///
/// `Ctrl-C` only ever flips an `AtomicBool`; the driver checks it
/// between builds (never mid-build), so a signal received while a build
/// is in flight still lets that build finish and write whatever it was
/// going to write before the loop exits.
pub struct Driver {
    engine: Engine,
    shutdown: Arc<AtomicBool>,
}

impl Driver {
    pub fn new(
        transform: Arc<dyn Transform>,
        options: FilterOptions,
        src_dir: impl Into<PathBuf>,
        dest_dir: impl Into<PathBuf>,
    ) -> Result<Driver, DriverError> {
        let engine = Engine::new(transform, options, src_dir, dest_dir)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let handler_flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            log::info!("received shutdown signal, finishing the current build then stopping");
            handler_flag.store(true, Ordering::SeqCst);
        })?;

        Ok(Driver { engine, shutdown })
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run one build and log it with a UTC timestamp.
    pub async fn run_once(&mut self) -> Result<BuildReport, DriverError> {
        let started_at = chrono::Utc::now();
        let report = self.engine.build().await?;
        log::info!("[{}] {report}", started_at.to_rfc3339());
        Ok(report)
    }

    /// Run builds on a fixed interval until a shutdown signal arrives,
    /// checked both right after a build completes and again after the
    /// sleep — so a signal received during the sleep doesn't wait out a
    /// full extra interval before the loop notices.
    pub async fn run_until_shutdown(&mut self, poll_interval: Duration) -> Result<BuildReport, DriverError> {
        loop {
            let report = self.run_once().await?;
            if self.is_shutting_down() {
                return Ok(report);
            }
            tokio::time::sleep(poll_interval).await;
            if self.is_shutting_down() {
                return Ok(report);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sieve_core::{DependencyRecorder, SieveResult};
    use sieve_processor::ProcessOutput;
    use std::fs;

    struct Passthrough;

    #[async_trait]
    impl Transform for Passthrough {
        async fn process_string(
            &self,
            contents: &[u8],
            _relative_path: &str,
            _deps: &dyn DependencyRecorder,
        ) -> SieveResult<ProcessOutput> {
            Ok(contents.to_vec().into())
        }
    }

    #[tokio::test]
    async fn run_once_mirrors_input_to_output() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.txt"), b"hello").unwrap();

        let mut driver = Driver::new(Arc::new(Passthrough), FilterOptions::default(), src.path(), dest.path()).unwrap();
        let report = driver.run_once().await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(fs::read_to_string(dest.path().join("a.txt")).unwrap(), "hello");
    }
}
