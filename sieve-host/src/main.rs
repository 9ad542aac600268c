//! Reference host binary: wires a trivial passthrough `Transform` into
//! `sieve_host::Driver` and runs it until `Ctrl-C`.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sieve_core::{DependencyRecorder, SieveResult};
use sieve_engine::FilterOptions;
use sieve_host::Driver;
use sieve_processor::{ProcessOutput, Transform};

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

    fn name(&self) -> &str {
        "sieve-host-passthrough"
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_default_env().init();

    let mut args = env::args().skip(1);
    let (Some(input_dir), Some(output_dir)) = (args.next(), args.next()) else {
        eprintln!("usage: sieve-host <input-dir> <output-dir>");
        return ExitCode::FAILURE;
    };

    let transform: Arc<dyn Transform> = Arc::new(Passthrough);
    let options = FilterOptions { name: Some("sieve-host-demo".to_string()), ..Default::default() };

    let mut driver = match Driver::new(transform, options, input_dir, output_dir) {
        Ok(driver) => driver,
        Err(err) => {
            eprintln!("failed to start sieve-host: {err}");
            return ExitCode::FAILURE;
        }
    };

    log::info!("sieve-host running; press Ctrl-C to stop");
    match driver.run_until_shutdown(Duration::from_secs(2)).await {
        Ok(report) => {
            log::info!("sieve-host shutting down after final build: {report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("sieve-host build loop failed: {err}");
            ExitCode::FAILURE
        }
    }
}
