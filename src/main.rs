use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sieve_core::{parse_args, DependencyRecorder, SieveResult};
use sieve_engine::{Engine, FilterOptions};
use sieve_processor::{ProcessOutput, Transform};

/// The demo transform this binary exercises the engine with: ROT-13 over
/// ASCII letters, byte-identical otherwise. Chosen because it's the
/// worked example this engine's behavior is specified against — every
/// byte a real transform would touch (read input, mutate, return) is
/// exercised without pulling in an actual bundler/minifier dependency.
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

    fn name(&self) -> &str {
        "sieve-demo-rot13"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env().init();

    let args = parse_args();

    let options = FilterOptions {
        name: Some("sieve-demo".to_string()),
        annotation: Some("ROT-13 demo transform".to_string()),
        extensions: args.extensions.clone(),
        target_extension: args.target_extension.clone(),
        persist: args.persist,
        dependency_invalidation: args.dependency_invalidation,
        concurrency: args.concurrency,
        ..Default::default()
    };

    let transform: Arc<dyn Transform> = Arc::new(Rot13);
    let mut engine = Engine::new(transform, options, &args.input_dir, &args.output_dir)
        .context("failed to construct the sieve engine")?;

    loop {
        let report = engine.build().await.context("build failed")?;
        if args.stats && !args.quiet {
            println!("{report}");
        } else if !args.quiet && !report.is_noop() {
            println!(
                "sieve: {} patches applied ({} created, {} changed, {} unlinked)",
                report.total_patches(),
                report.created,
                report.changed,
                report.unlink
            );
        }

        if !args.watch {
            break;
        }
        if !prompt_for_rebuild()? {
            break;
        }
    }

    Ok(())
}

/// `--watch` re-runs the build loop on an explicit trigger rather than on
/// filesystem events — this engine is deliberately not a file-watching
/// daemon (see the Non-goals in its specification). Typing `q` or EOF
/// (Ctrl-D) stops the loop.
fn prompt_for_rebuild() -> Result<bool> {
    print!("sieve: press Enter to rebuild, or 'q' to quit> ");
    std::io::stdout().flush().ok();

    let mut line = String::new();
    let bytes_read = std::io::stdin().read_line(&mut line)?;
    if bytes_read == 0 || line.trim().eq_ignore_ascii_case("q") {
        return Ok(false);
    }
    Ok(true)
}
