//! Tagproof CLI
//!
//! Runs a suite of version-bump workflow scenarios against a remote
//! repository and reports per-case outcomes.

use std::path::PathBuf;
use std::sync::Arc;

use tagproof::{ActionsClient, Harness, Provisioner, SuiteConfig};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <suite-config.yaml>", args[0]);
        eprintln!("\nVerifies a version-bump CI workflow end to end.");
        eprintln!("\nEnvironment variables:");
        eprintln!("  TAGPROOF_REMOTE    Git remote the scenarios are pushed to (required)");
        eprintln!("  TAGPROOF_REPO      owner/name slug for the workflow runs API (required)");
        eprintln!("  TAGPROOF_TOKEN     API token for the workflow runs API (required)");
        eprintln!("  TAGPROOF_WORK_DIR  Scratch directory (default: system temp)");
        std::process::exit(1);
    }

    let config = match SuiteConfig::load(&args[1]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load suite config: {}", e);
            std::process::exit(1);
        }
    };

    let remote = require_env("TAGPROOF_REMOTE");
    let repo = require_env("TAGPROOF_REPO");
    let token = require_env("TAGPROOF_TOKEN");

    let work_dir = std::env::var("TAGPROOF_WORK_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("tagproof"));

    let provisioner = Provisioner::new(remote, work_dir);
    let source = Arc::new(ActionsClient::new(repo, token));
    let harness = Harness::new(config, provisioner, source);

    tracing::info!("starting suite run");

    match harness.run().await {
        Ok(report) => {
            println!("\n{}", "=".repeat(60));
            println!("Suite Complete");
            println!("{}", "=".repeat(60));
            println!();
            for case in &report.cases {
                let status = if case.passed { "PASS" } else { "FAIL" };
                println!("[{}] {}/{}: {}", status, case.setup, case.index, case.message);
                if !case.passed {
                    for detail in &case.details {
                        println!("       {}", detail);
                    }
                }
            }
            println!();
            println!(
                "{} case(s), {} failed",
                report.cases.len(),
                report.failed_count()
            );

            if !report.passed() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Suite run failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn require_env(name: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            eprintln!("{} must be set", name);
            std::process::exit(1);
        }
    }
}
