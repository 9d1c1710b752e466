//! Tagproof - end-to-end verifier for version-bump CI workflows
//!
//! This library pushes a matrix of scenario branches to a repository whose
//! CI bumps versions and tags on push, waits for every triggered workflow
//! run to complete, and verifies the externally observable outcome (version
//! marker, tag, branch state) of each scenario. Correlation between a local
//! push and its remote run uses only the `tests/{setup}/{index}` branch
//! naming convention.

pub mod actions;
pub mod config;
pub mod error;
pub mod fsops;
pub mod gitio;
pub mod harness;
pub mod poll;
pub mod results;
pub mod scenario;
pub mod verify;

pub use actions::{
    completed_run_after, most_recent_run_date, ActionsClient, RunConclusion, RunSource, RunStatus,
    WorkflowRun,
};
pub use config::{Expectation, Setup, SuiteConfig, TestCase, Validate, ValidationResult};
pub use error::Error;
pub use fsops::copy_dir;
pub use gitio::{clone_repo, GitCmd, GitOutput};
pub use harness::{CaseReport, Harness, SuiteReport};
pub use poll::{poll, POLL_INTERVAL};
pub use results::{await_results, ResultsTable};
pub use scenario::{package_version, set_package_version, Provisioner};
pub use verify::{Verifier, VerifyResult};
