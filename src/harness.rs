//! Suite orchestration.
//!
//! Drives the full verification run: materialize the baseline checkout,
//! provision every scenario concurrently, wait for all workflow runs to
//! converge, then assert each case's conclusion and post-conditions.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::actions::{RunConclusion, RunSource};
use crate::config::SuiteConfig;
use crate::error::{Error, Result};
use crate::results::await_results;
use crate::scenario::Provisioner;
use crate::verify::Verifier;

/// Outcome of one test case.
#[derive(Debug)]
pub struct CaseReport {
    /// Owning setup name.
    pub setup: String,
    /// Case index within the setup.
    pub index: usize,
    /// The case's commit message, used as its display name.
    pub message: String,
    /// Whether the case passed all assertions.
    pub passed: bool,
    /// Assertion and mismatch details.
    pub details: Vec<String>,
}

/// Outcome of a whole suite run.
#[derive(Debug)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    /// True when every case passed.
    pub fn passed(&self) -> bool {
        self.cases.iter().all(|c| c.passed)
    }

    /// Number of failed cases.
    pub fn failed_count(&self) -> usize {
        self.cases.iter().filter(|c| !c.passed).count()
    }
}

/// Orchestrates a suite run end to end.
pub struct Harness {
    config: SuiteConfig,
    provisioner: Provisioner,
    source: Arc<dyn RunSource>,
}

impl Harness {
    /// Creates a harness over the given configuration and collaborators.
    pub fn new(config: SuiteConfig, provisioner: Provisioner, source: Arc<dyn RunSource>) -> Self {
        Self {
            config,
            provisioner,
            source,
        }
    }

    /// Runs the whole suite and reports per-case outcomes.
    ///
    /// Infrastructure failures (provisioning, run listing) abort the run:
    /// a missing push makes convergence impossible, so there is nothing
    /// meaningful to report per case. Assertion failures are scoped to
    /// their case and never stop sibling evaluation.
    pub async fn run(&self) -> Result<SuiteReport> {
        let baseline = self.provisioner.materialize_baseline().await?;

        // Fire every scenario at once; pushes carry no ordering dependency
        // and the branch name alone ties each one to its future run.
        let mut provisioning = JoinSet::new();
        for setup in &self.config.setups {
            for (index, case) in setup.tests.iter().enumerate() {
                let provisioner = self.provisioner.clone();
                let baseline = baseline.clone();
                let setup = setup.clone();
                let case = case.clone();
                provisioning.spawn(async move {
                    provisioner
                        .provision_case(&baseline, &setup, index, &case)
                        .await
                });
            }
        }

        while let Some(joined) = provisioning.join_next().await {
            joined.map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "provisioning task panicked: {}",
                    e
                )))
            })??;
        }

        tracing::info!(cases = self.config.case_count(), "all scenarios pushed");

        let table = await_results(&self.config, self.source.as_ref()).await?;

        let mut cases = Vec::new();
        for setup in &self.config.setups {
            for (index, case) in setup.tests.iter().enumerate() {
                let mut passed = true;
                let mut details = Vec::new();

                match table.conclusion(&setup.name, index) {
                    Some(RunConclusion::Success) => {
                        details.push("workflow concluded success".to_string());

                        let case_dir = self.provisioner.case_dir(setup, index);
                        match Verifier::verify(&case_dir, &case.expected).await {
                            Ok(result) => {
                                passed = result.passed;
                                details.extend(result.messages);
                            }
                            Err(e) => {
                                passed = false;
                                details.push(format!("verification failed: {}", e));
                            }
                        }
                    }
                    conclusion => {
                        passed = false;
                        details.push(format!(
                            "workflow concluded {:?} instead of success",
                            conclusion
                        ));
                    }
                }

                if passed {
                    tracing::info!(setup = %setup.name, index, "case passed");
                } else {
                    tracing::warn!(setup = %setup.name, index, details = ?details, "case failed");
                }

                cases.push(CaseReport {
                    setup: setup.name.clone(),
                    index,
                    message: case.message.clone(),
                    passed,
                    details,
                });
            }
        }

        Ok(SuiteReport { cases })
    }
}
