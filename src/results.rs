//! Run-to-test-case result aggregation.
//!
//! Many independently-triggered workflow runs complete in arbitrary order;
//! the aggregator correlates them back to test cases using only the branch
//! naming convention, by polling one shared run listing until every case
//! has a completed run.

use std::collections::HashMap;

use crate::actions::{RunConclusion, RunSource, WorkflowRun};
use crate::config::SuiteConfig;
use crate::error::Result;
use crate::poll::{poll, POLL_INTERVAL};

/// Conclusions per test case, keyed by setup name and indexed like `tests`.
///
/// Built fresh from each listing snapshot, so it carries no state between
/// polling cycles: a slot is a pure function of the configuration and one
/// snapshot of run records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsTable {
    slots: HashMap<String, Vec<Option<RunConclusion>>>,
}

impl ResultsTable {
    /// Folds one snapshot of run records into a table.
    ///
    /// A slot is filled only by a run whose `head_branch` matches the
    /// case's derived branch name and which has completed; a matching run
    /// that is still pending leaves the slot empty. First completed match
    /// wins, so a stale observation cannot overwrite a conclusion.
    pub fn from_runs(config: &SuiteConfig, runs: &[WorkflowRun]) -> Self {
        let mut slots = HashMap::new();
        for setup in &config.setups {
            let row = (0..setup.tests.len())
                .map(|index| {
                    let branch = setup.branch_name(index);
                    runs.iter()
                        .find(|run| run.head_branch == branch && run.is_completed())
                        .and_then(|run| run.conclusion)
                })
                .collect();
            slots.insert(setup.name.clone(), row);
        }
        Self { slots }
    }

    /// True once every test case slot holds a conclusion.
    pub fn is_complete(&self) -> bool {
        self.slots
            .values()
            .all(|row| row.iter().all(Option::is_some))
    }

    /// Returns the conclusion recorded for `(setup, index)`, if any.
    pub fn conclusion(&self, setup: &str, index: usize) -> Option<RunConclusion> {
        self.slots.get(setup).and_then(|row| row.get(index)).copied().flatten()
    }
}

/// Polls the run listing until every configured test case has a completed
/// run, then returns the final table.
///
/// One polling loop serves all cases; per-case completion is derived from
/// the shared snapshot rather than one poller per case. A listing failure
/// aborts the aggregation and surfaces as the run's failure.
pub async fn await_results(config: &SuiteConfig, source: &dyn RunSource) -> Result<ResultsTable> {
    tracing::info!(cases = config.case_count(), "awaiting workflow results");
    let table = poll(
        POLL_INTERVAL,
        || async move {
            Ok::<_, crate::error::Error>(ResultsTable::from_runs(config, &source.list_runs().await?))
        },
        ResultsTable::is_complete,
    )
    .await?;
    tracing::info!("all workflow runs completed");
    Ok(table)
}
