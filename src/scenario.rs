//! Scenario provisioning.
//!
//! Builds one repository working copy per test case, commits the scenario
//! on its correlation branch, and pushes it to fire the remote workflow.
//! The push is the trigger; nothing here waits for the run.

use std::path::{Path, PathBuf};

use crate::config::{Expectation, Setup, TestCase};
use crate::error::{Error, Result};
use crate::fsops::copy_dir;
use crate::gitio::{clone_repo, GitCmd};

/// Location of the workflow document inside each working copy.
const WORKFLOW_PATH: &str = ".github/workflows/push.yml";

/// Builds scenario working copies under one scratch directory.
#[derive(Debug, Clone)]
pub struct Provisioner {
    /// Remote the baseline is cloned from and scenarios are pushed to.
    remote: String,
    /// Scratch directory holding the baseline and all working copies.
    work_dir: PathBuf,
}

impl Provisioner {
    /// Creates a provisioner for the given remote and scratch directory.
    pub fn new(remote: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            remote: remote.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Directory a given case's working copy lives in.
    pub fn case_dir(&self, setup: &Setup, index: usize) -> PathBuf {
        self.work_dir.join(&setup.name).join(index.to_string())
    }

    /// Clones the remote once into a fresh baseline checkout that every
    /// scenario working copy is copied from.
    pub async fn materialize_baseline(&self) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.work_dir).await?;

        let short_id = &uuid::Uuid::new_v4().to_string()[..8];
        let baseline = self.work_dir.join(format!("baseline-{}", short_id));

        tracing::info!(remote = %self.remote, path = %baseline.display(), "cloning baseline");
        clone_repo(&self.remote, &baseline).await?;
        Ok(baseline)
    }

    /// Provisions one test case: isolated working copy, workflow document,
    /// starting version, correlation branch, scenario commit, push.
    ///
    /// Returns the working copy path for later verification.
    pub async fn provision_case(
        &self,
        baseline: &Path,
        setup: &Setup,
        index: usize,
        case: &TestCase,
    ) -> Result<PathBuf> {
        let branch = setup.branch_name(index);
        let case_dir = self.case_dir(setup, index);

        copy_dir(baseline, &case_dir).await?;
        let git = GitCmd::new(&case_dir);

        // Workflow document under test.
        let workflow_yaml = serde_yaml::to_string(&setup.workflow)?;
        tokio::fs::create_dir_all(case_dir.join(".github/workflows")).await?;
        tokio::fs::write(case_dir.join(WORKFLOW_PATH), &workflow_yaml).await?;
        git.add(WORKFLOW_PATH).await?;

        set_package_version(&case_dir, &case.starting_version).await?;
        git.add("package.json").await?;

        git.checkout_new_branch(&branch).await?;

        // Scenario README keeps the pushed branch self-describing.
        let readme = generate_readme(case, &workflow_yaml);
        tokio::fs::write(case_dir.join("README.md"), readme).await?;
        git.add("README.md").await?;

        git.commit(&case.message).await?;
        git.push_head().await?;

        tracing::info!(branch = %branch, "pushed scenario");
        Ok(case_dir)
    }
}

/// Reads the version field from `package.json` in `dir`.
pub async fn package_version(dir: &Path) -> Result<String> {
    let contents = tokio::fs::read_to_string(dir.join("package.json")).await?;
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    json.get("version")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Config("package.json has no string version field".to_string()))
}

/// Rewrites the version field of `package.json` in `dir`.
pub async fn set_package_version(dir: &Path, version: &str) -> Result<()> {
    let path = dir.join("package.json");
    let contents = tokio::fs::read_to_string(&path).await?;
    let mut json: serde_json::Value = serde_json::from_str(&contents)?;

    let object = json
        .as_object_mut()
        .ok_or_else(|| Error::Config("package.json is not an object".to_string()))?;
    object.insert(
        "version".to_string(),
        serde_json::Value::String(version.to_string()),
    );

    tokio::fs::write(&path, serde_json::to_string(&json)?).await?;
    Ok(())
}

/// Renders the scenario README committed alongside each test branch.
fn generate_readme(case: &TestCase, workflow_yaml: &str) -> String {
    [
        "# Test Details",
        "## .github/workflows/push.yml",
        "```YAML",
        workflow_yaml,
        "```",
        "## Message",
        &case.message,
        "## Starting Version",
        &case.starting_version,
        "## Expectation",
        &expectation_text(&case.expected),
    ]
    .join("\n")
}

/// Renders the expectation bullet list for the scenario README.
fn expectation_text(expected: &Expectation) -> String {
    let mut lines = vec![format!("- **Version:** {}", expected.version)];
    if let Some(tag) = &expected.tag {
        lines.push(format!("- **Tag:** {}", tag));
    }
    if let Some(branch) = &expected.branch {
        lines.push(format!("- **Branch:** {}", branch));
    }
    lines.join("\n")
}
