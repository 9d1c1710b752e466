//! Suite configuration loading and validation.
//!
//! A suite is an ordered list of setups; each setup carries a workflow
//! document and the test cases that exercise it. Validated up front so a
//! misconfigured suite fails before anything is pushed.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Expected outcome of one test case after its workflow run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expectation {
    /// Version the package manifest must end up at.
    pub version: String,

    /// Expected latest tag. Defaults to `version` when unset.
    #[serde(default)]
    pub tag: Option<String>,

    /// Branch to check out before verifying, if the workflow pushes
    /// its result somewhere other than the test branch.
    #[serde(default)]
    pub branch: Option<String>,

    /// Skip the tag assertion entirely.
    #[serde(default)]
    pub skip_tag_check: bool,
}

impl Expectation {
    /// Returns the tag to assert against, defaulting to the version.
    pub fn expected_tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.version)
    }
}

/// One scenario: a commit with a message and starting version, plus the
/// outcome the workflow is expected to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Commit message for the scenario commit.
    pub message: String,

    /// Version written to the package manifest before committing.
    pub starting_version: String,

    /// Expected post-conditions.
    pub expected: Expectation,
}

/// A named workflow configuration applied to one or more test cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setup {
    /// Unique setup name; doubles as a directory name and a branch-name
    /// component, so it must stay filesystem- and ref-safe.
    pub name: String,

    /// Workflow document written to `.github/workflows/push.yml` verbatim.
    pub workflow: serde_yaml::Value,

    /// Ordered test cases; the index within this list is part of each
    /// case's identity.
    pub tests: Vec<TestCase>,
}

impl Setup {
    /// Derives the branch name for the case at `index`.
    ///
    /// This string is the only correlation between a pushed commit and the
    /// workflow run it triggers, so the format is a wire-level contract.
    pub fn branch_name(&self, index: usize) -> String {
        format!("tests/{}/{}", self.name, index)
    }
}

/// The full test suite configuration. Loaded once, immutable for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub setups: Vec<Setup>,
}

impl SuiteConfig {
    /// Loads and validates a suite configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(Error::Io)?;
        Self::from_yaml(&content)
    }

    /// Parses and validates a suite configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: SuiteConfig = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("failed to parse suite config: {}", e)))?;
        config.validate().into_result()?;
        Ok(config)
    }

    /// Total number of test cases across all setups.
    pub fn case_count(&self) -> usize {
        self.setups.iter().map(|s| s.tests.len()).sum()
    }
}

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

/// Characters allowed in a setup name. Setup names become directory names
/// and branch-name segments, so slashes and whitespace are out.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl Validate for Setup {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !is_safe_name(&self.name) {
            result.add_error(format!(
                "setup name '{}' must be non-empty and contain only alphanumerics, '-', '_' or '.'",
                self.name
            ));
        }

        if self.tests.is_empty() {
            result.add_error(format!("setup '{}' has no test cases", self.name));
        }

        for (index, case) in self.tests.iter().enumerate() {
            if case.message.trim().is_empty() {
                result.add_error(format!(
                    "setup '{}' case {} has an empty commit message",
                    self.name, index
                ));
            }
            if case.starting_version.trim().is_empty() {
                result.add_error(format!(
                    "setup '{}' case {} has an empty starting version",
                    self.name, index
                ));
            }
            if case.expected.version.trim().is_empty() {
                result.add_error(format!(
                    "setup '{}' case {} expects an empty version",
                    self.name, index
                ));
            }
            if case.expected.skip_tag_check && case.expected.tag.is_some() {
                result.add_warning(format!(
                    "setup '{}' case {} sets an expected tag but skips the tag check",
                    self.name, index
                ));
            }
        }

        result
    }
}

impl Validate for SuiteConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.setups.is_empty() {
            result.add_error("suite has no setups");
        }

        // Setup names must be globally unique: `tests/{name}/{index}` is the
        // correlation key, and a duplicate name would alias branch names
        // across setups.
        let mut seen = std::collections::HashSet::new();
        for setup in &self.setups {
            if !seen.insert(setup.name.as_str()) {
                result.add_error(format!("duplicate setup name '{}'", setup.name));
            }
            let setup_result = setup.validate();
            result.errors.extend(setup_result.errors);
            result.warnings.extend(setup_result.warnings);
        }

        result
    }
}
