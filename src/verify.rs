//! Post-condition verification for completed test cases.
//!
//! After a case's workflow run completes, its working copy is brought up to
//! date and the version marker and latest tag are compared against the
//! expectation. Mismatches are collected as messages rather than raised, so
//! one failing case never masks its siblings.

use std::path::Path;

use crate::config::Expectation;
use crate::error::Result;
use crate::gitio::GitCmd;
use crate::scenario::package_version;

/// Result of verifying one test case's expectation.
#[derive(Debug)]
pub struct VerifyResult {
    /// Whether every assertion held.
    pub passed: bool,
    /// Human-readable assertion messages, mismatches and passes alike.
    pub messages: Vec<String>,
}

/// Verifies repository state against expectations.
pub struct Verifier;

impl Verifier {
    /// Checks the expectation against the working copy at `case_dir`.
    ///
    /// Fetches and checks out `expected.branch` when one is set, pulls the
    /// latest remote state, then asserts the package version and (unless
    /// skipped) the latest tag.
    pub async fn verify(case_dir: &Path, expected: &Expectation) -> Result<VerifyResult> {
        let git = GitCmd::new(case_dir);

        if let Some(branch) = &expected.branch {
            git.fetch(branch).await?;
            git.checkout(branch).await?;
        }
        git.pull().await?;

        let mut messages = Vec::new();
        let mut passed = true;

        let version = package_version(case_dir).await?;
        if version == expected.version {
            messages.push(format!("version is {}", version));
        } else {
            messages.push(format!(
                "version mismatch: expected {}, found {}",
                expected.version, version
            ));
            passed = false;
        }

        if expected.skip_tag_check {
            messages.push("tag check skipped".to_string());
        } else {
            let tag = git.latest_tag().await?;
            let expected_tag = expected.expected_tag();
            if tag == expected_tag {
                messages.push(format!("latest tag is {}", tag));
            } else {
                messages.push(format!(
                    "tag mismatch: expected {}, found {}",
                    expected_tag, tag
                ));
                passed = false;
            }
        }

        Ok(VerifyResult { passed, messages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Builds a bare remote whose main branch holds `package.json` at the
    /// given version with the given tag, then clones a working copy of it.
    async fn cloned_repo(version: &str, tag: Option<&str>) -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let seed_dir = temp.path().join("seed");

        std::fs::create_dir_all(&seed_dir).unwrap();
        let git = GitCmd::new(&seed_dir);
        git.run(&["init", "--initial-branch=main"]).await.unwrap();
        git.run(&["config", "user.email", "test@test.com"]).await.unwrap();
        git.run(&["config", "user.name", "Test User"]).await.unwrap();

        std::fs::write(
            seed_dir.join("package.json"),
            format!(r#"{{"name": "widget", "version": "{}"}}"#, version),
        )
        .unwrap();
        git.add("package.json").await.unwrap();
        git.commit("Seed commit").await.unwrap();
        if let Some(tag) = tag {
            git.run(&["tag", tag]).await.unwrap();
        }

        let bare = temp.path().join("remote.git");
        git.run(&["clone", "--bare", ".", bare.to_str().unwrap()])
            .await
            .unwrap();

        let work = temp.path().join("work");
        crate::gitio::clone_repo(bare.to_str().unwrap(), &work)
            .await
            .unwrap();

        (temp, work)
    }

    fn expectation(version: &str) -> Expectation {
        Expectation {
            version: version.to_string(),
            tag: None,
            branch: None,
            skip_tag_check: false,
        }
    }

    #[tokio::test]
    async fn passes_when_version_and_tag_match() {
        let (_temp, work) = cloned_repo("1.0.1", Some("1.0.1")).await;

        let result = Verifier::verify(&work, &expectation("1.0.1")).await.unwrap();
        assert!(result.passed, "messages: {:?}", result.messages);
    }

    #[tokio::test]
    async fn fails_on_version_mismatch() {
        let (_temp, work) = cloned_repo("1.0.0", Some("1.0.0")).await;

        let result = Verifier::verify(&work, &expectation("1.0.1")).await.unwrap();
        assert!(!result.passed);
        assert!(result
            .messages
            .iter()
            .any(|m| m.contains("version mismatch")));
    }

    #[tokio::test]
    async fn explicit_tag_overrides_version_default() {
        let (_temp, work) = cloned_repo("2.0.0", Some("v2.0.0")).await;

        let expected = Expectation {
            tag: Some("v2.0.0".to_string()),
            ..expectation("2.0.0")
        };
        let result = Verifier::verify(&work, &expected).await.unwrap();
        assert!(result.passed, "messages: {:?}", result.messages);
    }

    #[tokio::test]
    async fn skip_tag_check_ignores_mismatched_tag() {
        let (_temp, work) = cloned_repo("1.0.1", Some("wrong-tag")).await;

        let expected = Expectation {
            skip_tag_check: true,
            ..expectation("1.0.1")
        };
        let result = Verifier::verify(&work, &expected).await.unwrap();
        assert!(result.passed, "messages: {:?}", result.messages);
        assert!(result.messages.iter().any(|m| m.contains("skipped")));
    }

    #[tokio::test]
    async fn checks_out_expected_branch_before_asserting() {
        let (temp, work) = cloned_repo("1.0.0", None).await;

        // Push a release branch with a different version to the remote.
        let git = GitCmd::new(&work);
        git.run(&["config", "user.email", "test@test.com"]).await.unwrap();
        git.run(&["config", "user.name", "Test User"]).await.unwrap();
        git.checkout_new_branch("release").await.unwrap();
        crate::scenario::set_package_version(&work, "2.0.0").await.unwrap();
        git.add("package.json").await.unwrap();
        git.commit("release 2.0.0").await.unwrap();
        git.run(&["tag", "2.0.0"]).await.unwrap();
        git.run(&["push", "--tags", "-u", "origin", "release"]).await.unwrap();
        git.checkout("main").await.unwrap();

        // A second clone only sees 2.0.0 after checking out `release`.
        let other = temp.path().join("verify");
        crate::gitio::clone_repo(
            temp.path().join("remote.git").to_str().unwrap(),
            &other,
        )
        .await
        .unwrap();

        let expected = Expectation {
            branch: Some("release".to_string()),
            ..expectation("2.0.0")
        };
        let result = Verifier::verify(&other, &expected).await.unwrap();
        assert!(result.passed, "messages: {:?}", result.messages);
    }
}
