//! Git porcelain for scenario provisioning and verification.
//!
//! Command-style wrapper over the git CLI. Failures carry stderr and
//! propagate as fatal errors; there is no retry at this layer.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::{Error, Result};

/// Output of a git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub stdout: String,
}

/// Runs git commands inside one working directory.
#[derive(Debug, Clone)]
pub struct GitCmd {
    cwd: PathBuf,
    suppress_output: bool,
}

impl GitCmd {
    /// Creates a runner for the given working directory.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            suppress_output: false,
        }
    }

    /// Disables tracing of command output. Output is still captured and
    /// returned, just not logged.
    pub fn with_suppressed_output(mut self) -> Self {
        self.suppress_output = true;
        self
    }

    /// Returns the working directory commands run in.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Runs `git <args>` in the working directory.
    pub async fn run(&self, args: &[&str]) -> Result<GitOutput> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.cwd)
            .output()
            .await
            .map_err(|e| Error::Git(format!("failed to run git {}: {}", args.join(" "), e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(format!(
                "git {} failed in {}: {}",
                args.join(" "),
                self.cwd.display(),
                stderr.trim()
            )));
        }

        if !self.suppress_output {
            tracing::debug!(args = ?args, cwd = %self.cwd.display(), "git command succeeded");
        }

        Ok(GitOutput { stdout })
    }

    /// Stages a path.
    pub async fn add(&self, path: &str) -> Result<()> {
        self.run(&["add", path]).await.map(|_| ())
    }

    /// Commits staged changes with the given message.
    pub async fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "--message", message]).await.map(|_| ())
    }

    /// Creates and checks out a new branch.
    pub async fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        self.run(&["checkout", "-b", branch]).await.map(|_| ())
    }

    /// Checks out an existing branch.
    pub async fn checkout(&self, branch: &str) -> Result<()> {
        self.run(&["checkout", branch]).await.map(|_| ())
    }

    /// Fetches a branch from origin.
    pub async fn fetch(&self, branch: &str) -> Result<()> {
        self.run(&["fetch", "origin", branch]).await.map(|_| ())
    }

    /// Pulls the current branch's upstream.
    pub async fn pull(&self) -> Result<()> {
        self.run(&["pull"]).await.map(|_| ())
    }

    /// Pushes HEAD to origin, setting the upstream. This is what fires the
    /// remote workflow for a scenario branch.
    pub async fn push_head(&self) -> Result<()> {
        self.run(&["push", "-u", "origin", "HEAD"]).await.map(|_| ())
    }

    /// Returns the most recent tag reachable from HEAD, falling back to the
    /// abbreviated commit hash when the repository has no tags.
    pub async fn latest_tag(&self) -> Result<String> {
        let output = self
            .clone()
            .with_suppressed_output()
            .run(&["describe", "--tags", "--abbrev=0", "--always"])
            .await?;
        Ok(output.stdout)
    }
}

/// Clones `remote` into `dest`.
pub async fn clone_repo(remote: &str, dest: &Path) -> Result<()> {
    let output = Command::new("git")
        .args(["clone", remote])
        .arg(dest)
        .output()
        .await
        .map_err(|e| Error::Git(format!("failed to run git clone: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Git(format!(
            "git clone {} failed: {}",
            remote,
            stderr.trim()
        )));
    }

    Ok(())
}
