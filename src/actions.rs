//! Workflow runs API client.
//!
//! Thin typed wrapper over the GitHub Actions runs endpoints. The verifier
//! only ever reads run state; triggering happens implicitly via `git push`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Base URL for the GitHub REST API v3.
const GITHUB_API_BASE: &str = "https://api.github.com";

/// Lifecycle state of a workflow run as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    /// Any state this client does not model (e.g. `waiting`, `requested`).
    #[serde(other)]
    Unknown,
}

/// Final outcome of a completed workflow run.
///
/// Only meaningful once the run's status is [`RunStatus::Completed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    TimedOut,
    Neutral,
    ActionRequired,
    #[serde(other)]
    Unknown,
}

/// Observable state of one remote workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Run identifier.
    pub id: u64,
    /// Branch whose push triggered the run. The sole correlation key back
    /// to a test case.
    pub head_branch: String,
    /// Lifecycle state; transitions externally to `completed`.
    pub status: RunStatus,
    /// Final outcome; absent until the run completes.
    pub conclusion: Option<RunConclusion>,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
}

impl WorkflowRun {
    /// Returns true once the run has finished.
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Read-only source of workflow run records.
///
/// Abstracted so the aggregator can be driven by scripted fakes in tests.
#[async_trait]
pub trait RunSource: Send + Sync {
    /// Lists all current workflow runs, most recent first.
    async fn list_runs(&self) -> Result<Vec<WorkflowRun>>;

    /// Fetches a single run by id.
    async fn get_run(&self, id: u64) -> Result<WorkflowRun>;

    /// Returns the most recently created run, if any exist.
    async fn most_recent_run(&self) -> Result<Option<WorkflowRun>>;
}

/// Wire shape of the runs listing payload.
#[derive(Debug, Deserialize)]
struct RunsPage {
    workflow_runs: Vec<WorkflowRun>,
}

/// HTTP client for the workflow runs API of a single repository.
#[derive(Debug, Clone)]
pub struct ActionsClient {
    http: reqwest::Client,
    base_url: String,
    /// Repository slug, `owner/name`.
    repo: String,
    token: String,
}

impl ActionsClient {
    /// Creates a client for the given `owner/name` repository.
    pub fn new(repo: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: GITHUB_API_BASE.to_string(),
            repo: repo.into(),
            token: token.into(),
        }
    }

    /// Overrides the API base URL. Used by tests against a local server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn runs_url(&self) -> String {
        format!("{}/repos/{}/actions/runs", self.base_url, self.repo)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "tagproof")
            .send()
            .await
            .map_err(|e| Error::Api(format!("request to {} failed: {}", url, e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{} returned {}: {}", url, status, body)));
        }

        resp.json::<T>()
            .await
            .map_err(|e| Error::Api(format!("failed to decode response from {}: {}", url, e)))
    }
}

#[async_trait]
impl RunSource for ActionsClient {
    async fn list_runs(&self) -> Result<Vec<WorkflowRun>> {
        let url = format!("{}?per_page=100", self.runs_url());
        let page: RunsPage = self.get_json(&url).await?;
        Ok(page.workflow_runs)
    }

    async fn get_run(&self, id: u64) -> Result<WorkflowRun> {
        let url = format!("{}/{}", self.runs_url(), id);
        self.get_json(&url).await
    }

    async fn most_recent_run(&self) -> Result<Option<WorkflowRun>> {
        // The API lists runs most recent first.
        let url = format!("{}?per_page=1", self.runs_url());
        let page: RunsPage = self.get_json(&url).await?;
        Ok(page.workflow_runs.into_iter().next())
    }
}

/// Waits for a run created after `after` to appear, then waits for that
/// run to complete, and returns its final record.
pub async fn completed_run_after(
    source: &dyn RunSource,
    after: DateTime<Utc>,
) -> Result<WorkflowRun> {
    let run = crate::poll::poll(
        crate::poll::POLL_INTERVAL,
        || source.most_recent_run(),
        |run: &Option<WorkflowRun>| run.as_ref().is_some_and(|r| r.created_at > after),
    )
    .await?
    .ok_or_else(|| Error::Api("most recent run vanished while polling".to_string()))?;

    crate::poll::poll(
        crate::poll::POLL_INTERVAL,
        || source.get_run(run.id),
        WorkflowRun::is_completed,
    )
    .await
}

/// Returns the creation time of the most recent run, or the epoch when the
/// repository has none yet.
pub async fn most_recent_run_date(source: &dyn RunSource) -> Result<DateTime<Utc>> {
    let run = source.most_recent_run().await?;
    Ok(run.map_or(DateTime::<Utc>::UNIX_EPOCH, |r| r.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_json(id: u64, branch: &str, status: &str, conclusion: Option<&str>) -> String {
        format!(
            r#"{{
                "id": {},
                "head_branch": "{}",
                "status": "{}",
                "conclusion": {},
                "created_at": "2024-05-01T12:00:00Z"
            }}"#,
            id,
            branch,
            status,
            conclusion.map_or("null".to_string(), |c| format!("\"{}\"", c)),
        )
    }

    #[test]
    fn run_status_deserializes_known_and_unknown() {
        let run: WorkflowRun =
            serde_json::from_str(&run_json(1, "tests/a/0", "in_progress", None)).unwrap();
        assert_eq!(run.status, RunStatus::InProgress);
        assert!(!run.is_completed());
        assert_eq!(run.conclusion, None);

        let odd: WorkflowRun =
            serde_json::from_str(&run_json(2, "tests/a/1", "waiting", None)).unwrap();
        assert_eq!(odd.status, RunStatus::Unknown);
    }

    #[test]
    fn run_conclusion_deserializes() {
        let run: WorkflowRun =
            serde_json::from_str(&run_json(3, "tests/a/0", "completed", Some("success"))).unwrap();
        assert!(run.is_completed());
        assert_eq!(run.conclusion, Some(RunConclusion::Success));

        let timed_out: WorkflowRun =
            serde_json::from_str(&run_json(4, "tests/a/1", "completed", Some("timed_out")))
                .unwrap();
        assert_eq!(timed_out.conclusion, Some(RunConclusion::TimedOut));
    }

    #[tokio::test]
    async fn list_runs_decodes_page() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            r#"{{"total_count": 2, "workflow_runs": [{}, {}]}}"#,
            run_json(10, "tests/patch/0", "completed", Some("success")),
            run_json(11, "tests/patch/1", "queued", None),
        );
        let mock = server
            .mock("GET", "/repos/acme/widget/actions/runs?per_page=100")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = ActionsClient::new("acme/widget", "token").with_base_url(server.url());
        let runs = client.list_runs().await.unwrap();

        mock.assert_async().await;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, 10);
        assert_eq!(runs[1].status, RunStatus::Queued);
    }

    #[tokio::test]
    async fn get_run_fetches_by_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/widget/actions/runs/42")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(run_json(42, "tests/patch/0", "completed", Some("failure")))
            .create_async()
            .await;

        let client = ActionsClient::new("acme/widget", "token").with_base_url(server.url());
        let run = client.get_run(42).await.unwrap();

        mock.assert_async().await;
        assert_eq!(run.id, 42);
        assert_eq!(run.conclusion, Some(RunConclusion::Failure));
    }

    #[tokio::test]
    async fn most_recent_run_is_none_when_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/widget/actions/runs?per_page=1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"total_count": 0, "workflow_runs": []}"#)
            .create_async()
            .await;

        let client = ActionsClient::new("acme/widget", "token").with_base_url(server.url());
        assert!(client.most_recent_run().await.unwrap().is_none());
    }

    /// Fake source that walks a scripted sequence of per-call states.
    struct SequenceSource {
        recent: std::sync::Mutex<Vec<Option<WorkflowRun>>>,
        by_id: std::sync::Mutex<Vec<WorkflowRun>>,
    }

    #[async_trait]
    impl RunSource for SequenceSource {
        async fn list_runs(&self) -> crate::error::Result<Vec<WorkflowRun>> {
            Ok(Vec::new())
        }

        async fn get_run(&self, id: u64) -> crate::error::Result<WorkflowRun> {
            let mut by_id = self.by_id.lock().unwrap();
            let run = if by_id.len() > 1 { by_id.remove(0) } else { by_id[0].clone() };
            assert_eq!(run.id, id);
            Ok(run)
        }

        async fn most_recent_run(&self) -> crate::error::Result<Option<WorkflowRun>> {
            let mut recent = self.recent.lock().unwrap();
            if recent.len() > 1 {
                Ok(recent.remove(0))
            } else {
                Ok(recent[0].clone())
            }
        }
    }

    fn typed_run(id: u64, created_at: &str, status: RunStatus) -> WorkflowRun {
        WorkflowRun {
            id,
            head_branch: "tests/patch/0".to_string(),
            status,
            conclusion: (status == RunStatus::Completed).then_some(RunConclusion::Success),
            created_at: created_at.parse().unwrap(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completed_run_after_waits_for_newer_then_completed() {
        let after: chrono::DateTime<chrono::Utc> = "2024-05-01T12:00:00Z".parse().unwrap();
        let stale = typed_run(1, "2024-05-01T11:00:00Z", RunStatus::Completed);
        let fresh = typed_run(2, "2024-05-01T12:30:00Z", RunStatus::InProgress);

        let source = SequenceSource {
            // One stale observation, then the freshly triggered run.
            recent: std::sync::Mutex::new(vec![Some(stale), Some(fresh.clone())]),
            // The fresh run is pending on first lookup, completed on the next.
            by_id: std::sync::Mutex::new(vec![
                fresh,
                typed_run(2, "2024-05-01T12:30:00Z", RunStatus::Completed),
            ]),
        };

        let run = completed_run_after(&source, after).await.unwrap();
        assert_eq!(run.id, 2);
        assert!(run.is_completed());
        assert_eq!(run.conclusion, Some(RunConclusion::Success));
    }

    #[tokio::test]
    async fn most_recent_run_date_defaults_to_epoch() {
        let source = SequenceSource {
            recent: std::sync::Mutex::new(vec![None]),
            by_id: std::sync::Mutex::new(vec![typed_run(
                1,
                "2024-05-01T11:00:00Z",
                RunStatus::Completed,
            )]),
        };
        let date = most_recent_run_date(&source).await.unwrap();
        assert_eq!(date, chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn non_success_status_maps_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/widget/actions/runs?per_page=100")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = ActionsClient::new("acme/widget", "token").with_base_url(server.url());
        let err = client.list_runs().await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
