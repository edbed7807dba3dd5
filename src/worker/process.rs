use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::app::{PricewatchError, Result};
use crate::domain::{ScrapeMode, ScrapeRequest};
use crate::worker::{Worker, WorkerOutput};

/// Runs `<program> <script> <websiteId> <mode> <url> [flags]` as a child
/// process and waits for it to exit.
pub struct ProcessWorker {
    program: String,
    script_path: String,
    timeout: Option<Duration>,
    headless_arg: Option<String>,
}

impl ProcessWorker {
    pub fn new(program: impl Into<String>, script_path: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            script_path: script_path.into(),
            timeout: None,
            headless_arg: None,
        }
    }

    /// Hard wall-clock limit. The child is killed when it is exceeded.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Mode argument sent for headless runs, for workers that name it
    /// differently (the Python worker expects `selenium`).
    pub fn with_headless_arg(mut self, arg: impl Into<String>) -> Self {
        self.headless_arg = Some(arg.into()).filter(|a| !a.trim().is_empty());
        self
    }

    fn mode_arg(&self, mode: ScrapeMode) -> &str {
        match (mode, &self.headless_arg) {
            (ScrapeMode::Headless, Some(arg)) => arg.as_str(),
            _ => mode.as_str(),
        }
    }
}

#[async_trait]
impl Worker for ProcessWorker {
    async fn invoke(&self, request: &ScrapeRequest) -> Result<WorkerOutput> {
        let args = request.worker_args_with_mode(&self.script_path, self.mode_arg(request.mode));
        debug!(program = %self.program, ?args, "Starting worker");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PricewatchError::ProcessStart(format!("{}: {}", self.program, e)))?;

        // Dropping the wait future drops the child, and kill_on_drop reaps it.
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output?,
                Err(_) => {
                    warn!(
                        website_id = request.website_id,
                        timeout_secs = limit.as_secs_f64(),
                        "Worker exceeded its time limit, killing it"
                    );
                    return Err(PricewatchError::WorkerExit {
                        status: format!("timed out after {:.1}s", limit.as_secs_f64()),
                        stderr: "worker was killed".to_string(),
                    });
                }
            },
            None => child.wait_with_output().await?,
        };

        let output = WorkerOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        };

        debug!(
            website_id = request.website_id,
            exit_code = ?output.exit_code,
            stdout = %output.stdout_text(),
            stderr = %output.stderr_text(),
            "Worker finished"
        );

        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::ScrapeFilters;
    use std::path::PathBuf;

    fn script(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("worker.sh");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn request() -> ScrapeRequest {
        ScrapeRequest::new(7, ScrapeMode::Static, "https://shop.example.com")
    }

    #[tokio::test]
    async fn test_passes_positional_args_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(&dir, "echo \"starting\"\necho \"$*\"\n");
        let worker = ProcessWorker::new("sh", path.to_string_lossy());

        let req = request().with_filters(ScrapeFilters {
            max_pages: Some(2),
            ..Default::default()
        });
        let output = worker.invoke(&req).await.unwrap();

        assert!(output.success());
        let stdout = output.into_stdout().unwrap();
        assert!(stdout.contains("starting"));
        assert!(stdout.contains("7 static https://shop.example.com --maxPages 2"));
    }

    #[tokio::test]
    async fn test_headless_arg_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(&dir, "echo \"$2\"\n");
        let worker = ProcessWorker::new("sh", path.to_string_lossy()).with_headless_arg("selenium");

        let headless = ScrapeRequest::new(7, ScrapeMode::Headless, "https://shop.example.com");
        let stdout = worker.invoke(&headless).await.unwrap().into_stdout().unwrap();
        assert_eq!(stdout.trim(), "selenium");

        let stdout = worker.invoke(&request()).await.unwrap().into_stdout().unwrap();
        assert_eq!(stdout.trim(), "static");
    }

    #[tokio::test]
    async fn test_collects_stderr_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(&dir, "echo boom >&2\nexit 3\n");
        let worker = ProcessWorker::new("sh", path.to_string_lossy());

        let output = worker.invoke(&request()).await.unwrap();
        assert_eq!(output.exit_code, Some(3));

        let err = output.into_stdout().unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_missing_program_is_start_failure() {
        let worker = ProcessWorker::new("/nonexistent/pricewatch-worker", "scraper.py");
        let err = worker.invoke(&request()).await.unwrap_err();
        assert!(matches!(err, PricewatchError::ProcessStart(_)));
    }

    #[tokio::test]
    async fn test_timeout_kills_worker() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(&dir, "sleep 5\n");
        let worker = ProcessWorker::new("sh", path.to_string_lossy())
            .with_timeout(Some(Duration::from_millis(200)));

        let started = std::time::Instant::now();
        let err = worker.invoke(&request()).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(4));
        match err {
            PricewatchError::WorkerExit { status, .. } => assert!(status.contains("timed out")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
