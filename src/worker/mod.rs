pub mod process;

use std::borrow::Cow;

use async_trait::async_trait;

use crate::app::{PricewatchError, Result};
use crate::domain::ScrapeRequest;

pub use process::ProcessWorker;

/// Everything the worker printed, buffered in full.
#[derive(Debug, Clone, Default)]
pub struct WorkerOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl WorkerOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// Classify the run: a clean exit yields stdout, anything else is a
    /// [`PricewatchError::WorkerExit`] carrying stderr verbatim.
    pub fn into_stdout(self) -> Result<String> {
        if !self.success() {
            let status = match self.exit_code {
                Some(code) => format!("code {}", code),
                None => "no exit code (terminated by signal)".to_string(),
            };
            return Err(PricewatchError::WorkerExit {
                status,
                stderr: self.stderr_text().into_owned(),
            });
        }
        Ok(self.stdout_text().into_owned())
    }
}

/// Out-of-process scraper. Implementations must fail with
/// [`PricewatchError::ProcessStart`] when the worker cannot be launched.
#[async_trait]
pub trait Worker {
    async fn invoke(&self, request: &ScrapeRequest) -> Result<WorkerOutput>;
}
