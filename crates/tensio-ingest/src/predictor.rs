//! The external prediction step, behind a seam.
//!
//! The ML model is an opaque collaborator with a file-based contract: it
//! reads the canonical dataset and a geographic reference file, and writes
//! an output CSV. [`ProcessPredictor`] spawns the real executable;
//! [`CannedPredictor`] is a test double that writes a prepared output file.

#![allow(async_fn_in_trait)]

use std::{
  future::Future,
  path::{Path, PathBuf},
  process::Stdio,
  time::Duration,
};

use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::process::Command;

use crate::{Error, Result};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the external prediction process.
///
/// `run` must produce the output file at `output` on success. Exceeding
/// `timeout` is fatal; implementations do not retry.
pub trait Predictor: Send + Sync {
  fn run<'a>(
    &'a self,
    input: &'a Path,
    geo: &'a Path,
    output: &'a Path,
    timeout: Duration,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}

// ─── Subprocess adapter ──────────────────────────────────────────────────────

/// Runs the configured executable with the three-flag argument contract:
/// `--input_csv <in> --geojson <geo> --output_csv <out>`.
///
/// Child stdout/stderr are streamed line-by-line through `tracing` while
/// the process runs, so an operator can follow a long prediction live
/// instead of after the fact.
#[derive(Debug, Clone)]
pub struct ProcessPredictor {
  program: PathBuf,
}

impl ProcessPredictor {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self { program: program.into() }
  }
}

impl Predictor for ProcessPredictor {
  async fn run(
    &self,
    input: &Path,
    geo: &Path,
    output: &Path,
    timeout: Duration,
  ) -> Result<()> {
    if !self.program.exists() {
      return Err(Error::PredictorMissing(self.program.clone()));
    }

    tracing::info!(
      program = %self.program.display(),
      input = %input.display(),
      "starting external predictor"
    );

    let mut child = Command::new(&self.program)
      .arg("--input_csv")
      .arg(input)
      .arg("--geojson")
      .arg(geo)
      .arg("--output_csv")
      .arg(output)
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()?;

    // Stream both pipes while waiting; the readers finish when the child
    // closes its ends.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let out_task = tokio::spawn(async move {
      if let Some(stdout) = stdout {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
          tracing::info!(target: "predictor", "{line}");
        }
      }
    });
    let err_task = tokio::spawn(async move {
      if let Some(stderr) = stderr {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
          tracing::warn!(target: "predictor", "{line}");
        }
      }
    });

    let status = match tokio::time::timeout(timeout, child.wait()).await {
      Ok(status) => status?,
      Err(_elapsed) => {
        child.kill().await.ok();
        return Err(Error::TimeoutExceeded(timeout.as_secs()));
      }
    };

    out_task.await.ok();
    err_task.await.ok();

    if !status.success() {
      return Err(Error::PredictionFailed(format!(
        "predictor exited with {status}"
      )));
    }
    Ok(())
  }
}

// ─── Test double ─────────────────────────────────────────────────────────────

/// A predictor that writes a canned output file instead of spawning a
/// process. Used in tests to exercise the pipeline without an ML stack.
#[derive(Debug, Clone)]
pub struct CannedPredictor {
  /// CSV body to write to the output path, or `None` to simulate a
  /// predictor that exits successfully without producing output.
  pub body: Option<String>,
  /// When set, fail with this message instead of writing anything.
  pub fail_with: Option<String>,
}

impl CannedPredictor {
  pub fn succeeding(body: impl Into<String>) -> Self {
    Self { body: Some(body.into()), fail_with: None }
  }

  pub fn silent() -> Self {
    Self { body: None, fail_with: None }
  }

  pub fn failing(message: impl Into<String>) -> Self {
    Self { body: None, fail_with: Some(message.into()) }
  }
}

impl Predictor for CannedPredictor {
  async fn run(
    &self,
    _input: &Path,
    _geo: &Path,
    output: &Path,
    _timeout: Duration,
  ) -> Result<()> {
    if let Some(message) = &self.fail_with {
      return Err(Error::PredictionFailed(message.clone()));
    }
    if let Some(body) = &self.body {
      tokio::fs::write(output, body).await?;
    }
    Ok(())
  }
}
