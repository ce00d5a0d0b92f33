//! Drives an external `xelatex` binary to turn TeX source into a PDF.

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::config::AppConfig;
use crate::errors::AppError;

const JOB_NAME: &str = "book-of-abstracts";

/// Two passes so the table of contents is filled in.
const PASSES: u32 = 2;

/// Lines of compiler output kept in error messages.
const LOG_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct LatexCompiler {
    binary: PathBuf,
    timeout: Duration,
}

impl LatexCompiler {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        LatexCompiler { binary: binary.into(), timeout }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.xelatex_path, config.latex_timeout)
    }

    /// Compile `source` in a scratch directory and return the PDF bytes.
    pub async fn compile(&self, source: &str) -> Result<Vec<u8>, AppError> {
        let dir = tempfile::tempdir()?;
        let tex_file = format!("{JOB_NAME}.tex");
        tokio::fs::write(dir.path().join(&tex_file), source).await?;

        for pass in 1..=PASSES {
            log::debug!("Running {} pass {pass} in {:?}", self.binary.display(), dir.path());
            let run = Command::new(&self.binary)
                .current_dir(dir.path())
                .arg("-interaction=nonstopmode")
                .arg("-halt-on-error")
                .arg("-no-shell-escape")
                .arg(&tex_file)
                .kill_on_drop(true)
                .output();

            let output = tokio::time::timeout(self.timeout, run)
                .await
                .map_err(|_| {
                    AppError::Latex(format!("pass {pass} timed out after {}s", self.timeout.as_secs()))
                })?
                .map_err(|e| {
                    AppError::Latex(format!("could not run {}: {e}", self.binary.display()))
                })?;

            if !output.status.success() {
                return Err(AppError::Latex(format!(
                    "pass {pass} failed ({}):\n{}",
                    output.status,
                    log_tail(&output)
                )));
            }
        }

        let pdf_path = dir.path().join(format!("{JOB_NAME}.pdf"));
        tokio::fs::read(&pdf_path).await.map_err(|e| {
            AppError::Latex(format!("no PDF produced at {}: {e}", pdf_path.display()))
        })
    }
}

/// Last lines of stdout followed by stderr.
fn log_tail(output: &Output) -> String {
    let merged = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let lines: Vec<&str> = merged.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines[start..].join("\n")
}
