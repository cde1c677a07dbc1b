use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

/// Sends a saved label document to a physical printer.
#[async_trait]
pub trait Printer: Send + Sync {
    /// Name reported back to the server when a job is handled.
    fn name(&self) -> &str;

    async fn print(&self, path: &Path) -> Result<(), PrintError>;
}

/// CUPS printer driven through the `lp` command.
pub struct LpPrinter {
    name: String,
    options: Vec<String>,
}

impl LpPrinter {
    pub fn new(name: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// Parse `;`-separated `lp -o` options, e.g. `media=Custom.120x220mm,labels;InputSlot=manual`.
    pub fn parse_options(raw: &str) -> Vec<String> {
        raw.split(';')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether `lpstat` reports the printer as present and enabled.
    pub async fn check_available(&self) -> bool {
        match Command::new("lpstat").arg("-p").arg(&self.name).output().await {
            Ok(out) => {
                out.status.success()
                    && String::from_utf8_lossy(&out.stdout)
                        .to_lowercase()
                        .contains("enabled")
            }
            Err(e) => {
                tracing::debug!(error = %e, "lpstat unavailable");
                false
            }
        }
    }
}

#[async_trait]
impl Printer for LpPrinter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn print(&self, path: &Path) -> Result<(), PrintError> {
        let mut cmd = Command::new("lp");
        cmd.arg("-d").arg(&self.name);
        for opt in &self.options {
            cmd.arg("-o").arg(opt);
        }
        cmd.arg(path);

        let output = cmd.output().await.map_err(PrintError::Spawn)?;
        if output.status.success() {
            tracing::info!(
                printer = %self.name,
                path = %path.display(),
                "Label sent to printer"
            );
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            format!("lp exited with {}", output.status)
        } else {
            stderr
        };
        Err(PrintError::PrintFailure(detail))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    #[error("Print command failed: {0}")]
    PrintFailure(String),

    #[error("Failed to run print command: {0}")]
    Spawn(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let opts = LpPrinter::parse_options("media=Custom.120x220mm,labels; InputSlot=manual;;");
        assert_eq!(opts, vec!["media=Custom.120x220mm,labels", "InputSlot=manual"]);
        assert!(LpPrinter::parse_options("").is_empty());
    }
}
