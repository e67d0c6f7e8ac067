//! External build-tool invocation
//!
//! Wraps the platform build tool, streaming its output line by line while
//! the process runs so progress is observable before exit. Spawned
//! processes are killed when their invocation is dropped.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::config::defaults;
use crate::core::identifier::Scheme;
use crate::core::locator::ProjectLocator;
use crate::core::platform::Sdk;
use crate::error::ToolchainError;

/// Handle to the external build tool
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Path to the build tool binary
    program: PathBuf,
}

impl Toolchain {
    /// Wrap an explicit build tool binary
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate the default build tool on PATH
    pub fn locate() -> Result<Self, ToolchainError> {
        which::which(defaults::DEFAULT_BUILD_TOOL)
            .map(Self::new)
            .map_err(|e| ToolchainError::Spawn {
                program: PathBuf::from(defaults::DEFAULT_BUILD_TOOL),
                error: e.to_string(),
            })
    }

    /// Path to the build tool binary
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run one build invocation for (scheme, sdk)
    ///
    /// Products are directed to `products_dir`. Output lines are forwarded
    /// to `sink` (when given) as they arrive; the full text is retained for
    /// diagnostics. A non-zero exit is a [`ToolchainError::ExitFailure`]
    /// carrying that text.
    pub async fn invoke(
        &self,
        locator: &ProjectLocator,
        scheme: &Scheme,
        sdk: Sdk,
        configuration: &str,
        products_dir: &Path,
        sink: Option<mpsc::Sender<String>>,
    ) -> Result<(), ToolchainError> {
        tracing::info!("Building scheme '{scheme}' for {sdk} in {locator}");
        let mut command = Command::new(&self.program);
        command
            .arg(locator.toolchain_flag())
            .arg(locator.path())
            .arg("-scheme")
            .arg(scheme.as_str())
            .arg("-configuration")
            .arg(configuration)
            .arg("-sdk")
            .arg(sdk.name())
            .arg("build")
            .arg(format!("SYMROOT={}", products_dir.display()));
        self.run(command, sink).await.map(|_| ())
    }

    /// Discover the schemes a located project offers
    ///
    /// Parses the indented block following a `Schemes:` heading in the
    /// tool's listing output.
    pub async fn list_schemes(
        &self,
        locator: &ProjectLocator,
    ) -> Result<Vec<Scheme>, ToolchainError> {
        let mut command = Command::new(&self.program);
        command
            .arg(locator.toolchain_flag())
            .arg(locator.path())
            .arg("-list");
        let output = self.run(command, None).await?;
        Ok(parse_scheme_list(&output))
    }

    /// Spawn the prepared command, drain its output, and wait for exit
    async fn run(
        &self,
        mut command: Command,
        sink: Option<mpsc::Sender<String>>,
    ) -> Result<String, ToolchainError> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| ToolchainError::Spawn {
            program: self.program.clone(),
            error: e.to_string(),
        })?;

        // Both pipes are drained concurrently while the process runs, so
        // neither can back up and stall the build tool.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = stdout.map(|out| tokio::spawn(drain_lines(out, sink.clone())));
        let stderr_task = stderr.map(|err| tokio::spawn(drain_lines(err, sink)));

        let status = child.wait().await.map_err(|e| ToolchainError::Io {
            error: e.to_string(),
        })?;

        let mut diagnostic = String::new();
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            diagnostic.push_str(&task.await.unwrap_or_default());
        }

        if status.success() {
            Ok(diagnostic)
        } else {
            Err(ToolchainError::ExitFailure {
                exit_code: status.code().unwrap_or(-1),
                diagnostic,
            })
        }
    }
}

/// Forward lines to the sink as they arrive, accumulating the full text
async fn drain_lines<R>(reader: R, sink: Option<mpsc::Sender<String>>) -> String
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    let mut captured = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "unibuild::toolchain", "{line}");
        if let Some(sink) = &sink {
            // A departed consumer only stops progress reporting
            let _ = sink.send(line.clone()).await;
        }
        captured.push_str(&line);
        captured.push('\n');
    }
    captured
}

/// Extract scheme names from the tool's listing output
fn parse_scheme_list(output: &str) -> Vec<Scheme> {
    let mut in_section = false;
    let mut schemes = Vec::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if in_section {
            if trimmed.is_empty() {
                break;
            }
            schemes.push(Scheme::new(trimmed));
        } else if trimmed == "Schemes:" {
            in_section = true;
        }
    }
    schemes
}
