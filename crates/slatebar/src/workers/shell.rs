//! Shell command output as a block
//!
//! Three modes:
//! - `interval` set: run the command, show its output, sleep, repeat
//! - `restart_on_exit`: run the command again as soon as it exits
//!   (at most once per second)
//! - otherwise: run once and show each stdout line as it arrives

use crate::worker::{
    Capability, UpdateSender, Worker, WorkerError, WorkerMetadata, settings_from_table,
};
use serde::Deserialize;
use slatebar_core::config::Interval;
use slatebar_core::{Block, FormatTemplate, NamedArgs};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const RESTART_THROTTLE: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ShellConfig {
    command: String,
    interval: Option<Interval>,
    #[serde(default)]
    restart_on_exit: bool,
    #[serde(default)]
    json: bool,
    #[serde(default = "default_format")]
    format: FormatTemplate,
}

fn default_format() -> FormatTemplate {
    FormatTemplate::parse("{text}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Periodic(Duration),
    RestartOnExit,
    Streaming,
}

pub struct Shell {
    command: String,
    mode: Mode,
    json: bool,
    format: FormatTemplate,
    last: Mutex<String>,
}

impl Default for Shell {
    fn default() -> Self {
        Self {
            command: String::new(),
            mode: Mode::Streaming,
            json: false,
            format: default_format(),
            last: Mutex::new(String::new()),
        }
    }
}

impl Shell {
    fn command(&self) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> WorkerError {
        WorkerError::runtime_with(format!("failed to spawn {:?}", self.command), e)
    }

    fn store(&self, text: &str, updates: &UpdateSender) -> bool {
        let text = text.trim();
        {
            let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
            if *last == text {
                return true;
            }
            *last = text.to_string();
        }
        updates.notify()
    }

    /// Run the command to completion; `None` when cancelled first.
    async fn run_once(&self, cancel: &CancellationToken) -> Result<Option<String>, WorkerError> {
        let child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        tokio::select! {
            output = child.wait_with_output() => {
                let output = output.map_err(|e| {
                    WorkerError::runtime_with(format!("failed to wait for {:?}", self.command), e)
                })?;
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(WorkerError::runtime(format!(
                        "{:?} exited with {}: {}",
                        self.command,
                        output.status,
                        stderr.trim()
                    )));
                }
                Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
            }
            _ = cancel.cancelled() => Ok(None),
        }
    }

    async fn run_repeating(
        &self,
        pause: Duration,
        updates: &UpdateSender,
        cancel: &CancellationToken,
    ) -> Result<(), WorkerError> {
        loop {
            let Some(output) = self.run_once(cancel).await? else {
                return Ok(());
            };
            if !self.store(&output, updates) {
                return Ok(());
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    async fn run_streaming(
        &self,
        updates: &UpdateSender,
        cancel: &CancellationToken,
    ) -> Result<(), WorkerError> {
        let mut child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::runtime("child stdout not captured"))?;
        let mut lines = BufReader::new(stdout).lines();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = child.kill().await;
                    return Ok(());
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if !self.store(&line, updates) {
                            return Ok(());
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        return Err(WorkerError::runtime_with("failed to read command output", e));
                    }
                }
            }
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            status = child.wait() => status.map_err(|e| {
                WorkerError::runtime_with(format!("failed to wait for {:?}", self.command), e)
            })?,
        };
        if !status.success() {
            return Err(WorkerError::runtime(format!(
                "{:?} exited with {status}",
                self.command
            )));
        }
        debug!(command = %self.command, "command output ended");
        Ok(())
    }
}

impl Worker for Shell {
    fn metadata(&self) -> WorkerMetadata {
        WorkerMetadata {
            name: "shell",
            description: "Output of a shell command",
            capabilities: vec![Capability::Configurable],
        }
    }

    fn configure(&mut self, settings: &toml::Table) -> Result<(), WorkerError> {
        let config: ShellConfig = settings_from_table(settings)?;
        if config.command.trim().is_empty() {
            return Err(WorkerError::config("command must not be empty"));
        }
        if config.interval.is_some_and(|i| i.as_duration().is_zero()) {
            return Err(WorkerError::config("interval must be positive"));
        }
        self.mode = match (config.interval, config.restart_on_exit) {
            (Some(interval), _) => Mode::Periodic(interval.as_duration()),
            (None, true) => Mode::RestartOnExit,
            (None, false) => Mode::Streaming,
        };
        self.command = config.command;
        self.json = config.json;
        self.format = config.format;
        Ok(())
    }

    async fn run(
        &self,
        updates: UpdateSender,
        cancel: CancellationToken,
    ) -> Result<(), WorkerError> {
        match self.mode {
            Mode::Periodic(interval) => self.run_repeating(interval, &updates, &cancel).await,
            Mode::RestartOnExit => self.run_repeating(RESTART_THROTTLE, &updates, &cancel).await,
            Mode::Streaming => self.run_streaming(&updates, &cancel).await,
        }
    }

    fn render(&self) -> Vec<Block> {
        let text = self.last.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if text.is_empty() {
            return Vec::new();
        }
        if self.json {
            return match serde_json::from_str::<Block>(&text) {
                Ok(block) => vec![block],
                Err(e) => {
                    warn!(error = %e, "command output is not a block");
                    Vec::new()
                }
            };
        }
        let args = NamedArgs::new().with("text", text);
        vec![Block::new(self.format.expand(&args))]
    }
}
