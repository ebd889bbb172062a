//! External command execution and failure classification.

use std::process::ExitStatus;

use rebound_core::Classify;
use serde::Serialize;
use thiserror::Error;

/// FailureKind はコマンド失敗の種類（--retry-on で選ぶ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The command could not be started.
    Spawn,
    /// The command ran and exited with a non-zero status.
    Exit,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no command given")]
    Empty,

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}")]
    Exit { program: String, status: ExitStatus },
}

impl CommandError {
    /// Exit code `rebound` itself reports for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Empty => 2,
            CommandError::Spawn { .. } => 127,
            CommandError::Exit { status, .. } => status.code().unwrap_or(1),
        }
    }
}

impl Classify for CommandError {
    type Kind = FailureKind;

    fn kind(&self) -> FailureKind {
        match self {
            CommandError::Empty | CommandError::Spawn { .. } => FailureKind::Spawn,
            CommandError::Exit { .. } => FailureKind::Exit,
        }
    }
}

/// Runs `argv` once, inheriting stdio, and waits for it to exit.
pub async fn run_once(argv: &[String]) -> Result<(), CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;
    let status = tokio::process::Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(CommandError::Exit {
            program: program.clone(),
            status,
        })
    }
}

/// RunReport は --json で出力する最終結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub command: Vec<String>,
    pub attempts: u32,
    pub succeeded: bool,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(command: Vec<String>, attempts: u32, result: &Result<(), CommandError>) -> Self {
        match result {
            Ok(()) => Self {
                command,
                attempts,
                succeeded: true,
                exit_code: 0,
                failure_kind: None,
                error: None,
            },
            Err(e) => Self {
                command,
                attempts,
                succeeded: false,
                exit_code: e.exit_code(),
                failure_kind: Some(e.kind()),
                error: Some(e.to_string()),
            },
        }
    }
}
