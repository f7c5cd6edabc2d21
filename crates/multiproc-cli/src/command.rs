use multiproc::Processor;
use std::{io, process::ExitStatus, process::Stdio};
use tokio::process::Command;

/// Failure of a single command invocation.
#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program} {line}` exited with {status}")]
    Failed {
        program: String,
        line: String,
        status: ExitStatus,
    },
}

/// Runs `program args.. line` for every input line.
///
/// The child inherits stdout and stderr so its output interleaves with the
/// other workers' the way `xargs -P` output does. Stdin is closed; the
/// runner's own stdin is the message source.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    program: String,
    args: Vec<String>,
}

impl CommandProcessor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Processor<String> for CommandProcessor {
    type Error = CommandError;

    async fn process(&self, line: String) -> Result<(), Self::Error> {
        tracing::debug!(program = %self.program, line = %line, "Running command");

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&line)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| CommandError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(CommandError::Failed {
                program: self.program.clone(),
                line,
                status,
            })
        }
    }
}
