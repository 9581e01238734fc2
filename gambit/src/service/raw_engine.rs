use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::trace;
use vampirc_uci::UciMessage;

use super::error::ServiceError;

/// Line-oriented UCI transport over a child process's stdio.
#[derive(Debug)]
pub struct RawEngine {
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>
}

impl RawEngine {
    pub async fn new(path: &Path, args: &[String]) -> Result<Self, ServiceError> {
        let mut child = Command::new(path)
            .kill_on_drop(true)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .args(args)
            .spawn()?;
        let stdin = child.stdin.take().ok_or(ServiceError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(ServiceError::MissingPipe("stdout"))?;

        Ok(Self {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout)
        })
    }

    pub async fn send(&mut self, message: &UciMessage) -> Result<(), ServiceError> {
        let message = format!("{}\n", message);
        trace!(message = message.trim_end(), "to engine");
        self.stdin.write_all(message.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<Option<UciMessage>, ServiceError> {
        let mut message = String::new();
        if self.stdout.read_line(&mut message).await? == 0 {
            return Ok(None);
        }
        trace!(message = message.trim_end(), "from engine");
        Ok(Some(vampirc_uci::parse_one(&message)))
    }
}
