use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::{LinkError, Result};

// ─── SerialChannel ────────────────────────────────────────────────────────

/// One observable event on a die's serial channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A raw stdout chunk. Side reports are one or two bytes; anything
    /// longer is telemetry.
    Data(Vec<u8>),
    /// A line of stderr from the reader process.
    Stderr(String),
}

/// A running serial-reader subprocess, exposed as an ordered event stream.
///
/// stdout is read in raw chunks (side payloads are tiny unterminated
/// writes, not lines); stderr is read line-wise. Both are forwarded into
/// one mpsc so the caller observes them in delivery order per stream.
/// [`SerialChannel::next_event`] returning `None` means the process has
/// exited and both pipes are closed.
pub struct SerialChannel {
    child: Option<Child>,
    rx: mpsc::Receiver<ChannelEvent>,
}

impl SerialChannel {
    /// Spawn `cmd` with piped stdout/stderr and start the reader tasks.
    pub fn spawn(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(LinkError::Io)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LinkError::Process("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| LinkError::Process("stderr not captured".into()))?;

        let (tx, rx) = mpsc::channel(64);

        let tx_out = tx.clone();
        tokio::spawn(async move {
            let mut stdout = stdout;
            let mut buf = [0u8; 64];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx_out
                            .send(ChannelEvent::Data(buf[..n].to_vec()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(ChannelEvent::Stderr(line)).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            child: Some(child),
            rx,
        })
    }

    /// The next channel event, or `None` once the process has exited.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.rx.recv().await
    }

    /// Kill the subprocess (best-effort; errors are silently ignored).
    pub async fn kill(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill().await;
        }
    }

    /// Test-only constructor: a channel fed from a raw event receiver with
    /// no backing process. Used by supervisor tests to script scenarios.
    #[cfg(test)]
    pub(crate) fn from_events(rx: mpsc::Receiver<ChannelEvent>) -> Self {
        Self { child: None, rx }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
