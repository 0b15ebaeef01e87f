use std::future::Future;

use tokio::process::Command;

use dicebox_core::config::SerialConfig;
use dicebox_core::DieConfig;

use crate::channel::SerialChannel;
use crate::{LinkError, Result};

// ─── Transport ────────────────────────────────────────────────────────────

/// The OS seam for one die's link: bind the hardware address to an rfcomm
/// slot, release it again, and open the serial reader process.
pub trait Transport: Send + Sync + 'static {
    fn bind(&self, die: &DieConfig) -> impl Future<Output = Result<()>> + Send;

    fn release(&self, die: &DieConfig) -> impl Future<Output = Result<()>> + Send;

    fn open(&self, die: &DieConfig) -> impl Future<Output = Result<SerialChannel>> + Send;
}

// ─── RfcommTransport ──────────────────────────────────────────────────────

/// Production transport: `rfcomm bind/release` (optionally via sudo) plus
/// a `picocom` reader attached to `/dev/rfcomm<slot>`.
pub struct RfcommTransport {
    serial: SerialConfig,
}

impl RfcommTransport {
    pub fn new(serial: SerialConfig) -> Self {
        Self { serial }
    }

    fn command(&self, program: &str) -> Command {
        if self.serial.sudo {
            let mut cmd = Command::new("sudo");
            cmd.arg(program);
            cmd
        } else {
            Command::new(program)
        }
    }
}

impl Transport for RfcommTransport {
    /// Bind the die's hardware address to its rfcomm slot. The exit status
    /// is checked: a failed bind is a fault, not a silent no-op.
    async fn bind(&self, die: &DieConfig) -> Result<()> {
        let mut cmd = self.command(&self.serial.rfcomm);
        cmd.arg("bind")
            .arg(die.channel.to_string())
            .arg(&die.address);

        let output = cmd.output().await.map_err(LinkError::Io)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LinkError::Bind(format!(
                "rfcomm bind {} {} failed: {}",
                die.channel,
                die.address,
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn release(&self, die: &DieConfig) -> Result<()> {
        let mut cmd = self.command(&self.serial.rfcomm);
        cmd.arg("release").arg(die.channel.to_string());

        let output = cmd.output().await.map_err(LinkError::Io)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LinkError::Bind(format!(
                "rfcomm release {} failed: {}",
                die.channel,
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn open(&self, die: &DieConfig) -> Result<SerialChannel> {
        let mut cmd = Command::new(&self.serial.picocom);
        cmd.arg(format!("/dev/rfcomm{}", die.channel))
            .arg("-b")
            .arg(self.serial.baud.to_string());
        SerialChannel::spawn(cmd)
    }
}
