use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use dicebox_core::{DieConfig, DieId, SideReading};

use crate::channel::ChannelEvent;
use crate::decode::decode_side;
use crate::transport::Transport;

// ─── LinkEvent ────────────────────────────────────────────────────────────

/// Connectivity and side changes reported upward by the supervisor. The
/// consumer folds these into the shared side-state map, last-write-wins
/// per die.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LinkEvent {
    Connected { die: DieId },
    Disconnected { die: DieId },
    SideChanged(SideReading),
}

// ─── SupervisorOptions ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct SupervisorOptions {
    /// Silence after spawn is assumed to mean "connected, just not rolled
    /// yet" once this elapses.
    pub connect_grace: Duration,
    /// Delay before a faulted die is re-bound and re-spawned.
    pub restart_delay: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            connect_grace: Duration::from_secs(5),
            restart_delay: Duration::from_secs(30),
        }
    }
}

// ─── DeviceSupervisor ─────────────────────────────────────────────────────

/// Supervises every configured die. One task per die runs the
/// bind → connect → supervise → restart loop independently, so a single
/// die's failure never affects the others.
pub struct DeviceSupervisor {
    tx: broadcast::Sender<LinkEvent>,
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl DeviceSupervisor {
    /// Start supervision of `dice` over `transport`.
    pub fn start<T: Transport>(
        dice: Vec<DieConfig>,
        transport: T,
        opts: SupervisorOptions,
    ) -> Self {
        let (tx, _) = broadcast::channel(64);
        let (stop, stop_rx) = watch::channel(false);
        let transport = Arc::new(transport);

        let tasks = dice
            .into_iter()
            .map(|die| {
                tokio::spawn(supervise_die(
                    die,
                    Arc::clone(&transport),
                    opts,
                    tx.clone(),
                    stop_rx.clone(),
                ))
            })
            .collect();

        Self { tx, stop, tasks }
    }

    /// Subscribe to connectivity and side events.
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.tx.subscribe()
    }

    /// Terminate every managed reader process. Binding release is
    /// best-effort on shutdown.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

// ─── Per-die supervision loop ─────────────────────────────────────────────

/// States: BINDING → CONNECTING → CONNECTED → FAULTED → (delay) → BINDING.
/// Any fault (bind failure, stderr, reader exit) tears the channel down
/// before a replacement is created; once faulted, no further channel
/// events are observed until after the restart delay, so duplicate stderr
/// events cannot trigger a second restart.
async fn supervise_die<T: Transport>(
    die: DieConfig,
    transport: Arc<T>,
    opts: SupervisorOptions,
    tx: broadcast::Sender<LinkEvent>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        // BINDING
        if let Err(error) = transport.bind(&die).await {
            tracing::warn!(die = %die.id, %error, "binding failed, retrying after delay");
            let _ = tx.send(LinkEvent::Disconnected { die: die.id });
            if wait_or_stop(&mut stop, opts.restart_delay).await {
                return;
            }
            continue;
        }

        // CONNECTING
        let mut channel = match transport.open(&die).await {
            Ok(channel) => channel,
            Err(error) => {
                tracing::warn!(die = %die.id, %error, "serial reader failed to start");
                release_quiet(transport.as_ref(), &die).await;
                let _ = tx.send(LinkEvent::Disconnected { die: die.id });
                if wait_or_stop(&mut stop, opts.restart_delay).await {
                    return;
                }
                continue;
            }
        };

        let grace = tokio::time::sleep(opts.connect_grace);
        tokio::pin!(grace);
        let mut connected = false;

        loop {
            tokio::select! {
                _ = stop.changed() => {
                    channel.kill().await;
                    release_quiet(transport.as_ref(), &die).await;
                    return;
                }
                // Silence is a weak positive: the die may simply not have
                // rolled yet.
                _ = &mut grace, if !connected => {
                    connected = true;
                    let _ = tx.send(LinkEvent::Connected { die: die.id });
                }
                event = channel.next_event() => match event {
                    Some(ChannelEvent::Data(chunk)) => {
                        if chunk.len() > 2 {
                            // non-side telemetry
                            continue;
                        }
                        let Some(side) = decode_side(&chunk) else {
                            tracing::debug!(die = %die.id, ?chunk, "unparseable side payload");
                            continue;
                        };
                        if !connected {
                            connected = true;
                            let _ = tx.send(LinkEvent::Connected { die: die.id });
                        }
                        let _ = tx.send(LinkEvent::SideChanged(SideReading {
                            die: die.id,
                            side,
                        }));
                    }
                    Some(ChannelEvent::Stderr(line)) => {
                        tracing::warn!(die = %die.id, %line, "serial reader error");
                        break;
                    }
                    None => {
                        tracing::warn!(die = %die.id, "serial reader exited");
                        break;
                    }
                }
            }
        }

        // FAULTED: unbind before the replacement channel is created
        channel.kill().await;
        release_quiet(transport.as_ref(), &die).await;
        let _ = tx.send(LinkEvent::Disconnected { die: die.id });
        if wait_or_stop(&mut stop, opts.restart_delay).await {
            return;
        }
    }
}

/// Sleep for `delay`, returning early with `true` if shutdown was signalled.
async fn wait_or_stop(stop: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = stop.changed() => true,
    }
}

async fn release_quiet<T: Transport>(transport: &T, die: &DieConfig) {
    if let Err(error) = transport.release(die).await {
        tracing::debug!(die = %die.id, %error, "rfcomm release failed");
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
