use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::info;

/// Cooperative shutdown flag. Cloneable; every observer sees the flag flip
/// exactly once.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when shutdown has been requested. Used to interrupt the
    /// inter-poll sleep.
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|requested| *requested).await;
    }
}

/// Test/driver handle for flipping the flag by hand.
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// A manually driven shutdown pair.
pub fn manual() -> (ShutdownHandle, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, Shutdown { rx })
}

/// Install SIGINT/SIGTERM listeners that flip the shutdown flag. In-flight
/// work runs to completion; nothing is preempted.
pub fn from_signals() -> std::io::Result<Shutdown> {
    let (tx, rx) = watch::channel(false);
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        info!("Shutdown signal received");
        let _ = tx.send(true);
    });
    Ok(Shutdown { rx })
}
