//! Process signals that end a logging session.

use std::io;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Registered Ctrl+C / SIGTERM listeners.
///
/// Handlers are installed by [`ShutdownSignal::install`], not on first poll,
/// so a signal that arrives while the device is pairing or the first sample
/// is being read is still delivered.
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl ShutdownSignal {
    /// Register the handlers. Must run inside a tokio runtime.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(windows)]
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Wait for the next signal and name it.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(windows)]
    pub async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "Ctrl+C"
    }

    /// Set `stop` on the first signal.
    pub fn forward(mut self, stop: watch::Sender<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let signal = self.recv().await;
            info!(signal, "Stop signal received");
            stop.send_replace(true);
        })
    }
}
