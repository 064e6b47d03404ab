//! OS signal handling for graceful shutdown
//!
//! Every SIGINT/SIGTERM (Ctrl+C on Windows) becomes a `Message::Quit`. The
//! first one stops a running server; a repeat while the server is still
//! shutting down makes the engine exit without waiting for it.

use tokio::sync::mpsc;

use pumpkin_console_core::prelude::*;

use crate::message::Message;

/// Source of termination signals, yielding a name per delivery
trait SignalSource {
    /// Wait for the next signal; `None` when the source is exhausted
    async fn recv(&mut self) -> Option<&'static str>;
}

#[cfg(unix)]
struct OsSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsSignals {
    fn new() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }
}

#[cfg(unix)]
impl SignalSource for OsSignals {
    async fn recv(&mut self) -> Option<&'static str> {
        tokio::select! {
            received = self.sigint.recv() => received.map(|_| "SIGINT"),
            received = self.sigterm.recv() => received.map(|_| "SIGTERM"),
        }
    }
}

#[cfg(windows)]
struct OsSignals;

#[cfg(windows)]
impl OsSignals {
    fn new() -> Result<Self> {
        Ok(Self)
    }
}

#[cfg(windows)]
impl SignalSource for OsSignals {
    async fn recv(&mut self) -> Option<&'static str> {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some("Ctrl+C"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                None
            }
        }
    }
}

/// Install the OS handlers and spawn a task forwarding each signal as
/// `Message::Quit`. Must be called from within a tokio runtime.
pub fn spawn_signal_handler(tx: mpsc::Sender<Message>) {
    match OsSignals::new() {
        Ok(signals) => {
            tokio::spawn(forward_signals(signals, tx));
        }
        Err(e) => error!("Signal handler error: {}", e),
    }
}

async fn forward_signals(mut signals: impl SignalSource, tx: mpsc::Sender<Message>) {
    while let Some(name) = signals.recv().await {
        info!("Received {}, requesting quit", name);
        if tx.send(Message::Quit).await.is_err() {
            debug!("Engine channel closed, signal handler exiting");
            break;
        }
    }
}
