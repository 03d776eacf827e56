//! Interrupt and terminate signal handling.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Listens for SIGINT and SIGTERM. The handlers are registered on
/// [`SignalListener::install`], so signals arriving before the first
/// [`SignalListener::recv`] are not lost.
pub struct SignalListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            // equivalent to Ctrl+C
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    pub async fn recv(&mut self) -> ShutdownSignal {
        let signal = tokio::select! {
            _ = self.interrupt.recv() => ShutdownSignal::Interrupt,
            _ = self.terminate.recv() => ShutdownSignal::Terminate,
        };
        tracing::info!("received {signal} signal, shutting down");
        signal
    }
}

// Best-effort implementation for non-unix systems
#[cfg(not(unix))]
impl SignalListener {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }

    pub async fn recv(&mut self) -> ShutdownSignal {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(?err, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("received CTRL+C signal, shutting down");
        ShutdownSignal::Interrupt
    }
}
