use std::{future::Future, pin::Pin, sync::Arc, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AsyncServiceError {
    #[error("service '{0}' failed to start: {1}")]
    Start(String, String),
    #[error("service '{0}' join error: {1}")]
    Join(String, String),
}

pub type AsyncServiceFuture = Pin<Box<dyn Future<Output = Result<(), AsyncServiceError>> + Send>>;

/// Uniform lifecycle for long-running subsystems (the scheduler, the OSC
/// bridge): identify, start, request exit, await stop. `aggregator-server`
/// drives every subsystem through this trait rather than hand-rolling
/// per-subsystem start/stop glue.
pub trait AsyncService: Sync + Send {
    /// A short identifier used in logs ("scheduler", "osc-bridge", ...).
    fn ident(self: Arc<Self>) -> String;

    /// Spawns the service's run loop and returns a future that resolves once
    /// the loop has exited (cleanly or otherwise).
    fn start(self: Arc<Self>) -> AsyncServiceFuture;

    /// Signals the run loop to exit at its next safe point. Does not block;
    /// pair with the future returned by [`AsyncService::start`] or
    /// [`AsyncService::stop`] to await completion.
    fn signal_exit(self: Arc<Self>);

    /// Signals exit and returns a future resolving once the service has
    /// fully stopped. The default implementation just calls
    /// [`AsyncService::signal_exit`]; services with their own join handle
    /// override this to await it.
    fn stop(self: Arc<Self>) -> AsyncServiceFuture {
        self.signal_exit();
        Box::pin(async { Ok(()) })
    }
}

/// Why a tick-driven service's run loop woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReason {
    /// The tick interval elapsed; do a unit of work.
    Wakeup,
    /// An exit was signaled; the loop should terminate after any in-flight
    /// work completes (spec: "in-flight tick always completes").
    Shutdown,
}

/// Races a `duration` sleep against a shutdown listener, matching the
/// grounding repository's mining monitor tick loop. Returns
/// [`TickReason::Shutdown`] as soon as the listener fires, even mid-sleep.
pub async fn tick(duration: Duration, shutdown: &triggered::Listener) -> TickReason {
    tokio::select! {
        _ = tokio::time::sleep(duration) => TickReason::Wakeup,
        _ = shutdown.clone() => TickReason::Shutdown,
    }
}
