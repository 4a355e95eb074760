/// Wires `SIGINT`/`SIGTERM` to a [`triggered`] trigger/listener pair so every
/// `AsyncService` in the process can await the same shutdown signal, whether
/// it originates from the OS or from an explicit `scheduler:stop` message.
pub struct Shutdown {
    trigger: triggered::Trigger,
    listener: triggered::Listener,
}

impl Shutdown {
    /// Installs the process signal handler and returns the `Shutdown`
    /// wrapper. May only be called once per process; a second call returns
    /// an error from `ctrlc` which is logged and ignored (tests commonly
    /// construct a [`Shutdown`] without installing the handler via
    /// [`Shutdown::without_signal_handler`]).
    pub fn new() -> Self {
        let (trigger, listener) = triggered::trigger();
        let handler_trigger = trigger.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            crate::warn!("received shutdown signal, stopping...");
            handler_trigger.trigger();
        }) {
            crate::warn!("failed to install signal handler: {e}");
        }
        Self { trigger, listener }
    }

    /// Builds a `Shutdown` without touching process signal handlers, for use
    /// in tests and in-process tools that embed the engine.
    pub fn without_signal_handler() -> Self {
        let (trigger, listener) = triggered::trigger();
        Self { trigger, listener }
    }

    pub fn listener(&self) -> triggered::Listener {
        self.listener.clone()
    }

    /// Triggers shutdown explicitly, e.g. in response to a `scheduler:stop`
    /// control message rather than an OS signal.
    pub fn trigger(&self) {
        self.trigger.trigger();
    }

    pub fn is_triggered(&self) -> bool {
        self.listener.is_triggered()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::without_signal_handler()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_trigger_is_observed() {
        let shutdown = Shutdown::without_signal_handler();
        assert!(!shutdown.is_triggered());
        shutdown.trigger();
        assert!(shutdown.is_triggered());
    }
}
