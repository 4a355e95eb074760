use aggregator_buffer::InputBuffer;
use aggregator_bus::ParameterBus;
use aggregator_core::Counters;
use aggregator_registry::SessionRegistry;
use aggregator_scheduler::Scheduler;
use std::sync::Arc;

/// Every shared subsystem a connection handler needs. Cloned cheaply (it's
/// all `Arc`s) into each spawned connection task.
#[derive(Clone)]
pub struct EngineHandles {
    pub buffer: Arc<InputBuffer>,
    pub bus: Arc<ParameterBus>,
    pub registry: Arc<SessionRegistry>,
    pub scheduler: Arc<Scheduler>,
    pub counters: Arc<Counters>,
}
