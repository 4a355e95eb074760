mod ingress;
mod messages;
mod state;

use aggregator_buffer::InputBuffer;
use aggregator_bus::ParameterBus;
use aggregator_core::{AsyncService, Counters, Shutdown};
use aggregator_osc::{OscBridge, OscService};
use aggregator_registry::SessionRegistry;
use aggregator_scheduler::Scheduler;
use aggregator_types::{ConsensusMode, EngineConfig, Parameter};
use clap::Parser;
use state::EngineHandles;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Consensus aggregation engine: fuses weighted audience input into smoothed
/// performance parameters, published over WebSocket and (optionally) OSC.
#[derive(Parser)]
#[command(name = "aggregator-server", version)]
struct Cli {
    /// TOML configuration file; falls back to built-in defaults if absent.
    #[arg(long, default_value = "config.toml")]
    config: String,
    #[arg(long, default_value = "0.0.0.0:7000")]
    audience_addr: String,
    #[arg(long, default_value = "0.0.0.0:7001")]
    performer_addr: String,
}

const DEFAULT_PARAMETERS: &[&str] = &["mood", "tempo", "intensity", "density"];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = if std::path::Path::new(&cli.config).exists() {
        match aggregator_config::load(&cli.config) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("fatal: {e}");
                std::process::exit(1);
            }
        }
    } else {
        EngineConfig::default()
    };

    if let Err(e) = aggregator_core::init_logger(&config.log_level, config.log_dir.as_deref(), "aggregator.log") {
        eprintln!("fatal: failed to initialize logger: {e:?}");
        std::process::exit(1);
    }

    aggregator_core::info!("starting consensus aggregation engine");

    let shutdown = Shutdown::new();
    let counters = Arc::new(Counters::default());
    let buffer = Arc::new(InputBuffer::new(config.temporal_window_ms, config.buffer_hard_cap, counters.clone()));
    let bus = Arc::new(ParameterBus::new(config.subscriber_queue_size, counters.clone()));
    let registry = Arc::new(SessionRegistry::new(config.rate_limit_hz, config.rate_limit_burst, config.session_idle_timeout_ms, config.session_grace_period_ms));
    let scheduler = Arc::new(Scheduler::new(config.clone(), buffer.clone(), bus.clone(), counters.clone(), shutdown.listener()));

    for name in DEFAULT_PARAMETERS {
        scheduler.register_parameter(Parameter::new(*name, ConsensusMode::WeightedAverage, config.smoothing_factor, 0.5));
    }

    let handles = EngineHandles { buffer: buffer.clone(), bus: bus.clone(), registry: registry.clone(), scheduler: scheduler.clone(), counters: counters.clone() };

    let scheduler_for_run = scheduler.clone();
    let scheduler_task = tokio::spawn(async move {
        if let Err(e) = scheduler_for_run.start().await {
            aggregator_core::error!("scheduler exited with error: {e}");
        }
    });
    scheduler.request_start();

    let osc_task = if config.osc_enabled {
        match OscBridge::bind(&config, bus.clone(), shutdown.listener()).await {
            Ok(bridge) => {
                let (_id, rx) = bus.subscribe();
                let service = Arc::new(OscService::new(Arc::new(bridge), rx));
                aggregator_core::info!("OSC bridge bound on port {}, forwarding to {}:{}", config.osc_local_port, config.osc_remote_host, config.osc_remote_port);
                Some(tokio::spawn(async move {
                    if let Err(e) = service.start().await {
                        aggregator_core::error!("OSC bridge exited with error: {e}");
                    }
                }))
            }
            Err(e) => {
                aggregator_core::error!("failed to start OSC bridge: {e}");
                None
            }
        }
    } else {
        None
    };

    let audience_listener = match TcpListener::bind(&cli.audience_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            aggregator_core::error!("failed to bind audience address {}: {e}", cli.audience_addr);
            std::process::exit(1);
        }
    };
    let performer_listener = match TcpListener::bind(&cli.performer_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            aggregator_core::error!("failed to bind performer address {}: {e}", cli.performer_addr);
            std::process::exit(1);
        }
    };

    aggregator_core::info!("audience ingress listening on {}", cli.audience_addr);
    aggregator_core::info!("performer ingress listening on {}", cli.performer_addr);

    let audience_task = spawn_accept_loop(audience_listener, handles.clone(), shutdown.listener(), ingress::handle_audience_connection);
    let performer_task = spawn_accept_loop(performer_listener, handles.clone(), shutdown.listener(), ingress::handle_performer_connection);

    let sweep_task = {
        let registry = registry.clone();
        let bus = bus.clone();
        let shutdown_listener = shutdown.listener();
        tokio::spawn(async move {
            loop {
                match aggregator_core::tick(Duration::from_secs(5), &shutdown_listener).await {
                    aggregator_core::TickReason::Shutdown => return,
                    aggregator_core::TickReason::Wakeup => {
                        let now = aggregator_core::unix_now();
                        for session_id in registry.sweep(now) {
                            bus.publish(aggregator_bus::BusEvent::ParticipantLeave { session_id, at: now });
                        }
                    }
                }
            }
        })
    };

    shutdown.listener().await;
    aggregator_core::info!("shutdown signaled, waiting for subsystems to stop");

    let _ = scheduler_task.await;
    if let Some(task) = osc_task {
        let _ = task.await;
    }
    let _ = audience_task.await;
    let _ = performer_task.await;
    let _ = sweep_task.await;

    let snapshot = counters.snapshot();
    aggregator_core::info!(
        "final counters: ticks_completed={} tick_overruns={} inputs_rejected={} buffer_drops={} subscriber_drops={}",
        snapshot.ticks_completed, snapshot.tick_overruns, snapshot.inputs_rejected, snapshot.buffer_drops, snapshot.subscriber_drops,
    );
    aggregator_core::info!("consensus aggregation engine stopped");
}

/// Spawns a task that accepts connections on `listener` and hands each one
/// to `handler` on its own task, until `shutdown` fires.
fn spawn_accept_loop<F, Fut>(listener: TcpListener, handles: EngineHandles, shutdown: triggered::Listener, handler: F) -> tokio::task::JoinHandle<()>
where
    F: Fn(tokio::net::TcpStream, EngineHandles) -> Fut + Send + Copy + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.clone() => return,
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let handles = handles.clone();
                            tokio::spawn(async move { handler(stream, handles).await; });
                        }
                        Err(e) => aggregator_core::warn!("failed to accept connection: {e}"),
                    }
                }
            }
        }
    })
}
