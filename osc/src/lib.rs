//! The downstream OSC bridge (spec §6): for each parameter, emits
//! `{prefix}/{parameter}` with a single float argument; a whole-tick
//! snapshot goes out as a bundle at the tick's time-tag; `{prefix}/ping`
//! is answered with `{prefix}/pong` carrying a server timestamp.
//!
//! Per Open Question O1, any other inbound OSC packet is logged and
//! dropped — there is no path from here back into the [`ParameterBus`].

use aggregator_bus::{BusEvent, BusReceiver, ParameterBus};
use aggregator_core::{AsyncService, AsyncServiceFuture};
use aggregator_types::{ConsensusResult, ConsensusSnapshot, EngineConfig, OscError};
use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch
/// (1970-01-01), used to build OSC time-tags from Unix millisecond
/// timestamps.
const NTP_UNIX_EPOCH_OFFSET_SECS: u64 = 2_208_988_800;

pub struct OscBridge {
    socket: UdpSocket,
    remote_addr: SocketAddr,
    prefix: String,
    ping_addr: String,
    pong_addr: String,
    bus: Arc<ParameterBus>,
    shutdown: triggered::Listener,
}

impl OscBridge {
    pub async fn bind(config: &EngineConfig, bus: Arc<ParameterBus>, shutdown: triggered::Listener) -> Result<Self, OscError> {
        let local_addr = format!("0.0.0.0:{}", config.osc_local_port);
        let socket = UdpSocket::bind(&local_addr).await.map_err(|e| OscError::Bind(local_addr.clone(), e))?;

        let remote = format!("{}:{}", config.osc_remote_host, config.osc_remote_port);
        let remote_addr: SocketAddr = remote.parse().map_err(|_| OscError::InvalidAddress(remote))?;

        Ok(Self {
            socket,
            remote_addr,
            ping_addr: format!("{}/ping", config.osc_prefix),
            pong_addr: format!("{}/pong", config.osc_prefix),
            prefix: config.osc_prefix.clone(),
            bus,
            shutdown,
        })
    }

    fn encode_parameter(&self, result: &ConsensusResult) -> Result<Vec<u8>, OscError> {
        let message = OscMessage { addr: format!("{}/{}", self.prefix, result.parameter), args: vec![OscType::Float(result.value as f32)] };
        rosc::encoder::encode(&OscPacket::Message(message)).map_err(OscError::Encode)
    }

    fn encode_snapshot(&self, snapshot: &ConsensusSnapshot) -> Result<Vec<u8>, OscError> {
        let content = snapshot
            .results
            .values()
            .map(|r| OscPacket::Message(OscMessage { addr: format!("{}/{}", self.prefix, r.parameter), args: vec![OscType::Float(r.value as f32)] }))
            .collect();
        let bundle = OscBundle { timetag: osc_time_from_unix_ms(snapshot.timestamp), content };
        rosc::encoder::encode(&OscPacket::Bundle(bundle)).map_err(OscError::Encode)
    }

    async fn send(&self, bytes: &[u8]) -> Result<(), OscError> {
        self.socket.send_to(bytes, self.remote_addr).await.map(|_| ()).map_err(OscError::Send)
    }

    async fn handle_bus_event(&self, event: BusEvent) {
        let encoded = match event {
            BusEvent::ConsensusUpdate(result) => self.encode_parameter(&result),
            BusEvent::ConsensusSnapshot(snapshot) => self.encode_snapshot(&snapshot),
            _ => return,
        };
        match encoded {
            Ok(bytes) => {
                if let Err(e) = self.send(&bytes).await {
                    aggregator_core::warn!("OSC send failed: {e}");
                }
            }
            Err(e) => aggregator_core::warn!("OSC encode failed: {e}"),
        }
    }

    async fn handle_inbound(&self, data: &[u8], from: SocketAddr) {
        match rosc::decoder::decode_udp(data) {
            Ok((_, OscPacket::Message(msg))) if msg.addr == self.ping_addr => {
                let pong = OscMessage { addr: self.pong_addr.clone(), args: vec![OscType::Long(aggregator_core::unix_now() as i64)] };
                if let Ok(bytes) = rosc::encoder::encode(&OscPacket::Message(pong)) {
                    let _ = self.socket.send_to(&bytes, from).await;
                }
            }
            Ok((_, packet)) => {
                // O1: read and logged, never re-injected into the bus.
                aggregator_core::debug!("ignoring inbound OSC packet from {from}: {packet:?}");
            }
            Err(e) => aggregator_core::warn!("failed to decode inbound OSC packet from {from}: {e:?}"),
        }
    }

    pub async fn run(self: Arc<Self>, mut bus_rx: BusReceiver) {
        let mut recv_buf = [0u8; 1536];
        loop {
            tokio::select! {
                _ = self.shutdown.clone() => {
                    aggregator_core::info!("OSC bridge shutting down");
                    return;
                }
                event = bus_rx.recv() => {
                    match event {
                        Some(event) => self.handle_bus_event(event).await,
                        None => return,
                    }
                }
                incoming = self.socket.recv_from(&mut recv_buf) => {
                    if let Ok((len, from)) = incoming {
                        self.handle_inbound(&recv_buf[..len], from).await;
                    }
                }
            }
        }
    }
}

fn osc_time_from_unix_ms(ms: u64) -> OscTime {
    let seconds = ms / 1000 + NTP_UNIX_EPOCH_OFFSET_SECS;
    let millis_remainder = ms % 1000;
    let fractional = ((millis_remainder as f64 / 1000.0) * (u32::MAX as f64)) as u32;
    OscTime { seconds: seconds as u32, fractional }
}

/// Wraps an already-bound [`OscBridge`] behind [`AsyncService`] so
/// `aggregator-server` can start/stop it uniformly alongside the Scheduler.
/// Takes ownership of the bus receiver at construction since `run` needs it
/// by value.
pub struct OscService {
    bridge: Arc<OscBridge>,
    receiver: parking_lot::Mutex<Option<BusReceiver>>,
}

impl OscService {
    pub fn new(bridge: Arc<OscBridge>, receiver: BusReceiver) -> Self {
        Self { bridge, receiver: parking_lot::Mutex::new(Some(receiver)) }
    }
}

impl AsyncService for OscService {
    fn ident(self: Arc<Self>) -> String {
        "osc-bridge".to_string()
    }

    fn start(self: Arc<Self>) -> AsyncServiceFuture {
        let receiver = self.receiver.lock().take();
        Box::pin(async move {
            if let Some(receiver) = receiver {
                self.bridge.clone().run(receiver).await;
            }
            Ok(())
        })
    }

    fn signal_exit(self: Arc<Self>) {
        // Shutdown is driven by the shared `triggered::Listener` the bridge
        // was built with; nothing additional to signal here.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_tag_round_trips_through_ntp_offset() {
        let tag = osc_time_from_unix_ms(0);
        assert_eq!(tag.seconds as u64, NTP_UNIX_EPOCH_OFFSET_SECS);
        assert_eq!(tag.fractional, 0);
    }

    #[test]
    fn time_tag_fractional_reflects_sub_second_millis() {
        let tag = osc_time_from_unix_ms(500);
        assert!(tag.fractional > u32::MAX / 3);
        assert!(tag.fractional < 2 * (u32::MAX / 3));
    }
}
