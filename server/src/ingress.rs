//! Audience and performer WebSocket ingress (§6). Each connection gets its
//! own spawned task; the audience side also subscribes to the
//! [`ParameterBus`](aggregator_bus::ParameterBus) so every tick's consensus
//! snapshot is pushed straight back out as `state:update`.

use crate::messages::{AudienceClientMessage, AudienceServerMessage, LocationDto, PerformerClientMessage};
use crate::state::EngineHandles;
use aggregator_bus::BusEvent;
use aggregator_types::{AudienceInput, InputRejection, Location, Parameter};
use futures_util::{Sink, SinkExt, StreamExt};
use std::sync::atomic::Ordering;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

pub async fn handle_audience_connection(stream: TcpStream, handles: EngineHandles) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            aggregator_core::warn!("audience WebSocket handshake failed: {e}");
            return;
        }
    };
    let (mut sink, mut source) = ws.split();

    let now = aggregator_core::unix_now();
    let session_id = handles.registry.admit(now, None);
    handles.bus.publish(BusEvent::ParticipantJoin { session_id, at: now });
    aggregator_core::info!("audience session {session_id} connected");

    let (bus_id, mut bus_rx) = handles.bus.subscribe();

    loop {
        tokio::select! {
            incoming = source.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_audience_text(&text, session_id, &handles, &mut sink).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        aggregator_core::debug!("audience session {session_id} transport error: {e}");
                        break;
                    }
                }
            }
            event = bus_rx.recv() => {
                match event {
                    Some(BusEvent::ConsensusSnapshot(snapshot)) => {
                        let parameters = snapshot.results.iter().map(|(name, result)| (name.clone(), result.value)).collect();
                        let msg = AudienceServerMessage::StateUpdate {
                            parameters,
                            audience_count: handles.registry.active_count(),
                            tick_timestamp: snapshot.timestamp,
                        };
                        if send_json(&mut sink, &msg).await.is_err() {
                            break;
                        }
                    }
                    Some(_) => {}
                    None => break,
                }
            }
        }
    }

    handles.bus.unsubscribe(bus_id);
    handles.registry.disconnect(session_id, aggregator_core::unix_now());
    handles.bus.publish(BusEvent::ParticipantLeave { session_id, at: aggregator_core::unix_now() });
    aggregator_core::info!("audience session {session_id} disconnected");
}

async fn handle_audience_text<S>(text: &str, session_id: Uuid, handles: &EngineHandles, sink: &mut S)
where
    S: Sink<Message> + Unpin,
{
    let message: AudienceClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            aggregator_core::debug!("audience session {session_id} sent malformed message: {e}");
            let reason = InputRejection::Malformed(e.to_string());
            handles.counters.inputs_rejected.fetch_add(1, Ordering::Relaxed);
            let now = aggregator_core::unix_now();
            handles.bus.publish(BusEvent::InputRejected { session_id: Some(session_id), parameter: None, reason: reason.clone(), at: now });
            let _ = send_json(sink, &AudienceServerMessage::Error { code: "malformed".into(), message: reason.to_string() }).await;
            return;
        }
    };

    match message {
        AudienceClientMessage::Hello { location } => {
            let location = location.map(Location::from);
            handles.registry.set_location(session_id, location);
            aggregator_core::debug!("audience session {session_id} hello, location={location:?}");
        }
        AudienceClientMessage::Input { values, timestamp } => {
            for (parameter, value) in values {
                let now = aggregator_core::unix_now();
                match validate_and_record(handles, session_id, &parameter, value, timestamp, now) {
                    Ok(()) => {
                        handles.bus.publish(BusEvent::InputAccepted { session_id, parameter, at: now });
                    }
                    Err(reason) => {
                        handles.counters.inputs_rejected.fetch_add(1, Ordering::Relaxed);
                        handles.bus.publish(BusEvent::InputRejected {
                            session_id: Some(session_id),
                            parameter: Some(parameter),
                            reason,
                            at: now,
                        });
                    }
                }
            }
            let _ = send_json(sink, &AudienceServerMessage::InputAck { timestamp }).await;
        }
    }
}

/// Checks the parameter exists and the value is in bounds, then applies the
/// session's rate limit, then appends to the buffer — in that order, so a
/// malformed submission never consumes a rate-limit token (§7 kind 1).
fn validate_and_record(
    handles: &EngineHandles,
    session_id: Uuid,
    parameter: &str,
    value: f64,
    timestamp: u64,
    now: u64,
) -> Result<(), InputRejection> {
    let param: Parameter = handles.scheduler.parameter(parameter).ok_or_else(|| InputRejection::UnknownParameter(parameter.to_string()))?;
    if !param.in_bounds(value) {
        return Err(InputRejection::OutOfBounds { parameter: parameter.to_string(), value, min: param.min, max: param.max });
    }
    handles.registry.record_input(session_id, now)?;
    let location = handles.registry.session(session_id).and_then(|s| s.location);
    let input = AudienceInput::new(Uuid::new_v4(), session_id, param.clamp(value), timestamp, location);
    handles.buffer.append(parameter, input);
    Ok(())
}

async fn send_json<S>(sink: &mut S, msg: &AudienceServerMessage) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let text = serde_json::to_string(msg).map_err(|_| ())?;
    sink.send(Message::Text(text)).await.map_err(|_| ())
}

pub async fn handle_performer_connection(stream: TcpStream, handles: EngineHandles) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            aggregator_core::warn!("performer WebSocket handshake failed: {e}");
            return;
        }
    };
    let (_sink, mut source) = ws.split();
    aggregator_core::info!("performer connection established");

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_performer_text(&text, &handles),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                aggregator_core::debug!("performer transport error: {e}");
                break;
            }
        }
    }
    aggregator_core::info!("performer connection closed");
}

fn handle_performer_text(text: &str, handles: &EngineHandles) {
    let message: PerformerClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            aggregator_core::debug!("malformed performer message: {e}");
            return;
        }
    };

    match message {
        PerformerClientMessage::OverrideSet { parameter, mode, value, blend_factor, expires_at } => {
            let override_ = aggregator_types::PerformerOverride::new(mode, value, blend_factor, expires_at);
            handles.scheduler.set_override(&parameter, override_);
        }
        PerformerClientMessage::OverrideClear { parameter } => {
            handles.scheduler.clear_override(&parameter, aggregator_core::unix_now());
        }
        PerformerClientMessage::SchedulerStart => handles.scheduler.request_start(),
        PerformerClientMessage::SchedulerStop => handles.scheduler.request_stop(),
        PerformerClientMessage::ParameterRegister { name, mode, smoothing, default } => {
            handles.scheduler.register_parameter(Parameter::new(name, mode, smoothing, default));
        }
    }
}
