//! Wire messages for the audience and performer WebSocket ingress (§6).

use aggregator_types::{ConsensusMode, Location, OverrideMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationDto {
    pub x: f64,
    pub y: f64,
}

impl From<LocationDto> for Location {
    fn from(dto: LocationDto) -> Self {
        Location { x: dto.x, y: dto.y }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum AudienceClientMessage {
    #[serde(rename = "audience:input")]
    Input { values: HashMap<String, f64>, timestamp: u64 },
    #[serde(rename = "audience:hello")]
    Hello { location: Option<LocationDto> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum AudienceServerMessage {
    #[serde(rename = "state:update")]
    StateUpdate { parameters: HashMap<String, f64>, audience_count: usize, tick_timestamp: u64 },
    #[serde(rename = "input:ack")]
    InputAck { timestamp: u64 },
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum PerformerClientMessage {
    #[serde(rename = "override:set")]
    OverrideSet { parameter: String, mode: OverrideMode, value: f64, blend_factor: Option<f64>, expires_at: Option<u64> },
    #[serde(rename = "override:clear")]
    OverrideClear { parameter: String },
    #[serde(rename = "scheduler:start")]
    SchedulerStart,
    #[serde(rename = "scheduler:stop")]
    SchedulerStop,
    #[serde(rename = "parameter:register")]
    ParameterRegister { name: String, mode: ConsensusMode, smoothing: f64, default: f64 },
}
