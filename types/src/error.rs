use thiserror::Error;

/// Top-level error composed from every crate's own error enum. Only the
/// fatal kind (§7 kind 5) ever surfaces to `main`; everything else is caught
/// and counted closer to its source.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Osc(#[from] OscError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Validation failure for a single `audience:input` submission (§7 kind 1).
/// Never fatal; the session stays open and an `INPUT_REJECTED` event fires.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputRejection {
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("value {value} out of bounds [{min}, {max}] for parameter '{parameter}'")]
    OutOfBounds { parameter: String, value: f64, min: f64, max: f64 },
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("unknown session")]
    UnknownSession,
}

#[derive(Error, Debug)]
pub enum OscError {
    #[error("failed to bind OSC socket on {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("invalid OSC remote address '{0}'")]
    InvalidAddress(String),
    #[error("failed to send OSC packet: {0}")]
    Send(std::io::Error),
    #[error("failed to encode OSC packet: {0}")]
    Encode(#[from] rosc::OscError),
}
