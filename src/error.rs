use thiserror::Error;

/// Rejected user input. Raised before anything reaches the phase clock.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("{field} duration must be between 1 and {} seconds, got {value}", crate::simulation::MAX_PHASE_SECONDS)]
    InvalidDuration { field: &'static str, value: i64 },

    #[error("speed multiplier must be between 1 and {max}, got {value}")]
    InvalidSpeed { value: i64, max: u32 },

    #[error("'{0}' is not a whole number")]
    NotANumber(String),

    #[error("unknown intersection '{0}'")]
    UnknownIntersection(String),

    #[error("unknown traffic demand level '{0}'")]
    UnknownDemandLevel(String),

    #[error("unknown system mode '{0}'")]
    UnknownMode(String),

    #[error("unknown incident kind '{0}'")]
    UnknownIncident(String),

    #[error("unknown control '{0}'")]
    UnknownControl(String),
}

/// Failures of the optimizer round trip. None of these alter simulation state.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("failed to reach optimizer: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("optimizer returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed optimizer response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("signal timing changed while the request was in flight (sent epoch {sent}, now {current})")]
    Stale { sent: u64, current: u64 },
}
