use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectralError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Degenerate statistics in channel {channel}: {reason}")]
    DegenerateStatistics { channel: usize, reason: String },

    #[error("Undefined image moment: {0}")]
    UndefinedMoment(String),

    #[error("Empty window: {0}")]
    EmptyWindow(String),
}

pub type Result<T> = std::result::Result<T, SpectralError>;
