use thiserror::Error;

/// Invalid tuning values, detected once at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("target label must not be empty")]
    EmptyTargetLabel,

    #[error("{name} = {value} is out of range")]
    OutOfRange { name: &'static str, value: f32 },

    #[error("{low} must be below {high}")]
    Inverted {
        low: &'static str,
        high: &'static str,
    },

    #[error("at least one detection per frame must be gated")]
    ZeroDetectionCap,

    #[error("alert cooldown must be a positive number of seconds, got {0}")]
    InvalidCooldown(f64),
}

/// The frame source has no more frames to give; ends the stream loop
#[derive(Debug, Error)]
#[error("frame unavailable: {0}")]
pub struct FrameUnavailable(pub String);

/// Audio could not be loaded or played; never fatal
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to load alert sound from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start audio player: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("audio player exited with {0}")]
    Player(std::process::ExitStatus),
}
