//! Error taxonomy for the engine client.
//!
//! Exchange-level failures (`ProcessDead`, `ProcessExited`, `ResponseParse`,
//! `TimedOut`, `Cancelled`) are local to one `send` call and never crash the
//! supervisor; only an observed process death triggers a restart.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No engine binary exists under the versions root for this platform.
    #[error("couldn't find engine binary (tried versions={versions:?} and paths={tried:?})")]
    BinaryNotFound {
        versions: Vec<String>,
        tried: Vec<PathBuf>,
    },

    #[error("platform {0:?} is not supported by the engine")]
    UnsupportedPlatform(String),

    #[error("architecture {0:?} is not supported by the engine")]
    UnsupportedArchitecture(String),

    /// The engine process is not alive; nothing was written.
    #[error("engine process is currently dead")]
    ProcessDead,

    /// The engine process exited while the request was pending.
    #[error("engine process exited")]
    ProcessExited,

    #[error("error while parsing response from engine: {0}")]
    ResponseParse(#[source] serde_json::Error),

    #[error("request to engine timed out")]
    TimedOut,

    #[error("request to engine was cancelled")]
    Cancelled,

    /// Report-mode process was killed by a signal and produced no exit code.
    #[error("engine process terminated abnormally without an exit code")]
    AbnormalTermination,

    #[error("engine process exceeded maximum number of restarts")]
    RestartBudgetExhausted,

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to spawn engine process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("engine stdio error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
