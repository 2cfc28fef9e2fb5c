//! Lifecycle status vocabulary published by the supervisor and channel.

use std::fmt;

/// Observable health of the engine process, as shown to the user.
///
/// Only the latest state matters; transitions are not queued. The `None`
/// state is the pre-activation default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineStatus {
    #[default]
    None,
    /// The host is configured with the engine disabled.
    Disabled,
    /// Activation failed before the process could be supervised.
    ActivationError,
    /// No engine binary exists for this platform under the versions root.
    BinaryMissing,
    /// An external downloader is fetching the binary.
    DownloadingBinary,
    ProcessFailedToStart,
    ProcessRunning,
    /// The last reply parsed successfully.
    ParsingSuccess,
    /// The last reply was not valid JSON.
    ParsingError,
    /// The last request timed out.
    TimedOut,
    /// The process exited while a request was pending.
    ProcessExited,
    /// The process is dead (possibly permanently, budget exhausted).
    ProcessDead,
}

impl EngineStatus {
    /// Short human label for status surfaces.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "idle",
            Self::Disabled => "disabled",
            Self::ActivationError => "activation error",
            Self::BinaryMissing => "binary missing",
            Self::DownloadingBinary => "downloading binary",
            Self::ProcessFailedToStart => "failed to start",
            Self::ProcessRunning => "running",
            Self::ParsingSuccess => "ok",
            Self::ParsingError => "parse error",
            Self::TimedOut => "timed out",
            Self::ProcessExited => "exited",
            Self::ProcessDead => "dead",
        }
    }

    /// Whether this state indicates a usable engine.
    #[must_use]
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::ProcessRunning | Self::ParsingSuccess)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_none() {
        assert_eq!(EngineStatus::default(), EngineStatus::None);
    }

    #[test]
    fn test_healthy_states() {
        assert!(EngineStatus::ProcessRunning.is_healthy());
        assert!(EngineStatus::ParsingSuccess.is_healthy());
        assert!(!EngineStatus::ProcessDead.is_healthy());
        assert!(!EngineStatus::TimedOut.is_healthy());
        assert!(!EngineStatus::None.is_healthy());
    }

    #[test]
    fn test_display_uses_label() {
        assert_eq!(EngineStatus::ProcessRunning.to_string(), "running");
        assert_eq!(EngineStatus::BinaryMissing.to_string(), "binary missing");
    }
}
