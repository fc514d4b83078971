use std::fmt;

/// Why the crawl loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every queued URL was handled
    QueueExhausted,

    /// The result cap was reached
    ResultCapReached,

    /// Cancellation was requested
    Cancelled,

    /// The browser or its connection became unusable
    Critical(String),
}

/// How a run ended, as reported to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalStatus {
    Completed,
    Cancelled,
    Failed,
}

impl TerminalStatus {
    /// Derives the run status from the stop reason and the saved page count
    ///
    /// A critical stop with saved pages still counts as completed with
    /// partial output.
    pub fn from_stop(reason: &StopReason, saved: usize) -> Self {
        match reason {
            StopReason::QueueExhausted | StopReason::ResultCapReached => Self::Completed,
            StopReason::Cancelled => Self::Cancelled,
            StopReason::Critical(_) if saved > 0 => Self::Completed,
            StopReason::Critical(_) => Self::Failed,
        }
    }

    /// The line shown in the run summary
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled by user",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueExhausted => f.write_str("queue exhausted"),
            Self::ResultCapReached => f.write_str("result cap reached"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Critical(reason) => write!(f, "critical error: {}", reason),
        }
    }
}
