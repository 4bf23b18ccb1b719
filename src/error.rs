//! Error types for sampling, reporting and configuration

use std::fmt;
use std::time::Duration;

/// Result type alias for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors that can occur while monitoring the host
///
/// None of these stop the monitor loop. Sampling and send failures are logged
/// and the cycle moves on; configuration errors are raised before the loop
/// is constructed.
#[derive(Debug)]
pub enum MonitorError {
    /// The metrics source could not produce a snapshot
    SamplingFailed(String),

    /// The metrics source did not answer within the sample timeout
    SamplingTimedOut(Duration),

    /// The collector endpoint could not be reached
    RequestFailed(String),

    /// The collector endpoint answered with something other than 200
    UnexpectedStatus(u16),

    /// Missing or invalid configuration value
    InvalidConfig(String),
}

impl MonitorError {
    pub fn is_sampling_failure(&self) -> bool {
        matches!(
            self,
            MonitorError::SamplingFailed(_) | MonitorError::SamplingTimedOut(_)
        )
    }

    pub fn is_send_failure(&self) -> bool {
        matches!(
            self,
            MonitorError::RequestFailed(_) | MonitorError::UnexpectedStatus(_)
        )
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::SamplingFailed(msg) => write!(f, "failed to sample metrics: {}", msg),
            MonitorError::SamplingTimedOut(timeout) => {
                write!(f, "sampling metrics timed out after {:?}", timeout)
            }
            MonitorError::RequestFailed(msg) => {
                write!(f, "failed to reach collector endpoint: {}", msg)
            }
            MonitorError::UnexpectedStatus(status) => {
                write!(f, "collector endpoint responded with status {}", status)
            }
            MonitorError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::RequestFailed(err.to_string())
    }
}
