pub mod alerts;
pub mod config;
pub mod error;
pub mod monitors;
pub mod reporter;
pub mod sampler;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One point-in-time capture of host metrics.
///
/// Created once per cycle by a [`sampler::MetricsSource`] and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    #[serde(rename = "disk_usage")]
    pub disk_percent: f32,
    #[serde(rename = "network_connections")]
    pub connection_count: usize,
    /// At most five entries, busiest first.
    pub top_processes: Vec<ProcessInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
}
