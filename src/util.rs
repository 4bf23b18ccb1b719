use std::str::FromStr;

pub const AUTH_KEY: &str = "AUTH_KEY";

pub const API_ENDPOINT: &str = "MONITOR_API_ENDPOINT";

pub const INTERVAL: &str = "MONITOR_INTERVAL";

pub const CPU_THRESHOLD: &str = "MONITOR_CPU_THRESHOLD";

pub const MEMORY_THRESHOLD: &str = "MONITOR_MEMORY_THRESHOLD";

/// Read a variable from the process environment.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Look up `key` and parse it, ignoring values that do not parse.
pub fn parse_override<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| value.trim().parse().ok())
}
