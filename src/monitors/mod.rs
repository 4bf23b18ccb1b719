//! Alert decision logic and the sampling loop that drives it

pub mod host;
pub mod policy;
