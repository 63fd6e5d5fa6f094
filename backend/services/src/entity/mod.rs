pub mod servers;
pub mod performance_samples;
