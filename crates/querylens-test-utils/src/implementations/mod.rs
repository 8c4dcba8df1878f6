//! Fakes with observable behaviour.

pub mod faulty_cache;
pub mod recording_executor;
