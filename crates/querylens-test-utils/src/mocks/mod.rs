//! mockall doubles for the async seams of `querylens-core`.

pub mod executor;
pub mod fetcher;
