//! Core business logic abstractions

pub mod clock;
pub mod config;
pub mod log;
pub mod rate;

// Re-export main types for cleaner imports
pub use clock::{Clock, FixedClock, SystemClock};
pub use rate::{RateRecord, RateSource, RateStore, SourceError, StoreError};
