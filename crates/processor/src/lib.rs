//! Driving Behavior Processor
//!
//! Stateful pipeline from raw telemetry messages to classified samples:
//! normalize, sweep expired vehicles, derive features against the previous
//! sample, classify, and aggregate running statistics.

mod config;
mod error;
mod pipeline;
mod stats;

pub use config::ProcessorConfig;
pub use error::ProcessError;
pub use pipeline::{
    wall_clock_seconds, BehaviorPipeline, DrivingBehaviorProcessor, ProcessedSample, Step,
};
pub use stats::{BehaviorStats, StatsSummary};

pub use behavior_rules::BehaviorLabel;
pub use telemetry_normalizer::CanonicalSample;
