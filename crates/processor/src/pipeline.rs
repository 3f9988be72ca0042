//! Driving Behavior Pipeline

use behavior_rules::{BehaviorClassifier, BehaviorLabel};
use feature_engine::{FeatureEngine, Features};
use serde::{Deserialize, Serialize};
use state_store::{InMemoryStateStore, StateStore, VehicleState};
use std::sync::{Mutex, MutexGuard};
use telemetry_normalizer::{CanonicalSample, Normalizer};
use tracing::{debug, info};

use crate::config::ProcessorConfig;
use crate::error::ProcessError;
use crate::stats::{BehaviorStats, StatsSummary};

/// Enriched record published for every accepted transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSample {
    pub vehicle_id: String,
    pub timestamp: f64,
    pub speed: f64,
    pub engine_rpm: f64,
    pub engine_load: f64,
    pub throttle_pos: f64,
    pub delta_t: f64,
    pub speed_d: f64,
    pub rpm_d: f64,
    pub throttle_d: f64,
    pub rcz: f64,
    pub rjz: f64,
    pub behavior_label: BehaviorLabel,
    pub behavior_status: String,
}

impl ProcessedSample {
    fn new(sample: &CanonicalSample, features: Features, label: BehaviorLabel) -> Self {
        Self {
            vehicle_id: sample.vehicle_id.clone(),
            timestamp: sample.timestamp,
            speed: sample.speed,
            engine_rpm: sample.engine_rpm,
            engine_load: sample.engine_load,
            throttle_pos: sample.throttle_pos,
            delta_t: features.delta_t,
            speed_d: features.speed_d,
            rpm_d: features.rpm_d,
            throttle_d: features.throttle_d,
            rcz: features.rcz,
            rjz: features.rjz,
            behavior_label: label,
            behavior_status: label.as_str().to_string(),
        }
    }
}

/// Result of one pure pipeline step
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// State to store for the vehicle
    pub state: VehicleState,
    /// `None` when the vehicle was seen for the first time
    pub output: Option<ProcessedSample>,
}

/// Feature derivation plus classification, free of any stored state
#[derive(Debug, Clone, Default)]
pub struct BehaviorPipeline {
    engine: FeatureEngine,
    classifier: BehaviorClassifier,
}

impl BehaviorPipeline {
    pub fn new(engine: FeatureEngine, classifier: BehaviorClassifier) -> Self {
        Self { engine, classifier }
    }

    /// From (previous state, new sample) to (new state, optional output).
    ///
    /// A first sample only seeds the state. A sample that is not strictly
    /// newer than `prev` is rejected and no new state is produced.
    pub fn step(
        &self,
        prev: Option<&VehicleState>,
        sample: &CanonicalSample,
        now: f64,
    ) -> Result<Step, ProcessError> {
        let state = VehicleState {
            last_timestamp: sample.timestamp,
            last_speed: sample.speed,
            last_rpm: sample.engine_rpm,
            last_throttle: sample.throttle_pos,
            last_update: now,
        };

        let Some(prev) = prev else {
            return Ok(Step { state, output: None });
        };

        let features = self
            .engine
            .derive(prev, sample)
            .map_err(|e| ProcessError::from_feature(&sample.vehicle_id, e))?;
        let classification = self
            .classifier
            .classify(features.rcz, features.rjz, sample.engine_load);

        Ok(Step {
            state,
            output: Some(ProcessedSample::new(sample, features, classification.label)),
        })
    }
}

struct ProcessorState<S> {
    store: S,
    stats: BehaviorStats,
}

/// Stateful processor for a stream of raw telemetry messages.
///
/// Each message runs to completion under a single lock, so the per-vehicle
/// read-modify-write and the expiry sweep never interleave.
pub struct DrivingBehaviorProcessor<S: StateStore = InMemoryStateStore> {
    normalizer: Normalizer,
    pipeline: BehaviorPipeline,
    summary_interval: u64,
    inner: Mutex<ProcessorState<S>>,
}

impl DrivingBehaviorProcessor {
    /// Create a processor backed by an in-memory state store
    pub fn new(config: ProcessorConfig) -> Result<Self, ProcessError> {
        let store = InMemoryStateStore::new(config.state_expiry_seconds)?;
        Self::with_store(config, store)
    }
}

impl<S: StateStore> DrivingBehaviorProcessor<S> {
    /// Create a processor over a caller-supplied store
    pub fn with_store(config: ProcessorConfig, store: S) -> Result<Self, ProcessError> {
        if config.summary_interval == 0 {
            return Err(ProcessError::InvalidConfig(
                "summary_interval must be at least 1".to_string(),
            ));
        }
        let engine = FeatureEngine::new(config.feature_config())
            .map_err(|e| ProcessError::InvalidConfig(e.to_string()))?;

        info!(
            "Initialized driving behavior processor: expiry={}s, max_throttle_d={}, max_rpm_d={}",
            config.state_expiry_seconds, config.global_max_throttle_d, config.global_max_rpm_d
        );

        Ok(Self {
            normalizer: Normalizer::new(),
            pipeline: BehaviorPipeline::new(engine, BehaviorClassifier::new()),
            summary_interval: config.summary_interval,
            inner: Mutex::new(ProcessorState {
                store,
                stats: BehaviorStats::new(),
            }),
        })
    }

    /// Handle a raw message using the current wall clock
    pub fn handle_message(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> Result<Option<ProcessedSample>, ProcessError> {
        self.handle_message_at(topic, payload, wall_clock_seconds())
    }

    /// Handle a raw message at wall-clock time `now` (epoch seconds)
    pub fn handle_message_at(
        &self,
        topic: &str,
        payload: &[u8],
        now: f64,
    ) -> Result<Option<ProcessedSample>, ProcessError> {
        match self.normalizer.normalize_bytes(payload, topic) {
            Ok(sample) => self.process_sample_at(sample, now),
            Err(e) => {
                let err = ProcessError::from(e);
                self.lock()?.stats.record_drop(err.kind());
                Err(err)
            }
        }
    }

    /// Process an already-normalized sample at wall-clock time `now`
    pub fn process_sample_at(
        &self,
        sample: CanonicalSample,
        now: f64,
    ) -> Result<Option<ProcessedSample>, ProcessError> {
        let mut guard = self.lock()?;
        let result = self.process_locked(&mut guard, &sample, now);
        if let Err(err) = &result {
            guard.stats.record_drop(err.kind());
        }
        result
    }

    fn process_locked(
        &self,
        state: &mut ProcessorState<S>,
        sample: &CanonicalSample,
        now: f64,
    ) -> Result<Option<ProcessedSample>, ProcessError> {
        let evicted = state.store.sweep(now);
        if !evicted.is_empty() {
            state.stats.set_active_vehicles(state.store.len());
            info!("Active vehicles: {}", state.store.len());
        }

        let prev = state.store.get(&sample.vehicle_id);
        let step = self.pipeline.step(prev.as_ref(), sample, now)?;
        state.store.put(&sample.vehicle_id, step.state);

        let Some(output) = step.output else {
            state.stats.set_active_vehicles(state.store.len());
            info!("Initialized state for new vehicle: {}", sample.vehicle_id);
            debug!("Total vehicles being tracked: {}", state.store.len());
            return Ok(None);
        };

        state.stats.record(output.behavior_label);
        info!(
            "[{}] {} | Rcz={:.3}, Rjz={:.3}, Load={:.1}",
            output.vehicle_id,
            output.behavior_status.to_uppercase(),
            output.rcz,
            output.rjz,
            output.engine_load
        );

        if let Some(summary) = state.stats.periodic_summary(self.summary_interval) {
            summary.log();
        }

        Ok(Some(output))
    }

    /// Current statistics summary
    pub fn summary(&self) -> Result<StatsSummary, ProcessError> {
        Ok(self.lock()?.stats.summary())
    }

    /// Stored state for a vehicle, if tracked
    pub fn vehicle_state(&self, vehicle_id: &str) -> Result<Option<VehicleState>, ProcessError> {
        Ok(self.lock()?.store.get(vehicle_id))
    }

    /// Number of vehicles currently tracked
    pub fn active_vehicles(&self) -> Result<usize, ProcessError> {
        Ok(self.lock()?.store.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProcessorState<S>>, ProcessError> {
        self.inner
            .lock()
            .map_err(|e| ProcessError::StateUnavailable(format!("Lock error: {}", e)))
    }
}

/// Wall-clock seconds since the Unix epoch
pub fn wall_clock_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
