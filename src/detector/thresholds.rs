//! Live-tunable temperature range shared between the MQTT loop and the
//! control-plane HTTP handler.

use crate::{ColdchainError, Result};
use tokio::sync::RwLock;

/// A validated temperature range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureRange {
    /// Lower bound; readings below it are damage
    pub min: f64,
    /// Upper bound; readings above it are damage
    pub max: f64,
}

impl TemperatureRange {
    /// Build a range, rejecting `min >= max`.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ColdchainError::Config(
                "temperature bounds must be finite".into(),
            ));
        }
        if min >= max {
            return Err(ColdchainError::Config(format!(
                "min_temperature {min} must be below max_temperature {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Whether a reading falls outside the permitted range.
    pub fn is_violated_by(&self, temperature: f64) -> bool {
        temperature < self.min || temperature > self.max
    }
}

/// The range behind a read/write lock.
///
/// Updates from the control plane take effect for the next reading; the
/// MQTT handler takes the read lock per message so in-flight handlers
/// observe updates immediately.
#[derive(Debug)]
pub struct Thresholds {
    range: RwLock<TemperatureRange>,
}

impl Thresholds {
    /// Wrap an initial range.
    pub fn new(range: TemperatureRange) -> Self {
        Self {
            range: RwLock::new(range),
        }
    }

    /// Current range.
    pub async fn get(&self) -> TemperatureRange {
        *self.range.read().await
    }

    /// Replace the range.
    pub async fn set(&self, range: TemperatureRange) {
        *self.range.write().await = range;
    }
}
