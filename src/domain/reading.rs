// Live signal domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::calibration::{convert, DisplayRange, LinearModel};

/// Body of the backend's cycle-time endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CycleTimeReading {
    /// Unix seconds of the last backend update.
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub edge_count: Option<u64>,
    #[serde(default)]
    pub average_cycle_time_us: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CycleTimeReading {
    /// `None` when the backend saw no edges during its last period.
    pub fn to_sample(&self, received_at: DateTime<Utc>) -> Option<SignalSample> {
        let signal_us = self.average_cycle_time_us.filter(|v| v.is_finite())?;
        let observed_at = self
            .timestamp
            .filter(|ts| ts.is_finite())
            .and_then(|ts| DateTime::from_timestamp_millis((ts * 1000.0) as i64))
            .unwrap_or(received_at);

        Some(SignalSample {
            signal_us,
            edge_count: self.edge_count.unwrap_or(0),
            observed_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalSample {
    pub signal_us: f64,
    pub edge_count: u64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelReading {
    pub signal_us: f64,
    pub level_mm: f64,
    pub observed_at: DateTime<Utc>,
}

impl LevelReading {
    pub fn from_sample(sample: &SignalSample, model: &LinearModel, range: &DisplayRange) -> Self {
        Self {
            signal_us: sample.signal_us,
            level_mm: convert(model, sample.signal_us, range),
            observed_at: sample.observed_at,
        }
    }
}
