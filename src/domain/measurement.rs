// Measurement recording and analysis domain models
use serde::{Deserialize, Serialize};

/// Plain `{ "message": ... }` acknowledgement returned by several backend endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingParameters {
    pub calibration_slope: f64,
    pub calibration_intercept: f64,
}

/// Metadata the backend writes next to each recorded CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub filename: String,
    pub created_at: f64,
    pub duration_ms: f64,
    pub row_count: u64,
    #[serde(default)]
    pub file_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingFinished {
    pub message: String,
    pub file_link: String,
    pub metadata: Measurement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementCatalog {
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(default)]
    pub analysis_images: Vec<String>,
}

impl MeasurementCatalog {
    /// Newest recordings first.
    pub fn sorted(mut self) -> Self {
        self.measurements
            .sort_by(|a, b| b.created_at.total_cmp(&a.created_at));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub filename: String,
    /// Start of the analysed window in ms; 0 means "from the first row".
    #[serde(default)]
    pub start_elapsed: f64,
    /// End of the analysed window in ms; 0 means "to the last row".
    #[serde(default)]
    pub end_elapsed: f64,
    #[serde(default = "default_bins")]
    pub bins: u32,
    #[serde(default = "default_conversion_factor")]
    pub conversion_factor: f64,
}

fn default_bins() -> u32 {
    20
}

fn default_conversion_factor() -> f64 {
    10.3958
}

impl AnalysisRequest {
    pub fn for_measurement(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            start_elapsed: 0.0,
            end_elapsed: 0.0,
            bins: default_bins(),
            conversion_factor: default_conversion_factor(),
        }
    }

    /// Checks what the backend would otherwise reject after reading the file.
    pub fn validate(&self) -> Result<(), String> {
        if self.filename.trim().is_empty() {
            return Err("filename is required".to_string());
        }
        if self.bins < 1 {
            return Err("at least 1 bin required".to_string());
        }
        if !self.start_elapsed.is_finite() || !self.end_elapsed.is_finite() {
            return Err("elapsed bounds must be finite".to_string());
        }
        if self.end_elapsed != 0.0 && self.end_elapsed < self.start_elapsed {
            return Err("end_elapsed must not precede start_elapsed".to_string());
        }
        if !self.conversion_factor.is_finite() {
            return Err("conversion factor must be finite".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub ks_exponential: Option<f64>,
    pub ks_exponential_std: Option<f64>,
    pub ks_linear: Option<f64>,
    pub ks_linear_r_squared: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub message: String,
    pub analysis_file: String,
    #[serde(default)]
    pub results: AnalysisResults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub status: String,
    #[serde(default)]
    pub pigpio_connected: bool,
}
