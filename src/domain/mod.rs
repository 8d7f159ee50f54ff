// Domain layer - calibration math and instrument data models
pub mod calibration;
pub mod measurement;
pub mod reading;
