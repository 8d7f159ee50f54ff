// Application layer - use cases and ports
pub mod calibration_service;
pub mod calibration_session;
pub mod instrument_backend;
pub mod measurement_service;
pub mod signal_poller;
