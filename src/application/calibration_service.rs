// Calibration service - owns the session, persists it and converts live signals
use crate::application::calibration_session::CalibrationSession;
use crate::application::instrument_backend::{BackendError, CalibrationStore};
use crate::domain::calibration::{fit, CalibrationError, CalibrationPoint, DisplayRange, LinearModel};
use crate::domain::reading::{LevelReading, SignalSample};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Everything a calibration view needs to render.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub points: Vec<CalibrationPoint>,
    pub armed: Option<usize>,
    /// Fit of the points as they stand right now.
    pub model: LinearModel,
    /// Model used for live level conversion.
    pub active_model: LinearModel,
    pub latest_signal: Option<SignalSample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub message: String,
    pub model: LinearModel,
}

struct CalibrationState {
    session: CalibrationSession,
    active: LinearModel,
}

#[derive(Clone)]
pub struct CalibrationService {
    store: Arc<dyn CalibrationStore>,
    state: Arc<RwLock<CalibrationState>>,
    signals: watch::Receiver<Option<SignalSample>>,
    range: DisplayRange,
}

impl CalibrationService {
    pub fn new(
        store: Arc<dyn CalibrationStore>,
        signals: watch::Receiver<Option<SignalSample>>,
        range: DisplayRange,
    ) -> Self {
        let session = CalibrationSession::default();
        let active = session.model();
        Self {
            store,
            state: Arc::new(RwLock::new(CalibrationState { session, active })),
            signals,
            range,
        }
    }

    pub fn latest_signal(&self) -> Option<SignalSample> {
        *self.signals.borrow()
    }

    pub fn subscribe_signals(&self) -> watch::Receiver<Option<SignalSample>> {
        self.signals.clone()
    }

    /// Pull the stored calibration. Stored points replace the session set and
    /// stored parameters override the fit; on failure the session is left as it was.
    pub async fn load(&self) -> Result<SessionSnapshot, BackendError> {
        let stored = self.store.load_calibration().await?;
        let mut state = self.state.write().await;

        if stored.calibration_points.is_empty() {
            tracing::info!("Backend returned no calibration points, keeping current set");
        } else {
            tracing::info!(
                "Loaded {} calibration points from backend",
                stored.calibration_points.len()
            );
            state.session.replace(stored.calibration_points);
        }

        // Each stored parameter wins on its own; a missing one comes from the fit.
        let fitted = state.session.model();
        state.active = match (stored.slope, stored.intercept) {
            (None, None) => fitted,
            (slope, intercept) => LinearModel::with_parameters(
                slope.unwrap_or(fitted.slope),
                intercept.unwrap_or(fitted.intercept),
                state.session.points(),
            ),
        };

        Ok(self.snapshot_of(&state))
    }

    /// Fit the current points, persist them together with the fit and make
    /// the fit the active model.
    pub async fn save(&self) -> Result<SaveOutcome, BackendError> {
        let (points, model) = {
            let state = self.state.read().await;
            let points = state.session.points().to_vec();
            let model = fit(&points);
            (points, model)
        };

        let message = self
            .store
            .save_calibration(&points, model.slope, model.intercept)
            .await?;

        // Activate what was saved, even if points moved while the request was in flight.
        self.state.write().await.active = model;
        tracing::info!(
            slope = model.slope,
            intercept = model.intercept,
            r_squared = model.r_squared,
            "Calibration saved"
        );

        Ok(SaveOutcome { message, model })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        self.snapshot_of(&state)
    }

    pub async fn active_model(&self) -> LinearModel {
        self.state.read().await.active
    }

    pub async fn arm(&self, index: usize) -> Result<SessionSnapshot, CalibrationError> {
        self.mutate(|session| session.arm(index)).await
    }

    pub async fn disarm(&self) -> SessionSnapshot {
        let mut state = self.state.write().await;
        state.session.disarm();
        self.snapshot_of(&state)
    }

    /// Write the latest live signal into the armed point.
    pub async fn capture_latest(&self) -> Result<SessionSnapshot, CalibrationError> {
        let sample = self.latest_signal().ok_or(CalibrationError::NoSignal)?;
        self.mutate(|session| {
            let index = session.capture(sample.signal_us)?;
            tracing::debug!(index, signal_us = sample.signal_us, "Captured calibration signal");
            Ok(())
        })
        .await
    }

    pub async fn set_point_signal(
        &self,
        index: usize,
        signal: f64,
    ) -> Result<SessionSnapshot, CalibrationError> {
        self.mutate(|session| session.set_signal(index, signal)).await
    }

    pub async fn add_point(&self, point: CalibrationPoint) -> SessionSnapshot {
        let mut state = self.state.write().await;
        state.session.add_point(point);
        self.snapshot_of(&state)
    }

    pub async fn remove_point(&self, index: usize) -> Result<SessionSnapshot, CalibrationError> {
        self.mutate(|session| session.remove_point(index).map(|_| ())).await
    }

    /// Convert a sample with the active model.
    pub async fn level_for(&self, sample: &SignalSample) -> LevelReading {
        let active = self.active_model().await;
        LevelReading::from_sample(sample, &active, &self.range)
    }

    pub async fn latest_level(&self) -> Result<LevelReading, CalibrationError> {
        let sample = self.latest_signal().ok_or(CalibrationError::NoSignal)?;
        Ok(self.level_for(&sample).await)
    }

    async fn mutate<F>(&self, op: F) -> Result<SessionSnapshot, CalibrationError>
    where
        F: FnOnce(&mut CalibrationSession) -> Result<(), CalibrationError>,
    {
        let mut state = self.state.write().await;
        op(&mut state.session)?;
        Ok(self.snapshot_of(&state))
    }

    fn snapshot_of(&self, state: &CalibrationState) -> SessionSnapshot {
        SessionSnapshot {
            points: state.session.points().to_vec(),
            armed: state.session.armed(),
            model: state.session.model(),
            active_model: state.active,
            latest_signal: self.latest_signal(),
        }
    }
}
