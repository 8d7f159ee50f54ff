// Calibration session - the in-memory point set a user is calibrating
use crate::domain::calibration::{
    default_points, fit, update_point, CalibrationError, CalibrationPoint, LinearModel,
};

/// Working set of calibration points with at most one point armed for capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSession {
    points: Vec<CalibrationPoint>,
    armed: Option<usize>,
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new(default_points())
    }
}

impl CalibrationSession {
    pub fn new(points: Vec<CalibrationPoint>) -> Self {
        Self {
            points,
            armed: None,
        }
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    pub fn armed(&self) -> Option<usize> {
        self.armed
    }

    pub fn model(&self) -> LinearModel {
        fit(&self.points)
    }

    /// Swap in a freshly loaded set. Indices may no longer mean the same point,
    /// so any armed point is released.
    pub fn replace(&mut self, points: Vec<CalibrationPoint>) {
        self.points = points;
        self.armed = None;
    }

    pub fn arm(&mut self, index: usize) -> Result<(), CalibrationError> {
        self.check_index(index)?;
        self.armed = Some(index);
        Ok(())
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// Overwrite the armed point's signal. Returns the index that changed.
    pub fn capture(&mut self, signal: f64) -> Result<usize, CalibrationError> {
        let index = self.armed.ok_or(CalibrationError::NothingArmed)?;
        self.set_signal(index, signal)?;
        Ok(index)
    }

    pub fn set_signal(&mut self, index: usize, signal: f64) -> Result<(), CalibrationError> {
        self.points = update_point(&self.points, index, signal)?;
        Ok(())
    }

    pub fn add_point(&mut self, point: CalibrationPoint) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    pub fn remove_point(&mut self, index: usize) -> Result<CalibrationPoint, CalibrationError> {
        self.check_index(index)?;
        let removed = self.points.remove(index);
        self.armed = match self.armed {
            Some(armed) if armed == index => None,
            Some(armed) if armed > index => Some(armed - 1),
            other => other,
        };
        Ok(removed)
    }

    fn check_index(&self, index: usize) -> Result<(), CalibrationError> {
        if index >= self.points.len() {
            return Err(CalibrationError::IndexOutOfRange {
                index,
                len: self.points.len(),
            });
        }
        Ok(())
    }
}
