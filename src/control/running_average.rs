pub struct RunningAverage {
    _factor: f64,
    _average: Option<f64>,
    _reset_pending: bool,
}

impl RunningAverage {
    /// Time-weighted running average of a sensor reading.
    ///
    /// # Notes
    /// Each update blends the new sample with weight 1/factor into the
    /// average. After an actuator change the smoothing is reset so the next
    /// sample replaces the average: the old readings no longer describe the
    /// new operating point.
    ///
    /// # Arguments
    /// * `factor` - Averaging factor (>= 1). A factor of 1 disables the
    ///   smoothing.
    ///
    /// # Returns
    /// A new running average.
    pub fn new(factor: f64) -> Self {
        Self {
            _factor: factor,
            _average: None,
            _reset_pending: false,
        }
    }

    /// Blend in a new sample.
    ///
    /// # Arguments
    /// * `sample` - New sample.
    ///
    /// # Returns
    /// The updated average.
    pub fn update(&mut self, sample: f64) -> f64 {
        let average = match self._average {
            Some(average) if !self._reset_pending => {
                sample / self._factor + average * (self._factor - 1.0) / self._factor
            }
            _ => sample,
        };

        self._average = Some(average);
        self._reset_pending = false;

        average
    }

    /// Reset the smoothing. The next sample replaces the average.
    pub fn reset(&mut self) {
        self._reset_pending = true;
    }

    /// Get the current average.
    ///
    /// # Returns
    /// The average, or None before the first sample.
    pub fn value(&self) -> Option<f64> {
        self._average
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_update() {
        let mut average = RunningAverage::new(3.0);

        // The first sample seeds the average.
        assert_relative_eq!(average.update(18.0), 18.0);

        // 21.0 / 3 + 18.0 * 2 / 3
        assert_relative_eq!(average.update(21.0), 19.0);
        assert_relative_eq!(average.value().unwrap(), 19.0);
    }

    #[test]
    fn test_reset() {
        let mut average = RunningAverage::new(3.0);
        average.update(18.0);
        average.update(21.0);

        average.reset();

        // The first sample after a reset replaces the average.
        assert_relative_eq!(average.update(30.0), 30.0);

        // The smoothing resumes afterwards.
        assert_relative_eq!(average.update(27.0), 29.0);
    }
}
