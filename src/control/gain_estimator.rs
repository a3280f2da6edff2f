// This file is part of ts_teststand_tools.
//
// Developed for the Vera Rubin Observatory Systems.
// This product includes software developed by the LSST Project
// (https://www.lsst.org).
// See the COPYRIGHT file at the top-level directory of this distribution
// for details of code ownership.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::constants::{VOLTS_PER_STEP_FLOOR, VOLTS_PER_STEP_NOMINAL};

pub struct GainEstimator {
    _volts_per_step: f64,
}

impl GainEstimator {
    /// Adaptive estimate of the HV bias supply gain (volts per DAC step).
    ///
    /// # Notes
    /// Each observed gain is floored at 0.025 V/step before blending, so a
    /// noise-dominated observation cannot collapse the estimate and blow up
    /// the step computation. The blend keeps two thirds of the old estimate
    /// to damp the noise.
    ///
    /// # Arguments
    /// * `initial` - Initial volts-per-step estimate.
    ///
    /// # Returns
    /// A new gain estimator.
    pub fn new(initial: f64) -> Self {
        Self {
            _volts_per_step: initial,
        }
    }

    /// Get the current volts-per-step estimate.
    ///
    /// # Returns
    /// Volts per DAC step.
    pub fn volts_per_step(&self) -> f64 {
        self._volts_per_step
    }

    /// Blend in an observation from the last actuation.
    ///
    /// # Arguments
    /// * `delta_volts` - Voltage change since the last cycle.
    /// * `delta_dac` - DAC change since the last cycle. Ignored when zero.
    pub fn observe(&mut self, delta_volts: f64, delta_dac: i32) {
        if delta_dac == 0 {
            return;
        }

        let mut observed = delta_volts / (delta_dac as f64);
        if observed < VOLTS_PER_STEP_FLOOR {
            observed = VOLTS_PER_STEP_FLOOR;
        }

        self._volts_per_step = (2.0 * self._volts_per_step + observed) / 3.0;
    }
}

/// Compute the DAC steps toward the setpoint.
///
/// # Notes
/// The per-cycle step count is clamped to a magnitude that scales inversely
/// with the gain, so a hot supply moves by fewer counts per cycle.
///
/// # Arguments
/// * `setpoint` - Voltage setpoint.
/// * `volts` - Measured voltage.
/// * `volts_per_step` - Gain estimate.
/// * `max_step` - Step budget at the nominal gain.
///
/// # Returns
/// The signed DAC step count.
pub fn dac_steps(setpoint: f64, volts: f64, volts_per_step: f64, max_step: i32) -> i32 {
    let local_max = ((max_step as f64) / (volts_per_step / VOLTS_PER_STEP_NOMINAL)) as i32;
    let steps = ((setpoint - volts) / volts_per_step).round() as i32;

    steps.clamp(-local_max, local_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::constants::HVBIAS_MAX_STEP;

    #[test]
    fn test_observe() {
        let mut estimator = GainEstimator::new(0.125);

        // 1.0 V over 10 counts: observed gain 0.1.
        estimator.observe(1.0, 10);

        assert_relative_eq!(estimator.volts_per_step(), (2.0 * 0.125 + 0.1) / 3.0);
    }

    #[test]
    fn test_observe_floor() {
        let g0 = 0.125;
        let mut estimator = GainEstimator::new(g0);

        // The observed gain underflows the floor; the floor is blended
        // instead of the raw observation.
        estimator.observe(0.01, 10);

        assert_relative_eq!(estimator.volts_per_step(), (2.0 * g0 + 0.025) / 3.0);
    }

    #[test]
    fn test_observe_negative_gain_floored() {
        let g0 = 0.125;
        let mut estimator = GainEstimator::new(g0);

        // A backwards response is also floored.
        estimator.observe(-1.0, 10);

        assert_relative_eq!(estimator.volts_per_step(), (2.0 * g0 + 0.025) / 3.0);
    }

    #[test]
    fn test_observe_zero_delta_dac() {
        let mut estimator = GainEstimator::new(0.125);

        estimator.observe(1.0, 0);

        assert_relative_eq!(estimator.volts_per_step(), 0.125);
    }

    #[test]
    fn test_dac_steps() {
        // 10 V short at 0.125 V/step: 80 steps, clamped to 25/(0.125/0.04) = 8.
        assert_eq!(dac_steps(50.0, 40.0, 0.125, HVBIAS_MAX_STEP), 8);

        // Overshoot clamps on the other side.
        assert_eq!(dac_steps(40.0, 50.0, 0.125, HVBIAS_MAX_STEP), -8);

        // Close to the setpoint the count comes straight from the division.
        assert_eq!(dac_steps(50.0, 49.5, 0.125, HVBIAS_MAX_STEP), 4);
        assert_eq!(dac_steps(50.0, 50.0, 0.125, HVBIAS_MAX_STEP), 0);

        // At the nominal gain the full budget is available.
        assert_eq!(dac_steps(50.0, 40.0, 0.04, HVBIAS_MAX_STEP), 25);
    }
}
