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

use crate::enums::StepCommand;

pub struct StepControl {
    _dead_band: f64,
}

impl StepControl {
    /// Dead-band step control: one unit step per polling cycle.
    ///
    /// # Notes
    /// When the measured value sits above the setpoint by more than the
    /// dead band, the actuator opens one unit; below, it closes one unit;
    /// inside the band it holds. The dead band is sized to roughly twice
    /// the sensor noise.
    ///
    /// # Arguments
    /// * `dead_band` - Dead-band threshold in the unit of the measurement.
    ///
    /// # Returns
    /// A new step control.
    pub fn new(dead_band: f64) -> Self {
        Self {
            _dead_band: dead_band,
        }
    }

    /// Decide the step of one polling cycle.
    ///
    /// # Arguments
    /// * `measured` - Measured (or smoothed) value.
    /// * `setpoint` - Setpoint.
    ///
    /// # Returns
    /// The step command.
    pub fn decide(&self, measured: f64, setpoint: f64) -> StepCommand {
        let delta = measured - setpoint;

        if delta > self._dead_band {
            StepCommand::Increase
        } else if delta < -self._dead_band {
            StepCommand::Decrease
        } else {
            StepCommand::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_step_control() -> StepControl {
        StepControl::new(0.3)
    }

    #[test]
    fn test_decide_increase() {
        let step_control = create_step_control();

        // One increment step, not more, for this cycle.
        assert_eq!(step_control.decide(20.3, 18.0), StepCommand::Increase);
        assert_eq!(step_control.decide(18.31, 18.0), StepCommand::Increase);
    }

    #[test]
    fn test_decide_decrease() {
        let step_control = create_step_control();

        assert_eq!(step_control.decide(15.0, 18.0), StepCommand::Decrease);
        assert_eq!(step_control.decide(17.69, 18.0), StepCommand::Decrease);
    }

    #[test]
    fn test_decide_hold() {
        let step_control = create_step_control();

        assert_eq!(step_control.decide(18.0, 18.0), StepCommand::Hold);
        assert_eq!(step_control.decide(18.3, 18.0), StepCommand::Hold);
        assert_eq!(step_control.decide(17.7, 18.0), StepCommand::Hold);
    }
}
