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

use log::{info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::ccs::channel::ChannelKind;
use crate::ccs::client::Subsystem;
use crate::constants::{EEPR_POSITION_MAX, EEPR_POSITION_MIN};
use crate::control::running_average::RunningAverage;
use crate::control::step_control::StepControl;
use crate::enums::StepCommand;
use crate::utility::{get_parameter, get_parameter_array, pace, sleep_with_stop, timestamp};

/// One refrigeration channel under EEPR valve control.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub name: String,
    pub setpoint: f64,
    pub readonly: bool,
}

pub struct EeprSettings {
    // Seconds between cycle starts.
    pub cadence: f64,
    // Floor for the pause when a cycle overruns the cadence.
    pub min_delay: f64,
    // Pressure dead band around the setpoint (about twice the sensor noise).
    pub dead_band: f64,
    // Time-averaging factor of the return pressure.
    pub averaging_factor: f64,
    pub position_min: i32,
    pub position_max: i32,
    pub channels: Vec<ChannelSpec>,
}

impl EeprSettings {
    /// Create the default settings.
    ///
    /// # Returns
    /// New settings.
    pub fn new() -> Self {
        Self {
            cadence: 120.0,
            min_delay: 60.0,
            dead_band: 0.3,
            averaging_factor: 3.0,
            position_min: EEPR_POSITION_MIN,
            position_max: EEPR_POSITION_MAX,
            channels: vec![
                ChannelSpec {
                    name: String::from("Cold1"),
                    setpoint: 18.0,
                    readonly: true,
                },
                ChannelSpec {
                    name: String::from("Cold2"),
                    setpoint: 20.0,
                    readonly: false,
                },
            ],
        }
    }

    /// Read the settings from a configuration file.
    ///
    /// # Arguments
    /// * `filepath` - Path to the configuration file.
    ///
    /// # Returns
    /// New settings.
    pub fn from_file(filepath: &Path) -> Self {
        let names: Vec<String> = get_parameter_array(filepath, "channels");
        let setpoints: Vec<f64> = get_parameter_array(filepath, "setpoints");
        let readonly: Vec<bool> = get_parameter_array(filepath, "readonly");

        assert!(
            (names.len() == setpoints.len()) && (names.len() == readonly.len()),
            "channels, setpoints and readonly should have the same length."
        );

        let channels = names
            .into_iter()
            .zip(setpoints)
            .zip(readonly)
            .map(|((name, setpoint), readonly)| ChannelSpec {
                name,
                setpoint,
                readonly,
            })
            .collect();

        Self {
            cadence: get_parameter(filepath, "cadence"),
            min_delay: get_parameter(filepath, "min_delay"),
            dead_band: get_parameter(filepath, "dead_band"),
            averaging_factor: get_parameter(filepath, "averaging_factor"),
            position_min: get_parameter(filepath, "position_min"),
            position_max: get_parameter(filepath, "position_max"),
            channels,
        }
    }
}

/// Control record of one channel, owned by the polling loop.
pub struct EeprChannel {
    pub name: String,
    pub setpoint: f64,
    pub return_pressure: f64,
    pub average: RunningAverage,
    pub position: i32,
    pub last_position: i32,
    // Once read-only, the loop keeps reporting but never writes again.
    // Set from the configuration, or latched when an operator override is
    // detected.
    pub readonly: bool,
}

pub struct EeprController {
    _settings: EeprSettings,
    _step_control: StepControl,
    pub channels: Vec<EeprChannel>,
}

impl EeprController {
    /// EEPR valve position controller: one unit of valve travel per cycle,
    /// driven by the smoothed return pressure.
    ///
    /// # Arguments
    /// * `settings` - Loop settings.
    ///
    /// # Returns
    /// A new controller.
    pub fn new(settings: EeprSettings) -> Self {
        let step_control = StepControl::new(settings.dead_band);

        Self {
            _settings: settings,
            _step_control: step_control,
            channels: Vec::new(),
        }
    }

    /// Read the initial pressure and valve position of every configured
    /// channel.
    ///
    /// # Arguments
    /// * `refrig` - Refrigeration subsystem (valves).
    /// * `hex` - Heat-exchanger subsystem (return pressures).
    pub fn initialize(&mut self, refrig: &mut dyn Subsystem, hex: &mut dyn Subsystem) {
        self.channels = self
            ._settings
            .channels
            .iter()
            .map(|spec| {
                let pressure = hex
                    .read_channel_value(&spec.name, ChannelKind::ReturnPressure)
                    .unwrap_or_else(|| {
                        warn!("No return pressure reading for {}.", spec.name);
                        0.0
                    });
                let position =
                    read_valve_position(refrig, &spec.name, &self._settings).unwrap_or_else(|| {
                        warn!("No valve position reading for {}.", spec.name);
                        0
                    });

                let mut average = RunningAverage::new(self._settings.averaging_factor);
                average.update(pressure);

                EeprChannel {
                    name: spec.name.clone(),
                    setpoint: spec.setpoint,
                    return_pressure: pressure,
                    average,
                    position,
                    last_position: position,
                    readonly: spec.readonly,
                }
            })
            .collect();

        for channel in &self.channels {
            println!(
                "{} {}: ReturnPrs = {:5.2} EEPRValvePosn = {:2}",
                timestamp(),
                channel.name,
                channel.return_pressure,
                channel.position
            );
        }
    }

    /// Run one polling cycle over every channel.
    ///
    /// # Arguments
    /// * `refrig` - Refrigeration subsystem.
    /// * `hex` - Heat-exchanger subsystem.
    ///
    /// # Returns
    /// Number of channels that wanted a valve change this cycle.
    pub fn update_cycle(&mut self, refrig: &mut dyn Subsystem, hex: &mut dyn Subsystem) -> u32 {
        let mut changes = 0;

        for channel in self.channels.iter_mut() {
            let pressure = match hex.read_channel_value(&channel.name, ChannelKind::ReturnPressure)
            {
                Some(pressure) => pressure,
                None => {
                    warn!("No return pressure reading for {}.", channel.name);
                    continue;
                }
            };

            channel.return_pressure = pressure;
            let smoothed = channel.average.update(pressure);

            channel.last_position = channel.position;
            match read_valve_position(refrig, &channel.name, &self._settings) {
                Some(position) => channel.position = position,
                None => {
                    warn!("No valve position reading for {}.", channel.name);
                    continue;
                }
            }

            if channel.position != channel.last_position {
                channel.readonly = true;
                warn!(
                    "EEPR setting of {} changed since last time, assuming operator \
                     override, setting to READONLY.",
                    channel.name
                );
            }

            // Pressure above the setpoint opens the valve; below closes it.
            let step = self._step_control.decide(smoothed, channel.setpoint);
            if step == StepCommand::Hold {
                continue;
            }

            let requested = channel.position + step.offset();
            if channel.readonly {
                println!(
                    "{} EEPR: {:2} --> {:2} (readonly, no change)",
                    channel.name, channel.position, requested
                );
            } else if (requested < self._settings.position_min)
                || (requested > self._settings.position_max)
            {
                warn!(
                    "Requested EEPR position {} of {} is out of the allowed range {}--{}, \
                     skipping.",
                    requested, channel.name, self._settings.position_min, self._settings.position_max
                );
            } else {
                println!(
                    "{} EEPR: {:2} --> {:2}",
                    channel.name, channel.position, requested
                );
                if refrig
                    .set_valve_position(&channel.name, "EEPR", (requested as f64) / 100.0)
                    .is_some()
                {
                    channel.position = requested;
                }
            }

            changes += 1;
        }

        changes
    }

    /// Run the endless control loop, paced to the configured cadence.
    ///
    /// # Arguments
    /// * `refrig` - Refrigeration subsystem.
    /// * `hex` - Heat-exchanger subsystem.
    /// * `stop` - Stop flag set by the signal handler.
    pub fn run(
        &mut self,
        refrig: &mut dyn Subsystem,
        hex: &mut dyn Subsystem,
        stop: &Arc<AtomicBool>,
    ) {
        self.initialize(refrig, hex);

        while !stop.load(Ordering::Relaxed) {
            let start = Instant::now();
            let changes = self.update_cycle(refrig, hex);

            let mut status = format!("{} (Chan,ReturnPrs,EEPR) = ", timestamp());
            for channel in &self.channels {
                status.push_str(&format!(
                    "({},{:5.2},{:2}) ",
                    channel.name,
                    channel.average.value().unwrap_or(channel.return_pressure),
                    channel.position
                ));
            }
            println!("{status}");

            // Any valve change invalidates the smoothing of the readings.
            if changes > 0 {
                for channel in self.channels.iter_mut() {
                    channel.average.reset();
                }
            }

            let pause = pace(
                self._settings.cadence,
                start.elapsed().as_secs_f64(),
                self._settings.min_delay,
            );
            sleep_with_stop(pause, stop);
        }

        info!("Stopping the EEPR control loop.");
    }
}

/// Read the EEPR valve position of a channel.
///
/// # Arguments
/// * `refrig` - Refrigeration subsystem.
/// * `name` - Channel name.
/// * `settings` - Loop settings with the allowed position range.
///
/// # Returns
/// The rounded position, or None when the reading is unavailable. An
/// out-of-range reading is reported but still returned.
fn read_valve_position(
    refrig: &mut dyn Subsystem,
    name: &str,
    settings: &EeprSettings,
) -> Option<i32> {
    let position = refrig.read_channel_value(name, ChannelKind::EeprValvePosition)?;

    if (position < settings.position_min as f64) || (position > settings.position_max as f64) {
        warn!(
            "EEPR position value {} of {} is out of the allowed range {}--{}.",
            position, name, settings.position_min, settings.position_max
        );
    }

    Some(position.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mock::mock_subsystem::MockSubsystem;

    fn create_subsystems() -> (MockSubsystem, MockSubsystem) {
        let mut refrig = MockSubsystem::new("refrig");
        let mut hex = MockSubsystem::new("hex");

        refrig.set_channel("Cold1", ChannelKind::EeprValvePosition, 40.0);
        refrig.set_channel("Cold2", ChannelKind::EeprValvePosition, 55.0);
        hex.set_channel("Cold1", ChannelKind::ReturnPressure, 18.0);
        hex.set_channel("Cold2", ChannelKind::ReturnPressure, 20.0);

        (refrig, hex)
    }

    fn create_controller() -> EeprController {
        let mut settings = EeprSettings::new();

        // Both channels writable for most tests.
        settings.channels[0].readonly = false;

        EeprController::new(settings)
    }

    #[test]
    fn test_initialize() {
        let (mut refrig, mut hex) = create_subsystems();
        let mut controller = create_controller();

        controller.initialize(&mut refrig, &mut hex);

        assert_eq!(controller.channels.len(), 2);
        assert_eq!(controller.channels[0].position, 40);
        assert_eq!(controller.channels[1].position, 55);
        assert!(!controller.channels[0].readonly);
    }

    #[test]
    fn test_update_cycle_single_increment() {
        let (mut refrig, mut hex) = create_subsystems();
        let mut controller = create_controller();
        controller.initialize(&mut refrig, &mut hex);

        // Pressure well above the setpoint commands exactly one unit step.
        hex.set_channel("Cold1", ChannelKind::ReturnPressure, 20.3);

        // The smoothed value needs to climb out of the dead band first.
        let changes = controller.update_cycle(&mut refrig, &mut hex);
        assert_eq!(changes, 1);

        assert_eq!(controller.channels[0].position, 41);
        assert_eq!(
            refrig.mutating_calls(),
            vec![String::from("set_valve_position(Cold1, EEPR, 0.41)")]
        );
    }

    #[test]
    fn test_update_cycle_decrement() {
        let (mut refrig, mut hex) = create_subsystems();
        let mut controller = create_controller();
        controller.initialize(&mut refrig, &mut hex);

        hex.set_channel("Cold2", ChannelKind::ReturnPressure, 18.0);

        // Factor 3 smoothing: avg = 18/3 + 20*2/3 = 19.33, delta -0.67.
        let changes = controller.update_cycle(&mut refrig, &mut hex);

        assert_eq!(changes, 1);
        assert_eq!(controller.channels[1].position, 54);
    }

    #[test]
    fn test_update_cycle_hold_inside_dead_band() {
        let (mut refrig, mut hex) = create_subsystems();
        let mut controller = create_controller();
        controller.initialize(&mut refrig, &mut hex);

        hex.set_channel("Cold1", ChannelKind::ReturnPressure, 18.2);
        hex.set_channel("Cold2", ChannelKind::ReturnPressure, 19.9);

        let changes = controller.update_cycle(&mut refrig, &mut hex);

        assert_eq!(changes, 0);
        assert!(refrig.mutating_calls().is_empty());
    }

    #[test]
    fn test_update_cycle_operator_override() {
        let (mut refrig, mut hex) = create_subsystems();
        let mut controller = create_controller();
        controller.initialize(&mut refrig, &mut hex);

        // Someone moved the valve between the cycles.
        refrig.set_channel("Cold1", ChannelKind::EeprValvePosition, 45.0);
        hex.set_channel("Cold1", ChannelKind::ReturnPressure, 25.0);

        controller.update_cycle(&mut refrig, &mut hex);

        assert!(controller.channels[0].readonly);
        assert!(refrig.mutating_calls().is_empty());

        // Still read-only on the following cycles: no writes ever again.
        controller.update_cycle(&mut refrig, &mut hex);
        assert!(refrig.mutating_calls().is_empty());
    }

    #[test]
    fn test_update_cycle_range_clamp() {
        let (mut refrig, mut hex) = create_subsystems();
        let mut controller = create_controller();

        refrig.set_channel("Cold1", ChannelKind::EeprValvePosition, 80.0);
        controller.initialize(&mut refrig, &mut hex);

        hex.set_channel("Cold1", ChannelKind::ReturnPressure, 25.0);

        // The requested position 81 is out of range: counted, not written.
        let changes = controller.update_cycle(&mut refrig, &mut hex);

        assert_eq!(changes, 1);
        assert_eq!(controller.channels[0].position, 80);
        assert!(refrig.mutating_calls().is_empty());
    }

    #[test]
    fn test_readonly_channel_never_writes() {
        let (mut refrig, mut hex) = create_subsystems();

        // Cold1 is configured read-only.
        let mut controller = EeprController::new(EeprSettings::new());
        controller.initialize(&mut refrig, &mut hex);

        hex.set_channel("Cold1", ChannelKind::ReturnPressure, 25.0);

        let changes = controller.update_cycle(&mut refrig, &mut hex);

        assert_eq!(changes, 1);
        assert!(refrig.mutating_calls().is_empty());
    }

    #[test]
    fn test_settings_from_file() {
        use std::io::Write;

        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("Should create the temporary file");
        writeln!(
            file,
            "cadence: \"120.0\"\n\
             min_delay: \"60.0\"\n\
             dead_band: \"0.3\"\n\
             averaging_factor: \"3.0\"\n\
             position_min: \"25\"\n\
             position_max: \"80\"\n\
             channels:\n  - \"Cold1\"\n  - \"Cold2\"\n\
             setpoints:\n  - \"18.0\"\n  - \"20.0\"\n\
             readonly:\n  - \"true\"\n  - \"false\""
        )
        .expect("Should write the temporary file");

        let settings = EeprSettings::from_file(file.path());

        assert_eq!(settings.channels.len(), 2);
        assert_eq!(settings.channels[0].name, "Cold1");
        assert!(settings.channels[0].readonly);
        assert_eq!(settings.channels[1].setpoint, 20.0);
        assert_eq!(settings.position_max, 80);
    }
}
