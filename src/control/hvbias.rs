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

use log::{error, info, warn};
use regex::Regex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::ccs::channel::ChannelKind;
use crate::ccs::client::Subsystem;
use crate::constants::{
    HVBIAS_CONFIG_MAX, HVBIAS_CURRENT_MAX, HVBIAS_DAC_MIN, HVBIAS_INITIAL_STEP, HVBIAS_MAX_STEP,
    HVBIAS_VOLTS_MAX, VOLTS_PER_STEP_DEFAULT,
};
use crate::control::gain_estimator::{dac_steps, GainEstimator};
use crate::enums::RebPowerState;
use crate::utility::{get_parameter, get_parameter_array, pace, sleep_with_stop, timestamp};

// Science rafts carry three REBs, corner rafts a guider and a wavefront REB.
const SCIENCE_REB_PATTERN: &str = r"^R../Reb[012]$";
const CORNER_REB_PATTERN: &str = r"^R../Reb[GW]$";

pub struct HvBiasSettings {
    pub science_setpoint: f64,
    pub corner_setpoint: f64,
    // REBs with a special setpoint, checked before the raft-type defaults.
    pub exceptions: Vec<(String, f64)>,
    // Only REBs matching this pattern are driven.
    pub enabled_pattern: String,
    pub cadence: f64,
    pub min_delay: f64,
    // Pause between the per-REB actions in seconds.
    pub settle: f64,
    pub dac_min: i32,
    pub max_step: i32,
    pub initial_step: i32,
    pub volts_max: f64,
    pub config_max: i32,
    pub current_max: f64,
    pub initial_gain: f64,
}

impl HvBiasSettings {
    /// Create the default settings.
    ///
    /// # Returns
    /// New settings.
    pub fn new() -> Self {
        Self {
            science_setpoint: 50.0,
            corner_setpoint: 30.0,
            exceptions: vec![(String::from("R01/Reb0"), 30.0)],
            enabled_pattern: String::from(r"^R(43|33)/Reb[012]$"),
            cadence: 20.0,
            min_delay: 10.0,
            settle: 0.05,
            dac_min: HVBIAS_DAC_MIN,
            max_step: HVBIAS_MAX_STEP,
            initial_step: HVBIAS_INITIAL_STEP,
            volts_max: HVBIAS_VOLTS_MAX,
            config_max: HVBIAS_CONFIG_MAX,
            current_max: HVBIAS_CURRENT_MAX,
            initial_gain: VOLTS_PER_STEP_DEFAULT,
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
        let exception_rebs: Vec<String> = get_parameter_array(filepath, "exception_rebs");
        let exception_setpoints: Vec<f64> = get_parameter_array(filepath, "exception_setpoints");

        assert!(
            exception_rebs.len() == exception_setpoints.len(),
            "exception_rebs and exception_setpoints should have the same length."
        );

        Self {
            science_setpoint: get_parameter(filepath, "science_setpoint"),
            corner_setpoint: get_parameter(filepath, "corner_setpoint"),
            exceptions: exception_rebs.into_iter().zip(exception_setpoints).collect(),
            enabled_pattern: get_parameter(filepath, "enabled_pattern"),
            cadence: get_parameter(filepath, "cadence"),
            min_delay: get_parameter(filepath, "min_delay"),
            settle: get_parameter(filepath, "settle"),
            dac_min: get_parameter(filepath, "dac_min"),
            max_step: get_parameter(filepath, "max_step"),
            initial_step: get_parameter(filepath, "initial_step"),
            volts_max: get_parameter(filepath, "volts_max"),
            config_max: get_parameter(filepath, "config_max"),
            current_max: get_parameter(filepath, "current_max"),
            initial_gain: get_parameter(filepath, "initial_gain"),
        }
    }
}

/// Control record of one REB HV bias channel.
pub struct HvBiasChannel {
    pub name: String,
    pub is_on: bool,
    pub enabled: bool,
    pub setpoint: f64,
    pub config_dac: i32,
    pub volts: f64,
    pub last_volts: f64,
    pub current: f64,
    pub dac: i32,
    pub last_dac: i32,
    pub gain: GainEstimator,
}

pub struct HvBiasController {
    _settings: HvBiasSettings,
    _enabled: Regex,
    _science: Regex,
    _corner: Regex,
    pub channels: Vec<HvBiasChannel>,
}

impl HvBiasController {
    /// HV bias DAC controller: walks the powered, enabled REBs each cycle and
    /// steps their DAC toward the voltage setpoint with the adaptive gain.
    ///
    /// # Arguments
    /// * `settings` - Loop settings.
    ///
    /// # Returns
    /// A new controller.
    pub fn new(settings: HvBiasSettings) -> Self {
        let enabled = Regex::new(&settings.enabled_pattern)
            .expect("The enabled pattern should be a valid regular expression");

        Self {
            _settings: settings,
            _enabled: enabled,
            _science: Regex::new(SCIENCE_REB_PATTERN).expect("Pattern should compile"),
            _corner: Regex::new(CORNER_REB_PATTERN).expect("Pattern should compile"),
            channels: Vec::new(),
        }
    }

    /// Discover the REB components and create their control records.
    ///
    /// # Arguments
    /// * `rebpower` - REB power subsystem.
    pub fn initialize(&mut self, rebpower: &mut dyn Subsystem) {
        let state = rebpower.get_state();

        self.channels = state
            .components()
            .iter()
            .filter(|name| self._science.is_match(name) || self._corner.is_match(name))
            .map(|name| HvBiasChannel {
                name: name.clone(),
                is_on: false,
                enabled: false,
                setpoint: self.select_setpoint(name),
                config_dac: 0,
                volts: 0.0,
                last_volts: 0.0,
                current: 0.0,
                dac: 0,
                last_dac: 0,
                gain: GainEstimator::new(self._settings.initial_gain),
            })
            .collect();

        info!("Driving the HV bias of {} REBs.", self.channels.len());
    }

    /// Select the voltage setpoint of a REB.
    ///
    /// # Arguments
    /// * `name` - REB name.
    ///
    /// # Returns
    /// The setpoint. Exceptions take precedence over the raft-type defaults.
    fn select_setpoint(&self, name: &str) -> f64 {
        if let Some((_, setpoint)) = self
            ._settings
            .exceptions
            .iter()
            .find(|(reb, _)| reb == name)
        {
            return *setpoint;
        }

        if self._science.is_match(name) {
            self._settings.science_setpoint
        } else if self._corner.is_match(name) {
            self._settings.corner_setpoint
        } else {
            warn!("No setpoint rule for {name}.");
            0.0
        }
    }

    /// Run one polling cycle: refresh every control record, then step the
    /// DACs and apply the submitted changes as one batch.
    ///
    /// # Arguments
    /// * `rebpower` - REB power subsystem.
    ///
    /// # Returns
    /// Number of submitted changes.
    pub fn update_cycle(&mut self, rebpower: &mut dyn Subsystem) -> u32 {
        let state = rebpower.get_state();

        // Refresh pass.
        for channel in self.channels.iter_mut() {
            channel.is_on = state
                .component_state(&channel.name)
                .map(|component| component.reb_power == RebPowerState::On)
                .unwrap_or(false);
            channel.enabled = self._enabled.is_match(&channel.name);

            match rebpower
                .get_config_value(&channel.name, "hvBias")
                .and_then(|value| value.parse::<i32>().ok())
            {
                Some(config_dac) => {
                    if (config_dac < 0) || (config_dac > self._settings.config_max) {
                        warn!(
                            "hvBias configuration {} of {} is out of the allowed range 0--{}.",
                            config_dac, channel.name, self._settings.config_max
                        );
                    }
                    channel.config_dac = config_dac;
                }
                None => {
                    warn!("No hvBias configuration for {}.", channel.name);
                    continue;
                }
            }

            channel.last_volts = channel.volts;
            if let Some(volts) =
                rebpower.read_channel_value(&channel.name, ChannelKind::HvBiasVoltage)
            {
                if (volts < 0.0) || (volts > self._settings.volts_max) {
                    warn!(
                        "HV bias voltage {} of {} is out of the allowed range 0--{}.",
                        volts, channel.name, self._settings.volts_max
                    );
                }
                channel.volts = volts;
            }

            if let Some(current) =
                rebpower.read_channel_value(&channel.name, ChannelKind::HvBiasCurrent)
            {
                if (current < 0.0) || (current > self._settings.current_max) {
                    warn!(
                        "HV bias current {} of {} is out of the allowed range 0--{}.",
                        current, channel.name, self._settings.current_max
                    );
                }
                channel.current = current;
            }

            channel.last_dac = channel.dac;
            if let Some(dac) = rebpower.read_hvbias_dac(&channel.name) {
                channel.dac = dac;
            }

            // A fresh record has no usable last DAC to derive a gain from.
            if channel.last_dac != 0 {
                channel
                    .gain
                    .observe(channel.volts - channel.last_volts, channel.dac - channel.last_dac);
            }
        }

        // Step pass.
        let mut changes = 0;
        for channel in &self.channels {
            if let Some(new_dac) = plan_change(channel, &self._settings) {
                if new_dac == self._settings.dac_min {
                    println!(
                        "{}: Configure dac to min={}",
                        channel.name, self._settings.dac_min
                    );
                } else {
                    println!(
                        "{}: hvBias {:>4}->{:>4} steps={:>3} for delta={:>7.3} \
                         volts/step={:>5.3} volts={:>6.3}",
                        channel.name,
                        channel.dac,
                        new_dac,
                        new_dac - channel.dac,
                        channel.setpoint - channel.volts,
                        channel.gain.volts_per_step(),
                        channel.volts
                    );
                }

                rebpower.submit_change(&channel.name, "hvBias", &new_dac.to_string());
                changes += 1;
            }

            sleep(Duration::from_secs_f64(self._settings.settle));
        }

        // The staged changes take effect as one batch.
        if changes > 0 {
            rebpower.apply_submitted_changes();
        }

        changes
    }

    /// Run the endless control loop, paced to the configured cadence.
    ///
    /// # Arguments
    /// * `rebpower` - REB power subsystem.
    /// * `stop` - Stop flag set by the signal handler.
    pub fn run(&mut self, rebpower: &mut dyn Subsystem, stop: &Arc<AtomicBool>) {
        self.initialize(rebpower);

        while !stop.load(Ordering::Relaxed) {
            let start = Instant::now();
            let changes = self.update_cycle(rebpower);

            let elapsed = start.elapsed().as_secs_f64();
            if changes > 0 {
                println!(
                    "loop_time={elapsed:.3} change_count={changes} at {}",
                    timestamp()
                );
            }

            let pause = pace(self._settings.cadence, elapsed, self._settings.min_delay);
            sleep_with_stop(pause, stop);
        }

        info!("Stopping the HV bias drive loop.");
    }
}

/// Plan the DAC change of one REB for this cycle.
///
/// # Arguments
/// * `channel` - Control record of the REB.
/// * `settings` - Loop settings.
///
/// # Returns
/// The new DAC setting to submit, or None when the REB holds.
pub fn plan_change(channel: &HvBiasChannel, settings: &HvBiasSettings) -> Option<i32> {
    if !(channel.is_on && channel.enabled) {
        return None;
    }

    // A mismatch means a configuration change is still in flight or someone
    // else is driving this REB.
    if channel.config_dac != channel.dac {
        error!(
            "{}: hvbias config {} != dac {}, skipping.",
            channel.name, channel.config_dac, channel.dac
        );
        return None;
    }

    if channel.dac < settings.dac_min {
        return Some(settings.dac_min);
    }

    let steps = dac_steps(
        channel.setpoint,
        channel.volts,
        channel.gain.volts_per_step(),
        settings.max_step,
    );
    if steps == 0 {
        return None;
    }

    let mut new_dac = channel.dac + steps;
    if new_dac < settings.dac_min + settings.max_step {
        new_dac = channel.dac + settings.initial_step;
    }

    Some(new_dac)
}
