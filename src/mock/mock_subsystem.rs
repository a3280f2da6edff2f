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

use std::collections::HashMap;

use crate::ccs::channel::ChannelKind;
use crate::ccs::client::Subsystem;
use crate::ccs::state::{ComponentState, StateBundle};
use crate::enums::{CcdsPowerState, ReadoutMode, RebPowerState};

// Calls that change hardware or configuration state.
const MUTATING_CALLS: &[&str] = &[
    "submit_change",
    "apply_submitted_changes",
    "set_valve_position",
    "open_shutter",
    "close_shutter",
    "take_exposure",
    "clear",
    "start_integration",
    "end_integration",
    "shift_n_rows",
    "power_rebs_on",
    "power_ccds_off",
    "move_to_handoff",
    "move_to_approach_standby",
];

/// In-memory subsystem standing in for the lab control system. Configuration
/// changes are staged by `submit_change` and only become visible after
/// `apply_submitted_changes`, like the real two-phase protocol.
pub struct MockSubsystem {
    _name: String,
    pub state: StateBundle,
    _channels: HashMap<String, f64>,
    _config: HashMap<String, String>,
    _submitted: Vec<(String, String, String)>,
    _hvbias_dac: HashMap<String, i32>,
    // Voltage response of the simulated HV bias supply per DAC count.
    _plant_gain: f64,
    // When set, the simulated autochanger misses its target position.
    _autochanger_stuck: bool,
    pub call_log: Vec<String>,
}

impl MockSubsystem {
    /// Create a new mock subsystem.
    ///
    /// # Arguments
    /// * `name` - Subsystem name.
    ///
    /// # Returns
    /// A new mock subsystem.
    pub fn new(name: &str) -> Self {
        Self {
            _name: String::from(name),
            state: StateBundle::new(),
            _channels: HashMap::new(),
            _config: HashMap::new(),
            _submitted: Vec::new(),
            _hvbias_dac: HashMap::new(),
            _plant_gain: 0.1,
            _autochanger_stuck: false,
            call_log: Vec::new(),
        }
    }

    /// Add a component with its state.
    ///
    /// # Arguments
    /// * `name` - Component name.
    /// * `state` - Component state.
    pub fn add_component(&mut self, name: &str, state: ComponentState) {
        self.state.set_component_state(name, state);
    }

    /// Set a telemetry channel value.
    ///
    /// # Arguments
    /// * `component` - Component name.
    /// * `channel` - Channel.
    /// * `value` - Value.
    pub fn set_channel(&mut self, component: &str, channel: ChannelKind, value: f64) {
        self._channels.insert(channel.path(component), value);
    }

    /// Set a configuration parameter.
    ///
    /// # Arguments
    /// * `component` - Component name (or configuration group).
    /// * `key` - Parameter key.
    /// * `value` - Value.
    pub fn set_config(&mut self, component: &str, key: &str, value: &str) {
        self._config
            .insert(format!("{component}:{key}"), String::from(value));
    }

    /// Set the HV bias DAC of a component, keeping the "hvBias" configuration
    /// parameter consistent with it.
    ///
    /// # Arguments
    /// * `component` - Component name.
    /// * `value` - DAC setting.
    pub fn set_dac(&mut self, component: &str, value: i32) {
        self._hvbias_dac.insert(String::from(component), value);
        self.set_config(component, "hvBias", &value.to_string());
    }

    /// Set the voltage response of the simulated HV bias supply.
    ///
    /// # Arguments
    /// * `gain` - Volts per DAC count.
    pub fn set_plant_gain(&mut self, gain: f64) {
        self._plant_gain = gain;
    }

    /// Make the simulated autochanger miss its target position.
    ///
    /// # Arguments
    /// * `stuck` - The autochanger is stuck or not.
    pub fn set_autochanger_stuck(&mut self, stuck: bool) {
        self._autochanger_stuck = stuck;
    }

    /// Get the mutating calls that were issued.
    ///
    /// # Returns
    /// The log entries of hardware- or configuration-changing calls.
    pub fn mutating_calls(&self) -> Vec<String> {
        self.call_log
            .iter()
            .filter(|entry| MUTATING_CALLS.iter().any(|call| entry.starts_with(call)))
            .cloned()
            .collect()
    }

    fn log(&mut self, entry: String) {
        self.call_log.push(entry);
    }
}

impl Subsystem for MockSubsystem {
    fn agent_name(&self) -> String {
        self._name.clone()
    }

    fn get_state(&mut self) -> StateBundle {
        self.log(String::from("get_state"));
        self.state.clone()
    }

    fn read_channel_value(&mut self, component: &str, channel: ChannelKind) -> Option<f64> {
        let path = channel.path(component);
        self.log(format!("read_channel_value({path})"));

        self._channels.get(&path).copied()
    }

    fn get_config_value(&mut self, component: &str, key: &str) -> Option<String> {
        self.log(format!("get_config_value({component}, {key})"));

        self._config.get(&format!("{component}:{key}")).cloned()
    }

    fn submit_change(&mut self, component: &str, key: &str, value: &str) -> Option<()> {
        self.log(format!("submit_change({component}, {key}, {value})"));

        self._submitted.push((
            String::from(component),
            String::from(key),
            String::from(value),
        ));

        Some(())
    }

    fn apply_submitted_changes(&mut self) -> Option<()> {
        self.log(String::from("apply_submitted_changes"));

        let submitted = std::mem::take(&mut self._submitted);
        for (component, key, value) in submitted {
            self._config
                .insert(format!("{component}:{key}"), value.clone());

            // The simulated supply follows an applied DAC change.
            if key == "hvBias" {
                if let Ok(dac) = value.parse::<i32>() {
                    let last = self._hvbias_dac.insert(component.clone(), dac).unwrap_or(dac);
                    let path = ChannelKind::HvBiasVoltage.path(&component);
                    let volts = self._channels.get(&path).copied().unwrap_or(0.0);
                    self._channels
                        .insert(path, volts + self._plant_gain * ((dac - last) as f64));
                }
            }
        }

        Some(())
    }

    fn set_valve_position(&mut self, component: &str, valve: &str, fraction: f64) -> Option<()> {
        self.log(format!("set_valve_position({component}, {valve}, {fraction})"));

        // The position reads back on the 0-100 scale.
        self._channels
            .insert(ChannelKind::EeprValvePosition.path(component), fraction * 100.0);

        Some(())
    }

    fn read_hvbias_dac(&mut self, component: &str) -> Option<i32> {
        self.log(format!("read_hvbias_dac({component})"));

        self._hvbias_dac.get(component).copied()
    }

    fn open_shutter(&mut self) -> Option<()> {
        self.log(String::from("open_shutter"));
        Some(())
    }

    fn close_shutter(&mut self) -> Option<()> {
        self.log(String::from("close_shutter"));
        Some(())
    }

    fn take_exposure(&mut self, exposure_time: f64) -> Option<()> {
        self.log(format!("take_exposure({exposure_time})"));
        Some(())
    }

    fn clear(&mut self, count: i32) -> Option<()> {
        self.log(format!("clear({count})"));
        Some(())
    }

    fn start_integration(&mut self) -> Option<()> {
        self.log(String::from("start_integration"));
        Some(())
    }

    fn end_integration(&mut self, mode: ReadoutMode) -> Option<()> {
        self.log(format!("end_integration({})", mode.as_ref()));
        Some(())
    }

    fn shift_n_rows(&mut self, rows: i32) -> Option<()> {
        self.log(format!("shift_n_rows({rows})"));
        Some(())
    }

    fn wait_for_fits_files(&mut self) -> Option<()> {
        self.log(String::from("wait_for_fits_files"));
        Some(())
    }

    fn power_rebs_on(&mut self, component: &str) -> Option<()> {
        self.log(format!("power_rebs_on({component})"));

        self.state.update_component_state(component, |state| {
            state.reb_power = RebPowerState::On;
        });

        Some(())
    }

    fn power_ccds_off(&mut self, component: &str) -> Option<()> {
        self.log(format!("power_ccds_off({component})"));

        self.state.update_component_state(component, |state| {
            state.ccds_power = CcdsPowerState::Off;
        });

        Some(())
    }

    fn move_to_handoff(&mut self) -> bool {
        self.log(String::from("move_to_handoff"));
        !self._autochanger_stuck
    }

    fn move_to_approach_standby(&mut self) -> bool {
        self.log(String::from("move_to_approach_standby"));
        !self._autochanger_stuck
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_mock_subsystem() -> MockSubsystem {
        let mut mock = MockSubsystem::new("rebpower");
        mock.add_component("R22/Reb0", ComponentState::new());
        mock.set_channel("R22/Reb0", ChannelKind::HvBiasVoltage, 40.0);
        mock.set_dac("R22/Reb0", 2000);

        mock
    }

    #[test]
    fn test_two_phase_commit() {
        let mut mock = create_mock_subsystem();

        mock.submit_change("R22/Reb0", "hvBias", "2010");

        // Staged but not applied: reads still see the old values.
        assert_eq!(
            mock.get_config_value("R22/Reb0", "hvBias"),
            Some(String::from("2000"))
        );
        assert_eq!(mock.read_hvbias_dac("R22/Reb0"), Some(2000));

        mock.apply_submitted_changes();

        assert_eq!(
            mock.get_config_value("R22/Reb0", "hvBias"),
            Some(String::from("2010"))
        );
        assert_eq!(mock.read_hvbias_dac("R22/Reb0"), Some(2010));

        // The simulated supply followed the DAC change.
        assert_relative_eq!(
            mock.read_channel_value("R22/Reb0", ChannelKind::HvBiasVoltage)
                .unwrap(),
            41.0
        );
    }

    #[test]
    fn test_set_valve_position() {
        let mut mock = MockSubsystem::new("refrig");

        mock.set_valve_position("Cold1", "EEPR", 0.41);

        assert_relative_eq!(
            mock.read_channel_value("Cold1", ChannelKind::EeprValvePosition)
                .unwrap(),
            41.0
        );
    }

    #[test]
    fn test_power_actions_update_state() {
        let mut mock = create_mock_subsystem();

        mock.power_rebs_on("R22/Reb0");
        assert_eq!(
            mock.get_state().component_state("R22/Reb0").unwrap().reb_power,
            RebPowerState::On
        );

        mock.power_ccds_off("R22/Reb0");
        assert_eq!(
            mock.get_state()
                .component_state("R22/Reb0")
                .unwrap()
                .ccds_power,
            CcdsPowerState::Off
        );
    }

    #[test]
    fn test_mutating_calls() {
        let mut mock = create_mock_subsystem();

        let _ = mock.get_state();
        let _ = mock.read_channel_value("R22/Reb0", ChannelKind::HvBiasVoltage);

        assert!(mock.mutating_calls().is_empty());

        mock.submit_change("R22/Reb0", "hvBias", "2010");
        mock.apply_submitted_changes();

        assert_eq!(mock.mutating_calls().len(), 2);
    }
}
