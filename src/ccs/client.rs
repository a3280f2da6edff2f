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

use log::{error, info};

use crate::ccs::channel::ChannelKind;
use crate::ccs::state::StateBundle;
use crate::enums::ReadoutMode;
use crate::mock::mock_subsystem::MockSubsystem;

/// Client to one named subsystem of the lab control system. The control
/// system itself is an external service; this trait is the boundary the
/// tools talk through, and the simulation implements it in-process.
pub trait Subsystem {
    /// Get the agent name of the subsystem.
    ///
    /// # Returns
    /// Agent name.
    fn agent_name(&self) -> String;

    /// Query the state bundle.
    ///
    /// # Returns
    /// The state bundle.
    fn get_state(&mut self) -> StateBundle;

    /// Read a telemetry channel of a component.
    ///
    /// # Arguments
    /// * `component` - Component name.
    /// * `channel` - Channel to read.
    ///
    /// # Returns
    /// The value, or None when the channel does not exist.
    fn read_channel_value(&mut self, component: &str, channel: ChannelKind) -> Option<f64>;

    /// Read a configuration parameter of a component.
    ///
    /// # Arguments
    /// * `component` - Component name (or configuration group).
    /// * `key` - Parameter key.
    ///
    /// # Returns
    /// The value, or None when the parameter does not exist.
    fn get_config_value(&mut self, component: &str, key: &str) -> Option<String>;

    /// Stage a configuration change. Staged changes take effect only after
    /// `apply_submitted_changes`.
    ///
    /// # Arguments
    /// * `component` - Component name (or configuration group).
    /// * `key` - Parameter key.
    /// * `value` - New value.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn submit_change(&mut self, component: &str, key: &str, value: &str) -> Option<()>;

    /// Apply all staged configuration changes.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn apply_submitted_changes(&mut self) -> Option<()>;

    /// Set a valve position of a component.
    ///
    /// # Arguments
    /// * `component` - Component name.
    /// * `valve` - Valve name (e.g. "EEPR").
    /// * `fraction` - Position as a fraction in [0.0, 1.0].
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn set_valve_position(&mut self, component: &str, valve: &str, fraction: f64) -> Option<()>;

    /// Read the HV bias DAC setting of a component.
    ///
    /// # Arguments
    /// * `component` - Component name.
    ///
    /// # Returns
    /// The DAC setting, or None when the component is unknown.
    fn read_hvbias_dac(&mut self, component: &str) -> Option<i32>;

    /// Open the shutter.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn open_shutter(&mut self) -> Option<()>;

    /// Close the shutter.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn close_shutter(&mut self) -> Option<()>;

    /// Take one exposure through the shutter.
    ///
    /// # Arguments
    /// * `exposure_time` - Exposure time in seconds.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn take_exposure(&mut self, exposure_time: f64) -> Option<()>;

    /// Clear the CCDs.
    ///
    /// # Arguments
    /// * `count` - Number of clears.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn clear(&mut self, count: i32) -> Option<()>;

    /// Start an integration.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn start_integration(&mut self) -> Option<()>;

    /// End the integration.
    ///
    /// # Arguments
    /// * `mode` - Readout mode.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn end_integration(&mut self, mode: ReadoutMode) -> Option<()>;

    /// Shift rows on the focal plane during an integration.
    ///
    /// # Arguments
    /// * `rows` - Number of rows.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn shift_n_rows(&mut self, rows: i32) -> Option<()>;

    /// Block until the FITS files of the readout are written.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn wait_for_fits_files(&mut self) -> Option<()>;

    /// Power on a REB.
    ///
    /// # Arguments
    /// * `component` - Component name.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn power_rebs_on(&mut self, component: &str) -> Option<()>;

    /// Power off the CCDs of a REB.
    ///
    /// # Arguments
    /// * `component` - Component name.
    ///
    /// # Returns
    /// Some(()) on success. Otherwise, None.
    fn power_ccds_off(&mut self, component: &str) -> Option<()>;

    /// Move the filter autochanger to the handoff position at high velocity.
    ///
    /// # Returns
    /// True when the autochanger reads back at the handoff position.
    fn move_to_handoff(&mut self) -> bool;

    /// Move the filter autochanger to the approach-standby position at high
    /// velocity.
    ///
    /// # Returns
    /// True when the autochanger reads back at the approach-standby position.
    fn move_to_approach_standby(&mut self) -> bool;
}

/// Attach to a named subsystem.
///
/// # Notes
/// The live control system endpoint is host infrastructure that is not part
/// of this repository. In the simulation mode the returned client is backed
/// by the in-process simulator.
///
/// # Arguments
/// * `name` - Subsystem name (e.g. "refrig", "rebpower", "cam-shutter").
/// * `is_simulation_mode` - Use the in-process simulator.
///
/// # Returns
/// The client, or None when the attachment failed.
pub fn attach(name: &str, is_simulation_mode: bool) -> Option<Box<dyn Subsystem>> {
    if is_simulation_mode {
        info!("Attaching the simulated subsystem {name}.");
        return Some(Box::new(MockSubsystem::new(name)));
    }

    error!("Failed to attach the subsystem {name}: no live endpoint is available.");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach() {
        assert!(attach("refrig", true).is_some());
        assert!(attach("refrig", false).is_none());
    }

    #[test]
    fn test_attach_agent_name() {
        let mut subsystem = attach("rebpower", true).unwrap();

        assert_eq!(subsystem.agent_name(), "rebpower");
        let _ = subsystem.get_state();
    }
}
