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

use log::{error, warn};

use crate::ccs::state::StateBundle;
use crate::enums::{
    AlertState, CcdsPowerState, CommandState, ConfigurationState, FocalPlaneState, HvBiasState,
    RebDeviceState, RebValidationState,
};

/// Which axes the precondition gate of a tool checks beyond the always-on
/// command and configuration checks.
#[derive(Debug, Clone, Copy)]
pub struct GateRequirements {
    pub sequencer_idle: bool,
    pub focal_plane_quiescent: bool,
    pub components_ready: bool,
}

impl GateRequirements {
    /// Requirements of the shutter and power tools: subsystem-level checks
    /// plus the per-component checks.
    ///
    /// # Returns
    /// The gate requirements.
    pub fn subsystem_and_components() -> Self {
        Self {
            sequencer_idle: false,
            focal_plane_quiescent: false,
            components_ready: true,
        }
    }

    /// Requirements of the row-shift exposure tool: everything, including the
    /// sequencer and focal-plane axes.
    ///
    /// # Returns
    /// The gate requirements.
    pub fn full() -> Self {
        Self {
            sequencer_idle: true,
            focal_plane_quiescent: true,
            components_ready: true,
        }
    }

    /// Requirements of the plain shutter exposure tool: subsystem-level
    /// checks only.
    ///
    /// # Returns
    /// The gate requirements.
    pub fn subsystem_only() -> Self {
        Self {
            sequencer_idle: false,
            focal_plane_quiescent: false,
            components_ready: false,
        }
    }
}

/// Check the preconditions before any hardware action. All-or-nothing: the
/// first failing axis aborts the check; nothing is mutated by the check
/// itself.
///
/// # Arguments
/// * `agent` - Agent name of the subsystem, used in the messages.
/// * `state` - State bundle to check.
/// * `requirements` - Which optional axes to check.
///
/// # Returns
/// True if every checked axis satisfies its precondition.
pub fn check_preconditions(
    agent: &str,
    state: &StateBundle,
    requirements: &GateRequirements,
) -> bool {
    // An alert is reported but does not block the operator tools.
    if state.alert != AlertState::Nominal {
        warn!("{} is in AlertState {}.", agent, state.alert.as_ref());
    }

    if state.command != CommandState::Ready {
        error!("{} is not in READY CommandState.", agent);
        return false;
    }

    if state.configuration == ConfigurationState::Unconfigured {
        error!("{} is in UNCONFIGURED state.", agent);
        return false;
    }

    if requirements.sequencer_idle && !state.sequencer.is_idle() {
        error!("{} sequencer is not in an IDLE state.", agent);
        return false;
    }

    if requirements.focal_plane_quiescent && (state.focal_plane != FocalPlaneState::Quiescent) {
        error!("{} is not in QUIESCENT state.", agent);
        return false;
    }

    if requirements.components_ready {
        for name in state.components() {
            if let Some(component) = state.component_state(&name) {
                if component.device == RebDeviceState::Offline {
                    error!("{}/{} RebDeviceState is OFFLINE.", agent, name);
                    return false;
                }
                if component.validation != RebValidationState::Valid {
                    error!("{}/{} RebValidationState is not VALID.", agent, name);
                    return false;
                }
                if component.ccds_power == CcdsPowerState::Unknown {
                    error!("{}/{} CCDsPowerState is UNKNOWN.", agent, name);
                    return false;
                }
                if component.hv_bias == HvBiasState::Unknown {
                    error!("{}/{} HVBiasState is UNKNOWN.", agent, name);
                    return false;
                }
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ccs::state::ComponentState;
    use crate::enums::SequencerState;

    fn create_ready_state() -> StateBundle {
        let mut bundle = StateBundle::new();
        bundle.set_component_state(
            "R22/Reb0",
            ComponentState {
                device: RebDeviceState::Online,
                validation: RebValidationState::Valid,
                ccds_power: CcdsPowerState::Off,
                hv_bias: HvBiasState::Off,
                reb_power: crate::enums::RebPowerState::Off,
            },
        );

        bundle
    }

    #[test]
    fn test_check_preconditions_pass() {
        let state = create_ready_state();

        assert!(check_preconditions(
            "rebpower",
            &state,
            &GateRequirements::full()
        ));
    }

    #[test]
    fn test_check_preconditions_alert_is_not_fatal() {
        let mut state = create_ready_state();
        state.alert = AlertState::Warning;

        assert!(check_preconditions(
            "rebpower",
            &state,
            &GateRequirements::full()
        ));
    }

    #[test]
    fn test_check_preconditions_command_active() {
        let mut state = create_ready_state();
        state.command = CommandState::Active;

        assert!(!check_preconditions(
            "rebpower",
            &state,
            &GateRequirements::subsystem_only()
        ));
    }

    #[test]
    fn test_check_preconditions_unconfigured() {
        let mut state = create_ready_state();
        state.configuration = ConfigurationState::Unconfigured;

        assert!(!check_preconditions(
            "rebpower",
            &state,
            &GateRequirements::subsystem_only()
        ));
    }

    #[test]
    fn test_check_preconditions_sequencer() {
        let mut state = create_ready_state();
        state.sequencer = SequencerState::Running;

        // Only the full gate checks the sequencer.
        assert!(check_preconditions(
            "fp",
            &state,
            &GateRequirements::subsystem_only()
        ));
        assert!(!check_preconditions(
            "fp",
            &state,
            &GateRequirements::full()
        ));
    }

    #[test]
    fn test_check_preconditions_focal_plane() {
        let mut state = create_ready_state();
        state.focal_plane = FocalPlaneState::Integrating;

        assert!(!check_preconditions(
            "fp",
            &state,
            &GateRequirements::full()
        ));
    }

    #[test]
    fn test_check_preconditions_components() {
        let mut state = create_ready_state();
        state.update_component_state("R22/Reb0", |component| {
            component.validation = RebValidationState::Unknown;
        });

        assert!(!check_preconditions(
            "rebpower",
            &state,
            &GateRequirements::subsystem_and_components()
        ));

        // The same bundle passes when the component axis is not required.
        assert!(check_preconditions(
            "rebpower",
            &state,
            &GateRequirements::subsystem_only()
        ));
    }
}
