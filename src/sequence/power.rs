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

use log::warn;
use regex::Regex;
use std::thread::sleep;
use std::time::Duration;

use crate::ccs::client::Subsystem;
use crate::ccs::gate::{check_preconditions, GateRequirements};
use crate::enums::{CcdsPowerState, HvBiasState, RebPowerState};

/// Power on the REBs selected by the pattern.
///
/// # Notes
/// Only REBs that read back OFF are commanded; a REB that is already ON is
/// reported and left alone.
///
/// # Arguments
/// * `rebpower` - REB power subsystem.
/// * `pattern` - Pattern selecting the REBs to power.
/// * `seq_delay` - Pause after each power action in seconds.
///
/// # Returns
/// The number of powered REBs, or None when the precondition gate failed.
pub fn run_power_rebs_on(
    rebpower: &mut dyn Subsystem,
    pattern: &Regex,
    seq_delay: f64,
) -> Option<u32> {
    let agent = rebpower.agent_name();
    let state = rebpower.get_state();

    if !check_preconditions(&agent, &state, &GateRequirements::subsystem_and_components()) {
        return None;
    }

    let mut powered = 0;
    for name in state.components() {
        if !pattern.is_match(&name) {
            continue;
        }

        let is_on = state
            .component_state(&name)
            .map(|component| component.reb_power == RebPowerState::On)
            .unwrap_or(false);

        if is_on {
            println!("{name} is already ON");
            continue;
        }

        println!("{name} is OFF and selected -- powering on");
        rebpower.power_rebs_on(&name);
        powered += 1;

        sleep(Duration::from_secs_f64(seq_delay));
    }

    Some(powered)
}

/// Power off the CCDs of the REBs selected by the pattern.
///
/// # Notes
/// Only REBs whose CCDs read back ON are commanded. A REB with its HV bias
/// still ON is skipped with a warning; the bias has to come down first.
///
/// # Arguments
/// * `fp` - Focal-plane subsystem.
/// * `pattern` - Pattern selecting the REBs.
/// * `seq_delay` - Pause after each power action in seconds.
///
/// # Returns
/// The number of REBs whose CCDs were powered off, or None when the
/// precondition gate failed.
pub fn run_power_ccds_off(
    fp: &mut dyn Subsystem,
    pattern: &Regex,
    seq_delay: f64,
) -> Option<u32> {
    let agent = fp.agent_name();
    let state = fp.get_state();

    if !check_preconditions(&agent, &state, &GateRequirements::subsystem_and_components()) {
        return None;
    }

    let mut powered_off = 0;
    for name in state.components() {
        if !pattern.is_match(&name) {
            continue;
        }

        let component = match state.component_state(&name) {
            Some(component) => component,
            None => continue,
        };

        if component.ccds_power != CcdsPowerState::On {
            println!("{name} CCDs are already OFF");
            continue;
        }

        if component.hv_bias == HvBiasState::On {
            warn!("{name} HV bias is still ON, skipping the CCDs power off.");
            continue;
        }

        println!("{name} CCDs are ON and selected -- powering CCDs off");
        fp.power_ccds_off(&name);
        powered_off += 1;

        sleep(Duration::from_secs_f64(seq_delay));
    }

    Some(powered_off)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ccs::state::ComponentState;
    use crate::enums::{CommandState, RebDeviceState, RebValidationState};
    use crate::mock::mock_subsystem::MockSubsystem;

    fn ready_component(reb_power: RebPowerState, ccds_power: CcdsPowerState) -> ComponentState {
        ComponentState {
            device: RebDeviceState::Online,
            validation: RebValidationState::Valid,
            ccds_power,
            hv_bias: HvBiasState::Off,
            reb_power,
        }
    }

    fn create_rebpower() -> MockSubsystem {
        let mut rebpower = MockSubsystem::new("rebpower");
        rebpower.add_component(
            "R22/Reb0",
            ready_component(RebPowerState::Off, CcdsPowerState::Off),
        );
        rebpower.add_component(
            "R22/Reb1",
            ready_component(RebPowerState::On, CcdsPowerState::Off),
        );
        rebpower.add_component(
            "R43/Reb0",
            ready_component(RebPowerState::Off, CcdsPowerState::Off),
        );

        rebpower
    }

    #[test]
    fn test_run_power_rebs_on() {
        let mut rebpower = create_rebpower();
        let pattern = Regex::new(r"^R22/Reb[012]$").unwrap();

        let powered = run_power_rebs_on(&mut rebpower, &pattern, 0.0);

        // R22/Reb0 is off and selected; R22/Reb1 is already on; R43/Reb0 is
        // not selected.
        assert_eq!(powered, Some(1));
        assert_eq!(
            rebpower.mutating_calls(),
            vec![String::from("power_rebs_on(R22/Reb0)")]
        );
    }

    #[test]
    fn test_run_power_rebs_on_gate_failure() {
        let mut rebpower = create_rebpower();
        rebpower.state.command = CommandState::Active;
        let pattern = Regex::new(r"^R22/Reb[012]$").unwrap();

        let powered = run_power_rebs_on(&mut rebpower, &pattern, 0.0);

        assert_eq!(powered, None);
        assert!(rebpower.mutating_calls().is_empty());
    }

    #[test]
    fn test_run_power_ccds_off() {
        let mut fp = MockSubsystem::new("focal-plane");
        fp.add_component(
            "R22/Reb0",
            ready_component(RebPowerState::On, CcdsPowerState::On),
        );
        fp.add_component(
            "R22/Reb1",
            ready_component(RebPowerState::On, CcdsPowerState::Off),
        );

        // HV bias still on: the CCDs stay powered.
        let mut blocked = ready_component(RebPowerState::On, CcdsPowerState::On);
        blocked.hv_bias = HvBiasState::On;
        fp.add_component("R22/Reb2", blocked);

        let pattern = Regex::new(r"^R22/Reb[012]$").unwrap();
        let powered_off = run_power_ccds_off(&mut fp, &pattern, 0.0);

        assert_eq!(powered_off, Some(1));
        assert_eq!(
            fp.mutating_calls(),
            vec![String::from("power_ccds_off(R22/Reb0)")]
        );
    }
}
