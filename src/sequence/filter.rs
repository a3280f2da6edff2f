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

use log::error;
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::ccs::client::Subsystem;
use crate::ccs::gate::{check_preconditions, GateRequirements};
use crate::utility::timestamp;

/// Outcome of a filter autochanger exercise run.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum FilterCycleResult {
    // The precondition gate failed; nothing moved.
    GateFailed,
    // A move missed its target position; the run stopped there.
    MoveFailed,
    // All cycles completed.
    Completed(u32),
}

/// Exercise the filter autochanger: cycle it between the approach-standby
/// and handoff positions.
///
/// # Arguments
/// * `fcs` - Filter-changer subsystem.
/// * `count` - Number of cycles.
/// * `delay` - Pause after each cycle in seconds.
///
/// # Returns
/// The outcome of the run.
pub fn run_filter_cycles(fcs: &mut dyn Subsystem, count: u32, delay: f64) -> FilterCycleResult {
    let agent = fcs.agent_name();
    let state = fcs.get_state();

    if !check_preconditions(&agent, &state, &GateRequirements::subsystem_only()) {
        return FilterCycleResult::GateFailed;
    }

    let start = Instant::now();
    println!("{}", timestamp());

    for index in 0..count {
        println!("{} cycle: {}", timestamp(), index);

        if !fcs.move_to_handoff() {
            error!("Move to the handoff position failed.");
            return FilterCycleResult::MoveFailed;
        }

        if !fcs.move_to_approach_standby() {
            error!("Move to the approach-standby position failed.");
            return FilterCycleResult::MoveFailed;
        }

        sleep(Duration::from_secs_f64(delay));
    }

    println!("{}", timestamp());
    println!("elapsed time: {:.3}", start.elapsed().as_secs_f64());

    FilterCycleResult::Completed(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::enums::CommandState;
    use crate::mock::mock_subsystem::MockSubsystem;

    #[test]
    fn test_run_filter_cycles() {
        let mut fcs = MockSubsystem::new("fcs");

        let result = run_filter_cycles(&mut fcs, 2, 0.0);

        assert_eq!(result, FilterCycleResult::Completed(2));
        assert_eq!(
            fcs.mutating_calls(),
            vec![
                String::from("move_to_handoff"),
                String::from("move_to_approach_standby"),
                String::from("move_to_handoff"),
                String::from("move_to_approach_standby"),
            ]
        );
    }

    #[test]
    fn test_run_filter_cycles_gate_failure() {
        let mut fcs = MockSubsystem::new("fcs");
        fcs.state.command = CommandState::Active;

        let result = run_filter_cycles(&mut fcs, 2, 0.0);

        assert_eq!(result, FilterCycleResult::GateFailed);
        assert!(fcs.mutating_calls().is_empty());
    }

    #[test]
    fn test_run_filter_cycles_move_failure() {
        let mut fcs = MockSubsystem::new("fcs");
        fcs.set_autochanger_stuck(true);

        let result = run_filter_cycles(&mut fcs, 2, 0.0);

        // The run stops at the first missed position.
        assert_eq!(result, FilterCycleResult::MoveFailed);
        assert_eq!(fcs.mutating_calls(), vec![String::from("move_to_handoff")]);
    }
}
