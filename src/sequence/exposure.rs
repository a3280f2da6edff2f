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

use log::{debug, warn};
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::ccs::client::Subsystem;
use crate::ccs::gate::{check_preconditions, GateRequirements};
use crate::enums::ReadoutMode;
use crate::utility::timestamp;

/// Settle times of the exposure sequences in seconds. The defaults are the
/// field-tuned values of the test stand.
pub struct ExposureTimings {
    // After closing the shutter at the start of a sequence.
    pub shutter_settle: f64,
    // After the short and long clears.
    pub clear_short: f64,
    pub clear_long: f64,
    // After a pseudo read.
    pub pseudo_settle: f64,
    // Estimated shutter open delay.
    pub open_delay: f64,
    // After closing the shutter before ending the integration.
    pub close_settle: f64,
    // After each exposure of the shutter sequence.
    pub post_exposure: f64,
}

impl ExposureTimings {
    /// Create the default timings.
    ///
    /// # Returns
    /// New timings.
    pub fn new() -> Self {
        Self {
            shutter_settle: 1.0,
            clear_short: 0.1,
            clear_long: 0.4,
            pseudo_settle: 2.4,
            open_delay: 0.1,
            close_settle: 0.2,
            post_exposure: 1.0,
        }
    }
}

/// Take a series of exposures through the camera shutter.
///
/// # Arguments
/// * `shutter` - Shutter subsystem.
/// * `exposure_time` - Exposure time in seconds.
/// * `count` - Number of exposures.
/// * `delay` - Pause between the exposures in seconds.
/// * `timings` - Settle times.
///
/// # Returns
/// True when the sequence ran; false when the precondition gate failed.
pub fn run_shutter_exposures(
    shutter: &mut dyn Subsystem,
    exposure_time: f64,
    count: u32,
    delay: f64,
    timings: &ExposureTimings,
) -> bool {
    let agent = shutter.agent_name();
    let state = shutter.get_state();

    if !check_preconditions(&agent, &state, &GateRequirements::subsystem_only()) {
        return false;
    }

    let start = Instant::now();
    println!("{}", timestamp());

    // Close the shutter and let the CCD flush out; it may have been sitting
    // a long time. A failure here just means it was already closed.
    if shutter.close_shutter().is_none() {
        debug!("Initial shutter close failed; assuming it is already closed.");
    }
    sleep(Duration::from_secs_f64(timings.shutter_settle));

    for index in 0..count {
        println!("{} exposure: {}", timestamp(), index);
        shutter.take_exposure(exposure_time);

        sleep(Duration::from_secs_f64(
            exposure_time + timings.post_exposure + delay,
        ));
    }

    println!("{}", timestamp());
    println!("elapsed time: {:.3}", start.elapsed().as_secs_f64());

    true
}

/// Take one long integration with periodic row shifts: expose, shift the
/// image rows, expose again, for the requested number of frames.
///
/// # Arguments
/// * `bench` - Bench subsystem with the projector shutter.
/// * `fp` - Focal-plane subsystem.
/// * `exposure_time` - Exposure time of each frame in seconds.
/// * `count` - Number of frames.
/// * `rows` - Rows to shift between the frames.
/// * `timings` - Settle times.
///
/// # Returns
/// True when the sequence ran; false when the precondition gate failed.
pub fn run_row_shift_exposure(
    bench: &mut dyn Subsystem,
    fp: &mut dyn Subsystem,
    exposure_time: f64,
    count: u32,
    rows: i32,
    timings: &ExposureTimings,
) -> bool {
    let agent = fp.agent_name();
    let state = fp.get_state();

    if !check_preconditions(&agent, &state, &GateRequirements::full()) {
        return false;
    }

    let start = Instant::now();
    println!("{}", timestamp());

    // Close the projector shutter and flush out the CCDs; the stand may have
    // been idle for a long time.
    if bench.close_shutter().is_none() {
        debug!("Initial shutter close failed; assuming it is already closed.");
    }

    fp.clear(1);
    sleep(Duration::from_secs_f64(timings.clear_short));
    fp.clear(5);
    sleep(Duration::from_secs_f64(timings.clear_long));

    // Two pseudo reads give a clean starting point after a long idle.
    for _ in 0..2 {
        fp.start_integration();
        fp.end_integration(ReadoutMode::Pseudo);
        sleep(Duration::from_secs_f64(timings.pseudo_settle));
    }

    // The sequencer must not step after the integration while we shift rows
    // by hand. Cache the current setting and restore it at the end.
    let step_after_integrate = fp.get_config_value("sequencerConfig", "stepAfterIntegrate");
    if step_after_integrate.is_none() {
        warn!("No stepAfterIntegrate configuration value; it will not be restored.");
    }

    fp.submit_change("sequencerConfig", "stepAfterIntegrate", "false");
    fp.apply_submitted_changes();

    bench.open_shutter();
    fp.start_integration();
    print!("integrating ");
    sleep(Duration::from_secs_f64(timings.open_delay));

    print!("expose({exposure_time}s) ");
    sleep(Duration::from_secs_f64(exposure_time));
    for _ in 1..count {
        print!("shift({rows}) ");
        fp.shift_n_rows(rows);

        print!("expose({exposure_time}s) ");
        sleep(Duration::from_secs_f64(exposure_time));
    }
    println!("done");

    bench.close_shutter();
    sleep(Duration::from_secs_f64(timings.close_settle));
    fp.end_integration(ReadoutMode::Normal);
    fp.wait_for_fits_files();

    if let Some(cached) = step_after_integrate {
        fp.submit_change("sequencerConfig", "stepAfterIntegrate", &cached);
        fp.apply_submitted_changes();
    }

    println!("{}", timestamp());
    println!("elapsed time: {:.3}", start.elapsed().as_secs_f64());

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ccs::state::ComponentState;
    use crate::enums::{
        CcdsPowerState, CommandState, HvBiasState, RebDeviceState, RebValidationState,
        SequencerState,
    };
    use crate::mock::mock_subsystem::MockSubsystem;

    fn create_timings() -> ExposureTimings {
        ExposureTimings {
            shutter_settle: 0.0,
            clear_short: 0.0,
            clear_long: 0.0,
            pseudo_settle: 0.0,
            open_delay: 0.0,
            close_settle: 0.0,
            post_exposure: 0.0,
        }
    }

    fn create_focal_plane() -> MockSubsystem {
        let mut fp = MockSubsystem::new("ts8-fp");
        fp.add_component(
            "R22/Reb0",
            ComponentState {
                device: RebDeviceState::Online,
                validation: RebValidationState::Valid,
                ccds_power: CcdsPowerState::On,
                hv_bias: HvBiasState::On,
                reb_power: crate::enums::RebPowerState::On,
            },
        );
        fp.set_config("sequencerConfig", "stepAfterIntegrate", "true");

        fp
    }

    #[test]
    fn test_run_shutter_exposures() {
        let mut shutter = MockSubsystem::new("cam-shutter");

        let done = run_shutter_exposures(&mut shutter, 0.0, 3, 0.0, &create_timings());

        assert!(done);

        let calls = shutter.mutating_calls();
        assert_eq!(calls[0], "close_shutter");
        assert_eq!(
            calls[1..].to_vec(),
            vec![
                String::from("take_exposure(0)"),
                String::from("take_exposure(0)"),
                String::from("take_exposure(0)"),
            ]
        );
    }

    #[test]
    fn test_run_shutter_exposures_gate_failure() {
        let mut shutter = MockSubsystem::new("cam-shutter");
        shutter.state.command = CommandState::Active;

        let done = run_shutter_exposures(&mut shutter, 0.0, 3, 0.0, &create_timings());

        // The gate aborts before any hardware action.
        assert!(!done);
        assert!(shutter.mutating_calls().is_empty());
    }

    #[test]
    fn test_run_row_shift_exposure() {
        let mut bench = MockSubsystem::new("ts8-bench");
        let mut fp = create_focal_plane();

        let done = run_row_shift_exposure(&mut bench, &mut fp, 0.0, 3, 100, &create_timings());

        assert!(done);

        assert_eq!(
            bench.mutating_calls(),
            vec![
                String::from("close_shutter"),
                String::from("open_shutter"),
                String::from("close_shutter"),
            ]
        );

        let calls = fp.mutating_calls();
        assert_eq!(
            calls,
            vec![
                String::from("clear(1)"),
                String::from("clear(5)"),
                String::from("start_integration"),
                String::from("end_integration(PSEUDO)"),
                String::from("start_integration"),
                String::from("end_integration(PSEUDO)"),
                String::from("submit_change(sequencerConfig, stepAfterIntegrate, false)"),
                String::from("apply_submitted_changes"),
                String::from("start_integration"),
                String::from("shift_n_rows(100)"),
                String::from("shift_n_rows(100)"),
                String::from("end_integration(NORMAL)"),
                String::from("submit_change(sequencerConfig, stepAfterIntegrate, true)"),
                String::from("apply_submitted_changes"),
            ]
        );

        // The cached setting was restored.
        assert_eq!(
            fp.get_config_value("sequencerConfig", "stepAfterIntegrate"),
            Some(String::from("true"))
        );
    }

    #[test]
    fn test_run_row_shift_exposure_gate_failure() {
        let mut bench = MockSubsystem::new("ts8-bench");
        let mut fp = create_focal_plane();
        fp.state.sequencer = SequencerState::Running;

        let done = run_row_shift_exposure(&mut bench, &mut fp, 0.0, 3, 100, &create_timings());

        assert!(!done);
        assert!(bench.mutating_calls().is_empty());
        assert!(fp.mutating_calls().is_empty());
    }
}
