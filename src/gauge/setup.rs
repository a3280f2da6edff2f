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
use std::thread::sleep;
use std::time::Duration;

use crate::constants::{MAX_DEVICE_ADDRESS, MAX_RELAY_SETPOINT, MIN_DEVICE_ADDRESS, NUM_RELAYS};
use crate::enums::{RelayDirection, SwitchState};
use crate::gauge::frame::scientific;
use crate::gauge::mnemonic::Mnemonic;
use crate::gauge::protocol::Gauge;
use crate::gauge::transport::GaugeTransport;

/// Relay configuration of one setpoint relay.
#[derive(Debug, Clone, Copy)]
pub struct RelaySetup {
    pub relay: usize,
    pub enable: SwitchState,
    pub setpoint: f64,
    pub direction: RelayDirection,
}

/// The setters a setup run should apply. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct SetupRequest {
    pub set_id: Option<u8>,
    pub relays: Vec<RelaySetup>,
    pub user_tag: Option<String>,
    pub cc_enable: Option<SwitchState>,
    pub cc_on: Option<f64>,
    pub cc_off: Option<f64>,
    pub cc_protection: Option<i32>,
    pub cc_smoothing: Option<f64>,
}

impl SetupRequest {
    /// Create an empty request.
    ///
    /// # Returns
    /// A new request.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Apply the requested setters to the gauge. Each setter validates its range
/// first; an out-of-range value is reported and skipped, the others still
/// run. The gauge acknowledges each set command with the value read back.
///
/// # Arguments
/// * `gauge` - Gauge client.
/// * `request` - Setters to apply.
/// * `settle` - Pause after each set command.
///
/// # Returns
/// The number of set commands that were issued.
pub fn run_setup<T: GaugeTransport>(
    gauge: &mut Gauge<T>,
    request: &SetupRequest,
    settle: Duration,
) -> u32 {
    println!("#---------- MKS Gauge Setup ----");

    let outcome = gauge.query(Mnemonic::SerialNumber);
    println!(
        "SerialNumber: {}",
        outcome.payload.as_deref().unwrap_or("none")
    );

    // The setters only take while the gauge is unlocked.
    gauge.set(Mnemonic::FactoryLock, "UNLOCK");

    let mut commands = 0;

    if let Some(address) = request.set_id {
        if (address < MIN_DEVICE_ADDRESS) || (address > MAX_DEVICE_ADDRESS) {
            warn!(
                "RS-485 address {address} is out of the allowed range \
                 {MIN_DEVICE_ADDRESS}--{MAX_DEVICE_ADDRESS}, skipping."
            );
            return commands;
        }

        let outcome = gauge.set(Mnemonic::Address, &format!("{address:03}"));
        println!("SetID result: {}", outcome.payload.as_deref().unwrap_or("none"));

        // Commands to the old address fail after the change; stop here
        // without locking.
        return commands + 1;
    }

    for relay in &request.relays {
        if (relay.relay < 1) || (relay.relay > NUM_RELAYS) {
            warn!("Relay {} is not one of 1--{NUM_RELAYS}, skipping.", relay.relay);
            continue;
        }
        if (relay.setpoint < 1e-8) || (relay.setpoint > MAX_RELAY_SETPOINT) {
            warn!(
                "Relay setpoint {} is out of the allowed range (1E-08, {MAX_RELAY_SETPOINT}), \
                 skipping.",
                relay.setpoint
            );
            continue;
        }

        let outcome = gauge.set(Mnemonic::RelayEnable(relay.relay), relay.enable.as_ref());
        println!(
            "relay {} enable is set to {}",
            relay.relay,
            outcome.payload.as_deref().unwrap_or("none")
        );
        commands += 1;
        sleep(settle);

        let outcome = gauge.set(
            Mnemonic::RelaySetpoint(relay.relay),
            &scientific(relay.setpoint),
        );
        println!(
            "relay {} setpoint is set to {}",
            relay.relay,
            outcome.payload.as_deref().unwrap_or("none")
        );
        commands += 1;
        sleep(settle);

        let outcome = gauge.set(
            Mnemonic::RelayDirection(relay.relay),
            relay.direction.as_ref(),
        );
        println!(
            "relay {} direction set to {}",
            relay.relay,
            outcome.payload.as_deref().unwrap_or("none")
        );
        commands += 1;
        sleep(settle);
    }

    if let Some(user_tag) = &request.user_tag {
        let outcome = gauge.set(Mnemonic::UserTag, &user_tag.to_uppercase());
        println!(
            "usertag:{} is set",
            outcome.payload.as_deref().unwrap_or("none")
        );
        commands += 1;
        sleep(settle);
    }

    if let Some(enable) = request.cc_enable {
        let outcome = gauge.set(Mnemonic::CcAutoEnable, enable.as_ref());
        println!(
            "CCenable is set to {}",
            outcome.payload.as_deref().unwrap_or("none")
        );
        commands += 1;
        sleep(settle);
    }

    if let Some(cc_on) = request.cc_on {
        if (cc_on < 1e-4) || (cc_on > 5e-4) {
            warn!("CCAuto On setpoint {cc_on} is out of the allowed range (1E-04, 5E-04), skipping.");
        } else {
            let outcome = gauge.set(Mnemonic::CcOnSetpoint, &scientific(cc_on));
            println!(
                "CCAuto On setpoint is set to {}",
                outcome.payload.as_deref().unwrap_or("none")
            );
            commands += 1;
            sleep(settle);
        }
    }

    if let Some(cc_off) = request.cc_off {
        if (cc_off < 5e-4) || (cc_off > 8e-4) {
            warn!(
                "CCAuto Off setpoint {cc_off} is out of the allowed range (5E-04, 8E-04), skipping."
            );
        } else {
            let outcome = gauge.set(Mnemonic::CcOffSetpoint, &scientific(cc_off));
            println!(
                "CCAuto Off setpoint is set to {}",
                outcome.payload.as_deref().unwrap_or("none")
            );
            commands += 1;
            sleep(settle);
        }
    }

    if let Some(protection) = request.cc_protection {
        if (protection < 10) || (protection > 120) {
            warn!(
                "CC protection setpoint {protection} is out of the allowed range (10, 120) \
                 seconds, skipping."
            );
        } else {
            let outcome = gauge.set(Mnemonic::CcProtection, &protection.to_string());
            println!(
                "CC protection setpoint is set to {}",
                outcome.payload.as_deref().unwrap_or("none")
            );
            commands += 1;
            sleep(settle);
        }
    }

    if let Some(smoothing) = request.cc_smoothing {
        if smoothing < 1e-4 {
            warn!("CC smoothing boundary {smoothing} should be above 1E-04, skipping.");
        } else {
            let outcome = gauge.set(Mnemonic::CcSmoothing, &scientific(smoothing));
            println!(
                "CC smoothing setpoint is set to {}",
                outcome.payload.as_deref().unwrap_or("none")
            );
            commands += 1;
            sleep(settle);
        }
    }

    gauge.set(Mnemonic::FactoryLock, "LOCK");

    if commands > 0 {
        println!("{commands} commands were executed");
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mock::mock_gauge::MockGauge;

    fn create_gauge() -> Gauge<MockGauge> {
        let mut mock = MockGauge::new(1, Duration::from_millis(50));
        mock.set_auto_ack(String::from("OK"));

        Gauge::new(mock, 1, false, true, true)
    }

    #[test]
    fn test_run_setup_relay() {
        let mut gauge = create_gauge();

        let mut request = SetupRequest::new();
        request.relays.push(RelaySetup {
            relay: 1,
            enable: SwitchState::On,
            setpoint: 500.0,
            direction: RelayDirection::Below,
        });

        let commands = run_setup(&mut gauge, &request, Duration::ZERO);

        assert_eq!(commands, 3);
        assert_eq!(
            gauge.transport().mutating_frames(),
            vec![
                String::from("@001FD!UNLOCK;FF"),
                String::from("@001EN1!ON;FF"),
                String::from("@001SP1!5.00E+02;FF"),
                String::from("@001SD1!BELOW;FF"),
                String::from("@001FD!LOCK;FF"),
            ]
        );
    }

    #[test]
    fn test_run_setup_out_of_range_is_skipped() {
        let mut gauge = create_gauge();

        let mut request = SetupRequest::new();
        request.cc_on = Some(1e-3);
        request.cc_off = Some(6e-4);

        let commands = run_setup(&mut gauge, &request, Duration::ZERO);

        // The out-of-range CCAuto On setter is skipped; the valid CCAuto Off
        // setter still runs.
        assert_eq!(commands, 1);

        let frames = gauge.transport().mutating_frames();
        assert!(frames.iter().all(|frame| !frame.contains("SLC")));
        assert!(frames.iter().any(|frame| frame.contains("SHC!6.00E-04")));
    }

    #[test]
    fn test_run_setup_set_id_stops_early() {
        let mut gauge = create_gauge();

        let mut request = SetupRequest::new();
        request.set_id = Some(5);
        request.cc_enable = Some(SwitchState::On);

        let commands = run_setup(&mut gauge, &request, Duration::ZERO);

        // The address change is the only command; the gauge stops answering
        // on the old address afterwards, so nothing else is sent.
        assert_eq!(commands, 1);
        assert_eq!(
            gauge.transport().mutating_frames(),
            vec![
                String::from("@001FD!UNLOCK;FF"),
                String::from("@001AD!005;FF"),
            ]
        );
    }

    #[test]
    fn test_run_setup_relay_validation() {
        let mut gauge = create_gauge();

        let mut request = SetupRequest::new();
        request.relays.push(RelaySetup {
            relay: 4,
            enable: SwitchState::On,
            setpoint: 100.0,
            direction: RelayDirection::Above,
        });
        request.relays.push(RelaySetup {
            relay: 2,
            enable: SwitchState::Off,
            setpoint: 1e-9,
            direction: RelayDirection::Above,
        });

        let commands = run_setup(&mut gauge, &request, Duration::ZERO);

        assert_eq!(commands, 0);
        assert_eq!(
            gauge.transport().mutating_frames(),
            vec![
                String::from("@001FD!UNLOCK;FF"),
                String::from("@001FD!LOCK;FF"),
            ]
        );
    }
}
