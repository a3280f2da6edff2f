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

use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::constants::NUM_RELAYS;
use crate::gauge::mnemonic::Mnemonic;
use crate::gauge::protocol::Gauge;
use crate::gauge::stats::PollStats;
use crate::gauge::transport::GaugeTransport;

// Identity and cold-cathode block of the report, in print order.
const IDENTITY_QUERIES: &[Mnemonic] = &[
    Mnemonic::PartNumber,
    Mnemonic::ModelNumber,
    Mnemonic::DeviceType,
    Mnemonic::FirmwareVersion,
    Mnemonic::HardwareVersion,
    Mnemonic::Address,
    Mnemonic::BaudRate,
    Mnemonic::ReceiveSendDelay,
    Mnemonic::CcAutoEnable,
    Mnemonic::CcOnSetpoint,
    Mnemonic::CcOffSetpoint,
    Mnemonic::TimeOn,
    Mnemonic::CcTimeOn,
    Mnemonic::CcDose,
    Mnemonic::CombinedPressure,
    Mnemonic::CcPressure,
    Mnemonic::TransducerStatus,
];

/// Result of a report run: the printed value lines (identity and relays)
/// plus the polling statistics.
pub struct ReportOutput {
    pub lines: Vec<String>,
    pub stats: PollStats,
    pub elapsed: f64,
}

/// Print the gauge report: the identity block, the relay block, then the
/// polling loop over the combined pressure with its statistics. Read-only:
/// no set command is ever issued.
///
/// # Arguments
/// * `gauge` - Gauge client.
/// * `count` - Number of pressure queries.
/// * `delay` - Pause between the queries in seconds.
/// * `serial_only` - Print the serial number and stop.
///
/// # Returns
/// The report output.
pub fn run_report<T: GaugeTransport>(
    gauge: &mut Gauge<T>,
    count: u32,
    delay: f64,
    serial_only: bool,
) -> ReportOutput {
    let mut lines = Vec::new();

    emit(&mut lines, String::from("#---------- MKS Gauge Report ----"));

    let outcome = gauge.query(Mnemonic::SerialNumber);
    emit(
        &mut lines,
        format!(
            "{}: {}",
            Mnemonic::SerialNumber.label(),
            display(&outcome.payload)
        ),
    );

    if serial_only {
        return ReportOutput {
            lines,
            stats: PollStats::new(),
            elapsed: 0.0,
        };
    }

    for mnemonic in IDENTITY_QUERIES {
        let outcome = gauge.query(*mnemonic);
        emit(
            &mut lines,
            format!("{}: {}", mnemonic.label(), display(&outcome.payload)),
        );
    }

    emit(&mut lines, String::new());
    emit(&mut lines, String::from("Relays:"));
    for relay in 1..=NUM_RELAYS {
        let enable = gauge.query(Mnemonic::RelayEnable(relay));
        let setpoint = gauge.query(Mnemonic::RelaySetpoint(relay));
        let direction = gauge.query(Mnemonic::RelayDirection(relay));
        let status = gauge.query(Mnemonic::RelayStatus(relay));

        emit(
            &mut lines,
            format!(
                "    R{relay} enable: {}    R{relay} setPoint: {} R{relay} direction: {} R{relay} status: {}",
                display(&enable.payload),
                display(&setpoint.payload),
                display(&direction.payload),
                display(&status.payload)
            ),
        );
    }

    let (stats, elapsed) = run_poll(gauge, count, delay);

    // The statistics block carries wall-time figures, so it is printed but
    // not part of the repeatable value lines.
    println!();
    for line in stats.format_report(elapsed) {
        println!("{line}");
    }

    ReportOutput {
        lines,
        stats,
        elapsed,
    }
}

/// Poll the combined pressure and collect the round-trip statistics.
///
/// # Arguments
/// * `gauge` - Gauge client.
/// * `count` - Number of queries.
/// * `delay` - Pause between the queries in seconds; each query's own round
///   trip counts against it.
///
/// # Returns
/// * `stats` - The collected statistics.
/// * `elapsed` - Wall time of the loop in seconds.
pub fn run_poll<T: GaugeTransport>(gauge: &mut Gauge<T>, count: u32, delay: f64) -> (PollStats, f64) {
    let mut stats = PollStats::new();
    let start = Instant::now();

    for _ in 0..count {
        let outcome = gauge.query(Mnemonic::CombinedPressure);
        stats.record(&outcome);

        if delay > outcome.elapsed {
            sleep(Duration::from_secs_f64(delay - outcome.elapsed));
        }
    }

    (stats, start.elapsed().as_secs_f64())
}

/// Polling result of one gauge on a shared line.
pub struct GaugePoll {
    pub address: u8,
    pub serial: String,
    pub stats: PollStats,
    // Pressure readings that parsed.
    pub pressures: Vec<f64>,
}

/// Poll the combined pressure of several gauges sharing one line and print
/// the per-gauge statistics blocks.
///
/// # Arguments
/// * `gauge` - Gauge client; its address is rotated over the ids.
/// * `ids` - RS-485 device addresses to poll.
/// * `count` - Number of polling rounds over all the ids.
/// * `delay` - Pause between the queries in seconds; each query's own round
///   trip counts against it.
///
/// # Returns
/// The per-gauge polling results in id order.
pub fn run_poll_all<T: GaugeTransport>(
    gauge: &mut Gauge<T>,
    ids: &[u8],
    count: u32,
    delay: f64,
) -> Vec<GaugePoll> {
    let mut polls: Vec<GaugePoll> = ids
        .iter()
        .map(|id| {
            gauge.set_address(*id);
            let outcome = gauge.query(Mnemonic::SerialNumber);

            GaugePoll {
                address: *id,
                serial: outcome.payload.unwrap_or_else(|| String::from("unknown")),
                stats: PollStats::new(),
                pressures: Vec::new(),
            }
        })
        .collect();

    let start = Instant::now();
    for _ in 0..count {
        for poll in polls.iter_mut() {
            gauge.set_address(poll.address);

            let outcome = gauge.query(Mnemonic::CombinedPressure);
            if let Some(pressure) = outcome.value() {
                poll.pressures.push(pressure);
            }
            poll.stats.record(&outcome);

            if delay > outcome.elapsed {
                sleep(Duration::from_secs_f64(delay - outcome.elapsed));
            }
        }
    }
    let elapsed = start.elapsed().as_secs_f64();

    println!();
    println!("===================================================================");
    for poll in &polls {
        println!("===================================");
        println!("Gauge ID: SN:{}  {:>03}", poll.serial, poll.address);
        for line in poll.stats.format_report(elapsed) {
            println!("{line}");
        }
        if !poll.pressures.is_empty() {
            println!(
                "  Pressure avg: {:>.4}",
                poll.pressures.iter().sum::<f64>() / (poll.pressures.len() as f64)
            );
        }
    }

    polls
}

fn emit(lines: &mut Vec<String>, line: String) {
    println!("{line}");
    lines.push(line);
}

fn display(payload: &Option<String>) -> String {
    match payload {
        Some(payload) => payload.clone(),
        None => String::from("none"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mock::mock_gauge::MockGauge;

    fn create_gauge(payload: &str) -> Gauge<MockGauge> {
        let mut mock = MockGauge::new(1, Duration::from_millis(50));
        mock.set_auto_ack(String::from(payload));

        Gauge::new(mock, 1, false, true, true)
    }

    #[test]
    fn test_run_report_is_read_only_and_repeatable() {
        let mut gauge = create_gauge("1.23E-6");
        let first = run_report(&mut gauge, 1, 0.0, false);

        // No set command was issued by the report.
        assert!(gauge.transport().mutating_frames().is_empty());

        // With unchanged hardware state, a second run prints the same values.
        let mut gauge = create_gauge("1.23E-6");
        let second = run_report(&mut gauge, 1, 0.0, false);

        assert_eq!(first.lines, second.lines);
    }

    #[test]
    fn test_run_report_serial_only() {
        let mut gauge = create_gauge("SN12345");
        let output = run_report(&mut gauge, 3, 0.0, true);

        assert_eq!(output.lines.len(), 2);
        assert_eq!(output.lines[1], "SerialNumber: SN12345");
        assert_eq!(gauge.transport().sent_frames().len(), 1);
    }

    #[test]
    fn test_run_poll_all() {
        let mut gauge = create_gauge("2.00E-6");

        let polls = run_poll_all(&mut gauge, &[1, 2], 3, 0.0);

        assert_eq!(polls.len(), 2);
        for poll in &polls {
            assert_eq!(poll.serial, "2.00E-6");
            assert_eq!(poll.stats.count(), 3);
            assert_eq!(poll.stats.total_errors(), 0);
            assert_eq!(poll.pressures, vec![2.0e-6, 2.0e-6, 2.0e-6]);
        }

        // The queries went out under the rotated addresses.
        let frames = gauge.transport().sent_frames();
        assert!(frames.contains(&String::from("@001PR4?;FF")));
        assert!(frames.contains(&String::from("@002PR4?;FF")));
    }

    #[test]
    fn test_run_poll_paces_to_delay() {
        let mut gauge = create_gauge("1.00E-6");

        // An immediately acknowledging responder: the loop takes about
        // count * delay and sees no retries and no errors.
        let (stats, elapsed) = run_poll(&mut gauge, 3, 0.2);

        assert_eq!(stats.count(), 3);
        assert_eq!(stats.total_retries(), 0);
        assert_eq!(stats.total_errors(), 0);

        assert!(elapsed >= 0.55);
        assert!(elapsed < 1.2);
    }
}
