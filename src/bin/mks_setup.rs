use clap::{value_parser, Arg, ArgAction, Command};
use log::error;
use std::process;
use std::str::FromStr;
use std::time::Duration;

use run_teststand_tools::constants::DEFAULT_SERIAL_PORT;
use run_teststand_tools::enums::{RelayDirection, SwitchState};
use run_teststand_tools::gauge::protocol::Gauge;
use run_teststand_tools::gauge::setup::{run_setup, RelaySetup, SetupRequest};
use run_teststand_tools::gauge::transport::SerialTransport;
use run_teststand_tools::utility::{get_log_filter, initiate_logger};

fn main() {
    // Parse the command line arguments
    let matches = Command::new("mks_setup")
        .about("Issue setup commands to an MKS 974B gauge.")
        .arg(
            Arg::new("port")
                .long("port")
                .default_value(DEFAULT_SERIAL_PORT)
                .help("Serial port to open"),
        )
        .arg(
            Arg::new("baudrate")
                .long("baudrate")
                .default_value("9600")
                .value_parser(value_parser!(u32))
                .help("4800, [9600], 19200, 38400, 57600, 115200, 230400"),
        )
        .arg(
            Arg::new("id")
                .long("id")
                .default_value("1")
                .value_parser(value_parser!(u8))
                .help("RS-485 id: 1..253"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .default_value("0.1")
                .value_parser(value_parser!(f64))
                .help("Read timeout in seconds"),
        )
        .arg(
            Arg::new("setid")
                .long("setid")
                .value_parser(value_parser!(u8))
                .help("Set the RS-485 id (1..253) and exit"),
        )
        .arg(
            Arg::new("setrelay")
                .long("setrelay")
                .num_args(4)
                .action(ArgAction::Append)
                .value_names(["R#", "ENABLE", "SETPOINT", "DIRECTION"])
                .help("Set up relay R# in {1,2,3}: enable=ON|OFF, setpoint<500, direction=BELOW|ABOVE"),
        )
        .arg(
            Arg::new("setusertag")
                .long("setusertag")
                .help("Set the gauge user tag"),
        )
        .arg(
            Arg::new("ccenable")
                .long("ccenable")
                .help("Enable the cold-cathode auto control (ON|OFF)"),
        )
        .arg(
            Arg::new("ccon")
                .long("ccon")
                .value_parser(value_parser!(f64))
                .help("Cold-cathode auto ON setpoint (1e-4, 5e-4)"),
        )
        .arg(
            Arg::new("ccoff")
                .long("ccoff")
                .value_parser(value_parser!(f64))
                .help("Cold-cathode auto OFF setpoint (5e-4, 8e-4)"),
        )
        .arg(
            Arg::new("ccprotection")
                .long("ccprotection")
                .value_parser(value_parser!(i32))
                .help("Cold-cathode protection setpoint (10, 120) seconds"),
        )
        .arg(
            Arg::new("ccsmoothing")
                .long("ccsmoothing")
                .value_parser(value_parser!(f64))
                .help("Cold-cathode / micro-Pirani smoothing boundary (>1e-4)"),
        )
        .arg(
            Arg::new("loopback")
                .long("loopback")
                .action(ArgAction::SetTrue)
                .help("The connection is RS-485 half duplex"),
        )
        .arg(
            Arg::new("noflush")
                .long("noflush")
                .action(ArgAction::SetTrue)
                .help("No flush after each write"),
        )
        .arg(
            Arg::new("noreset")
                .long("noreset")
                .action(ArgAction::SetTrue)
                .help("No buffer reset before each attempt"),
        )
        .arg(
            Arg::new("level")
                .short('l')
                .long("log-level")
                .default_value("3")
                .value_parser(value_parser!(u32))
                .help("Log level: 0 (Off), 1 (Error), 2 (Warn), 3 (Info), 4 (Debug), 5 (Trace)"),
        )
        .get_matches();

    initiate_logger(get_log_filter(matches.get_one::<u32>("level")), None);

    let mut request = SetupRequest::new();
    request.set_id = matches.get_one::<u8>("setid").copied();
    request.user_tag = matches.get_one::<String>("setusertag").cloned();
    request.cc_on = matches.get_one::<f64>("ccon").copied();
    request.cc_off = matches.get_one::<f64>("ccoff").copied();
    request.cc_protection = matches.get_one::<i32>("ccprotection").copied();
    request.cc_smoothing = matches.get_one::<f64>("ccsmoothing").copied();

    if let Some(enable) = matches.get_one::<String>("ccenable") {
        match SwitchState::from_str(&enable.to_uppercase()) {
            Ok(enable) => request.cc_enable = Some(enable),
            Err(_) => {
                error!("ccenable ({enable}) must be OFF or ON.");
                process::exit(1);
            }
        }
    }

    if let Some(occurrences) = matches.get_occurrences::<String>("setrelay") {
        for occurrence in occurrences {
            let values: Vec<&String> = occurrence.collect();
            match parse_relay(&values) {
                Some(relay) => request.relays.push(relay),
                None => process::exit(1),
            }
        }
    }

    let port: &String = matches.get_one("port").expect("Port should have a default");
    let baud_rate = *matches
        .get_one::<u32>("baudrate")
        .expect("Baud rate should have a default");
    let timeout = Duration::from_secs_f64(
        *matches
            .get_one::<f64>("timeout")
            .expect("Timeout should have a default"),
    );

    let transport = match SerialTransport::open(port, baud_rate, timeout) {
        Ok(transport) => transport,
        Err(error) => {
            eprintln!("Failed to open the serial port {port}: {error}.");
            process::exit(1);
        }
    };

    let mut gauge = Gauge::new(
        transport,
        *matches.get_one::<u8>("id").expect("Id should have a default"),
        matches.get_flag("loopback"),
        !matches.get_flag("noflush"),
        !matches.get_flag("noreset"),
    );

    // The gauge needs a moment between consecutive set commands.
    run_setup(&mut gauge, &request, Duration::from_secs_f64(0.2));
}

/// Parse one `--setrelay R# ENABLE SETPOINT DIRECTION` group.
///
/// # Arguments
/// * `values` - The four argument values.
///
/// # Returns
/// The relay setup, or None when a value does not parse.
fn parse_relay(values: &[&String]) -> Option<RelaySetup> {
    let relay = match values[0].parse::<usize>() {
        Ok(relay) => relay,
        Err(_) => {
            error!("Relay number ({}) must be an integer.", values[0]);
            return None;
        }
    };

    let enable = match SwitchState::from_str(&values[1].to_uppercase()) {
        Ok(enable) => enable,
        Err(_) => {
            error!("Relay enable ({}) must be OFF or ON.", values[1]);
            return None;
        }
    };

    let setpoint = match values[2].parse::<f64>() {
        Ok(setpoint) => setpoint,
        Err(_) => {
            error!("Relay setpoint ({}) must be a number.", values[2]);
            return None;
        }
    };

    let direction = match RelayDirection::from_str(&values[3].to_uppercase()) {
        Ok(direction) => direction,
        Err(_) => {
            error!("Relay direction ({}) must be BELOW or ABOVE.", values[3]);
            return None;
        }
    };

    Some(RelaySetup {
        relay,
        enable,
        setpoint,
        direction,
    })
}
