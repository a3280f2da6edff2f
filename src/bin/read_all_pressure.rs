use clap::{value_parser, Arg, ArgAction, Command};
use std::process;
use std::time::Duration;

use run_teststand_tools::constants::DEFAULT_SERIAL_PORT;
use run_teststand_tools::gauge::protocol::Gauge;
use run_teststand_tools::gauge::report::run_poll_all;
use run_teststand_tools::gauge::transport::SerialTransport;
use run_teststand_tools::utility::{get_log_filter, initiate_logger};

fn main() {
    // Parse the command line arguments
    let matches = Command::new("read_all_pressure")
        .about("Poll the combined pressure of several MKS 974B gauges on one line.")
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
            Arg::new("ids")
                .long("ids")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(u8))
                .help("RS-485 ids: 1..253"),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .default_value("1")
                .value_parser(value_parser!(u32))
                .help("Number of polling rounds over all the ids"),
        )
        .arg(
            Arg::new("delay")
                .long("delay")
                .default_value("1.0")
                .value_parser(value_parser!(f64))
                .help("Delay between queries in seconds"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .default_value("0.1")
                .value_parser(value_parser!(f64))
                .help("Read timeout in seconds"),
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

    let ids: Vec<u8> = matches
        .get_many::<u8>("ids")
        .expect("Ids should be set")
        .copied()
        .collect();

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
        ids[0],
        matches.get_flag("loopback"),
        !matches.get_flag("noflush"),
        !matches.get_flag("noreset"),
    );

    run_poll_all(
        &mut gauge,
        &ids,
        *matches
            .get_one::<u32>("count")
            .expect("Count should have a default"),
        *matches
            .get_one::<f64>("delay")
            .expect("Delay should have a default"),
    );
}
