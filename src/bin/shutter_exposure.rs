use clap::{value_parser, Arg, ArgAction, Command};
use std::process;

use run_teststand_tools::ccs::client::attach;
use run_teststand_tools::sequence::exposure::{run_shutter_exposures, ExposureTimings};
use run_teststand_tools::utility::{get_log_filter, initiate_logger};

fn main() {
    // Parse the command line arguments
    let matches = Command::new("shutter_exposure")
        .about("Take a series of exposures through the camera shutter.")
        .arg(
            Arg::new("exptime")
                .long("exptime")
                .required(true)
                .value_parser(value_parser!(f64))
                .help("Exposure time in seconds"),
        )
        .arg(
            Arg::new("expcount")
                .long("expcount")
                .required(true)
                .value_parser(value_parser!(u32))
                .help("Number of exposures"),
        )
        .arg(
            Arg::new("delay")
                .long("delay")
                .required(true)
                .value_parser(value_parser!(f64))
                .help("Delay between exposures in seconds"),
        )
        .arg(
            Arg::new("subsystem")
                .long("subsystem")
                .default_value("cam-shutter")
                .help("Shutter subsystem name"),
        )
        .arg(
            Arg::new("simulate")
                .short('s')
                .long("simulate")
                .action(ArgAction::SetTrue)
                .help("Run against the in-process simulator"),
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

    let subsystem_name: &String = matches
        .get_one("subsystem")
        .expect("Subsystem should have a default");
    let mut shutter = match attach(subsystem_name, matches.get_flag("simulate")) {
        Some(subsystem) => subsystem,
        None => {
            eprintln!("failed to attach subsystems, exiting...");
            process::exit(1);
        }
    };

    let done = run_shutter_exposures(
        &mut *shutter,
        *matches
            .get_one::<f64>("exptime")
            .expect("Exposure time should be set"),
        *matches
            .get_one::<u32>("expcount")
            .expect("Exposure count should be set"),
        *matches
            .get_one::<f64>("delay")
            .expect("Delay should be set"),
        &ExposureTimings::new(),
    );

    if !done {
        process::exit(2);
    }
}
