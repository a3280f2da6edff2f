use clap::{value_parser, Arg, ArgAction, Command};
use log::error;
use regex::Regex;
use std::process;

use run_teststand_tools::ccs::client::attach;
use run_teststand_tools::sequence::power::{run_power_ccds_off, run_power_rebs_on};
use run_teststand_tools::utility::{get_log_filter, initiate_logger};

fn main() {
    // Parse the command line arguments
    let matches = Command::new("power_rebs")
        .about("Power on the selected REBs, or power their CCDs off with --off.")
        .arg(
            Arg::new("rebexpr")
                .long("rebexpr")
                .required(true)
                .help("Pattern selecting the REBs (e.g. 'R22/Reb[012]')"),
        )
        .arg(
            Arg::new("off")
                .long("off")
                .action(ArgAction::SetTrue)
                .help("Power the CCDs of the selected REBs off instead"),
        )
        .arg(
            Arg::new("subsystem")
                .long("subsystem")
                .default_value("rebpower")
                .help("Subsystem name (rebpower, or the focal plane for --off)"),
        )
        .arg(
            Arg::new("delay")
                .long("delay")
                .default_value("5.0")
                .value_parser(value_parser!(f64))
                .help("Pause after each power action in seconds"),
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

    let rebexpr: &String = matches
        .get_one("rebexpr")
        .expect("Reb pattern should be set");
    let pattern = match Regex::new(rebexpr) {
        Ok(pattern) => pattern,
        Err(parse_error) => {
            error!("Invalid REB pattern {rebexpr}: {parse_error}.");
            process::exit(1);
        }
    };

    let subsystem_name: &String = matches
        .get_one("subsystem")
        .expect("Subsystem should have a default");
    let mut subsystem = match attach(subsystem_name, matches.get_flag("simulate")) {
        Some(subsystem) => subsystem,
        None => {
            eprintln!("failed to attach subsystems, exiting...");
            process::exit(1);
        }
    };

    let delay = *matches
        .get_one::<f64>("delay")
        .expect("Delay should have a default");

    let result = if matches.get_flag("off") {
        run_power_ccds_off(&mut *subsystem, &pattern, delay)
    } else {
        run_power_rebs_on(&mut *subsystem, &pattern, delay)
    };

    match result {
        Some(count) => println!("{count} components acted on"),
        None => process::exit(2),
    }
}
