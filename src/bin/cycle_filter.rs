use clap::{value_parser, Arg, ArgAction, Command};
use std::process;

use run_teststand_tools::ccs::client::attach;
use run_teststand_tools::sequence::filter::{run_filter_cycles, FilterCycleResult};
use run_teststand_tools::utility::{get_log_filter, initiate_logger};

fn main() {
    // Parse the command line arguments
    let matches = Command::new("cycle_filter")
        .about("Exercise the filter autochanger between approach-standby and handoff.")
        .arg(
            Arg::new("count")
                .long("count")
                .required(true)
                .value_parser(value_parser!(u32))
                .help("Number of cycles"),
        )
        .arg(
            Arg::new("delay")
                .long("delay")
                .required(true)
                .value_parser(value_parser!(f64))
                .help("Pause after each cycle in seconds"),
        )
        .arg(
            Arg::new("subsystem")
                .long("subsystem")
                .default_value("fcs")
                .help("Filter-changer subsystem name"),
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
    let mut fcs = match attach(subsystem_name, matches.get_flag("simulate")) {
        Some(subsystem) => subsystem,
        None => {
            eprintln!("failed to attach subsystems, exiting...");
            process::exit(1);
        }
    };

    let result = run_filter_cycles(
        &mut *fcs,
        *matches
            .get_one::<u32>("count")
            .expect("Count should be set"),
        *matches
            .get_one::<f64>("delay")
            .expect("Delay should be set"),
    );

    match result {
        FilterCycleResult::Completed(count) => println!("{count} cycles completed"),
        FilterCycleResult::GateFailed => process::exit(2),
        FilterCycleResult::MoveFailed => process::exit(1),
    }
}
