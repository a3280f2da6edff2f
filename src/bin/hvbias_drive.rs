use clap::{value_parser, Arg, ArgAction, Command};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag::register,
};
use std::path::Path;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use run_teststand_tools::ccs::client::attach;
use run_teststand_tools::control::hvbias::{HvBiasController, HvBiasSettings};
use run_teststand_tools::utility::{get_log_filter, initiate_logger};

fn main() {
    // Parse the command line arguments
    let matches = Command::new("hvbias_drive")
        .about("Feedback loop driving the REB HV bias DACs toward their voltage setpoints.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .default_value("config/parameters_hvbias.yaml")
                .help("Loop parameter file"),
        )
        .arg(
            Arg::new("subsystem")
                .long("subsystem")
                .default_value("rebpower")
                .help("REB power subsystem name"),
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

    initiate_logger(
        get_log_filter(matches.get_one::<u32>("level")),
        Some("hvbias_drive.log"),
    );

    let config: &String = matches
        .get_one("config")
        .expect("Config should have a default");
    let settings = HvBiasSettings::from_file(Path::new(config));

    let subsystem_name: &String = matches
        .get_one("subsystem")
        .expect("Subsystem should have a default");
    let mut rebpower = match attach(subsystem_name, matches.get_flag("simulate")) {
        Some(subsystem) => subsystem,
        None => {
            eprintln!("missing {subsystem_name} subsystem, exiting...");
            process::exit(1);
        }
    };

    // Register the signals that stop the loop
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT].iter() {
        let _ = register(*signal, stop.clone());
    }

    let mut controller = HvBiasController::new(settings);
    controller.run(&mut *rebpower, &stop);
}
