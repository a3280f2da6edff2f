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
use run_teststand_tools::control::eepr::{EeprController, EeprSettings};
use run_teststand_tools::utility::{get_log_filter, initiate_logger};

fn main() {
    // Parse the command line arguments
    let matches = Command::new("eepr_control")
        .about("Feedback loop holding the refrigeration return pressures by stepping the EEPR valves.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .default_value("config/parameters_eepr.yaml")
                .help("Loop parameter file"),
        )
        .arg(
            Arg::new("refrig")
                .long("refrig")
                .default_value("refrig")
                .help("Refrigeration subsystem name"),
        )
        .arg(
            Arg::new("hex")
                .long("hex")
                .default_value("hex")
                .help("Heat-exchanger subsystem name"),
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
        Some("eepr_control.log"),
    );

    let config: &String = matches
        .get_one("config")
        .expect("Config should have a default");
    let settings = EeprSettings::from_file(Path::new(config));

    let is_simulation_mode = matches.get_flag("simulate");

    let refrig_name: &String = matches
        .get_one("refrig")
        .expect("Refrig should have a default");
    let mut refrig = match attach(refrig_name, is_simulation_mode) {
        Some(subsystem) => subsystem,
        None => {
            eprintln!("missing {refrig_name} subsystem, exiting...");
            process::exit(1);
        }
    };

    let hex_name: &String = matches.get_one("hex").expect("Hex should have a default");
    let mut hex = match attach(hex_name, is_simulation_mode) {
        Some(subsystem) => subsystem,
        None => {
            eprintln!("missing {hex_name} subsystem, exiting...");
            process::exit(1);
        }
    };

    // Register the signals that stop the loop
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT].iter() {
        let _ = register(*signal, stop.clone());
    }

    let mut controller = EeprController::new(settings);
    controller.run(&mut *refrig, &mut *hex, &stop);
}
