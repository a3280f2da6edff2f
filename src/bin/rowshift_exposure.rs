use clap::{value_parser, Arg, ArgAction, Command};
use std::process;

use run_teststand_tools::ccs::client::attach;
use run_teststand_tools::sequence::exposure::{run_row_shift_exposure, ExposureTimings};
use run_teststand_tools::utility::{get_log_filter, initiate_logger};

fn main() {
    // Parse the command line arguments
    let matches = Command::new("rowshift_exposure")
        .about("Take one long integration with periodic row shifts on the focal plane.")
        .arg(
            Arg::new("exptime")
                .long("exptime")
                .required(true)
                .value_parser(value_parser!(f64))
                .help("Exposure time of each frame in seconds"),
        )
        .arg(
            Arg::new("expcount")
                .long("expcount")
                .required(true)
                .value_parser(value_parser!(u32))
                .help("Number of frames"),
        )
        .arg(
            Arg::new("rowshift")
                .long("rowshift")
                .required(true)
                .value_parser(value_parser!(i32))
                .help("Rows to shift between frames"),
        )
        .arg(
            Arg::new("bench")
                .long("bench")
                .default_value("ts8-bench")
                .help("Bench subsystem name (projector shutter)"),
        )
        .arg(
            Arg::new("fp")
                .long("fp")
                .default_value("ts8-fp")
                .help("Focal-plane subsystem name"),
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

    let is_simulation_mode = matches.get_flag("simulate");

    let bench_name: &String = matches
        .get_one("bench")
        .expect("Bench should have a default");
    let fp_name: &String = matches.get_one("fp").expect("Fp should have a default");

    let (mut bench, mut fp) = match (
        attach(bench_name, is_simulation_mode),
        attach(fp_name, is_simulation_mode),
    ) {
        (Some(bench), Some(fp)) => (bench, fp),
        _ => {
            eprintln!("failed to attach subsystems, exiting...");
            process::exit(1);
        }
    };

    let done = run_row_shift_exposure(
        &mut *bench,
        &mut *fp,
        *matches
            .get_one::<f64>("exptime")
            .expect("Exposure time should be set"),
        *matches
            .get_one::<u32>("expcount")
            .expect("Exposure count should be set"),
        *matches
            .get_one::<i32>("rowshift")
            .expect("Row shift should be set"),
        &ExposureTimings::new(),
    );

    if !done {
        process::exit(2);
    }
}
