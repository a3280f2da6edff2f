use config::Config;
use simplelog::{
    format_description, ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;
use time::macros::format_description as time_format_description;
use time::OffsetDateTime;

/// Trait for parsing the configuration value.
///
/// # Parameters
/// * `Self` - Type of the configuration value.
pub trait ConfigValue: Sized {
    /// Parse the configuration value.
    ///
    /// # Parameters
    /// * `s` - String to parse.
    ///
    /// # Returns
    /// The parsed configuration value.
    fn parse_value(s: &str) -> Self;
}

/// Implement the trait ConfigValue for String.
impl ConfigValue for String {
    fn parse_value(s: &str) -> Self {
        s.to_string()
    }
}

/// Implement the trait ConfigValue for f64.
impl ConfigValue for f64 {
    fn parse_value(s: &str) -> Self {
        s.parse::<f64>().expect(&format!("{s} should parse as f64"))
    }
}

/// Implement the trait ConfigValue for i32.
impl ConfigValue for i32 {
    fn parse_value(s: &str) -> Self {
        s.parse::<i32>().expect(&format!("{s} should parse as i32"))
    }
}

/// Implement the trait ConfigValue for bool.
impl ConfigValue for bool {
    fn parse_value(s: &str) -> Self {
        s.parse::<bool>()
            .expect(&format!("{s} should parse as bool"))
    }
}

/// Get the configuation from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
///
/// # Returns
/// The configuration.
pub fn get_config(filepath: &Path) -> Config {
    let name = filepath
        .to_str()
        .expect(&format!("Should have the file name in the {:?}", filepath));

    Config::builder()
        .add_source(config::File::with_name(name))
        .build()
        .expect(&format!("Should be able to read the {name}"))
}

/// Get the parameter from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
/// * `key` - Key to find the parameter in the config file.
///
/// # Returns
/// The parameter.
pub fn get_parameter<T: ConfigValue>(filepath: &Path, key: &str) -> T {
    let config = get_config(filepath);

    config
        .get_string(key)
        .map(|v| T::parse_value(&v))
        .expect(&format!("Should find the {key} in the {:?}", filepath))
}

/// Get the array parameter from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
/// * `key` - Key to find the parameter in the config file.
///
/// # Returns
/// The array parameter.
pub fn get_parameter_array<T: ConfigValue>(filepath: &Path, key: &str) -> Vec<T> {
    let config = get_config(filepath);
    let config_array = config
        .get_array(key)
        .expect(&format!("Should find the {key} in the {:?}", filepath));

    config_array
        .iter()
        .map(|x| T::parse_value(&x.clone().into_string().expect("Should be a string")))
        .collect()
}

/// Get the log filter.
///
/// # Arguments
/// * `log_level` - Log level.
///
/// # Returns
/// Log filter.
pub fn get_log_filter(log_level: Option<&u32>) -> LevelFilter {
    match log_level {
        Some(level) => match level {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            5 => LevelFilter::Trace,
            _ => LevelFilter::Info,
        },
        None => LevelFilter::Info,
    }
}

/// Initiate the logger.
///
/// # Arguments
/// * `level` - Log level.
/// * `filepath` - Log file path. If None, only the terminal logger is set up.
pub fn initiate_logger(level: LevelFilter, filepath: Option<&str>) {
    let config = ConfigBuilder::new()
        .set_time_format_custom(format_description!(
            "[year]/[month]/[day] [hour]:[minute]:[second].[subsecond]"
        ))
        .build();

    // Log to the terminal
    let logger_terminal = TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    // Log to the file
    let mut logger_file: Option<Box<WriteLogger<File>>> = None;
    if let Some(filepath) = filepath {
        match File::create(filepath) {
            Ok(file) => {
                logger_file = Some(WriteLogger::new(level, config.clone(), file));
            }
            Err(error) => {
                eprintln!("Failed to create the log file: {error}.");
            }
        }
    }

    if let Some(logger_file) = logger_file {
        let _ = CombinedLogger::init(vec![logger_terminal, logger_file]);
    } else {
        let _ = CombinedLogger::init(vec![logger_terminal]);
    }
}

/// Get the local timestamp line used by the loop printouts.
///
/// # Returns
/// Timestamp such as "2024-03-01T08:30:00 -07:00". Falls back to UTC when the
/// local offset is unavailable.
pub fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let format = time_format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second] [offset_hour sign:mandatory]:[offset_minute]"
    );

    now.format(&format)
        .unwrap_or_else(|_| String::from("unknown time"))
}

/// Compute the pause that paces a polling loop to its cadence.
///
/// # Arguments
/// * `cadence` - Configured time between cycle starts in seconds.
/// * `elapsed` - Work time of the cycle that just finished in seconds.
/// * `minimum` - Floor for the pause in seconds.
///
/// # Returns
/// The pause to sleep before the next cycle.
pub fn pace(cadence: f64, elapsed: f64, minimum: f64) -> Duration {
    if cadence > elapsed {
        Duration::from_secs_f64(cadence - elapsed)
    } else {
        Duration::from_secs_f64(minimum)
    }
}

/// Sleep in short slices so a stop request ends the pause early.
///
/// # Arguments
/// * `duration` - Total pause.
/// * `stop` - Stop flag set by the signal handler.
pub fn sleep_with_stop(duration: Duration, stop: &Arc<AtomicBool>) {
    let mut remaining = duration;
    while (remaining > Duration::ZERO) && !stop.load(Ordering::Relaxed) {
        let slice = remaining.min(Duration::from_secs(1));
        sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    fn create_config_file() -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("Should create the temporary file");

        writeln!(
            file,
            "cadence: \"120.0\"\nmin_delay: \"60\"\nchannels:\n  - \"Cold1\"\n  - \"Cold2\""
        )
        .expect("Should write the temporary file");

        file
    }

    #[test]
    fn test_get_parameter() {
        let file = create_config_file();

        let cadence: f64 = get_parameter(file.path(), "cadence");
        assert_relative_eq!(cadence, 120.0);

        let min_delay: i32 = get_parameter(file.path(), "min_delay");
        assert_eq!(min_delay, 60);
    }

    #[test]
    #[should_panic(expected = "Should find the missing in the")]
    fn test_get_parameter_panic() {
        let file = create_config_file();

        let _: f64 = get_parameter(file.path(), "missing");
    }

    #[test]
    fn test_get_parameter_array() {
        let file = create_config_file();

        let channels: Vec<String> = get_parameter_array(file.path(), "channels");
        assert_eq!(channels, vec!["Cold1", "Cold2"]);
    }

    #[test]
    fn test_get_log_filter() {
        assert_eq!(get_log_filter(Some(&0)), LevelFilter::Off);
        assert_eq!(get_log_filter(Some(&1)), LevelFilter::Error);
        assert_eq!(get_log_filter(Some(&2)), LevelFilter::Warn);
        assert_eq!(get_log_filter(Some(&3)), LevelFilter::Info);
        assert_eq!(get_log_filter(Some(&4)), LevelFilter::Debug);
        assert_eq!(get_log_filter(Some(&5)), LevelFilter::Trace);

        assert_eq!(get_log_filter(Some(&6)), LevelFilter::Info);

        assert_eq!(get_log_filter(None), LevelFilter::Info);
    }

    #[test]
    fn test_timestamp() {
        let stamp = timestamp();

        assert!(stamp.contains("T"));
        assert!(stamp.len() >= 19);
    }

    #[test]
    fn test_pace() {
        // Work time fits within the cadence.
        assert_relative_eq!(pace(120.0, 20.0, 60.0).as_secs_f64(), 100.0);

        // Work time overran the cadence.
        assert_relative_eq!(pace(120.0, 130.0, 60.0).as_secs_f64(), 60.0);
    }
}
