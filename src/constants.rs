// Serial protocol to the MKS 974B gauge
pub const MAX_QUERY_RETRIES: u32 = 5;
pub const FRAME_TERMINATOR: &[u8; 3] = b";FF";
pub const ACK_TOKEN: &str = "ACK";

pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyS0";

pub const MIN_DEVICE_ADDRESS: u8 = 1;
pub const MAX_DEVICE_ADDRESS: u8 = 253;

pub const NUM_RELAYS: usize = 3;
pub const MAX_RELAY_SETPOINT: f64 = 500.0;

// EEPR valve position control
pub const EEPR_POSITION_MIN: i32 = 25;
pub const EEPR_POSITION_MAX: i32 = 80;

// HV bias DAC control
pub const HVBIAS_DAC_MIN: i32 = 1100;
pub const HVBIAS_CONFIG_MAX: i32 = 3200;
pub const HVBIAS_VOLTS_MAX: f64 = 52.0;
pub const HVBIAS_CURRENT_MAX: f64 = 0.150;

pub const HVBIAS_MAX_STEP: i32 = 25;
pub const HVBIAS_INITIAL_STEP: i32 = 15;

pub const VOLTS_PER_STEP_DEFAULT: f64 = 0.125;
pub const VOLTS_PER_STEP_FLOOR: f64 = 0.025;
// Nominal DAC gain the per-cycle step limit is scaled against.
pub const VOLTS_PER_STEP_NOMINAL: f64 = 0.04;
