use strum_macros::{AsRefStr, EnumIter, EnumString, FromRepr, VariantNames};

/// Subsystem alert state.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString, VariantNames)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum AlertState {
    Nominal,
    Warning,
    Alarm,
}

/// Subsystem command state.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CommandState {
    Ready,
    Active,
}

/// Subsystem configuration state.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ConfigurationState {
    Unconfigured,
    Configured,
    Dirty,
    InitialSafe,
}

/// Focal-plane sequencer state.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum SequencerState {
    Idle,
    Running,
    IdleFlush,
}

impl SequencerState {
    /// Check if the sequencer is idle. Both of the idle states count.
    ///
    /// # Returns
    /// True if the sequencer is idle. Otherwise, false.
    pub fn is_idle(&self) -> bool {
        matches!(self, SequencerState::Idle | SequencerState::IdleFlush)
    }
}

/// Focal-plane readout state.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum FocalPlaneState {
    NeedsClear,
    Clearing,
    Integrating,
    ReadingOut,
    Quiescent,
    RowShift,
    ImageWait,
}

/// Raft electronics board (REB) device state.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RebDeviceState {
    Offline,
    Online,
}

/// REB validation state.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RebValidationState {
    Unknown,
    Valid,
    Invalid,
}

/// CCDs power state of a REB.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CcdsPowerState {
    Unknown,
    Fault,
    Off,
    On,
    Delta,
}

/// High-voltage bias state of a REB.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum HvBiasState {
    Unknown,
    Off,
    On,
}

/// REB power-supply state.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RebPowerState {
    Unknown,
    Off,
    On,
}

/// Focal-plane readout mode for the end of an integration.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ReadoutMode {
    Normal,
    Pseudo,
}

/// Trip direction of a gauge relay setpoint.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString, VariantNames)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum RelayDirection {
    Below,
    Above,
}

/// On/off value as the gauge spells it on the wire.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumString, VariantNames)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum SwitchState {
    Off,
    On,
}

/// Actuator step decision of one polling cycle.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, EnumIter)]
#[repr(i8)]
pub enum StepCommand {
    Decrease = -1,
    Hold = 0,
    Increase = 1,
}

impl StepCommand {
    /// Get the signed unit step.
    ///
    /// # Returns
    /// -1, 0 or 1.
    pub fn offset(&self) -> i32 {
        *self as i32
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_as_ref() {
        assert_eq!(AlertState::Nominal.as_ref(), "NOMINAL");
        assert_eq!(ConfigurationState::InitialSafe.as_ref(), "INITIAL_SAFE");
        assert_eq!(SequencerState::IdleFlush.as_ref(), "IDLE_FLUSH");
        assert_eq!(FocalPlaneState::NeedsClear.as_ref(), "NEEDS_CLEAR");
        assert_eq!(RelayDirection::Below.as_ref(), "BELOW");
        assert_eq!(SwitchState::On.as_ref(), "ON");
    }

    #[test]
    fn test_from_str() {
        assert_eq!(AlertState::from_str("NOMINAL"), Ok(AlertState::Nominal));
        assert_eq!(SwitchState::from_str("OFF"), Ok(SwitchState::Off));
        assert_eq!(RelayDirection::from_str("ABOVE"), Ok(RelayDirection::Above));

        assert!(AlertState::from_str("nominal").is_err());
    }

    #[test]
    fn test_is_idle() {
        assert!(SequencerState::Idle.is_idle());
        assert!(SequencerState::IdleFlush.is_idle());
        assert!(!SequencerState::Running.is_idle());
    }

    #[test]
    fn test_offset() {
        assert_eq!(StepCommand::Decrease.offset(), -1);
        assert_eq!(StepCommand::Hold.offset(), 0);
        assert_eq!(StepCommand::Increase.offset(), 1);
    }
}
