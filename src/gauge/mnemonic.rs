/// Command mnemonics of the MKS 974B gauge used by the tools. Relay variants
/// carry the 1-based relay number.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Mnemonic {
    SerialNumber,
    PartNumber,
    ModelNumber,
    DeviceType,
    FirmwareVersion,
    HardwareVersion,
    Address,
    BaudRate,
    ReceiveSendDelay,
    CcAutoEnable,
    CcOnSetpoint,
    CcOffSetpoint,
    CcProtection,
    CcSmoothing,
    TimeOn,
    CcTimeOn,
    CcDose,
    CombinedPressure,
    CcPressure,
    TransducerStatus,
    UserTag,
    FactoryLock,
    RelayEnable(usize),
    RelaySetpoint(usize),
    RelayDirection(usize),
    RelayStatus(usize),
}

impl Mnemonic {
    /// Get the wire code of the mnemonic.
    ///
    /// # Returns
    /// The code as transmitted in a frame.
    pub fn code(&self) -> String {
        match self {
            Mnemonic::SerialNumber => String::from("SN"),
            Mnemonic::PartNumber => String::from("PN"),
            Mnemonic::ModelNumber => String::from("MD"),
            Mnemonic::DeviceType => String::from("DT"),
            Mnemonic::FirmwareVersion => String::from("FV"),
            Mnemonic::HardwareVersion => String::from("HV"),
            Mnemonic::Address => String::from("AD"),
            Mnemonic::BaudRate => String::from("BR"),
            Mnemonic::ReceiveSendDelay => String::from("RSD"),
            Mnemonic::CcAutoEnable => String::from("ENC"),
            Mnemonic::CcOnSetpoint => String::from("SLC"),
            Mnemonic::CcOffSetpoint => String::from("SHC"),
            Mnemonic::CcProtection => String::from("PRO"),
            Mnemonic::CcSmoothing => String::from("SLP"),
            Mnemonic::TimeOn => String::from("TIM"),
            Mnemonic::CcTimeOn => String::from("TIM2"),
            Mnemonic::CcDose => String::from("TIM3"),
            Mnemonic::CombinedPressure => String::from("PR4"),
            Mnemonic::CcPressure => String::from("PR5"),
            Mnemonic::TransducerStatus => String::from("T"),
            Mnemonic::UserTag => String::from("UT"),
            Mnemonic::FactoryLock => String::from("FD"),
            Mnemonic::RelayEnable(relay) => format!("EN{relay}"),
            Mnemonic::RelaySetpoint(relay) => format!("SP{relay}"),
            Mnemonic::RelayDirection(relay) => format!("SD{relay}"),
            Mnemonic::RelayStatus(relay) => format!("SS{relay}"),
        }
    }

    /// Get the label used by the report printout.
    ///
    /// # Returns
    /// The label.
    pub fn label(&self) -> &'static str {
        match self {
            Mnemonic::SerialNumber => "SerialNumber",
            Mnemonic::PartNumber => "PartNum",
            Mnemonic::ModelNumber => "Model",
            Mnemonic::DeviceType => "DeviceType",
            Mnemonic::FirmwareVersion => "Firmware",
            Mnemonic::HardwareVersion => "Hardware",
            Mnemonic::Address => "Address",
            Mnemonic::BaudRate => "BaudRate",
            Mnemonic::ReceiveSendDelay => "ReceiveSendDelay",
            Mnemonic::CcAutoEnable => "AutoCC",
            Mnemonic::CcOnSetpoint => "CCOnSetpoint",
            Mnemonic::CcOffSetpoint => "CCOffSetpoint",
            Mnemonic::CcProtection => "CCProtection",
            Mnemonic::CcSmoothing => "CCSmoothing",
            Mnemonic::TimeOn => "TimeOn",
            Mnemonic::CcTimeOn => "CCTimeOn",
            Mnemonic::CcDose => "CCDose",
            Mnemonic::CombinedPressure => "Combined Pressure",
            Mnemonic::CcPressure => "Cold Cathode Reading",
            Mnemonic::TransducerStatus => "status",
            Mnemonic::UserTag => "UserTag",
            Mnemonic::FactoryLock => "FactoryLock",
            Mnemonic::RelayEnable(_) => "enable",
            Mnemonic::RelaySetpoint(_) => "setPoint",
            Mnemonic::RelayDirection(_) => "direction",
            Mnemonic::RelayStatus(_) => "status",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code() {
        assert_eq!(Mnemonic::SerialNumber.code(), "SN");
        assert_eq!(Mnemonic::CombinedPressure.code(), "PR4");
        assert_eq!(Mnemonic::CcDose.code(), "TIM3");
        assert_eq!(Mnemonic::RelayEnable(1).code(), "EN1");
        assert_eq!(Mnemonic::RelaySetpoint(3).code(), "SP3");
    }

    #[test]
    fn test_label() {
        assert_eq!(Mnemonic::CombinedPressure.label(), "Combined Pressure");
        assert_eq!(Mnemonic::CcAutoEnable.label(), "AutoCC");
    }
}
