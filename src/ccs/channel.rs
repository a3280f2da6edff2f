use strum_macros::{AsRefStr, EnumIter};

/// Telemetry channels the tools read through a subsystem proxy. The channel
/// path is built here so nothing else in the crate assembles path strings.
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq, AsRefStr, EnumIter)]
pub enum ChannelKind {
    ReturnPressure,
    EeprValvePosition,
    HvBiasVoltage,
    HvBiasCurrent,
}

impl ChannelKind {
    /// Get the channel path of a component.
    ///
    /// # Arguments
    /// * `component` - Component name (e.g. "Cold1" or "R22/Reb0").
    ///
    /// # Returns
    /// The channel path.
    pub fn path(&self, component: &str) -> String {
        match self {
            ChannelKind::ReturnPressure => format!("{component}/ReturnPrs"),
            ChannelKind::EeprValvePosition => format!("{component}/EEPRValvePosn"),
            ChannelKind::HvBiasVoltage => format!("{component}/hvbias/VbefSwch"),
            ChannelKind::HvBiasCurrent => format!("{component}/hvbias/IbefSwch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path() {
        assert_eq!(
            ChannelKind::ReturnPressure.path("Cold1"),
            "Cold1/ReturnPrs"
        );
        assert_eq!(
            ChannelKind::EeprValvePosition.path("Cold2"),
            "Cold2/EEPRValvePosn"
        );
        assert_eq!(
            ChannelKind::HvBiasVoltage.path("R22/Reb0"),
            "R22/Reb0/hvbias/VbefSwch"
        );
        assert_eq!(
            ChannelKind::HvBiasCurrent.path("R22/RebG"),
            "R22/RebG/hvbias/IbefSwch"
        );
    }
}
