use std::collections::BTreeMap;

use crate::enums::{
    AlertState, CcdsPowerState, CommandState, ConfigurationState, FocalPlaneState, HvBiasState,
    RebDeviceState, RebPowerState, RebValidationState, SequencerState,
};

/// States of one component (REB) of a subsystem.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ComponentState {
    pub device: RebDeviceState,
    pub validation: RebValidationState,
    pub ccds_power: CcdsPowerState,
    pub hv_bias: HvBiasState,
    pub reb_power: RebPowerState,
}

impl ComponentState {
    /// Create a new component state. Everything starts unknown or offline.
    ///
    /// # Returns
    /// A new component state.
    pub fn new() -> Self {
        Self {
            device: RebDeviceState::Offline,
            validation: RebValidationState::Unknown,
            ccds_power: CcdsPowerState::Unknown,
            hv_bias: HvBiasState::Unknown,
            reb_power: RebPowerState::Unknown,
        }
    }
}

/// Snapshot of the state of a subsystem: the subsystem-level status axes and
/// the per-component states.
#[derive(Debug, Clone)]
pub struct StateBundle {
    pub alert: AlertState,
    pub command: CommandState,
    pub configuration: ConfigurationState,
    pub sequencer: SequencerState,
    pub focal_plane: FocalPlaneState,
    // Components with states, keyed by name. A BTreeMap keeps the walk order
    // deterministic, matching the sorted iteration of the operator tools.
    _components: BTreeMap<String, ComponentState>,
}

impl StateBundle {
    /// Create a new state bundle with nominal subsystem-level states and no
    /// components.
    ///
    /// # Returns
    /// A new state bundle.
    pub fn new() -> Self {
        Self {
            alert: AlertState::Nominal,
            command: CommandState::Ready,
            configuration: ConfigurationState::Configured,
            sequencer: SequencerState::Idle,
            focal_plane: FocalPlaneState::Quiescent,
            _components: BTreeMap::new(),
        }
    }

    /// Get the component names in sorted order.
    ///
    /// # Returns
    /// The component names.
    pub fn components(&self) -> Vec<String> {
        self._components.keys().cloned().collect()
    }

    /// Get the state of a component.
    ///
    /// # Arguments
    /// * `name` - Component name.
    ///
    /// # Returns
    /// The component state, or None when the component is unknown.
    pub fn component_state(&self, name: &str) -> Option<&ComponentState> {
        self._components.get(name)
    }

    /// Set the state of a component, adding it when new.
    ///
    /// # Arguments
    /// * `name` - Component name.
    /// * `state` - Component state.
    pub fn set_component_state(&mut self, name: &str, state: ComponentState) {
        self._components.insert(String::from(name), state);
    }

    /// Update the state of a component in place.
    ///
    /// # Arguments
    /// * `name` - Component name.
    /// * `update` - Update to apply.
    pub fn update_component_state<F: FnOnce(&mut ComponentState)>(&mut self, name: &str, update: F) {
        if let Some(state) = self._components.get_mut(name) {
            update(state);
        }
    }
}
