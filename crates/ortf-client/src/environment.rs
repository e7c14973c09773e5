//! Collaborator traits for the hosting simulation environment.
//!
//! The client never looks inside the simulator.  It needs exactly three
//! capabilities from it: create a sensor plugin, attach that plugin, and hand
//! out bodies whose names go on the wire.

use ortf_types::OrTfError;

use crate::plugin::SensorPlugin;

/// A simulated rigid body.  Only its name travels to the plugin.
pub trait Body {
    fn name(&self) -> &str;
}

impl Body for str {
    fn name(&self) -> &str {
        self
    }
}

impl Body for String {
    fn name(&self) -> &str {
        self
    }
}

/// A simulation environment able to host sensor plugins.
pub trait Environment {
    type Plugin: SensorPlugin;
    type Body: Body;

    /// Instantiate the sensor `interface` with creation arguments `args`
    /// (for the transform bridge: `"<instance name> <world frame id>"`).
    ///
    /// # Errors
    ///
    /// Returns [`OrTfError::ConstructionFailure`] if the interface is unknown
    /// or refuses the arguments.
    fn create_sensor(&mut self, interface: &str, args: &str) -> Result<Self::Plugin, OrTfError>;

    /// Attach a created plugin so the environment starts driving it.
    fn add_plugin(&mut self, plugin: &Self::Plugin) -> Result<(), OrTfError>;

    /// Look up a live body by name.
    ///
    /// # Errors
    ///
    /// Returns [`OrTfError::InvalidReference`] when no such body exists.
    fn body_by_name(&self, name: &str) -> Result<Self::Body, OrTfError>;
}
