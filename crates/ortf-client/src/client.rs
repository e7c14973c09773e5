//! [`TfClient`] – typed front end for one transform bridge plugin instance.
//!
//! Each public operation builds one [`TfCommand`], renders it with
//! [`TfCommand::to_command_line`] and writes the line to the plugin's command
//! channel.  The client keeps no registration state of its own; the plugin is
//! the single source of truth.

use ortf_types::{OrTfError, PLUGIN_INTERFACE};
use tracing::{debug, info};

use crate::command::{RegisterBody, RegisterOptions, TfCommand};
use crate::environment::{Body, Environment};
use crate::plugin::SensorPlugin;

/// Client bound to a single plugin instance.
///
/// The plugin handle is owned here and is the only path to the plugin; the
/// environment that created it controls its lifetime.
pub struct TfClient<P: SensorPlugin> {
    plugin: P,
    world_frame_id: String,
}

impl<P: SensorPlugin> TfClient<P> {
    /// Create the plugin inside `env`, attach it, and bind a client to it.
    ///
    /// `world_frame_id` names the root frame of the external transform tree
    /// and is passed through unvalidated.
    ///
    /// # Errors
    ///
    /// Returns [`OrTfError::ConstructionFailure`] if the environment cannot
    /// create or attach the plugin.
    pub fn new<E>(env: &mut E, world_frame_id: &str) -> Result<Self, OrTfError>
    where
        E: Environment<Plugin = P>,
    {
        let args = format!("{PLUGIN_INTERFACE} {world_frame_id}");
        let plugin = env
            .create_sensor(PLUGIN_INTERFACE, &args)
            .map_err(construction_failure)?;
        env.add_plugin(&plugin).map_err(construction_failure)?;

        info!(plugin = plugin.name(), world_frame = world_frame_id, "transform bridge attached");
        Ok(Self {
            plugin,
            world_frame_id: world_frame_id.to_string(),
        })
    }

    pub fn world_frame_id(&self) -> &str {
        &self.world_frame_id
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    /// Render `command` and dispatch it, returning the plugin's raw response.
    ///
    /// # Errors
    ///
    /// Returns [`OrTfError::MalformedCommand`] without touching the plugin if
    /// the command cannot be rendered; otherwise whatever the plugin reports.
    pub fn send(&mut self, command: &TfCommand) -> Result<String, OrTfError> {
        let line = command.to_command_line()?;
        debug!(plugin = self.plugin.name(), command = %line, "dispatching");
        self.plugin.send_command(&line)
    }

    /// Track `body` at the external frame `frame_id`.  Registering an already
    /// tracked body updates its registration.
    pub fn register_body<B: Body + ?Sized>(
        &mut self,
        body: &B,
        frame_id: &str,
        options: RegisterOptions,
    ) -> Result<(), OrTfError> {
        let request = RegisterBody::new(body.name(), frame_id).with_options(options);
        self.send(&TfCommand::RegisterBody(request)).map(drop)
    }

    /// Track a robot's end-effector at `frame_id`.
    pub fn register_robot_hand<B: Body + ?Sized>(
        &mut self,
        body: &B,
        frame_id: &str,
    ) -> Result<(), OrTfError> {
        self.send(&TfCommand::RegisterRobotHand {
            body: body.name().to_string(),
            frame_id: frame_id.to_string(),
        })
        .map(drop)
    }

    /// Remove a registration.  Unknown names are the plugin's business.
    pub fn unregister_body<B: Body + ?Sized>(&mut self, body: &B) -> Result<(), OrTfError> {
        self.send(&TfCommand::UnregisterBody {
            body: body.name().to_string(),
        })
        .map(drop)
    }

    pub fn pause(&mut self) -> Result<(), OrTfError> {
        self.send(&TfCommand::Pause).map(drop)
    }

    pub fn resume(&mut self) -> Result<(), OrTfError> {
        self.send(&TfCommand::Resume).map(drop)
    }

    pub fn clear(&mut self) -> Result<(), OrTfError> {
        self.send(&TfCommand::Clear).map(drop)
    }
}

fn construction_failure(err: OrTfError) -> OrTfError {
    match err {
        OrTfError::ConstructionFailure { .. } => err,
        other => OrTfError::ConstructionFailure {
            plugin: PLUGIN_INTERFACE.to_string(),
            details: other.to_string(),
        },
    }
}
