//! In-process simulation environment for headless tests and CI.
//!
//! [`SimEnvironment`] stands in for the simulator and [`SimPlugin`] for the
//! native transform bridge.  The plugin does no pose tracking; it reads every
//! line with [`TfCommand::parse`], records it, and keeps the same
//! bookkeeping the native plugin keeps, so tests can assert on both the exact
//! wire traffic and the resulting registration state.
//!
//! # Stub behaviour
//!
//! | Command | Effect |
//! |---|---|
//! | `RegisterBody` | Inserts or replaces a [`TrackedBody`]; unknown body → [`OrTfError::InvalidReference`]. |
//! | `RegisterRobotHand` | Inserts or replaces a hand; unknown body → [`OrTfError::InvalidReference`]. |
//! | `UnregisterBody` | Removes a body registration, else a hand, else does nothing. |
//! | `Pause` / `Resume` | Sets [`TrackingState`]. |
//! | `Clear` | Drops bodies and hands; the tracking state is kept. |
//!
//! # Example
//!
//! ```rust
//! use ortf_client::{RegisterOptions, TfClient};
//! use ortf_client::sim::SimEnvironment;
//!
//! let mut env = SimEnvironment::builder().with_body("object_1").build();
//! let mut client = TfClient::new(&mut env, "world").unwrap();
//! client
//!     .register_body("object_1", "goal/base_link", RegisterOptions::new())
//!     .unwrap();
//!
//! assert_eq!(client.plugin().lines(), vec!["RegisterBody object_1 goal/base_link"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ortf_geometry::Transform3D;
use ortf_types::{CommandRecord, OrTfError, PLUGIN_INTERFACE, TrackingState};
use tracing::{debug, warn};

use crate::command::TfCommand;
use crate::environment::{Body, Environment};
use crate::plugin::SensorPlugin;

type BodySet = Arc<Mutex<BTreeSet<String>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─────────────────────────────────────────────────────────────────────────────
// Bodies
// ─────────────────────────────────────────────────────────────────────────────

/// A named body living in a [`SimEnvironment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimBody {
    name: String,
}

impl Body for SimBody {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Registration the simulated plugin holds for one body.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedBody {
    pub frame_id: String,
    /// Identity when the command carried no offset clause.
    pub offset: Transform3D,
    pub planar_tracking: bool,
    pub fixed_translation_z: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// SimPlugin
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PluginState {
    state: TrackingState,
    bodies: BTreeMap<String, TrackedBody>,
    hands: BTreeMap<String, String>,
    records: Vec<CommandRecord>,
    reject_next: Option<String>,
}

/// Shared handle to a simulated transform bridge plugin.
///
/// Clones share state, so the copy attached to the environment and the copy
/// owned by a [`TfClient`][crate::TfClient] observe the same plugin.
#[derive(Debug, Clone)]
pub struct SimPlugin {
    name: String,
    world_frame_id: String,
    env_bodies: BodySet,
    inner: Arc<Mutex<PluginState>>,
}

impl SimPlugin {
    fn new(name: String, world_frame_id: String, env_bodies: BodySet) -> Self {
        Self {
            name,
            world_frame_id,
            env_bodies,
            inner: Arc::default(),
        }
    }

    pub fn world_frame_id(&self) -> &str {
        &self.world_frame_id
    }

    /// Every line received so far, including rejected ones.
    pub fn records(&self) -> Vec<CommandRecord> {
        lock(&self.inner).records.clone()
    }

    /// Just the text of [`records`][Self::records].
    pub fn lines(&self) -> Vec<String> {
        lock(&self.inner)
            .records
            .iter()
            .map(|r| r.line.clone())
            .collect()
    }

    pub fn state(&self) -> TrackingState {
        lock(&self.inner).state
    }

    pub fn tracked_body(&self, name: &str) -> Option<TrackedBody> {
        lock(&self.inner).bodies.get(name).cloned()
    }

    pub fn tracked_bodies(&self) -> BTreeMap<String, TrackedBody> {
        lock(&self.inner).bodies.clone()
    }

    /// Registered hands, body name → frame id.
    pub fn hands(&self) -> BTreeMap<String, String> {
        lock(&self.inner).hands.clone()
    }

    /// Make the next command fail with [`OrTfError::DispatchFailure`].
    pub fn reject_next(&self, details: impl Into<String>) {
        lock(&self.inner).reject_next = Some(details.into());
    }

    fn require_body(&self, name: &str) -> Result<(), OrTfError> {
        if lock(&self.env_bodies).contains(name) {
            Ok(())
        } else {
            Err(OrTfError::InvalidReference(format!(
                "body '{name}' does not exist"
            )))
        }
    }
}

impl SensorPlugin for SimPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_command(&mut self, line: &str) -> Result<String, OrTfError> {
        let mut st = lock(&self.inner);
        st.records.push(CommandRecord::new(self.name.as_str(), line));

        if let Some(details) = st.reject_next.take() {
            return Err(OrTfError::DispatchFailure {
                command: line.to_string(),
                details,
            });
        }

        let command = TfCommand::parse(line).map_err(|e| OrTfError::DispatchFailure {
            command: line.to_string(),
            details: e.to_string(),
        })?;
        debug!(plugin = %self.name, command = command.name(), "sim plugin received command");

        match command {
            TfCommand::RegisterBody(req) => {
                self.require_body(&req.body)?;
                let opts = req.options;
                st.bodies.insert(
                    req.body,
                    TrackedBody {
                        frame_id: req.frame_id,
                        offset: opts.offset.unwrap_or_default(),
                        planar_tracking: opts.planar_tracking,
                        fixed_translation_z: opts.effective_fixed_translation_z(),
                    },
                );
            }
            TfCommand::RegisterRobotHand { body, frame_id } => {
                self.require_body(&body)?;
                st.hands.insert(body, frame_id);
            }
            TfCommand::UnregisterBody { body } => {
                if st.bodies.remove(&body).is_none() && st.hands.remove(&body).is_none() {
                    warn!(body = %body, "unregister of unknown body ignored");
                }
            }
            TfCommand::Pause => st.state = TrackingState::Paused,
            TfCommand::Resume => st.state = TrackingState::Active,
            TfCommand::Clear => {
                st.bodies.clear();
                st.hands.clear();
            }
        }

        Ok(String::new())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SimEnvironment
// ─────────────────────────────────────────────────────────────────────────────

/// Simulated environment: a set of body names plus the plugins attached to it.
#[derive(Debug, Default)]
pub struct SimEnvironment {
    bodies: BodySet,
    plugins: Vec<SimPlugin>,
    fail_create: bool,
    fail_attach: bool,
}

impl SimEnvironment {
    /// Start building an environment.
    pub fn builder() -> SimEnvironmentBuilder {
        SimEnvironmentBuilder::default()
    }

    pub fn add_body(&mut self, name: impl Into<String>) -> SimBody {
        let name = name.into();
        lock(&self.bodies).insert(name.clone());
        SimBody { name }
    }

    /// Remove a body; plugins see it vanish immediately.
    pub fn remove_body(&mut self, name: &str) -> bool {
        lock(&self.bodies).remove(name)
    }

    /// Plugins attached with [`Environment::add_plugin`].
    pub fn plugins(&self) -> &[SimPlugin] {
        &self.plugins
    }
}

impl Environment for SimEnvironment {
    type Plugin = SimPlugin;
    type Body = SimBody;

    fn create_sensor(&mut self, interface: &str, args: &str) -> Result<SimPlugin, OrTfError> {
        let fail = |details: String| OrTfError::ConstructionFailure {
            plugin: interface.to_string(),
            details,
        };
        if self.fail_create {
            return Err(fail("plugin library not loaded".to_string()));
        }
        if interface != PLUGIN_INTERFACE {
            return Err(fail(format!("unknown sensor interface '{interface}'")));
        }
        let mut tokens = args.split_whitespace();
        let name = tokens
            .next()
            .ok_or_else(|| fail("missing instance name".to_string()))?;
        let world = tokens
            .next()
            .ok_or_else(|| fail("missing world frame id".to_string()))?;
        if let Some(extra) = tokens.next() {
            return Err(fail(format!("unexpected creation argument '{extra}'")));
        }
        Ok(SimPlugin::new(
            name.to_string(),
            world.to_string(),
            self.bodies.clone(),
        ))
    }

    fn add_plugin(&mut self, plugin: &SimPlugin) -> Result<(), OrTfError> {
        if self.fail_attach {
            return Err(OrTfError::ConstructionFailure {
                plugin: plugin.name.clone(),
                details: "environment refused the plugin".to_string(),
            });
        }
        self.plugins.push(plugin.clone());
        Ok(())
    }

    fn body_by_name(&self, name: &str) -> Result<SimBody, OrTfError> {
        if lock(&self.bodies).contains(name) {
            Ok(SimBody {
                name: name.to_string(),
            })
        } else {
            Err(OrTfError::InvalidReference(format!(
                "body '{name}' does not exist"
            )))
        }
    }
}

/// Builder for [`SimEnvironment`].
#[derive(Default)]
pub struct SimEnvironmentBuilder {
    body_names: Vec<String>,
    fail_create: bool,
    fail_attach: bool,
}

impl SimEnvironmentBuilder {
    pub fn with_body(mut self, name: impl Into<String>) -> Self {
        self.body_names.push(name.into());
        self
    }

    /// Make every `create_sensor` call fail.
    pub fn fail_plugin_creation(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Make every `add_plugin` call fail.
    pub fn fail_plugin_attach(mut self) -> Self {
        self.fail_attach = true;
        self
    }

    pub fn build(self) -> SimEnvironment {
        SimEnvironment {
            bodies: Arc::new(Mutex::new(self.body_names.into_iter().collect())),
            plugins: Vec::new(),
            fail_create: self.fail_create,
            fail_attach: self.fail_attach,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
