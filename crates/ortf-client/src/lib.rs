//! `ortf-client` – typed client for the `or_tf` transform bridge plugin.
//!
//! The plugin runs inside a robotics simulator and keeps simulated bodies in
//! sync with frames of an external transform tree.  It is driven entirely by
//! one-line text commands; this crate turns typed calls into those lines.
//!
//! # Modules
//!
//! - [`command`] – [`TfCommand`]: one variant per plugin command, with the
//!   single formatter ([`TfCommand::to_command_line`]) and a parser that reads
//!   lines back the way the plugin does.
//! - [`client`] – [`TfClient`]: creates and attaches the plugin, then sends
//!   one command per call.
//! - [`environment`] / [`plugin`] – the collaborator traits a simulator
//!   binding implements ([`Environment`], [`Body`], [`SensorPlugin`]).
//! - [`sim`] – [`SimEnvironment`][sim::SimEnvironment]: in-process stand-ins
//!   that record traffic and mirror the plugin's registration state.
//!
//! # Example
//!
//! ```rust
//! use ortf_client::sim::SimEnvironment;
//! use ortf_client::{Environment, RegisterOptions, TfClient};
//! use ortf_geometry::Transform3D;
//!
//! let mut env = SimEnvironment::builder().with_body("cart").build();
//! let mut tf = TfClient::new(&mut env, "world").unwrap();
//!
//! let cart = env.body_by_name("cart").unwrap();
//! tf.register_body(
//!     &cart,
//!     "mocap/cart",
//!     RegisterOptions::new()
//!         .offset(Transform3D::identity())
//!         .planar_tracking(true),
//! )
//! .unwrap();
//! tf.pause().unwrap();
//!
//! assert_eq!(
//!     tf.plugin().lines(),
//!     vec![
//!         "RegisterBody cart mocap/cart openrave_frame_in_tf_frame 0.0 0.0 0.0 1.0 0.0 0.0 0.0 planar_tracking fixed_translation_z -1.0",
//!         "Pause",
//!     ]
//! );
//! ```

pub mod client;
pub mod command;
pub mod environment;
pub mod plugin;
pub mod sim;

pub use client::TfClient;
pub use command::{OBSERVED_Z, RegisterBody, RegisterOptions, TfCommand};
pub use environment::{Body, Environment};
pub use plugin::SensorPlugin;

pub use ortf_types::{CommandRecord, OrTfError, TrackingState};
