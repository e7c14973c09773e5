//! Registration manifests – a TOML description of what to track.
//!
//! ```toml
//! world_frame = "world"
//!
//! [[body]]
//! name = "object_1"
//! frame = "goal/base_link"
//!
//! [[body]]
//! name = "cart"
//! frame = "mocap/cart"
//! offset = { translation = [0.0, 0.0, 0.1], rotation = [1.0, 0.0, 0.0, 0.0] }
//! planar_tracking = true
//! fixed_translation_z = 0.05
//!
//! [[hand]]
//! name = "herb"
//! frame = "herb/right_palm"
//! ```
//!
//! An offset is either `translation` + `rotation` (w, x, y, z) or a row-major
//! 4x4 `matrix`.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use ortf_client::{RegisterBody, RegisterOptions, TfCommand};
use ortf_geometry::{Matrix4, Quaternion, Transform3D, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Overrides the configured world frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_frame: Option<String>,

    #[serde(default, rename = "body")]
    pub bodies: Vec<BodyEntry>,

    #[serde(default, rename = "hand")]
    pub hands: Vec<HandEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyEntry {
    pub name: String,
    pub frame: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<OffsetEntry>,
    #[serde(default)]
    pub planar_tracking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_translation_z: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandEntry {
    pub name: String,
    pub frame: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OffsetEntry {
    Matrix {
        matrix: Matrix4,
    },
    Pose {
        translation: [f64; 3],
        #[serde(default = "identity_rotation")]
        rotation: [f64; 4],
    },
}

fn identity_rotation() -> [f64; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

impl OffsetEntry {
    /// The offset as written.  Normalizing and validating the rotation is
    /// left to the command formatter.
    pub fn to_transform(&self) -> Transform3D {
        match self {
            OffsetEntry::Matrix { matrix } => Transform3D::from_homogeneous(matrix),
            OffsetEntry::Pose {
                translation: [x, y, z],
                rotation: [qw, qx, qy, qz],
            } => Transform3D::new(
                Vec3::new(*x, *y, *z),
                Quaternion::new(*qw, *qx, *qy, *qz),
            ),
        }
    }
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read manifest at {}: {}", path.display(), e))?;
        Self::from_toml_str(&raw)
            .map_err(|e| format!("Failed to parse manifest {}: {}", path.display(), e))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }

    /// Commands in dispatch order: bodies, then hands, each in file order.
    pub fn commands(&self) -> Vec<TfCommand> {
        let bodies = self.bodies.iter().map(|b| {
            let mut options = RegisterOptions::new().planar_tracking(b.planar_tracking);
            if let Some(offset) = &b.offset {
                options = options.offset(offset.to_transform());
            }
            if let Some(z) = b.fixed_translation_z {
                options = options.fixed_translation_z(z);
            }
            TfCommand::RegisterBody(RegisterBody::new(&b.name, &b.frame).with_options(options))
        });
        let hands = self.hands.iter().map(|h| TfCommand::RegisterRobotHand {
            body: h.name.clone(),
            frame_id: h.frame.clone(),
        });
        bodies.chain(hands).collect()
    }

    /// Every body name the manifest refers to.
    pub fn body_names(&self) -> BTreeSet<&str> {
        self.bodies
            .iter()
            .map(|b| b.name.as_str())
            .chain(self.hands.iter().map(|h| h.name.as_str()))
            .collect()
    }
}
