//! Typed plugin commands and their wire grammar.
//!
//! Every operation of the transform bridge is one ASCII line of
//! space-separated tokens:
//!
//! ```text
//! RegisterBody <body> <frame> [openrave_frame_in_tf_frame <x> <y> <z> <qw> <qx> <qy> <qz>] [planar_tracking fixed_translation_z <z>]
//! RegisterRobotHand <body> <frame>
//! UnregisterBody <body>
//! Pause
//! Resume
//! Clear
//! ```
//!
//! [`TfCommand::to_command_line`] is the only place lines are built, and
//! [`TfCommand::parse`] reads them back the way the plugin does.
//!
//! # Numbers
//!
//! Numeric tokens use Rust's shortest round-trip `f64` representation with a
//! mandatory fractional part or exponent: `0.0`, `-1.0`, `2.5`, `1e-7`.  Every
//! emitted number parses back to the identical `f64`.
//!
//! # Planar tracking
//!
//! The plugin only accepts `planar_tracking` after an offset clause, so the
//! planar clause is emitted only when an offset is present.  A request for
//! planar tracking without an offset is logged and the clause is left out.

use ortf_geometry::{Matrix4, Quaternion, Transform3D, Vec3};
use ortf_types::OrTfError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// `fixed_translation_z` value meaning "keep the observed Z".
pub const OBSERVED_Z: f64 = -1.0;

const OFFSET_KEYWORD: &str = "openrave_frame_in_tf_frame";
const PLANAR_KEYWORD: &str = "planar_tracking";
const FIXED_Z_KEYWORD: &str = "fixed_translation_z";

/// Optional fields of a body registration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegisterOptions {
    /// Pose of the simulated body's frame inside the tracked frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Transform3D>,
    #[serde(default)]
    pub planar_tracking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_translation_z: Option<f64>,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(mut self, offset: Transform3D) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Offset given as a homogeneous matrix: translation from the last
    /// column, rotation from the upper-left block.
    pub fn offset_matrix(self, m: &Matrix4) -> Self {
        self.offset(Transform3D::from_homogeneous(m))
    }

    pub fn planar_tracking(mut self, enabled: bool) -> Self {
        self.planar_tracking = enabled;
        self
    }

    pub fn fixed_translation_z(mut self, z: f64) -> Self {
        self.fixed_translation_z = Some(z);
        self
    }

    /// The z-override that goes on the wire under planar tracking.
    pub fn effective_fixed_translation_z(&self) -> f64 {
        self.fixed_translation_z.unwrap_or(OBSERVED_Z)
    }
}

/// Arguments of one `RegisterBody` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterBody {
    pub body: String,
    pub frame_id: String,
    #[serde(default)]
    pub options: RegisterOptions,
}

impl RegisterBody {
    pub fn new(body: impl Into<String>, frame_id: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            frame_id: frame_id.into(),
            options: RegisterOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RegisterOptions) -> Self {
        self.options = options;
        self
    }
}

/// One command understood by the transform bridge plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args")]
pub enum TfCommand {
    /// Track `body` at the external frame `frame_id`.
    RegisterBody(RegisterBody),
    /// Track a manipulator end-effector.
    RegisterRobotHand { body: String, frame_id: String },
    /// Drop one registration (a body first, else a hand).
    UnregisterBody { body: String },
    /// Suspend pose updates.
    Pause,
    /// Resume pose updates.
    Resume,
    /// Drop every registration.
    Clear,
}

impl TfCommand {
    /// Command keyword, the first token on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            TfCommand::RegisterBody(_) => "RegisterBody",
            TfCommand::RegisterRobotHand { .. } => "RegisterRobotHand",
            TfCommand::UnregisterBody { .. } => "UnregisterBody",
            TfCommand::Pause => "Pause",
            TfCommand::Resume => "Resume",
            TfCommand::Clear => "Clear",
        }
    }

    /// Render the command as one wire line.
    ///
    /// # Errors
    ///
    /// Returns [`OrTfError::MalformedCommand`] when a name is empty or
    /// contains whitespace, a number is NaN or infinite, or the offset
    /// rotation has zero length.  The plugin splits
    /// on whitespace, so such lines would be silently misread.
    pub fn to_command_line(&self) -> Result<String, OrTfError> {
        let mut tokens: Vec<String> = vec![self.name().to_string()];

        match self {
            TfCommand::RegisterBody(req) => {
                tokens.push(name_token("body name", &req.body)?);
                tokens.push(name_token("frame id", &req.frame_id)?);

                let opts = &req.options;
                if let Some(offset) = opts.offset {
                    if !offset.is_finite() {
                        return Err(OrTfError::MalformedCommand(format!(
                            "offset of '{}' has non-finite values",
                            req.body
                        )));
                    }
                    let q = offset.rotation.normalized().ok_or_else(|| {
                        OrTfError::MalformedCommand(format!(
                            "offset of '{}' has a zero-length rotation",
                            req.body
                        ))
                    })?;
                    tokens.push(OFFSET_KEYWORD.to_string());
                    let t = offset.translation;
                    for v in [t.x, t.y, t.z, q.w, q.x, q.y, q.z] {
                        tokens.push(number_token(v)?);
                    }
                    if opts.planar_tracking {
                        tokens.push(PLANAR_KEYWORD.to_string());
                        tokens.push(FIXED_Z_KEYWORD.to_string());
                        tokens.push(number_token(opts.effective_fixed_translation_z())?);
                    }
                } else if opts.planar_tracking {
                    warn!(
                        body = %req.body,
                        "planar tracking requires a pose offset; omitting planar clause"
                    );
                }
            }
            TfCommand::RegisterRobotHand { body, frame_id } => {
                tokens.push(name_token("body name", body)?);
                tokens.push(name_token("frame id", frame_id)?);
            }
            TfCommand::UnregisterBody { body } => {
                tokens.push(name_token("body name", body)?);
            }
            TfCommand::Pause | TfCommand::Resume | TfCommand::Clear => {}
        }

        Ok(tokens.join(" "))
    }

    /// Read a wire line back into a command, with the plugin's rules: clauses
    /// must appear in order (offset, then `planar_tracking`, then
    /// `fixed_translation_z`), the offset needs exactly seven numbers, and an
    /// absent z-override means [`OBSERVED_Z`].  Trailing tokens are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`OrTfError::MalformedCommand`] describing the first problem.
    pub fn parse(line: &str) -> Result<Self, OrTfError> {
        let mut tokens = line.split_whitespace();
        let keyword = tokens
            .next()
            .ok_or_else(|| OrTfError::MalformedCommand("empty command line".to_string()))?;

        let command = match keyword {
            "RegisterBody" => {
                let body = required(&mut tokens, keyword, "body name")?;
                let frame_id = required(&mut tokens, keyword, "frame id")?;
                let mut options = RegisterOptions::default();

                if let Some(tok) = tokens.next() {
                    if tok != OFFSET_KEYWORD {
                        return Err(unknown_clause(keyword, tok));
                    }
                    let mut v = [0.0f64; 7];
                    for slot in v.iter_mut() {
                        let raw = tokens.next().ok_or_else(|| {
                            OrTfError::MalformedCommand(format!(
                                "{keyword} {OFFSET_KEYWORD} requires 7 values: x y z qw qx qy qz"
                            ))
                        })?;
                        *slot = parse_number(raw)?;
                    }
                    options.offset = Some(Transform3D::new(
                        Vec3::new(v[0], v[1], v[2]),
                        Quaternion::new(v[3], v[4], v[5], v[6]),
                    ));

                    if let Some(tok) = tokens.next() {
                        if tok != PLANAR_KEYWORD {
                            return Err(unknown_clause(keyword, tok));
                        }
                        options.planar_tracking = true;

                        if let Some(tok) = tokens.next() {
                            if tok != FIXED_Z_KEYWORD {
                                return Err(unknown_clause(keyword, tok));
                            }
                            let raw = required(&mut tokens, keyword, FIXED_Z_KEYWORD)?;
                            options.fixed_translation_z = Some(parse_number(raw)?);
                        }
                    }
                }

                TfCommand::RegisterBody(RegisterBody {
                    body: body.to_string(),
                    frame_id: frame_id.to_string(),
                    options,
                })
            }
            "RegisterRobotHand" => TfCommand::RegisterRobotHand {
                body: required(&mut tokens, keyword, "robot name")?.to_string(),
                frame_id: required(&mut tokens, keyword, "frame id")?.to_string(),
            },
            "UnregisterBody" => TfCommand::UnregisterBody {
                body: required(&mut tokens, keyword, "body name")?.to_string(),
            },
            "Pause" => TfCommand::Pause,
            "Resume" => TfCommand::Resume,
            "Clear" => TfCommand::Clear,
            other => {
                return Err(OrTfError::MalformedCommand(format!(
                    "unknown command '{other}'"
                )));
            }
        };

        if let Some(extra) = tokens.next() {
            return Err(OrTfError::MalformedCommand(format!(
                "{keyword}: unexpected trailing token '{extra}'"
            )));
        }
        Ok(command)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token helpers
// ─────────────────────────────────────────────────────────────────────────────

fn name_token(what: &str, value: &str) -> Result<String, OrTfError> {
    if value.is_empty() {
        return Err(OrTfError::MalformedCommand(format!("{what} is empty")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(OrTfError::MalformedCommand(format!(
            "{what} '{value}' contains whitespace"
        )));
    }
    Ok(value.to_string())
}

fn number_token(v: f64) -> Result<String, OrTfError> {
    if !v.is_finite() {
        return Err(OrTfError::MalformedCommand(format!(
            "non-finite number {v} cannot be sent"
        )));
    }
    // Debug keeps the ".0" on integral values and round-trips exactly.
    Ok(format!("{v:?}"))
}

fn parse_number(raw: &str) -> Result<f64, OrTfError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(OrTfError::MalformedCommand(format!("'{raw}' is not a number"))),
    }
}

fn required<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    keyword: &str,
    what: &str,
) -> Result<&'a str, OrTfError> {
    tokens
        .next()
        .ok_or_else(|| OrTfError::MalformedCommand(format!("{keyword} is missing {what}")))
}

fn unknown_clause(keyword: &str, tok: &str) -> OrTfError {
    OrTfError::MalformedCommand(format!("{keyword} unknown clause: {tok}"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn line(cmd: TfCommand) -> String {
        cmd.to_command_line().unwrap()
    }

    fn offset_1_2_3_half_turn_z() -> Matrix4 {
        let (s, c) = PI.sin_cos();
        [
            [c, -s, 0.0, 1.0],
            [s, c, 0.0, 2.0],
            [0.0, 0.0, 1.0, 3.0],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    // ── Formatting ──────────────────────────────────────────────────────────

    #[test]
    fn register_body_without_offset_has_no_clauses() {
        let cmd = TfCommand::RegisterBody(RegisterBody::new("object_1", "goal/base_link"));
        assert_eq!(line(cmd), "RegisterBody object_1 goal/base_link");
    }

    #[test]
    fn identity_offset_clause() {
        let req = RegisterBody::new("table", "vicon/table")
            .with_options(RegisterOptions::new().offset(Transform3D::identity()));
        assert_eq!(
            line(TfCommand::RegisterBody(req)),
            "RegisterBody table vicon/table openrave_frame_in_tf_frame 0.0 0.0 0.0 1.0 0.0 0.0 0.0"
        );
    }

    #[test]
    fn matrix_offset_emits_translation_and_quaternion() {
        let req = RegisterBody::new("box", "mocap/box")
            .with_options(RegisterOptions::new().offset_matrix(&offset_1_2_3_half_turn_z()));
        let text = line(TfCommand::RegisterBody(req));
        let tokens: Vec<&str> = text.split(' ').collect();
        assert_eq!(tokens.len(), 11);
        assert_eq!(tokens[3], "openrave_frame_in_tf_frame");
        assert_eq!(&tokens[4..7], &["1.0", "2.0", "3.0"]);

        let q: Vec<f64> = tokens[7..11].iter().map(|t| t.parse().unwrap()).collect();
        assert!(q[0].abs() < 1e-9, "qw={}", q[0]);
        assert!(q[1].abs() < 1e-9);
        assert!(q[2].abs() < 1e-9);
        assert!((q[3].abs() - 1.0).abs() < 1e-9, "qz={}", q[3]);
    }

    #[test]
    fn planar_tracking_defaults_z_to_observed() {
        let req = RegisterBody::new("cart", "mocap/cart").with_options(
            RegisterOptions::new()
                .offset(Transform3D::identity())
                .planar_tracking(true),
        );
        assert!(line(TfCommand::RegisterBody(req))
            .ends_with("planar_tracking fixed_translation_z -1.0"));
    }

    #[test]
    fn planar_tracking_with_explicit_z() {
        let req = RegisterBody::new("cart", "mocap/cart").with_options(
            RegisterOptions::new()
                .offset(Transform3D::identity())
                .planar_tracking(true)
                .fixed_translation_z(2.5),
        );
        assert!(line(TfCommand::RegisterBody(req))
            .ends_with("planar_tracking fixed_translation_z 2.5"));
    }

    #[test]
    fn planar_tracking_without_offset_is_dropped() {
        let req = RegisterBody::new("cart", "mocap/cart")
            .with_options(RegisterOptions::new().planar_tracking(true).fixed_translation_z(0.4));
        assert_eq!(line(TfCommand::RegisterBody(req)), "RegisterBody cart mocap/cart");
    }

    #[test]
    fn fixed_z_without_planar_is_not_emitted() {
        let req = RegisterBody::new("cart", "mocap/cart").with_options(
            RegisterOptions::new()
                .offset(Transform3D::identity())
                .fixed_translation_z(0.4),
        );
        assert!(!line(TfCommand::RegisterBody(req)).contains("planar_tracking"));
    }

    #[test]
    fn control_commands_are_single_tokens() {
        assert_eq!(line(TfCommand::Pause), "Pause");
        assert_eq!(line(TfCommand::Resume), "Resume");
        assert_eq!(line(TfCommand::Clear), "Clear");
    }

    #[test]
    fn hand_and_unregister_lines() {
        assert_eq!(
            line(TfCommand::RegisterRobotHand {
                body: "herb".to_string(),
                frame_id: "herb/right_hand".to_string(),
            }),
            "RegisterRobotHand herb herb/right_hand"
        );
        assert_eq!(
            line(TfCommand::UnregisterBody { body: "object_1".to_string() }),
            "UnregisterBody object_1"
        );
    }

    #[test]
    fn whitespace_in_names_is_rejected() {
        let cmd = TfCommand::RegisterBody(RegisterBody::new("my body", "frame"));
        assert!(matches!(cmd.to_command_line(), Err(OrTfError::MalformedCommand(_))));

        let cmd = TfCommand::UnregisterBody { body: String::new() };
        assert!(matches!(cmd.to_command_line(), Err(OrTfError::MalformedCommand(_))));
    }

    #[test]
    fn non_finite_offset_is_rejected() {
        let bad = Transform3D::new(Vec3::new(f64::INFINITY, 0.0, 0.0), Quaternion::identity());
        let req = RegisterBody::new("a", "b").with_options(RegisterOptions::new().offset(bad));
        assert!(matches!(
            TfCommand::RegisterBody(req).to_command_line(),
            Err(OrTfError::MalformedCommand(_))
        ));
    }

    fn offset_line(options: RegisterOptions) -> Result<String, OrTfError> {
        TfCommand::RegisterBody(RegisterBody::new("a", "b").with_options(options)).to_command_line()
    }

    #[test]
    fn nan_rotation_is_rejected_not_replaced() {
        let bad = Transform3D::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::new(f64::NAN, 0.0, 0.0, 0.0));
        let err = offset_line(RegisterOptions::new().offset(bad)).unwrap_err();
        assert!(matches!(err, OrTfError::MalformedCommand(_)));
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn nan_matrix_rotation_is_rejected() {
        let mut m = offset_1_2_3_half_turn_z();
        m[0][0] = f64::NAN;
        assert!(matches!(
            offset_line(RegisterOptions::new().offset_matrix(&m)),
            Err(OrTfError::MalformedCommand(_))
        ));
    }

    #[test]
    fn zero_rotation_is_rejected() {
        let bad = Transform3D::new(Vec3::zero(), Quaternion::new(0.0, 0.0, 0.0, 0.0));
        let err = offset_line(RegisterOptions::new().offset(bad)).unwrap_err();
        assert!(err.to_string().contains("zero-length rotation"));
    }

    #[test]
    fn unnormalized_rotation_is_scaled_to_unit() {
        let t = Transform3D::new(Vec3::zero(), Quaternion::new(2.0, 0.0, 0.0, 0.0));
        assert_eq!(
            offset_line(RegisterOptions::new().offset(t)).unwrap(),
            "RegisterBody a b openrave_frame_in_tf_frame 0.0 0.0 0.0 1.0 0.0 0.0 0.0"
        );
    }

    #[test]
    fn small_numbers_keep_full_precision() {
        assert_eq!(number_token(1e-7).unwrap(), "1e-7");
        assert_eq!(number_token(0.1).unwrap().parse::<f64>().unwrap(), 0.1);
        assert_eq!(number_token(-1.0).unwrap(), "-1.0");
    }

    // ── Parsing ─────────────────────────────────────────────────────────────

    #[test]
    fn parse_reads_full_register_body() {
        let cmd = TfCommand::parse(
            "RegisterBody cart mocap/cart openrave_frame_in_tf_frame 1.0 2.0 3.0 1.0 0.0 0.0 0.0 planar_tracking fixed_translation_z 0.25",
        )
        .unwrap();
        let TfCommand::RegisterBody(req) = cmd else {
            panic!("unexpected variant");
        };
        assert_eq!(req.body, "cart");
        assert_eq!(req.frame_id, "mocap/cart");
        let offset = req.options.offset.unwrap();
        assert_eq!(offset.translation, Vec3::new(1.0, 2.0, 3.0));
        assert!(req.options.planar_tracking);
        assert_eq!(req.options.fixed_translation_z, Some(0.25));
    }

    #[test]
    fn parse_planar_without_z_uses_observed() {
        let cmd = TfCommand::parse(
            "RegisterBody cart f openrave_frame_in_tf_frame 0 0 0 1 0 0 0 planar_tracking",
        )
        .unwrap();
        let TfCommand::RegisterBody(req) = cmd else {
            panic!("unexpected variant");
        };
        assert!(req.options.planar_tracking);
        assert_eq!(req.options.effective_fixed_translation_z(), OBSERVED_Z);
    }

    #[test]
    fn parse_rejects_planar_before_offset() {
        let err = TfCommand::parse("RegisterBody cart f planar_tracking").unwrap_err();
        assert!(err.to_string().contains("unknown clause"));
    }

    #[test]
    fn parse_rejects_short_offset() {
        let err = TfCommand::parse("RegisterBody cart f openrave_frame_in_tf_frame 0 0 0 1").unwrap_err();
        assert!(err.to_string().contains("7 values"));
    }

    #[test]
    fn parse_rejects_missing_arguments_and_unknown_commands() {
        assert!(TfCommand::parse("RegisterBody only_body").is_err());
        assert!(TfCommand::parse("UnregisterBody").is_err());
        assert!(TfCommand::parse("Teleport x").is_err());
        assert!(TfCommand::parse("   ").is_err());
        assert!(TfCommand::parse("Pause now").is_err());
    }

    #[test]
    fn parse_rejects_nan_tokens() {
        assert!(TfCommand::parse("RegisterBody a b openrave_frame_in_tf_frame NaN 0 0 1 0 0 0").is_err());
    }

    #[test]
    fn formatted_lines_parse_back() {
        let original = TfCommand::RegisterBody(RegisterBody::new("box", "mocap/box").with_options(
            RegisterOptions::new()
                .offset_matrix(&offset_1_2_3_half_turn_z())
                .planar_tracking(true)
                .fixed_translation_z(0.75),
        ));
        let TfCommand::RegisterBody(parsed) = TfCommand::parse(&line(original.clone())).unwrap()
        else {
            panic!("unexpected variant");
        };
        let TfCommand::RegisterBody(expected) = original else {
            unreachable!();
        };
        assert_eq!(parsed.body, expected.body);
        assert_eq!(parsed.options.fixed_translation_z, Some(0.75));
        let (p, e) = (parsed.options.offset.unwrap(), expected.options.offset.unwrap());
        assert_eq!(p.translation, e.translation);
        assert!(p.rotation.same_rotation(e.rotation, 1e-12));
    }

    #[test]
    fn command_json_is_tagged() {
        let json = serde_json::to_string(&TfCommand::UnregisterBody { body: "a".to_string() }).unwrap();
        assert!(json.contains("\"command\":\"UnregisterBody\""));
        let back: TfCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "UnregisterBody");
    }
}
