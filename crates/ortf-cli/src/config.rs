//! Configuration Vault – reads/writes `~/.ortf/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user configuration stored in `~/.ortf/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// World frame used when a manifest does not name one.
    #[serde(default = "default_world_frame")]
    pub world_frame: String,

    /// Print dispatched command records as JSON instead of a summary.
    #[serde(default)]
    pub json_output: bool,
}

fn default_world_frame() -> String {
    "world".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world_frame: default_world_frame(),
            json_output: false,
        }
    }
}

impl Config {
    /// The world frame travels as a single token of the plugin's creation
    /// arguments (`or_tf <world_frame>`), so it must be one non-empty word.
    pub fn validate(&self) -> Result<(), String> {
        if self.world_frame.is_empty() || self.world_frame.chars().any(char::is_whitespace) {
            return Err(format!(
                "world_frame '{}' must be a single non-empty token",
                self.world_frame
            ));
        }
        Ok(())
    }
}

/// Return the path to `~/.ortf/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".ortf").join("config.toml")
}

/// Load the config from disk, falling back to defaults when the file is
/// absent.  Environment overrides are applied either way.
pub fn load() -> Result<Config, String> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    cfg.validate()
        .map_err(|e| format!("Invalid config at {}: {}", path.display(), e))?;
    Ok(Some(cfg))
}

/// Apply `ORTF_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ORTF_WORLD_FRAME` | `world_frame` |
/// | `ORTF_JSON_OUTPUT` | `json_output` (`1`/`true` or `0`/`false`) |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ORTF_WORLD_FRAME")
        && !v.trim().is_empty()
    {
        cfg.world_frame = v.trim().to_string();
    }
    if let Ok(v) = std::env::var("ORTF_JSON_OUTPUT") {
        match v.trim() {
            "1" | "true" => cfg.json_output = true,
            "0" | "false" => cfg.json_output = false,
            _ => {}
        }
    }
}

/// Save the config to disk, creating `~/.ortf/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path, creating the parent directory with
/// owner-only permissions.  An invalid world frame is refused before anything
/// touches the disk.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
