use anyhow::{Context, Result};
use std::{fs, path::Path};
use tracing::warn;
use wayfarer_core::SimConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/sim.toml";

/// Load simulation tunables from the default path.
pub fn load() -> SimConfig {
    load_from_path(Path::new(DEFAULT_CONFIG_PATH))
}

/// Load tunables from an explicit path, falling back to defaults on errors.
/// Out-of-range values are clamped (see [`SimConfig::sanitized`]).
pub fn load_from_path(path: &Path) -> SimConfig {
    match fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<SimConfig>(&contents) {
            Ok(cfg) => cfg.sanitized(),
            Err(err) => {
                warn!("Failed to parse {}: {err}. Using defaults", path.display());
                SimConfig::default()
            }
        },
        Err(err) => {
            if path != Path::new(DEFAULT_CONFIG_PATH) || err.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Failed to read {}: {err}. Using defaults", path.display());
            } else {
                warn!(
                    "Simulation config not found at {}. Using defaults",
                    path.display()
                );
            }
            SimConfig::default()
        }
    }
}

/// Save tunables to an explicit path.
pub fn save_to_path(config: &SimConfig, path: &Path) -> Result<()> {
    let toml = toml::to_string_pretty(config).context("Failed to serialize simulation config")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, toml).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
