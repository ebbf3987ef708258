//! Default paths for KaiSheng components
//!
//! Paths are user-writable by default:
//! - Config: `$XDG_CONFIG_HOME/kaisheng/config.toml` or `~/.config/kaisheng/config.toml`
//! - Data: `$XDG_DATA_HOME/kaisheng` or `~/.local/share/kaisheng`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const KAISHENG_CONFIG_ENV: &str = "KAISHENG_CONFIG";

/// Application subdirectory name
const APP_DIR: &str = "kaisheng";

const CONFIG_FILENAME: &str = "config.toml";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$KAISHENG_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/kaisheng/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/kaisheng/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(KAISHENG_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// `$XDG_DATA_HOME/kaisheng`, falling back to `~/.local/share/kaisheng`.
/// `KAISHENG_DATA_DIR` is applied by the CLI on top of this.
pub fn default_data_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}
