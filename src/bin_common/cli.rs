//! Command line helpers shared by the binaries
//!
//! Resolves which YAML file a binary reads: an explicit path argument,
//! then the config type's environment variable, then its default location.

use std::path::PathBuf;

/// Which configuration file a binary wants
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Live client settings
    Live,
    /// Explicit path, bypasses the environment
    Custom(String),
}

impl ConfigType {
    /// Location used when the environment says nothing
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Live => "config/live.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Variable that may point at another file
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Live => "LIVE_CONFIG_PATH",
            ConfigType::Custom(_) => "CONFIG_PATH",
        }
    }
}

/// Resolve the config path for `config_type`
///
/// # Examples
/// ```
/// use ticket_live::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Custom("live.yaml".into()));
/// assert_eq!(path.to_str(), Some("live.yaml"));
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    match config_type {
        ConfigType::Custom(path) => PathBuf::from(path),
        other => match std::env::var(other.env_var_name()) {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => PathBuf::from(other.default_path()),
        },
    }
}

/// First positional argument wins, otherwise resolve `fallback`
pub fn config_path_from_args(args: &[String], fallback: ConfigType) -> PathBuf {
    match args.iter().find(|arg| !arg.starts_with('-')) {
        Some(path) => load_config_from_env(ConfigType::Custom(path.clone())),
        None => load_config_from_env(fallback),
    }
}

/// Arguments after the program name
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_locations() {
        assert_eq!(ConfigType::Live.default_path(), "config/live.yaml");
        assert_eq!(
            ConfigType::Custom("other/live.yaml".into()).default_path(),
            "other/live.yaml"
        );
    }

    #[test]
    fn test_positional_argument_wins() {
        let args = vec!["--verbose".to_string(), "staging.yaml".to_string()];
        assert_eq!(
            config_path_from_args(&args, ConfigType::Live),
            PathBuf::from("staging.yaml")
        );
    }

    #[test]
    fn test_flags_are_not_paths() {
        let args = vec!["--verbose".to_string()];
        let fallback = ConfigType::Custom("fallback.yaml".into());
        assert_eq!(
            config_path_from_args(&args, fallback),
            PathBuf::from("fallback.yaml")
        );
    }
}
