//! Path utilities for DropLab configuration files

use std::path::PathBuf;

/// Get the DropLab configuration directory
///
/// Returns: `$XDG_CONFIG_HOME/droplab` (or the platform equivalent),
/// falling back to `./droplab` when no config directory is known.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("droplab")
}

/// Get the default config file path
///
/// Returns: `<config dir>/droplab/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_droplab() {
        assert!(default_config_dir().ends_with("droplab"));
    }

    #[test]
    fn test_config_path_includes_filename() {
        assert!(default_config_path().ends_with("droplab/config.yaml"));
    }
}
