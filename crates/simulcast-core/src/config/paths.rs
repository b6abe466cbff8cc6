//! Standard locations of simulcast files

use std::path::PathBuf;

/// `~/.config/simulcast` (or the platform equivalent)
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("simulcast")
}

/// `~/.config/simulcast/config.yaml`
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_layout() {
        let path = default_config_path();
        assert!(path.ends_with("simulcast/config.yaml"));
    }
}
