//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use ft_core::TrackingMode;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the collector's database file.
    pub database_path: PathBuf,
    /// Where `ft track` posts finished sessions.
    pub endpoint: String,
    /// Address `ft serve` binds to.
    pub listen_addr: String,
    /// Whether sessions are keyed by domain or full URL.
    pub mode: TrackingMode,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("endpoint", &self.endpoint)
            .field("listen_addr", &self.listen_addr)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("ft.db"),
            endpoint: ft_report::DEFAULT_ENDPOINT.to_string(),
            listen_addr: "127.0.0.1:8080".to_string(),
            mode: TrackingMode::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (FT_*)
        figment = figment.merge(Env::prefixed("FT_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for ft.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ft"))
}

/// Returns the platform-specific data directory for ft.
///
/// On Linux: `~/.local/share/ft`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ft"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_ft() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "ft");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("ft.db"));
    }

    #[test]
    fn test_default_config_points_at_local_collector() {
        let config = Config::default();
        assert_eq!(config.endpoint, "http://localhost:8080/");
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.mode, TrackingMode::Domain);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"mode = "url""#).unwrap();
        writeln!(file, r#"listen_addr = "127.0.0.1:9999""#).unwrap();
        file.flush().unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.mode, TrackingMode::Url);
        assert_eq!(config.listen_addr, "127.0.0.1:9999");
        assert_eq!(config.endpoint, "http://localhost:8080/");
    }

    #[test]
    fn test_config_rejects_unknown_mode() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"mode = "host""#).unwrap();
        file.flush().unwrap();

        assert!(Config::load_from(Some(file.path())).is_err());
    }
}
