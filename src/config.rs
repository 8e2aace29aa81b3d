use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::export::model::ExportFormat;
use crate::symbols::BuildOptions;

pub const CONFIG_FILE: &str = "module-graph.toml";

/// Configuration loaded from `module-graph.toml` in the working directory.
///
/// Every key is optional; command-line flags take precedence.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ModuleGraphConfig {
    /// Directories searched for modules, relative to the config file's directory.
    pub search_paths: Option<Vec<PathBuf>>,
    /// Show private names in listings by default.
    pub show_private: Option<bool>,
    /// Default format for `export`.
    pub export_format: Option<ExportFormat>,
    /// Maximum length of a constant's value repr.
    pub max_repr: Option<usize>,
}

impl ModuleGraphConfig {
    /// Load configuration from `module-graph.toml` in the given directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    return Self::default();
                }
            },
            Err(err) => {
                log::warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                return Self::default();
            }
        };

        if let Some(paths) = config.search_paths.as_mut() {
            for path in paths.iter_mut().filter(|p| p.is_relative()) {
                *path = root.join(&*path);
            }
        }
        log::debug!("loaded {}", config_path.display());
        config
    }

    /// CLI paths win; otherwise the configured ones; otherwise empty (current directory).
    pub fn search_paths(&self, cli_paths: &[PathBuf]) -> Vec<PathBuf> {
        if !cli_paths.is_empty() {
            return cli_paths.to_vec();
        }
        self.search_paths.clone().unwrap_or_default()
    }

    pub fn show_private(&self, cli_flag: bool) -> bool {
        cli_flag || self.show_private.unwrap_or(false)
    }

    pub fn build_options(&self) -> BuildOptions {
        let mut options = BuildOptions::default();
        if let Some(max_repr) = self.max_repr {
            options.max_repr = max_repr;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModuleGraphConfig::load(dir.path());
        assert_eq!(config, ModuleGraphConfig::default());
        assert_eq!(config.build_options().max_repr, 50);
    }

    #[test]
    fn test_all_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "search_paths = [\"src\", \"/abs\"]\nshow_private = true\nexport_format = \"json\"\nmax_repr = 10\n",
        )
        .unwrap();
        let config = ModuleGraphConfig::load(dir.path());
        assert_eq!(
            config.search_paths(&[]),
            vec![dir.path().join("src"), PathBuf::from("/abs")]
        );
        assert!(config.show_private(false));
        assert_eq!(config.export_format, Some(ExportFormat::Json));
        assert_eq!(config.build_options().max_repr, 10);
    }

    #[test]
    fn test_cli_paths_override_config() {
        let config = ModuleGraphConfig {
            search_paths: Some(vec![PathBuf::from("lib")]),
            ..Default::default()
        };
        assert_eq!(
            config.search_paths(&[PathBuf::from("other")]),
            vec![PathBuf::from("other")]
        );
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "max_repr = \"lots\"\n").unwrap();
        assert_eq!(ModuleGraphConfig::load(dir.path()), ModuleGraphConfig::default());
    }
}
