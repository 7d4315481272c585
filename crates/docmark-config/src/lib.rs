use docmark_engine::{ActiveTabs, MapXrefResolver, ParseOptions, XrefSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// A cross reference known ahead of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrefEntry {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Grammar options handed to the parser.
    pub parser: ParseOptions,
    /// Directory include paths are resolved against when the including file
    /// has no directory of its own.
    pub include_root: PathBuf,
    /// Tab conditions shown by default.
    pub active_tabs: Vec<String>,
    /// uid -> target.
    pub xrefs: BTreeMap<String, XrefEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parser: ParseOptions::default(),
            include_root: PathBuf::from("."),
            active_tabs: Vec::new(),
            xrefs: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the include root
        config.include_root =
            Self::expand_path(&config.include_root).unwrap_or(config.include_root);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/docmark");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }

    /// The configured cross references as an in-memory resolver.
    pub fn xref_resolver(&self) -> MapXrefResolver {
        let mut resolver = MapXrefResolver::new();
        for (uid, entry) in &self.xrefs {
            resolver.insert(
                uid.clone(),
                XrefSpec {
                    href: entry.href.clone(),
                    name: entry.name.clone(),
                    full_name: entry.full_name.clone(),
                },
            );
        }
        resolver
    }

    pub fn tab_conditions(&self) -> ActiveTabs {
        ActiveTabs::new(self.active_tabs.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmark_engine::{TabConditions, XrefResolver};
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    fn sample() -> Config {
        let mut xrefs = BTreeMap::new();
        xrefs.insert(
            "System.String".to_string(),
            XrefEntry {
                href: "/api/System.String.html".into(),
                name: Some("String".into()),
                full_name: None,
            },
        );
        Config {
            parser: ParseOptions {
                legacy: false,
                ..ParseOptions::default()
            },
            include_root: PathBuf::from("/tmp/docs"),
            active_tabs: vec!["linux".into()],
            xrefs,
        }
    }

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/docmark/config.toml"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = sample();
        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("active_tabs = [\"win\"]\n").unwrap();
        assert_eq!(config.parser, ParseOptions::default());
        assert_eq!(config.include_root, PathBuf::from("."));
        assert!(config.xrefs.is_empty());

        let config: Config = toml::from_str("[parser]\ngfm = false\n").unwrap();
        assert!(!config.parser.gfm);
        assert!(config.parser.extensions);
        assert_eq!(config.parser.max_loop_count, 10);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("DOCMARK_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$DOCMARK_TEST_VAR/subdir");
        let expanded = Config::expand_path(&path).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/env/path/subdir"));

        unsafe {
            env::remove_var("DOCMARK_TEST_VAR");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "active_tabs = 3\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_load_written_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        let test_config = sample();

        std::fs::write(&config_file, toml::to_string_pretty(&test_config).unwrap()).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_include_root_with_env_var_in_toml() {
        unsafe {
            env::set_var("DOCMARK_DOCS_ROOT", "/custom/docs");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "include_root = \"$DOCMARK_DOCS_ROOT/src\"\n").unwrap();
        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config.include_root, PathBuf::from("/custom/docs/src"));

        unsafe {
            env::remove_var("DOCMARK_DOCS_ROOT");
        }
    }

    #[test]
    fn test_collaborators_from_config() {
        let config = sample();
        let spec = config.xref_resolver().resolve("System.String").unwrap();
        assert_eq!(spec.href, "/api/System.String.html");
        assert_eq!(spec.name.as_deref(), Some("String"));
        assert!(config.xref_resolver().resolve("Other").is_none());

        let tabs = config.tab_conditions();
        assert!(tabs.is_visible("linux"));
        assert!(!tabs.is_visible("windows"));
    }
}
