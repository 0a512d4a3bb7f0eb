//! Application configuration management.
//!
//! This module handles loading the application configuration, which selects
//! the document store backend and its settings.
//!
//! Configuration is stored at `~/.config/bloodbank-dashboard/config.json`.
//! Environment variables (optionally from a `.env` file) override it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bloodbank_core::store::StoreSettings;
use serde::{Deserialize, Serialize};

/// Application name used for config/data/log directory paths
const APP_NAME: &str = "bloodbank-dashboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Firestore database used when none is configured
const DEFAULT_DATABASE: &str = "(default)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Firestore,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub backend: Option<Backend>,
    pub firestore_project_id: Option<String>,
    pub firestore_database: Option<String>,
    pub firestore_access_token: Option<String>,
    pub firestore_emulator_host: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = var("BLOODBANK_BACKEND") {
            match backend.to_lowercase().as_str() {
                "firestore" => self.backend = Some(Backend::Firestore),
                "local" => self.backend = Some(Backend::Local),
                other => tracing::warn!(backend = other, "Unknown BLOODBANK_BACKEND, ignoring"),
            }
        }
        if let Some(project) = var("FIRESTORE_PROJECT_ID") {
            self.firestore_project_id = Some(project);
        }
        if let Some(database) = var("FIRESTORE_DATABASE") {
            self.firestore_database = Some(database);
        }
        if let Some(token) = var("FIRESTORE_ACCESS_TOKEN") {
            self.firestore_access_token = Some(token);
        }
        if let Some(host) = var("FIRESTORE_EMULATOR_HOST") {
            self.firestore_emulator_host = Some(host);
        }
        if let Some(dir) = var("BLOODBANK_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Backend in effect: explicit choice, else Firestore when a project is set.
    pub fn backend(&self) -> Backend {
        self.backend.unwrap_or(if self.firestore_project_id.is_some() {
            Backend::Firestore
        } else {
            Backend::Local
        })
    }

    pub fn store_settings(&self) -> Result<StoreSettings> {
        match self.backend() {
            Backend::Firestore => {
                let project_id = self
                    .firestore_project_id
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("Firestore backend selected but no project id configured (set FIRESTORE_PROJECT_ID)"))?;
                Ok(StoreSettings::Firestore {
                    project_id,
                    database: self
                        .firestore_database
                        .clone()
                        .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
                    access_token: self.firestore_access_token.clone(),
                    emulator_host: self.firestore_emulator_host.clone(),
                })
            }
            Backend::Local => Ok(StoreSettings::Local {
                data_dir: self.data_dir()?,
            }),
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn log_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_backend_is_local() {
        let config = Config::default();
        assert_eq!(config.backend(), Backend::Local);
    }

    #[test]
    fn test_project_implies_firestore() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("FIRESTORE_PROJECT_ID", "blood-net")]));
        assert_eq!(config.backend(), Backend::Firestore);

        match config.store_settings().unwrap() {
            StoreSettings::Firestore { project_id, database, .. } => {
                assert_eq!(project_id, "blood-net");
                assert_eq!(database, "(default)");
            }
            other => panic!("unexpected settings: {:?}", other),
        }
    }

    #[test]
    fn test_explicit_local_wins() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("FIRESTORE_PROJECT_ID", "blood-net"),
            ("BLOODBANK_BACKEND", "LOCAL"),
            ("BLOODBANK_DATA_DIR", "/tmp/bloodbank"),
        ]));

        assert_eq!(
            config.store_settings().unwrap(),
            StoreSettings::Local {
                data_dir: PathBuf::from("/tmp/bloodbank")
            }
        );
    }

    #[test]
    fn test_firestore_without_project_is_error() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("BLOODBANK_BACKEND", "firestore")]));
        assert!(config.store_settings().is_err());
    }

    #[test]
    fn test_blank_overrides_ignored() {
        let mut config = Config {
            firestore_project_id: Some("from-file".to_string()),
            ..Default::default()
        };
        config.apply_overrides(env(&[("FIRESTORE_PROJECT_ID", "  ")]));
        assert_eq!(config.firestore_project_id.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_parse_config_file() {
        let json = r#"{"backend": "firestore", "firestore_project_id": "p", "firestore_emulator_host": "localhost:8080"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.backend, Some(Backend::Firestore));
        assert_eq!(config.firestore_emulator_host.as_deref(), Some("localhost:8080"));
    }
}
