use std::collections::BTreeMap;
use std::fs::{File, read_to_string};
use std::io::{Error as IoError, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::backoff::{BackoffError, BackoffPolicy};

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("IoError: {0}")]
    IoError(#[from] IoError),
    #[error("TomlError: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("TomlSerializeError: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("InvalidBackoff: {0}")]
    InvalidBackoff(#[from] BackoffError),
}

/// Per-store settings fixed at construction.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RegistryConfig {
    /// labels every visible object must carry with exactly this value
    pub label_scope: BTreeMap<String, String>,
    /// schedule for re-running a patch after a version conflict
    pub patch_conflict_backoff: BackoffPolicy,
}

impl RegistryConfig {
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.label_scope.insert(key.into(), value.into());
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.patch_conflict_backoff = backoff;
        self
    }

    pub fn load_from<T: AsRef<Path>>(path: T) -> Result<Self, LoadConfigError> {
        let path_ref = path.as_ref();
        debug!(?path_ref, "loading registry config");

        let file_str = read_to_string(path_ref)?;
        Self::load_str(&file_str)
    }

    pub fn load_str(config: &str) -> Result<Self, LoadConfigError> {
        let config: Self = toml::from_str(config)?;
        config.patch_conflict_backoff.validate()?;
        Ok(config)
    }

    pub fn save_to<T: AsRef<Path>>(&self, path: T) -> Result<(), LoadConfigError> {
        let path_ref = path.as_ref();
        debug!("saving registry config: {:#?} to: {:#?}", self, path_ref);
        let toml = toml::to_string(self)?;

        let mut file = File::create(path_ref)?;
        file.write_all(toml.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_load_full() {
        let config = RegistryConfig::load_str(
            r#"
            [label-scope]
            "example.io/tenant-visible" = "true"
            env = "prod"

            [patch-conflict-backoff]
            initial = "20ms"
            factor = 2.0
            jitter = 0.0
            steps = 3
            cap = "1s"
            "#,
        )
        .expect("parse");

        assert_eq!(config.label_scope.len(), 2);
        assert_eq!(config.label_scope["env"], "prod");
        let backoff = &config.patch_conflict_backoff;
        assert_eq!(backoff.initial, Duration::from_millis(20));
        assert_eq!(backoff.steps, 3);
        assert_eq!(backoff.cap, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_empty_uses_defaults() {
        let config = RegistryConfig::load_str("").expect("parse");
        assert!(config.label_scope.is_empty());
        assert_eq!(config.patch_conflict_backoff, BackoffPolicy::default());
    }

    #[test]
    fn test_partial_backoff_keeps_defaults() {
        let config = RegistryConfig::load_str(
            r#"
            [patch-conflict-backoff]
            steps = 9
            "#,
        )
        .expect("parse");
        assert_eq!(config.patch_conflict_backoff.steps, 9);
        assert_eq!(config.patch_conflict_backoff.initial, Duration::from_millis(10));
    }

    #[test]
    fn test_rejects_bad_duration() {
        let err = RegistryConfig::load_str(
            r#"
            [patch-conflict-backoff]
            initial = "soon"
            "#,
        )
        .expect_err("bad duration");
        assert!(matches!(err, LoadConfigError::TomlError(_)));
    }

    #[test]
    fn test_rejects_unusable_backoff() {
        let err = RegistryConfig::load_str(
            r#"
            [patch-conflict-backoff]
            factor = -1.0
            "#,
        )
        .expect_err("negative factor");
        assert!(matches!(
            err,
            LoadConfigError::InvalidBackoff(BackoffError::InvalidFactor(_))
        ));

        let err = RegistryConfig::load_str(
            r#"
            [patch-conflict-backoff]
            jitter = 1e300
            "#,
        )
        .expect_err("huge jitter");
        assert!(matches!(
            err,
            LoadConfigError::InvalidBackoff(BackoffError::InvalidJitter(_))
        ));
    }

    #[test]
    fn test_large_factor_with_cap_loads() {
        let config = RegistryConfig::load_str(
            r#"
            [patch-conflict-backoff]
            initial = "1s"
            factor = 10.0
            steps = 30
            cap = "1s"
            "#,
        )
        .expect("parse");
        let backoff = &config.patch_conflict_backoff;
        let delays: Vec<_> = backoff
            .delays()
            .expect("schedule")
            .take(backoff.attempts() as usize - 1)
            .collect();
        assert_eq!(delays.len(), 29);
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(1100)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.toml");

        let config = RegistryConfig::default()
            .with_label("env", "prod")
            .with_backoff(
                BackoffPolicy::new(Duration::from_millis(5), 1.5, 4)
                    .with_cap(Duration::from_millis(50)),
            );
        config.save_to(&path).expect("save");

        let loaded = RegistryConfig::load_from(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = RegistryConfig::load_from(dir.path().join("absent.toml")).expect_err("missing");
        assert!(matches!(err, LoadConfigError::IoError(_)));
    }
}
