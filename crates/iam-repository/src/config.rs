use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Repository configuration for the local SQLite cache.
///
/// `database_file` is resolved relative to the application data directory.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RepositoryManagerConfigRaw {
    pub database_file: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl RepositoryManagerConfigRaw {
    pub fn resolve(self, app_data_path: &Path) -> Result<RepositoryManagerConfig, ConfigError> {
        if self.database_file.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "repository.database_file must not be empty".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidConfig(
                "repository.max_connections must be at least 1".to_string(),
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidConfig(format!(
                "repository.min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }

        Ok(RepositoryManagerConfig {
            database_path: app_data_path.join(self.database_file),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RepositoryManagerConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl RepositoryManagerConfig {
    pub fn connection_string(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.database_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RepositoryManagerConfigRaw {
        RepositoryManagerConfigRaw {
            database_file: "cache/access_log.sqlite".to_string(),
            max_connections: 4,
            min_connections: 1,
        }
    }

    #[test]
    fn test_resolve_joins_app_data_path() {
        let config = raw().resolve(Path::new("/var/lib/iam")).unwrap();
        assert_eq!(
            config.database_path,
            PathBuf::from("/var/lib/iam/cache/access_log.sqlite")
        );
        assert_eq!(
            config.connection_string(),
            "sqlite:///var/lib/iam/cache/access_log.sqlite?mode=rwc"
        );
    }

    #[test]
    fn test_resolve_rejects_inverted_pool_bounds() {
        let config = RepositoryManagerConfigRaw {
            min_connections: 8,
            ..raw()
        };
        assert!(matches!(
            config.resolve(Path::new(".")),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_empty_pool() {
        let config = RepositoryManagerConfigRaw {
            max_connections: 0,
            min_connections: 0,
            ..raw()
        };
        assert!(config.resolve(Path::new(".")).is_err());
    }
}
