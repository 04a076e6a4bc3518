//! Deployment configuration (`config.yaml`).
//!
//! Every field defaults when absent so that a missing key surfaces as
//! [`StackError::ConfigurationIncomplete`] naming the dotted key, not as an
//! opaque parse failure.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StackError, StackResult};

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Database settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbSettings {
    pub user: String,
    pub password: String,
    /// Allocated storage in GB.
    pub allocated_storage: u32,
    pub instance_class: String,
    pub storage_type: String,
    pub multi_az: bool,
}

/// Cache cluster settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub cache_node_type: String,
    pub num_cache_nodes: u32,
}

/// Where the application images are built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub repository: String,
    pub branch: String,
}

/// Container cluster sizing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    pub instance_type: String,
    pub cluster_size: u32,
}

/// Deployment-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub region: String,
    pub hostname: String,
    pub district_name: String,
    pub heritage_name: String,
    pub certificate_arn: String,
    pub endpoint: String,
    pub db: DbSettings,
    pub redis: CacheSettings,
    pub mastodon_source: SourceSettings,
    pub ecs: ClusterSettings,
}

/// On-disk layout: everything lives under a top-level `config:` key.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    config: Config,
}

/// Values supplied interactively when creating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub region: String,
    pub hostname: String,
    pub district_name: String,
    pub heritage_name: String,
    pub certificate_arn: String,
    pub endpoint: String,
}

impl Config {
    /// A fresh configuration with stock sizing and a generated DB password.
    pub fn from_options(options: ConfigOptions) -> Self {
        Self {
            region: options.region,
            hostname: options.hostname,
            district_name: options.district_name,
            heritage_name: options.heritage_name,
            certificate_arn: options.certificate_arn,
            endpoint: options.endpoint,
            db: DbSettings {
                user: "mastodon_admin".to_string(),
                password: uuid::Uuid::new_v4().simple().to_string(),
                allocated_storage: 5,
                instance_class: "db.t2.micro".to_string(),
                storage_type: "gp2".to_string(),
                multi_az: false,
            },
            redis: CacheSettings {
                cache_node_type: "cache.t2.micro".to_string(),
                num_cache_nodes: 1,
            },
            mastodon_source: SourceSettings {
                repository: "https://github.com/essa/mastodon.git".to_string(),
                branch: "barcelona".to_string(),
            },
            ecs: ClusterSettings {
                instance_type: "t2.small".to_string(),
                cluster_size: 2,
            },
        }
    }

    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> StackResult<Self> {
        debug!("Reading config from {:?}", path);
        let content = fs::read_to_string(path).map_err(|source| StackError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = serde_yaml::from_str(&content).map_err(|source| StackError::CorruptDocument {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(file.config)
    }

    /// Write configuration to a YAML file.
    pub fn save(&self, path: &Path) -> StackResult<()> {
        let content = serde_yaml::to_string(&ConfigFile { config: self.clone() })?;
        fs::write(path, content).map_err(|source| StackError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Wrote config to {:?}", path);
        Ok(())
    }

    /// Check every key any stack reads.
    pub fn validate(&self) -> StackResult<()> {
        self.validate_db()?;
        self.validate_resources()?;
        Ok(())
    }

    /// Keys the database stack reads.
    pub fn validate_db(&self) -> StackResult<()> {
        require_str("db.user", &self.db.user)?;
        require_str("db.password", &self.db.password)?;
        require_positive("db.allocated_storage", self.db.allocated_storage)?;
        require_str("db.instance_class", &self.db.instance_class)?;
        require_str("db.storage_type", &self.db.storage_type)?;
        Ok(())
    }

    /// Keys the resources stack reads.
    pub fn validate_resources(&self) -> StackResult<()> {
        require_str("district_name", &self.district_name)?;
        require_str("heritage_name", &self.heritage_name)?;
        require_str("redis.cache_node_type", &self.redis.cache_node_type)?;
        require_positive("redis.num_cache_nodes", self.redis.num_cache_nodes)?;
        Ok(())
    }
}

fn require_str<'a>(key: &str, value: &'a str) -> StackResult<&'a str> {
    if value.trim().is_empty() {
        return Err(StackError::incomplete(key, "is missing"));
    }
    Ok(value)
}

fn require_positive(key: &str, value: u32) -> StackResult<u32> {
    if value == 0 {
        return Err(StackError::incomplete(key, "must be greater than zero"));
    }
    Ok(value)
}
