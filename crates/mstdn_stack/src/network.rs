//! Network topology facts supplied once per deployment.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StackError, StackResult};

pub const DEFAULT_NETWORK_FILE: &str = "network.yaml";

/// VPC and subnet facts the stacks are placed into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkFacts {
    pub vpc_id: Option<String>,
    pub subnet_ids: Vec<String>,
    /// CIDR blocks of the subnets, used for security group ingress.
    pub subnet_cidrs: Vec<String>,
}

impl NetworkFacts {
    pub fn new(subnet_ids: Vec<String>, subnet_cidrs: Vec<String>) -> Self {
        Self {
            vpc_id: None,
            subnet_ids,
            subnet_cidrs,
        }
    }

    pub fn with_vpc(mut self, vpc_id: impl Into<String>) -> Self {
        self.vpc_id = Some(vpc_id.into());
        self
    }

    pub fn load(path: &Path) -> StackResult<Self> {
        debug!("Reading network facts from {:?}", path);
        let content = fs::read_to_string(path).map_err(|source| StackError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| StackError::CorruptDocument {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn require_subnet_ids(&self) -> StackResult<&[String]> {
        if self.subnet_ids.is_empty() {
            return Err(StackError::incomplete("network.subnet_ids", "is empty"));
        }
        Ok(&self.subnet_ids)
    }

    pub fn require_subnet_cidrs(&self) -> StackResult<&[String]> {
        if self.subnet_cidrs.is_empty() {
            return Err(StackError::incomplete("network.subnet_cidrs", "is empty"));
        }
        Ok(&self.subnet_cidrs)
    }
}
