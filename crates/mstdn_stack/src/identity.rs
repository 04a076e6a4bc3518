//! Deployment identity and physical resource naming.

use serde::{Deserialize, Serialize};

use crate::error::{StackError, StackResult};

/// Prefix shared by every physical name of a deployment.
pub const RESOURCE_PREFIX: &str = "mstdn";

/// Longest accepted id. `mstdn-<id>` is used as the cache cluster name,
/// which ElastiCache caps at 40 characters.
pub const MAX_DEPLOYMENT_ID_LEN: usize = 40 - RESOURCE_PREFIX.len() - 1;

/// Short name scoping all resource names of one deployment.
///
/// Lowercase ASCII letters, digits and `-`, starting with a letter and not
/// ending with `-`. These are the characters every physical name it flows
/// into (DB instance identifier, cache cluster name, ECR repository) accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeploymentId(String);

impl DeploymentId {
    pub fn new(name: impl Into<String>) -> StackResult<Self> {
        let name = name.into();
        let mut chars = name.chars();
        match chars.next() {
            None => return Err(StackError::incomplete("name", "must not be empty")),
            Some(c) if !c.is_ascii_lowercase() => {
                return Err(StackError::incomplete(
                    "name",
                    format!("must start with a lowercase letter, got {:?}", name),
                ));
            }
            Some(_) => {}
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            return Err(StackError::incomplete(
                "name",
                format!("may only contain lowercase letters, digits and '-', got {:?}", name),
            ));
        }
        if name.len() > MAX_DEPLOYMENT_ID_LEN {
            return Err(StackError::incomplete(
                "name",
                format!("must be at most {} characters, got {}", MAX_DEPLOYMENT_ID_LEN, name.len()),
            ));
        }
        if name.ends_with('-') || name.contains("--") {
            return Err(StackError::incomplete(
                "name",
                format!("must not end with '-' or contain '--', got {:?}", name),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeploymentId {
    type Error = StackError;

    fn try_from(value: String) -> StackResult<Self> {
        Self::new(value)
    }
}

impl From<DeploymentId> for String {
    fn from(id: DeploymentId) -> Self {
        id.0
    }
}

impl std::str::FromStr for DeploymentId {
    type Err = StackError;

    fn from_str(s: &str) -> StackResult<Self> {
        Self::new(s)
    }
}

impl std::fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical name `mstdn-<id>` or `mstdn-<id>-<suffix>`.
pub fn resource_name(id: &DeploymentId, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}-{}-{}", RESOURCE_PREFIX, id, suffix),
        None => format!("{}-{}", RESOURCE_PREFIX, id),
    }
}
