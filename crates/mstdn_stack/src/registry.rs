//! Resource registry (`resources.yaml`).
//!
//! Maps logical output names to the identifiers the provider produced for
//! them. Later stacks read what earlier deployments registered. Keys are
//! never removed.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StackError, StackResult};

pub const DEFAULT_REGISTRY_FILE: &str = "resources.yaml";

/// Cross-stack key-value store of provider-assigned identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRegistry {
    values: BTreeMap<String, String>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry. A missing file is an empty registry.
    pub fn load(path: &Path) -> StackResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No registry at {:?}, starting empty", path);
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(StackError::Persistence {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let registry: ResourceRegistry =
            serde_yaml::from_str(&content).map_err(|source| StackError::CorruptDocument {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Loaded {} registry entries from {:?}", registry.len(), path);
        Ok(registry)
    }

    /// Persist the registry.
    ///
    /// The document is written to a sibling temporary file and renamed into
    /// place, so the previous contents survive a failed write.
    pub fn save(&self, path: &Path) -> StackResult<()> {
        let content = serde_yaml::to_string(self)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let persistence = |source: io::Error| StackError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(persistence)?;
        file.write_all(content.as_bytes()).map_err(persistence)?;
        file.as_file().sync_all().map_err(persistence)?;
        file.persist(path).map_err(|e| persistence(e.error))?;

        info!("Saved {} registry entries to {:?}", self.len(), path);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up a key another stack must have registered.
    pub fn require(&self, key: &str, stack: &str) -> StackResult<&str> {
        self.get(key)
            .ok_or_else(|| StackError::missing_dependency(key, stack))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(previous) = self.values.get(&key) {
            if *previous != value {
                warn!("Registry key {} changes from {} to {}", key, previous, value);
            }
        }
        self.values.insert(key, value);
    }

    /// Record the outputs of one deployed stack.
    ///
    /// Only keys listed in `expected` (the stack's own `Outputs`) are
    /// written. An undeclared output that would change a key already in the
    /// registry is rejected and nothing is written. Other undeclared outputs
    /// are ignored. Returns the entries that were written.
    pub fn register<I, K, V>(
        &mut self,
        stack: &str,
        expected: &[String],
        outputs: I,
    ) -> StackResult<BTreeMap<String, String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut accepted = BTreeMap::new();
        for (key, value) in outputs {
            let (key, value) = (key.into(), value.into());
            if expected.contains(&key) {
                accepted.insert(key, value);
                continue;
            }
            match self.get(&key) {
                Some(current) if current != value => {
                    return Err(StackError::registry_conflict(key, stack));
                }
                _ => warn!("Ignoring output {} not declared by stack {}", key, stack),
            }
        }

        for (key, value) in &accepted {
            self.insert(key.as_str(), value.as_str());
        }
        Ok(accepted)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResourceRegistry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut registry = ResourceRegistry::new();
        for (k, v) in iter {
            registry.insert(k, v);
        }
        registry
    }
}
