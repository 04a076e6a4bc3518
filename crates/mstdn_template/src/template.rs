//! Finished template documents and their serialization.

use serde::{Serialize, Serializer};

use crate::error::TemplateResult;
use crate::value::{Mapping, Value};

pub const DESCRIPTION: &str = "Description";
pub const FORMAT_VERSION: &str = "AWSTemplateFormatVersion";
pub const PARAMETERS: &str = "Parameters";
pub const RESOURCES: &str = "Resources";
pub const OUTPUTS: &str = "Outputs";

/// Serialization format understood by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An assembled template document.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    root: Mapping,
}

impl Template {
    pub(crate) fn from_root(root: Mapping) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// A top-level mapping section.
    pub fn section(&self, name: &str) -> Option<&Mapping> {
        self.root.get(name).and_then(Value::as_mapping)
    }

    pub fn parameters(&self) -> Option<&Mapping> {
        self.section(PARAMETERS)
    }

    pub fn resources(&self) -> Option<&Mapping> {
        self.section(RESOURCES)
    }

    pub fn outputs(&self) -> Option<&Mapping> {
        self.section(OUTPUTS)
    }

    pub fn resource(&self, logical_name: &str) -> Option<&Value> {
        self.resources().and_then(|r| r.get(logical_name))
    }

    pub fn resource_type(&self, logical_name: &str) -> Option<&str> {
        self.resource(logical_name)
            .and_then(|r| r.get("Type"))
            .and_then(Value::as_str)
    }

    pub fn properties(&self, logical_name: &str) -> Option<&Mapping> {
        self.resource(logical_name)
            .and_then(|r| r.get("Properties"))
            .and_then(Value::as_mapping)
    }

    pub fn output_value(&self, name: &str) -> Option<&Value> {
        self.outputs()
            .and_then(|o| o.get(name))
            .and_then(|o| o.get("Value"))
    }

    pub fn to_json(&self) -> TemplateResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> TemplateResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn render(&self, format: Format) -> TemplateResult<String> {
        match format {
            Format::Json => self.to_json(),
            Format::Yaml => self.to_yaml(),
        }
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}
