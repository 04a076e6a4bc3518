//! Stack builders.
//!
//! Each stack variant turns the deployment inputs into one CloudFormation
//! template. The shared assembly order lives in [`StackBuilder::build`];
//! variants only fill in the Parameters, Resources and Outputs sections.

use mstdn_template::{
    Format, SectionBuilder, Template, TemplateBuilder, Value, DESCRIPTION, FORMAT_VERSION,
    OUTPUTS, PARAMETERS, RESOURCES,
};
use tracing::info;

use crate::config::Config;
use crate::error::StackResult;
use crate::identity::DeploymentId;
use crate::network::NetworkFacts;
use crate::registry::ResourceRegistry;

pub mod db;
pub mod resources;

pub use db::DbStack;
pub use resources::ResourcesStack;

/// CloudFormation template format version emitted by every stack.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Read-only inputs shared by all stack variants.
#[derive(Debug, Clone, Copy)]
pub struct StackInputs<'a> {
    pub identity: &'a DeploymentId,
    pub config: &'a Config,
    pub network: &'a NetworkFacts,
    pub registry: &'a ResourceRegistry,
}

impl<'a> StackInputs<'a> {
    pub fn new(
        identity: &'a DeploymentId,
        config: &'a Config,
        network: &'a NetworkFacts,
        registry: &'a ResourceRegistry,
    ) -> Self {
        Self {
            identity,
            config,
            network,
            registry,
        }
    }
}

/// The fixed set of stack variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackKind {
    Db,
    Resources,
}

impl StackKind {
    /// Deploy order. The resources stack reads what the db stack registers.
    pub const DEPLOY_ORDER: [StackKind; 2] = [StackKind::Db, StackKind::Resources];

    pub fn as_str(&self) -> &'static str {
        match self {
            StackKind::Db => "db",
            StackKind::Resources => "resources",
        }
    }

    /// Instantiate the builder for this variant.
    pub fn builder<'a>(self, inputs: StackInputs<'a>) -> Box<dyn StackBuilder + 'a> {
        match self {
            StackKind::Db => Box::new(DbStack::new(inputs)),
            StackKind::Resources => Box::new(ResourcesStack::new(inputs)),
        }
    }
}

impl std::fmt::Display for StackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Common contract of all stack variants.
pub trait StackBuilder {
    fn kind(&self) -> StackKind;

    /// Physical name prefix of the resources this stack creates.
    fn resource_name(&self) -> String;

    fn stack_name(&self) -> String {
        self.resource_name()
    }

    fn description(&self) -> String {
        format!("AWS CloudFormation for Barcelona {}", self.resource_name())
    }

    /// Fail before anything is built if config, network facts or the
    /// registry lack something this stack needs.
    fn check_prerequisites(&self) -> StackResult<()>;

    fn build_parameters(&self, _parameters: &mut SectionBuilder<'_>) -> StackResult<()> {
        Ok(())
    }

    fn build_resources(&self, resources: &mut SectionBuilder<'_>) -> StackResult<()>;

    fn build_outputs(&self, outputs: &mut SectionBuilder<'_>) -> StackResult<()>;

    /// Assemble the template: description and format version, then the
    /// Parameters, Resources and Outputs sections.
    fn build(&self) -> StackResult<Template> {
        self.check_prerequisites()?;

        let mut builder = TemplateBuilder::new();
        builder
            .set(DESCRIPTION, self.description())
            .set(FORMAT_VERSION, TEMPLATE_FORMAT_VERSION);
        self.build_parameters(&mut builder.open_section(PARAMETERS))?;
        self.build_resources(&mut builder.open_section(RESOURCES))?;
        self.build_outputs(&mut builder.open_section(OUTPUTS))?;
        let template = builder.finish();

        info!(
            "Built {} stack {} with {} resources",
            self.kind(),
            self.stack_name(),
            template.resources().map_or(0, |r| r.len())
        );
        Ok(template)
    }

    /// Build and serialize.
    fn render(&self, format: Format) -> StackResult<String> {
        Ok(self.build()?.render(format)?)
    }
}

/// `Ref` to a logical resource.
pub fn reference(logical_name: &str) -> Value {
    Value::reference(logical_name)
}

/// `Fn::GetAtt` on a logical resource.
pub fn get_att(logical_name: &str, attribute: &str) -> Value {
    Value::attribute(logical_name, [attribute])
}

/// Declare a resource with a type and a properties block.
pub(crate) fn declare<F>(resources: &mut SectionBuilder<'_>, logical_name: &str, resource_type: &str, properties: F)
where
    F: FnOnce(&mut SectionBuilder<'_>),
{
    tracing::debug!("Declaring {} ({})", logical_name, resource_type);
    resources.section(logical_name, |r| {
        r.set("Type", resource_type);
        r.section("Properties", properties);
    });
}

/// Declare an output.
pub(crate) fn output(outputs: &mut SectionBuilder<'_>, name: &str, description: &str, value: Value) {
    outputs.section(name, |o| {
        o.set("Description", description).set("Value", value);
    });
}
