//! Deployment orchestration.
//!
//! Builds a stack against the current registry, hands the rendered template
//! to a [`ProvisioningSink`], and registers the outputs it returns. Only the
//! outputs the stack declares are registered. The registry file is only
//! replaced after the sink succeeded, and then in one atomic write.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use mstdn_template::Format;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::StackResult;
use crate::identity::DeploymentId;
use crate::network::NetworkFacts;
use crate::registry::ResourceRegistry;
use crate::stack::{StackInputs, StackKind};

/// Named outputs returned by the provider for a deployed stack.
pub type StackOutputs = BTreeMap<String, String>;

/// The provider engine that turns a template into real infrastructure.
#[async_trait]
pub trait ProvisioningSink: Send + Sync {
    /// Create or update `stack_name` from `template_body` and return its outputs.
    async fn deploy(&self, stack_name: &str, template_body: &str) -> StackResult<StackOutputs>;
}

/// Result of one stack deployment.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub kind: StackKind,
    pub stack_name: String,
    pub outputs: StackOutputs,
}

/// Drives stack deployments for one deployment identity.
pub struct Deployer {
    identity: DeploymentId,
    config: Config,
    network: NetworkFacts,
    registry_path: PathBuf,
    sink: Arc<dyn ProvisioningSink>,
    lock: Mutex<()>,
}

impl Deployer {
    pub fn new(
        identity: DeploymentId,
        config: Config,
        network: NetworkFacts,
        registry_path: impl Into<PathBuf>,
        sink: Arc<dyn ProvisioningSink>,
    ) -> Self {
        Self {
            identity,
            config,
            network,
            registry_path: registry_path.into(),
            sink,
            lock: Mutex::new(()),
        }
    }

    /// Current persisted registry.
    pub fn registry(&self) -> StackResult<ResourceRegistry> {
        ResourceRegistry::load(&self.registry_path)
    }

    /// Render a stack against the persisted registry without deploying it.
    pub fn render(&self, kind: StackKind, format: Format) -> StackResult<String> {
        let registry = self.registry()?;
        let inputs = StackInputs::new(&self.identity, &self.config, &self.network, &registry);
        let builder = kind.builder(inputs);
        builder.render(format)
    }

    /// Deploy one stack and register its outputs.
    pub async fn deploy(&self, kind: StackKind) -> StackResult<DeployReport> {
        let _guard = self.lock.lock().await;
        let mut registry = self.registry()?;

        let (stack_name, expected, body) = {
            let inputs = StackInputs::new(&self.identity, &self.config, &self.network, &registry);
            let builder = kind.builder(inputs);
            let template = builder.build()?;
            let expected: Vec<String> = template
                .outputs()
                .map(|o| o.keys().map(str::to_string).collect())
                .unwrap_or_default();
            (builder.stack_name(), expected, template.to_json()?)
        };

        info!("Deploying {} stack {}", kind, stack_name);
        let outputs = self.sink.deploy(&stack_name, &body).await?;

        for key in expected.iter().filter(|k| !outputs.contains_key(k.as_str())) {
            warn!("Stack {} did not return output {}", stack_name, key);
        }

        let registered = registry.register(&stack_name, &expected, outputs)?;
        registry.save(&self.registry_path)?;
        info!("Registered {} outputs of stack {}", registered.len(), stack_name);

        Ok(DeployReport {
            kind,
            stack_name,
            outputs: registered,
        })
    }

    /// Deploy every stack in [`StackKind::DEPLOY_ORDER`], stopping at the first failure.
    pub async fn deploy_all(&self) -> StackResult<Vec<DeployReport>> {
        let mut reports = Vec::new();
        for kind in StackKind::DEPLOY_ORDER {
            reports.push(self.deploy(kind).await?);
        }
        Ok(reports)
    }
}
