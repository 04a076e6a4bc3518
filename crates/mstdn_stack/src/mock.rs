//! Mock provisioning sink for testing.
//!
//! Captures every deployment and answers with canned outputs, so the
//! orchestrator can be exercised without a cloud account.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::deploy::{ProvisioningSink, StackOutputs};
use crate::error::{StackError, StackResult};

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedDeploy {
    pub stack_name: String,
    pub template_body: String,
}

/// Mock provisioning sink.
///
/// Stacks without canned outputs answer with one value per key of the
/// template's `Outputs` section, `<stack_name>:<output>`.
#[derive(Clone, Default)]
pub struct MockSink {
    outputs: Arc<RwLock<HashMap<String, StackOutputs>>>,
    captured_calls: Arc<RwLock<Vec<CapturedDeploy>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned outputs for a stack name.
    pub fn with_outputs<I, K, V>(self, stack_name: impl Into<String>, outputs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let outputs = outputs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.outputs.write().insert(stack_name.into(), outputs);
        self
    }

    /// Fail every deployment with `message`.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    pub fn get_calls(&self) -> Vec<CapturedDeploy> {
        self.captured_calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    pub fn was_deployed(&self, stack_name: &str) -> bool {
        self.captured_calls
            .read()
            .iter()
            .any(|c| c.stack_name == stack_name)
    }

    fn echo_outputs(stack_name: &str, template_body: &str) -> StackResult<StackOutputs> {
        let template: serde_json::Value =
            serde_json::from_str(template_body).map_err(|e| StackError::Provisioning {
                stack: stack_name.to_string(),
                message: format!("template is not valid JSON: {}", e),
            })?;
        Ok(template
            .get("Outputs")
            .and_then(|o| o.as_object())
            .map(|o| {
                o.keys()
                    .map(|k| (k.clone(), format!("{}:{}", stack_name, k)))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl ProvisioningSink for MockSink {
    async fn deploy(&self, stack_name: &str, template_body: &str) -> StackResult<StackOutputs> {
        self.captured_calls.write().push(CapturedDeploy {
            stack_name: stack_name.to_string(),
            template_body: template_body.to_string(),
        });

        if let Some(message) = self.simulate_failure.read().clone() {
            return Err(StackError::Provisioning {
                stack: stack_name.to_string(),
                message,
            });
        }

        if let Some(outputs) = self.outputs.read().get(stack_name).cloned() {
            return Ok(outputs);
        }
        Self::echo_outputs(stack_name, template_body)
    }
}
