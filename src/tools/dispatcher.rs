use serde_json::json;
use tracing::{error, info};

use super::registry::ToolRegistry;
use crate::error::SessionError;
use crate::transport::{FunctionCall, FunctionResponse, ToolResponse};

/// Runs function calls against a [`ToolRegistry`].
///
/// There is no retry: a failing handler is reported to the caller and the
/// backend never receives a response for that call.
#[derive(Default, Clone)]
pub struct ToolDispatcher {
    registry: ToolRegistry,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute `call` and wrap the result as `{"output": <value>}` in a
    /// response carrying the call's id and name.
    pub async fn dispatch(&self, call: &FunctionCall) -> Result<ToolResponse, SessionError> {
        let tool = self
            .registry
            .get(&call.name)
            .ok_or_else(|| SessionError::UnknownTool(call.name.clone()))?;

        info!("Executing tool '{}' (id={:?})", call.name, call.id);

        let output = tool.execute(call.args.clone()).await.map_err(|source| {
            error!("Tool '{}' failed: {:#}", call.name, source);
            SessionError::ToolFailed {
                name: call.name.clone(),
                source,
            }
        })?;

        Ok(ToolResponse {
            function_responses: vec![FunctionResponse {
                id: call.id.clone(),
                name: call.name.clone(),
                response: json!({ "output": output }),
            }],
        })
    }
}
