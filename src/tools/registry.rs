use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A tool handler the model can call by name.
///
/// Handlers may finish synchronously or await other work; either way the
/// dispatcher awaits the returned future.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses in function calls
    fn name(&self) -> &str;

    /// Function declaration (name, description, parameter schema)
    fn declaration(&self) -> Value;

    async fn execute(&self, args: Map<String, Value>) -> Result<Value>;
}

type Handler = Box<dyn Fn(&Map<String, Value>) -> Result<Value> + Send + Sync>;

/// Adapts a synchronous closure into a [`Tool`]
pub struct FnTool {
    name: String,
    declaration: Value,
    handler: Handler,
}

impl FnTool {
    pub fn new<F>(name: impl Into<String>, declaration: Value, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            declaration,
            handler: Box::new(handler),
        }
    }
}

#[async_trait::async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn declaration(&self) -> Value {
        self.declaration.clone()
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        (self.handler)(&args)
    }
}

/// Registered tools, kept in registration order
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a tool with the same name is replaced
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();

        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("Replacing previously registered tool '{}'", name);
        } else {
            info!("Registered tool '{}'", name);
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Declarations in registration order
    pub fn declarations(&self) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.declaration())
            .collect()
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
