// Tests for the tool registry and dispatcher

use anyhow::{anyhow, Result};
use loqa_live::error::SessionError;
use loqa_live::tools::{FnTool, Tool, ToolDispatcher, ToolRegistry};
use loqa_live::transport::FunctionCall;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Tool that finishes after awaiting
struct SlowEcho;

#[async_trait::async_trait]
impl Tool for SlowEcho {
    fn name(&self) -> &str {
        "echo"
    }

    fn declaration(&self) -> Value {
        json!({
            "name": "echo",
            "description": "Echo the message back",
            "parameters": {
                "type": "object",
                "properties": { "message": { "type": "string" } }
            }
        })
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        tokio::task::yield_now().await;
        Ok(args.get("message").cloned().unwrap_or(Value::Null))
    }
}

fn function_call(id: Option<&str>, name: &str, args: Value) -> FunctionCall {
    FunctionCall {
        id: id.map(str::to_string),
        name: name.to_string(),
        args: args.as_object().cloned().unwrap_or_default(),
    }
}

#[test]
fn test_registry_keeps_registration_order() {
    let mut registry = ToolRegistry::new();
    registry.register(SlowEcho);
    registry.register(FnTool::new("time", json!({ "name": "time" }), |_| Ok(json!("noon"))));

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.names(), &["echo".to_string(), "time".to_string()]);

    let declarations = registry.declarations();
    assert_eq!(declarations[0]["name"], "echo");
    assert_eq!(declarations[1]["name"], "time");
}

#[test]
fn test_registering_same_name_replaces_tool() {
    let mut registry = ToolRegistry::new();
    registry.register(FnTool::new("time", json!({ "v": 1 }), |_| Ok(json!(1))));
    registry.register_arc(Arc::new(FnTool::new("time", json!({ "v": 2 }), |_| {
        Ok(json!(2))
    })));

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.declarations(), vec![json!({ "v": 2 })]);
}

#[test]
fn test_empty_registry() {
    let registry = ToolRegistry::new();

    assert!(registry.is_empty());
    assert!(registry.get("anything").is_none());
    assert!(registry.declarations().is_empty());
}

#[tokio::test]
async fn test_dispatch_wraps_output() -> Result<()> {
    let mut registry = ToolRegistry::new();
    registry.register(SlowEcho);
    let dispatcher = ToolDispatcher::new(registry);

    let response = dispatcher
        .dispatch(&function_call(Some("abc"), "echo", json!({ "message": "hi" })))
        .await?;

    assert_eq!(response.function_responses.len(), 1);
    let function_response = &response.function_responses[0];
    assert_eq!(function_response.id.as_deref(), Some("abc"));
    assert_eq!(function_response.name, "echo");
    assert_eq!(function_response.response, json!({ "output": "hi" }));

    Ok(())
}

#[tokio::test]
async fn test_dispatch_without_call_id() -> Result<()> {
    let mut registry = ToolRegistry::new();
    registry.register(FnTool::new("ping", json!({}), |_| Ok(json!("pong"))));
    let dispatcher = ToolDispatcher::new(registry);

    let response = dispatcher
        .dispatch(&function_call(None, "ping", json!({})))
        .await?;

    assert_eq!(response.function_responses[0].id, None);
    assert_eq!(
        serde_json::to_value(&response)?,
        json!({
            "functionResponses": [
                { "name": "ping", "response": { "output": "pong" } }
            ]
        })
    );

    Ok(())
}

#[tokio::test]
async fn test_dispatch_unknown_tool() {
    let dispatcher = ToolDispatcher::new(ToolRegistry::new());

    let err = dispatcher
        .dispatch(&function_call(Some("1"), "missing", json!({})))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::UnknownTool(ref name) if name == "missing"));
    assert_eq!(err.to_string(), "No tool registered under the name 'missing'");
}

#[tokio::test]
async fn test_dispatch_handler_failure() {
    let mut registry = ToolRegistry::new();
    registry.register(FnTool::new("fail", json!({}), |_| Err(anyhow!("quota exceeded"))));
    let dispatcher = ToolDispatcher::new(registry);

    let err = dispatcher
        .dispatch(&function_call(Some("1"), "fail", json!({})))
        .await
        .unwrap_err();

    match err {
        SessionError::ToolFailed { name, source } => {
            assert_eq!(name, "fail");
            assert_eq!(source.to_string(), "quota exceeded");
        }
        other => panic!("unexpected error: {}", other),
    }
}
