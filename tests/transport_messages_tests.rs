use base64::Engine;
use loqa_live::config::Config;
use loqa_live::transport::{
    ClientMessage, FunctionResponse, ServerContent, ServerMessage, SetupMessage, ToolResponse,
    TransportEvent,
};
use serde_json::json;

#[test]
fn test_text_message_serialization() {
    let msg = ClientMessage::text("What is on my screen?");

    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        value,
        json!({
            "clientContent": {
                "turns": [{ "role": "user", "parts": [{ "text": "What is on my screen?" }] }],
                "turnComplete": true
            }
        })
    );
}

#[test]
fn test_audio_message_carries_rate_and_base64() {
    let msg = ClientMessage::audio(&[1, 2, 3], 16000);

    let value = serde_json::to_value(&msg).unwrap();
    let chunk = &value["realtimeInput"]["mediaChunks"][0];
    assert_eq!(chunk["mimeType"], "audio/pcm;rate=16000");

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(chunk["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, vec![1, 2, 3]);
}

#[test]
fn test_image_message() {
    let msg = ClientMessage::image("/9j/4AAQ");

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"mimeType\":\"image/jpeg\""));
    assert!(json.contains("\"data\":\"/9j/4AAQ\""));
}

#[test]
fn test_tool_response_envelope() {
    let msg = ClientMessage::ToolResponse(ToolResponse {
        function_responses: vec![FunctionResponse {
            id: Some("call-7".to_string()),
            name: "lookup".to_string(),
            response: json!({ "output": { "hits": 2 } }),
        }],
    });

    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        value,
        json!({
            "toolResponse": {
                "functionResponses": [{
                    "id": "call-7",
                    "name": "lookup",
                    "response": { "output": { "hits": 2 } }
                }]
            }
        })
    );
}

#[test]
fn test_setup_from_config() {
    let mut config = Config::default();
    config.backend.builtin_tools = vec!["googleSearch".to_string(), "codeExecution".to_string()];

    let setup = SetupMessage::from_config(&config, vec![json!({ "name": "add" })]);

    assert_eq!(setup.model, "models/gemini-2.0-flash-live-001");
    assert_eq!(setup.generation_config.top_k, 65);
    assert_eq!(setup.generation_config.response_modalities, vec!["TEXT"]);
    assert_eq!(
        setup.tools,
        vec![
            json!({ "googleSearch": {} }),
            json!({ "codeExecution": {} }),
            json!({ "functionDeclarations": [{ "name": "add" }] }),
        ]
    );
    assert!(setup.system_instruction.parts[0]
        .text
        .as_deref()
        .unwrap()
        .contains("<silent>"));

    let value = serde_json::to_value(ClientMessage::Setup(setup)).unwrap();
    assert!(value["setup"]["generationConfig"]["topP"].is_number());
    assert!(value["setup"].get("apiKey").is_none());
}

#[test]
fn test_setup_without_function_declarations() {
    let mut config = Config::default();
    config.backend.builtin_tools.clear();

    let setup = SetupMessage::from_config(&config, Vec::new());

    assert!(setup.tools.is_empty());
}

#[test]
fn test_server_text_becomes_content_event() {
    let json = r#"{
        "serverContent": {
            "modelTurn": { "role": "model", "parts": [{ "text": "Let" }, { "text": " me" }] }
        }
    }"#;

    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    let events = msg.into_events().unwrap();

    assert_eq!(
        events,
        vec![TransportEvent::Content(ServerContent {
            model_turn: Some(loqa_live::transport::Content {
                role: Some("model".to_string()),
                parts: vec![
                    loqa_live::transport::Part::text("Let"),
                    loqa_live::transport::Part::text(" me"),
                ],
            }),
            turn_complete: false,
            interrupted: false,
        })]
    );
}

#[test]
fn test_content_texts_skip_empty_parts() {
    let json = r#"{
        "serverContent": {
            "modelTurn": { "parts": [{ "text": "" }, { "text": "Hi" }, {}] }
        }
    }"#;

    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    let content = msg.server_content.unwrap();

    assert_eq!(content.texts().collect::<Vec<_>>(), vec!["Hi"]);
}

#[test]
fn test_server_audio_is_decoded() {
    let pcm = base64::engine::general_purpose::STANDARD.encode([0u8, 1, 2, 3]);
    let json = format!(
        r#"{{
            "serverContent": {{
                "modelTurn": {{ "parts": [{{ "inlineData": {{ "mimeType": "audio/pcm;rate=24000", "data": "{}" }} }}] }}
            }}
        }}"#,
        pcm
    );

    let msg: ServerMessage = serde_json::from_str(&json).unwrap();
    let events = msg.into_events().unwrap();

    assert_eq!(events, vec![TransportEvent::Audio(vec![0, 1, 2, 3])]);
}

#[test]
fn test_server_flags_follow_content() {
    let json = r#"{
        "serverContent": {
            "modelTurn": { "parts": [{ "text": "done" }] },
            "turnComplete": true
        }
    }"#;

    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    let events = msg.into_events().unwrap();

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], TransportEvent::Content(_)));
    assert_eq!(events[1], TransportEvent::TurnComplete);
}

#[test]
fn test_server_interrupted() {
    let msg: ServerMessage =
        serde_json::from_str(r#"{ "serverContent": { "interrupted": true } }"#).unwrap();

    assert_eq!(msg.into_events().unwrap(), vec![TransportEvent::Interrupted]);
}

#[test]
fn test_server_tool_call() {
    let json = r#"{
        "toolCall": {
            "functionCalls": [{ "id": "c1", "name": "add", "args": { "a": 1, "b": 2 } }]
        }
    }"#;

    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    let events = msg.into_events().unwrap();

    match &events[..] {
        [TransportEvent::ToolCall(call)] => {
            assert_eq!(call.function_calls.len(), 1);
            assert_eq!(call.function_calls[0].id.as_deref(), Some("c1"));
            assert_eq!(call.function_calls[0].name, "add");
            assert_eq!(call.function_calls[0].args["b"], 2);
        }
        other => panic!("unexpected events: {:?}", other),
    }
}

#[test]
fn test_setup_complete_yields_no_events() {
    let msg: ServerMessage = serde_json::from_str(r#"{ "setupComplete": {} }"#).unwrap();

    assert!(msg.setup_complete.is_some());
    assert!(msg.into_events().unwrap().is_empty());
}

#[test]
fn test_invalid_audio_payload_is_error() {
    let json = r#"{
        "serverContent": {
            "modelTurn": { "parts": [{ "inlineData": { "mimeType": "audio/pcm", "data": "***" } }] }
        }
    }"#;

    let msg: ServerMessage = serde_json::from_str(json).unwrap();

    assert!(msg.into_events().is_err());
}
