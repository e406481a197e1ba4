//! Google Generative Language (`generateContent`) backend.

use super::{CallFailure, FailureClass, InferenceClient, InferenceRequest, InferenceResponse, Turn};
use crate::config::InferenceConfig;
use crate::errors::AchflowError;
use crate::tools::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Non-streaming Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

impl GeminiClient {
    /// Builds a client from the inference configuration.
    pub fn new(config: &InferenceConfig) -> Result<Self, AchflowError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AchflowError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    fn build_body(request: &InferenceRequest) -> Value {
        let mut contents = Vec::with_capacity(request.turns.len());
        for turn in &request.turns {
            match turn {
                Turn::User { text } => {
                    contents.push(json!({"role": "user", "parts": [{"text": text}]}));
                }
                Turn::ToolCalls { calls } => {
                    let parts: Vec<Value> = calls
                        .iter()
                        .map(|call| {
                            json!({"functionCall": {
                                "name": call.name,
                                "args": call_args(&request.tools, call),
                            }})
                        })
                        .collect();
                    contents.push(json!({"role": "model", "parts": parts}));
                }
                Turn::ToolResults { results } => {
                    let parts: Vec<Value> = results
                        .iter()
                        .map(|result| {
                            json!({"functionResponse": {
                                "name": result.name,
                                "response": {"content": result.output},
                            }})
                        })
                        .collect();
                    contents.push(json!({"role": "user", "parts": parts}));
                }
            }
        }

        let mut body = json!({ "contents": contents });

        if !request.system_instruction.is_empty() {
            body["systemInstruction"] = json!({"parts": [{"text": request.system_instruction}]});
        }

        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request.tools.iter().map(function_declaration).collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        let mut generation = Map::new();
        if let Some(schema) = &request.response_schema {
            generation.insert("responseMimeType".into(), json!("application/json"));
            generation.insert("responseSchema".into(), schema.clone());
        }
        if let Some(temperature) = request.temperature {
            generation.insert("temperature".into(), json!(temperature));
        }
        if !generation.is_empty() {
            body["generationConfig"] = Value::Object(generation);
        }

        body
    }

    fn parse_response(
        tools: &[ToolDefinition],
        response: GenerateResponse,
    ) -> Result<InferenceResponse, CallFailure> {
        let parts = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .ok_or_else(|| CallFailure::new(FailureClass::Protocol, "response has no candidates"))?;

        let mut calls = Vec::new();
        let mut text = String::new();
        for part in parts {
            if let Some(call) = part.function_call {
                let argument = call_argument(tools, &call);
                calls.push(ToolCall::new(format!("call-{}", calls.len()), call.name, argument));
            } else if let Some(fragment) = part.text {
                text.push_str(&fragment);
            }
        }

        if calls.is_empty() {
            Ok(InferenceResponse::text(text))
        } else {
            Ok(InferenceResponse::tool_calls(calls))
        }
    }
}

fn function_declaration(definition: &ToolDefinition) -> Value {
    let mut declaration = json!({
        "name": definition.name,
        "description": definition.description,
    });
    if let Some(parameter) = &definition.parameter {
        declaration["parameters"] = json!({
            "type": "OBJECT",
            "properties": {
                parameter.name.as_str(): {"type": "STRING", "description": parameter.description}
            },
            "required": [parameter.name],
        });
    }
    declaration
}

fn call_args(tools: &[ToolDefinition], call: &ToolCall) -> Value {
    let parameter = tools
        .iter()
        .find(|definition| definition.name == call.name)
        .and_then(|definition| definition.parameter.as_ref());
    match parameter {
        Some(parameter) => json!({ parameter.name.as_str(): call.argument }),
        None => json!({}),
    }
}

fn call_argument(tools: &[ToolDefinition], call: &FunctionCall) -> String {
    let parameter = tools
        .iter()
        .find(|definition| definition.name == call.name)
        .and_then(|definition| definition.parameter.as_ref());
    let value = match parameter {
        Some(parameter) => call.args.get(&parameter.name),
        None => call.args.values().next(),
    };
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn classify_transport(err: &reqwest::Error) -> CallFailure {
    let class = if err.is_timeout() {
        FailureClass::Timeout
    } else {
        FailureClass::Transport
    };
    CallFailure::new(class, err.to_string())
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn generate(&self, request: &InferenceRequest) -> Result<InferenceResponse, CallFailure> {
        let body = Self::build_body(request);

        let mut builder = self.http.post(self.endpoint(&request.model)).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-goog-api-key", key);
        }

        let response = builder.send().await.map_err(|e| classify_transport(&e))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CallFailure::from_status(status.as_u16(), detail));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                CallFailure::new(FailureClass::Protocol, e.to_string())
            } else {
                classify_transport(&e)
            }
        })?;

        tracing::trace!(stage = %request.stage, "Received inference response");
        Self::parse_response(&request.tools, parsed)
    }
}
