//! Wire types for the upstream chat-completion API

use serde::{Deserialize, Serialize};

use super::model_class::{ModelClass, classify_model, normalize_token_limit};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One message of a conversation, in conversation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Outbound chat-completion request body
///
/// The only constructor applies the model-class rules, so a request that
/// exists always carries a clamped token limit in the right field.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    stream: bool,
}

impl UpstreamRequest {
    pub fn new(
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
        requested_limit: u32,
        temperature: f64,
        stream: bool,
    ) -> Self {
        let model = model.into();
        let class = classify_model(&model);
        let limit = normalize_token_limit(&model, requested_limit);

        let (max_tokens, max_completion_tokens, temperature) = if class.is_reasoning() {
            (None, Some(limit), None)
        } else {
            (Some(limit), None, Some(temperature))
        };

        Self {
            model,
            messages,
            max_tokens,
            max_completion_tokens,
            temperature,
            stream,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn model_class(&self) -> ModelClass {
        classify_model(&self.model)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The clamped limit, whichever field carries it
    pub fn token_limit(&self) -> u32 {
        self.max_tokens
            .or(self.max_completion_tokens)
            .unwrap_or_default()
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn is_stream(&self) -> bool {
        self.stream
    }
}

/// Non-streaming completion response (fields echoed to the client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamCompletion {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<serde_json::Value>,
}

impl UpstreamCompletion {
    /// Text of the first choice, if present and non-blank
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub index: u32,
    pub message: CompletionMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
}

/// One `data:` payload of the upstream event stream
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: StreamDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl StreamChunk {
    /// Content fragment carried by the first choice, if any
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_request_serializes_max_tokens_and_temperature() {
        let request =
            UpstreamRequest::new("gpt-4o", vec![ChatMessage::user("hi")], 50_000, 0.3, true);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 16_384);
        assert_eq!(json["temperature"], 0.3);
        assert!(json.get("max_completion_tokens").is_none());
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_reasoning_request_omits_temperature() {
        let request =
            UpstreamRequest::new("o4-mini", vec![ChatMessage::user("hi")], 200, 0.3, false);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_completion_tokens"], 1000);
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
        assert_eq!(request.token_limit(), 1000);
    }

    #[test]
    fn test_stream_chunk_content_extraction() {
        let chunk: StreamChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#).unwrap();
        assert_eq!(chunk.into_content().as_deref(), Some("Hel"));

        let role_only: StreamChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(role_only.into_content(), None);

        let empty: StreamChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(empty.into_content(), None);
    }

    #[test]
    fn test_completion_first_content_rejects_blank() {
        let completion: UpstreamCompletion = serde_json::from_str(
            r#"{"id":"x","model":"m","choices":[{"index":0,"message":{"role":"assistant","content":"  "}}]}"#,
        )
        .unwrap();
        assert_eq!(completion.first_content(), None);
    }
}
