use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

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

/// Body of a chat completion call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    /// A system turn carrying instructions followed by a user turn carrying
    /// untrusted data. The two are never merged into one message.
    pub fn separated(
        model: impl Into<String>,
        instructions: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::system(instructions), ChatMessage::user(payload)],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice, if any
    pub fn into_text(self) -> Option<String> {
        self.choices.into_iter().next()?.message.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let req = CompletionRequest::separated("gpt-4o-mini", "do things", "data");

        let body = serde_json::to_value(&req).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "do things"},
                    {"role": "user", "content": "data"}
                ]
            })
        );
    }

    #[test]
    fn test_response_first_choice() {
        let resp: CompletionResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"hello"}},{"index":1,"message":{"role":"assistant","content":"other"}}]}"#,
        )
        .unwrap();

        assert_eq!(resp.into_text().as_deref(), Some("hello"));
    }

    #[test]
    fn test_response_without_content() {
        let resp: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();

        assert!(resp.into_text().is_none());
    }
}
