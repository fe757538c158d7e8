use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::fetch::{Fetch, FetchError, FetchRequest};

pub const SYSTEM_PROMPT: &str = "You are a concise, factual assistant.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            max_tokens: 200,
            temperature: 0.2,
        }
    }
}

/// OpenAI-compatible chat completions client.
pub struct LlmClient {
    fetcher: Arc<dyn Fetch>,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(fetcher: Arc<dyn Fetch>, settings: LlmSettings) -> Self {
        Self { fetcher, settings }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.settings.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Non-streaming chat completion.
    pub async fn chat(&self, messages: &[Message]) -> Result<String, FetchError> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        });

        let mut req = FetchRequest::post_json(self.endpoint(), body);
        if let Some(key) = &self.settings.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let text = self.fetcher.fetch(&req).await?;
        parse_content(&text)
    }
}

/// Content of `choices[0].message.content`; a null content is an empty answer.
fn parse_content(text: &str) -> Result<String, FetchError> {
    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| FetchError::Malformed(format!("LLM response is not JSON: {}", e)))?;

    let message = json["choices"]
        .get(0)
        .map(|c| &c["message"])
        .ok_or_else(|| FetchError::Malformed("LLM response has no choices".to_string()))?;

    Ok(message["content"].as_str().unwrap_or("").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<FetchRequest>>,
        reply: String,
    }

    #[async_trait]
    impl Fetch for Recording {
        async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn client(base_url: &str, fetcher: Arc<dyn Fetch>) -> LlmClient {
        LlmClient::new(
            fetcher,
            LlmSettings {
                base_url: base_url.to_string(),
                api_key: Some("sk-test".to_string()),
                ..LlmSettings::default()
            },
        )
    }

    #[test]
    fn test_endpoint_resolution() {
        let f: Arc<dyn Fetch> = Arc::new(Recording {
            seen: Mutex::new(vec![]),
            reply: String::new(),
        });
        assert_eq!(
            client("https://api.openai.com/v1/", f.clone()).endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            client("http://localhost:1234", f.clone()).endpoint(),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            client("http://host/v1/chat/completions", f).endpoint(),
            "http://host/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_chat_request_shape() {
        let fetcher = Arc::new(Recording {
            seen: Mutex::new(vec![]),
            reply: r#"{"choices":[{"message":{"content":"  Ownership moves values. "}}]}"#.to_string(),
        });
        let llm = client("https://api.openai.com/v1", fetcher.clone());

        let out = llm.chat(&[Message::user("Q: What is ownership?\nA:")]).await.unwrap();
        assert_eq!(out, "Ownership moves values.");

        let seen = fetcher.seen.lock().unwrap();
        let body = seen[0].body.as_ref().unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 200);
        assert!(seen[0]
            .headers
            .iter()
            .any(|(k, v)| k == "Authorization" && v == "Bearer sk-test"));
    }

    #[test]
    fn test_parse_content_edge_cases() {
        assert_eq!(
            parse_content(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap(),
            ""
        );
        assert!(matches!(
            parse_content(r#"{"error":{"message":"quota"}}"#),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(parse_content("oops"), Err(FetchError::Malformed(_))));
    }
}
