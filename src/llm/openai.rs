//! OpenAI-compatible chat completions client (vLLM, OpenRouter, …).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::transcript::{Role, Segment, Transcript};

use super::LlmClient;

/// Client for any `/chat/completions` endpoint speaking the OpenAI dialect.
pub struct OpenAiClient {
    http: reqwest::Client,
    config: ModelConfig,
}

impl OpenAiClient {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, transcript: &Transcript) -> anyhow::Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let request = ChatRequest {
            model: &self.config.model,
            messages: wire_messages(transcript),
            stream: false,
            max_tokens: self.config.max_output_tokens,
            // vLLM-style switch for models with built-in deliberation; the
            // prompt's own <think> convention replaces it.
            chat_template_kwargs: self
                .config
                .disable_thinking
                .then_some(ChatTemplateKwargs {
                    enable_thinking: false,
                }),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("model endpoint returned {}: {}", status, body);
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow::anyhow!("model returned empty response"))
    }
}

// ── Wire types ────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat_template_kwargs: Option<ChatTemplateKwargs>,
}

#[derive(Serialize)]
struct ChatTemplateKwargs {
    enable_thinking: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: Vec<WireSegment<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireSegment<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn wire_messages(transcript: &Transcript) -> Vec<WireMessage<'_>> {
    transcript
        .turns()
        .iter()
        .map(|turn| WireMessage {
            role: match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: turn
                .content
                .iter()
                .map(|segment| match segment {
                    Segment::Text { text } => WireSegment::Text { text },
                    Segment::Image { data_uri } => WireSegment::ImageUrl {
                        image_url: ImageUrl { url: data_uri },
                    },
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Turn;

    #[test]
    fn wire_messages_mix_text_and_image_segments() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user_text("question"));
        transcript.push(Turn::assistant_text("<search_visual>x</search_visual>"));
        transcript.push(Turn::user_image("data:image;base64,AAAA"));

        let json = serde_json::to_value(wire_messages(&transcript)).unwrap();
        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[0]["content"][0]["type"], "text");
        assert_eq!(json[1]["role"], "assistant");
        assert_eq!(json[2]["content"][0]["type"], "image_url");
        assert_eq!(
            json[2]["content"][0]["image_url"]["url"],
            "data:image;base64,AAAA"
        );
    }

    #[test]
    fn request_omits_template_kwargs_when_thinking_allowed() {
        let request = ChatRequest {
            model: "m",
            messages: vec![],
            stream: false,
            max_tokens: 64,
            chat_template_kwargs: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("chat_template_kwargs").is_none());
    }

    #[test]
    fn request_disables_thinking_when_configured() {
        let request = ChatRequest {
            model: "m",
            messages: vec![],
            stream: false,
            max_tokens: 64,
            chat_template_kwargs: Some(ChatTemplateKwargs {
                enable_thinking: false,
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["chat_template_kwargs"]["enable_thinking"], false);
    }
}
