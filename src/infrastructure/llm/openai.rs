use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http_client::HttpClientTrait;
use crate::domain::content::{BlogPost, BlogRequest, ContentGenerator};
use crate::domain::DomainError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";

/// Blog generator backed by the OpenAI chat completions API
#[derive(Debug)]
pub struct OpenAiBlogGenerator<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
}

impl<C: HttpClientTrait> OpenAiBlogGenerator<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, request: &BlogRequest) -> serde_json::Value {
        let messages = vec![OpenAiMessage {
            role: "system".to_string(),
            content: request.prompt(),
        }];

        serde_json::json!({
            "model": self.model,
            "messages": messages,
        })
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<BlogPost, DomainError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("openai", format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider("openai", "No choices in response"))?;

        let content = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| DomainError::provider("openai", "Empty completion"))?;

        Ok(BlogPost {
            content,
            model: response.model,
        })
    }
}

#[async_trait]
impl<C: HttpClientTrait> ContentGenerator for OpenAiBlogGenerator<C> {
    async fn generate_blog(&self, request: &BlogRequest) -> Result<BlogPost, DomainError> {
        let url = self.chat_completions_url();
        let body = self.build_request(request);

        debug!(model = %self.model, word_count = request.word_count, "Requesting blog post");

        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await
            .map_err(|e| match e {
                DomainError::Provider { message, .. } => DomainError::provider("openai", message),
                other => other,
            })?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use crate::infrastructure::llm::HttpClient;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_URL: &str = "https://api.openai.com/v1/chat/completions";

    fn request() -> BlogRequest {
        BlogRequest {
            topic: "home espresso".to_string(),
            style: "how-to".to_string(),
            tone: "casual".to_string(),
            word_count: 600,
            seo_keywords: vec!["grinder".to_string(), "crema".to_string()],
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "model": "gpt-4-0613",
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 40, "completion_tokens": 600, "total_tokens": 640 }
        })
    }

    #[tokio::test]
    async fn test_generate_blog() {
        let client = MockHttpClient::new().with_response(TEST_URL, completion("# Espresso at home"));
        let generator = OpenAiBlogGenerator::new(client, "test-api-key");

        let post = generator.generate_blog(&request()).await.unwrap();

        assert_eq!(post.content, "# Espresso at home");
        assert_eq!(post.model, "gpt-4-0613");
    }

    #[tokio::test]
    async fn test_request_carries_prompt_as_system_message() {
        let client = MockHttpClient::new().with_response(TEST_URL, completion("ok"));
        let generator = OpenAiBlogGenerator::new(client, "k").with_model("gpt-4o-mini");

        generator.generate_blog(&request()).await.unwrap();

        let sent = generator.client.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["model"], "gpt-4o-mini");
        assert_eq!(sent[0]["messages"][0]["role"], "system");
        assert_eq!(sent[0]["messages"][0]["content"], request().prompt());
    }

    #[tokio::test]
    async fn test_error_is_attributed_to_openai() {
        let client = MockHttpClient::new().with_error(TEST_URL, "API key invalid");
        let generator = OpenAiBlogGenerator::new(client, "invalid-key");

        let err = generator.generate_blog(&request()).await.unwrap_err();
        match err {
            DomainError::Provider { provider, message } => {
                assert_eq!(provider, "openai");
                assert_eq!(message, "API key invalid");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let response = serde_json::json!({ "id": "x", "model": "gpt-4", "choices": [] });
        let client = MockHttpClient::new().with_response(TEST_URL, response);
        let generator = OpenAiBlogGenerator::new(client, "k");

        assert!(generator.generate_blog(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_blank_completion_is_error() {
        let client = MockHttpClient::new().with_response(TEST_URL, completion("   "));
        let generator = OpenAiBlogGenerator::new(client, "k");

        assert!(generator.generate_blog(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_against_http_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer live-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Served")))
            .expect(1)
            .mount(&server)
            .await;

        let generator =
            OpenAiBlogGenerator::with_base_url(HttpClient::new(), "live-key", format!("{}/", server.uri()));

        let post = generator.generate_blog(&request()).await.unwrap();
        assert_eq!(post.content, "Served");
        assert_eq!(generator.provider_name(), "openai");
    }
}
