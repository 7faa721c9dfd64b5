//! Content generation collaborator
//!
//! Runs only after authorization succeeded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::DomainError;

/// Blog generation request as accepted by the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BlogRequest {
    #[validate(length(min = 1, max = 300))]
    pub topic: String,
    #[validate(length(min = 1, max = 100))]
    pub style: String,
    #[validate(length(min = 1, max = 100))]
    pub tone: String,
    #[validate(range(min = 50, max = 5000))]
    pub word_count: u32,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub seo_keywords: Vec<String>,
}

impl BlogRequest {
    /// Instruction sent to the language model
    pub fn prompt(&self) -> String {
        format!(
            "Write a {}-word blog post about {} in a {} style with a {} tone. \
             Include the following SEO keywords naturally: {}.",
            self.word_count,
            self.topic,
            self.style,
            self.tone,
            self.seo_keywords.join(", ")
        )
    }
}

/// Generated article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub content: String,
    pub model: String,
}

/// Produces blog posts from requests
#[async_trait]
pub trait ContentGenerator: Send + Sync + std::fmt::Debug {
    async fn generate_blog(&self, request: &BlogRequest) -> Result<BlogPost, DomainError>;

    fn provider_name(&self) -> &'static str;
}
