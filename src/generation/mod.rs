//! Access to the external text generator.
//!
//! [`GenerationService`] is the seam between this server and the generator:
//! [`GeminiClient`] talks to the real REST API, tests substitute scripted
//! implementations. Everything built on top (the retry policy, outline
//! suggestions, the content pipeline and refine) only sees the trait.

mod error;
mod gemini;
pub mod outline;
pub mod retry;
pub mod sanitize;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::GenerationError;
pub use gemini::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use retry::{generate_with_retry, RetryPolicy, Sleeper, TokioSleeper};
pub use sanitize::sanitize;

/// A text generator: given a prompt, returns text or fails.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;
}

/// Per-call options forwarded to the generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub safety: SafetySettings,
}

impl GenerationOptions {
    /// Every safety category set to [`SafetyThreshold::Allow`].
    pub fn permissive() -> Self {
        Self {
            safety: SafetySettings::allow_all(),
        }
    }
}

/// Content filter configuration, one threshold per harm category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySettings {
    pub harassment: SafetyThreshold,
    pub hate_speech: SafetyThreshold,
    pub sexually_explicit: SafetyThreshold,
    pub dangerous_content: SafetyThreshold,
}

impl SafetySettings {
    pub fn allow_all() -> Self {
        Self {
            harassment: SafetyThreshold::Allow,
            hate_speech: SafetyThreshold::Allow,
            sexually_explicit: SafetyThreshold::Allow,
            dangerous_content: SafetyThreshold::Allow,
        }
    }

    /// `(category, threshold)` pairs in the generator's vocabulary.
    pub fn categories(&self) -> [(&'static str, SafetyThreshold); 4] {
        [
            ("HARM_CATEGORY_HARASSMENT", self.harassment),
            ("HARM_CATEGORY_HATE_SPEECH", self.hate_speech),
            ("HARM_CATEGORY_SEXUALLY_EXPLICIT", self.sexually_explicit),
            ("HARM_CATEGORY_DANGEROUS_CONTENT", self.dangerous_content),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyThreshold {
    #[default]
    Block,
    Allow,
}

impl SafetyThreshold {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "BLOCK_MEDIUM_AND_ABOVE",
            Self::Allow => "BLOCK_NONE",
        }
    }
}
