//! LLM model registry.
//!
//! The set of selectable models is static. Which of them are offered to users
//! depends on which providers have an API key configured at startup.

use serde::{Deserialize, Serialize};

/// Supported LLM vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    OpenAI,
}

impl Provider {
    /// Every provider, in registry order.
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::OpenAI];

    /// Environment variable holding this provider's API key.
    pub fn env_key(&self) -> &'static str {
        match self {
            Self::Google => "GOOGLE_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }

    /// Models registered under this provider.
    pub fn models(&self) -> &'static [Model] {
        match self {
            Self::Google => GOOGLE_MODELS,
            Self::OpenAI => OPENAI_MODELS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::OpenAI => "openai",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Model {
    pub slug: &'static str,
    pub name: &'static str,
    pub provider: Provider,
}

const fn model(slug: &'static str, name: &'static str, provider: Provider) -> Model {
    Model {
        slug,
        name,
        provider,
    }
}

pub const GOOGLE_MODELS: &[Model] = &[
    model("gemini-3-pro-preview", "Gemini 3 Pro Preview", Provider::Google),
    model("gemini-3-flash-preview", "Gemini 3 Flash Preview", Provider::Google),
    model("gemini-2.5-flash", "Gemini 2.5 Flash", Provider::Google),
    model(
        "gemini-2.5-flash-preview-09-2025",
        "Gemini 2.5 Flash Preview",
        Provider::Google,
    ),
    model("gemini-2.5-flash-lite", "Gemini 2.5 Flash Lite", Provider::Google),
    model("gemini-2.5-pro", "Gemini 2.5 Pro", Provider::Google),
];

pub const OPENAI_MODELS: &[Model] = &[
    model("gpt-4o", "GPT-4o", Provider::OpenAI),
    model("gpt-4o-mini", "GPT-4o mini", Provider::OpenAI),
    model("gpt-4.1", "GPT-4.1", Provider::OpenAI),
];

/// Slug used when a chat request does not select a model.
pub fn default_model_slug() -> &'static str {
    GOOGLE_MODELS[0].slug
}

/// Look up a model by slug across all providers.
pub fn model_by_slug(slug: &str) -> Option<&'static Model> {
    Provider::ALL
        .iter()
        .flat_map(|p| p.models().iter())
        .find(|m| m.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_is_registered() {
        let model = model_by_slug(default_model_slug()).unwrap();
        assert_eq!(model.provider, Provider::Google);
    }

    #[test]
    fn test_model_by_slug() {
        assert_eq!(
            model_by_slug("gpt-4o-mini").map(|m| m.provider),
            Some(Provider::OpenAI)
        );
        assert!(model_by_slug("claude-unknown").is_none());
    }

    #[test]
    fn test_slugs_are_unique() {
        let mut slugs: Vec<_> = Provider::ALL
            .iter()
            .flat_map(|p| p.models().iter().map(|m| m.slug))
            .collect();
        let total = slugs.len();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), total);
    }

    #[test]
    fn test_provider_serialization() {
        assert_eq!(
            serde_json::to_string(&Provider::OpenAI).unwrap(),
            "\"openai\""
        );
        assert_eq!(Provider::Google.to_string(), "google");
        assert_eq!(Provider::Google.env_key(), "GOOGLE_API_KEY");
    }
}
