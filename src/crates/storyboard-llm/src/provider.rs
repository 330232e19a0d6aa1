//! Provider presets.
//!
//! Each provider carries a default base URL and model so a configuration
//! only has to name the provider and an API key. `openai-compatible` has no
//! default URL; the base URL must be configured.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Request/response shape spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `POST {base}/chat/completions` with a bearer token
    ChatCompletions,
    /// `POST {base}/models/{model}:generateContent?key=...`
    Gemini,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    #[default]
    Deepseek,
    Kimi,
    Gemini,
    OpenaiCompatible,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Deepseek,
        Provider::Kimi,
        Provider::Gemini,
        Provider::OpenaiCompatible,
    ];

    /// Human-readable provider name
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Deepseek => "DeepSeek",
            Provider::Kimi => "Kimi (Moonshot)",
            Provider::Gemini => "Google Gemini",
            Provider::OpenaiCompatible => "OpenAI compatible",
        }
    }

    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Provider::Deepseek => Some("https://api.deepseek.com/v1"),
            Provider::Kimi => Some("https://api.moonshot.cn/v1"),
            Provider::Gemini => Some("https://generativelanguage.googleapis.com/v1beta"),
            Provider::OpenaiCompatible => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Deepseek => "deepseek-chat",
            Provider::Kimi => "moonshot-v1-8k",
            Provider::Gemini => "gemini-pro",
            Provider::OpenaiCompatible => "gpt-4o-mini",
        }
    }

    pub fn wire_format(&self) -> WireFormat {
        match self {
            Provider::Gemini => WireFormat::Gemini,
            _ => WireFormat::ChatCompletions,
        }
    }

    fn key(&self) -> &'static str {
        match self {
            Provider::Deepseek => "deepseek",
            Provider::Kimi => "kimi",
            Provider::Gemini => "gemini",
            Provider::OpenaiCompatible => "openai-compatible",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|provider| provider.key() == wanted)
            .ok_or_else(|| format!("Unknown LLM provider: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(Provider::default(), Provider::Deepseek);
        assert_eq!(Provider::Kimi.default_model(), "moonshot-v1-8k");
        assert_eq!(Provider::OpenaiCompatible.default_base_url(), None);
        assert_eq!(Provider::Gemini.wire_format(), WireFormat::Gemini);
        assert_eq!(Provider::Deepseek.wire_format(), WireFormat::ChatCompletions);
    }

    #[test]
    fn test_names_round_trip() {
        for provider in Provider::ALL {
            assert_eq!(provider.to_string().parse::<Provider>(), Ok(provider));
            let json = serde_json::to_string(&provider).unwrap();
            assert_eq!(json, format!("\"{}\"", provider));
        }
        assert!("claude".parse::<Provider>().is_err());
    }
}
