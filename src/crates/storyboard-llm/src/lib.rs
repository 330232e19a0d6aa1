//! # storyboard-llm - Generation Providers
//!
//! [`LlmGenerator`] implements the workflow's
//! [`GenerationService`](storyboard_workflow::GenerationService) on top of a
//! [`ChatBackend`]. The backend is chosen by [`Provider`]:
//!
//! - DeepSeek, Kimi and any OpenAI-compatible endpoint use
//!   [`OpenAiClient`] (`/chat/completions`)
//! - Google Gemini uses [`GeminiClient`] (`generateContent`)
//!
//! Both decode streaming replies from Server-Sent Events into fragments.
//! Scene lists are parsed from numbered model output.
//!
//! ```rust,ignore
//! use storyboard_llm::{LlmConfig, LlmGenerator, Provider};
//!
//! let config = LlmConfig::for_provider(Provider::Gemini, std::env::var("GEMINI_API_KEY")?);
//! let generator = LlmGenerator::new(config)?;
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod prompts;
pub mod provider;
pub mod sse;

pub use backend::{backend_for, ChatBackend};
pub use client::OpenAiClient;
pub use config::LlmConfig;
pub use error::{LlmError, Result};
pub use gemini::GeminiClient;
pub use generator::LlmGenerator;
pub use provider::{Provider, WireFormat};
pub use prompts::{parse_scene_list, ChatMessage, PromptRequest};
pub use sse::{decode_stream, parse_gemini_chunk, SseDecoder};
