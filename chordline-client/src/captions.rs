//! Social captions through OpenRouter chat completions
//!
//! Any failure (no API key, network error, bad status, empty reply) falls
//! back to a template caption, so callers always get text.

use chordline_common::captions::{build_prompt, template_caption, CaptionOptions, ShowDetails, VARIATION_TONES};
use chordline_common::Provider;
use rand::Rng;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::{ClientError, Result};

const PROVIDER: Provider = Provider::OpenRouter;
pub const CAPTION_MODEL: &str = "meta-llama/llama-3.2-3b-instruct:free";
const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f64 = 0.8;
const APP_TITLE: &str = "ChordLine Social Caption Generator";

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

fn random_template(show: &ShowDetails, options: &CaptionOptions) -> String {
    let index = rand::thread_rng().gen_range(0..options.tone.templates().len());
    template_caption(show, options, index)
}

#[derive(Debug, Clone)]
pub struct CaptionClient {
    config: ServiceConfig,
}

impl CaptionClient {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// Caption straight from the model, without fallback
    pub async fn ai_caption(&self, show: &ShowDetails, options: &CaptionOptions) -> Result<String> {
        let body = json!({
            "model": CAPTION_MODEL,
            "messages": [{ "role": "user", "content": build_prompt(show, options) }],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let completion: ChatCompletion = self
            .config
            .send_json(PROVIDER, Method::POST, "/api/v1/chat/completions", |r| {
                r.header("X-Title", APP_TITLE).json(&body)
            })
            .await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ClientError::Parse("Completion has no content".to_string()))
    }

    /// Model caption, or a template caption when the model is unavailable
    pub async fn generate_caption(&self, show: &ShowDetails, options: &CaptionOptions) -> String {
        if self.config.endpoint(PROVIDER).credential.is_none() {
            debug!("No OpenRouter key configured, using template caption");
            return random_template(show, options);
        }

        match self.ai_caption(show, options).await {
            Ok(caption) => caption,
            Err(e) => {
                warn!("Caption generation failed, using template: {}", e);
                random_template(show, options)
            }
        }
    }

    /// One caption per variation tone, in order
    pub async fn variations(&self, show: &ShowDetails, options: &CaptionOptions) -> Vec<String> {
        let mut captions = Vec::with_capacity(VARIATION_TONES.len());
        for tone in VARIATION_TONES {
            captions.push(self.generate_caption(show, &options.with_tone(tone)).await);
        }
        captions
    }
}
