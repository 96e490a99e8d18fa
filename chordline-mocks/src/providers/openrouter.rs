//! OpenRouter mock
//!
//! Returns canned assistant text picked by a keyword category of the prompt.
//! Chat completions can stream word by word as server-sent events.

use axum::{
    extract::rejection::JsonRejection,
    middleware,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chordline_common::{time, Provider};
use futures::stream::Stream;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tracing::debug;

use crate::auth::require_credential;
use crate::error::{json_body, MockError, MockResult};
use crate::AppState;

const PROVIDER: Provider = Provider::OpenRouter;
pub const DEFAULT_MODEL: &str = "anthropic/claude-3-sonnet";
/// Delay between streamed words
const WORD_DELAY: Duration = Duration::from_millis(100);

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/chat/completions", post(chat_completions))
        .route("/api/v1/completions", post(completions))
        .route("/api/v1/models", get(models))
        .route("/api/v1/generation", post(generation))
        .route("/api/v1/usage", get(usage))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), PROVIDER),
            require_credential,
        ))
}

/// Kind of canned answer a prompt gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SocialMedia,
    Planning,
    Creative,
}

const SOCIAL_MEDIA_RESPONSES: [&str; 3] = [
    "🎵 Just finished an incredible show at The Bluebird Cafe! The acoustic vibes were perfect and the audience was so engaged. There's nothing quite like that intimate Nashville magic. #LiveMusic #TheBluebird #AcousticVibes",
    "✨ New song 'Whispers in the Dark' is now streaming everywhere! This one's close to our hearts - written during those late night sessions when creativity flows freely. Give it a listen and let us know what you think! 🎶",
    "🌟 Thank you to everyone who came out to our show last night! Your energy was incredible and made every song feel special. Already planning our next performance - stay tuned! #ThankYou #LiveMusic #GratefulBand",
];

const PLANNING_RESPONSES: [&str; 3] = [
    "I'd recommend starting with smaller venues to build your fanbase, then gradually moving to larger spaces. Consider booking 2-3 shows per month to maintain momentum without overwhelming your schedule.",
    "For your summer tour, I suggest focusing on college towns and music festivals. The demographic tends to be more open to discovering new music, and the atmosphere is perfect for building a loyal following.",
    "Based on your current performance schedule, adding merchandise sales could increase your revenue by 20-30%. Consider starting with simple items like stickers, t-shirts, and digital downloads.",
];

const CREATIVE_RESPONSES: [&str; 3] = [
    "Here's a creative setlist idea: Start with your most recognizable song to grab attention, then take the audience on an emotional journey with 2-3 deeper cuts, and end with your most energetic crowd-pleaser.",
    "For your next music video, consider a simple performance-style video in an interesting location. Nashville has so many iconic spots that would complement your sound - maybe the pedestrian bridge or East Nashville murals?",
    "Try experimenting with alternate tunings on your guitar for your next writing session. Drop D or DADGAD can inspire completely different chord progressions and melodies you might not find in standard tuning.",
];

impl Category {
    /// Keyword match on the lowercased prompt; social wins over creative
    pub fn detect(prompt: &str) -> Self {
        let prompt = prompt.to_lowercase();
        let any = |words: &[&str]| words.iter().any(|w| prompt.contains(w));

        if any(&["social", "post", "caption", "instagram", "twitter"]) {
            Category::SocialMedia
        } else if any(&["creative", "music", "song", "setlist", "video"]) {
            Category::Creative
        } else {
            Category::Planning
        }
    }

    pub fn responses(self) -> &'static [&'static str] {
        match self {
            Category::SocialMedia => &SOCIAL_MEDIA_RESPONSES,
            Category::Planning => &PLANNING_RESPONSES,
            Category::Creative => &CREATIVE_RESPONSES,
        }
    }

    fn random_response(self) -> &'static str {
        self.responses()
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(PLANNING_RESPONSES[0])
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "social_media" => Some(Category::SocialMedia),
            "planning" => Some(Category::Planning),
            "creative" => Some(Category::Creative),
            _ => None,
        }
    }
}

/// Rough token estimate: a quarter of the character count
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

#[derive(Debug, Serialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

impl Usage {
    fn of(prompt: &str, response: &str) -> Self {
        let prompt_chars = prompt.chars().count();
        let response_chars = response.chars().count();
        Self {
            prompt_tokens: prompt_chars / 4,
            completion_tokens: response_chars / 4,
            total_tokens: (prompt_chars + response_chars) / 4,
        }
    }
}

fn invalid_request(message: &str) -> MockError {
    MockError::bad_request(PROVIDER, message)
}

/// Text of a message `content`, stringifying non-string values
fn content_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn model_of(body: &Value) -> String {
    body.get("model")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MODEL)
        .to_string()
}

/// POST /api/v1/chat/completions
async fn chat_completions(body: Result<Json<Value>, JsonRejection>) -> MockResult<Response> {
    let body = json_body(PROVIDER, body)?;
    let last = body
        .get("messages")
        .and_then(Value::as_array)
        .and_then(|messages| messages.last())
        .ok_or_else(|| invalid_request("Invalid messages format"))?;

    let prompt = content_text(last.get("content"));
    let category = Category::detect(&prompt);
    let response = category.random_response();
    let model = model_of(&body);
    let id = format!("chatcmpl-{}", time::now_millis());
    let created = time::now_secs();
    debug!(?category, %model, "OpenRouter chat completion");

    if body.get("stream").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(stream_completion(id, created, model, response).into_response());
    }

    Ok(Json(json!({
        "id": id,
        "object": "chat.completion",
        "created": created,
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": response },
            "finish_reason": "stop"
        }],
        "usage": Usage::of(&prompt, response)
    }))
    .into_response())
}

/// One `chat.completion.chunk` per word, then `[DONE]`
fn stream_completion(
    id: String,
    created: i64,
    model: String,
    response: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        let words: Vec<&str> = response.split(' ').collect();
        let last = words.len().saturating_sub(1);

        for (index, word) in words.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(WORD_DELAY).await;
            }
            let content = if index < last { format!("{word} ") } else { word.to_string() };
            let chunk = json!({
                "id": id,
                "object": "chat.completion.chunk",
                "created": created,
                "model": model,
                "choices": [{
                    "index": 0,
                    "delta": { "content": content },
                    "finish_reason": if index == last { Value::from("stop") } else { Value::Null }
                }]
            });
            yield Ok(Event::default().data(chunk.to_string()));
        }

        yield Ok(Event::default().data("[DONE]"));
    };

    Sse::new(stream)
}

fn prompt_of(body: &Value) -> MockResult<String> {
    body.get("prompt")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .ok_or_else(|| invalid_request("No prompt provided"))
}

/// POST /api/v1/completions
async fn completions(body: Result<Json<Value>, JsonRejection>) -> MockResult<Json<Value>> {
    let body = json_body(PROVIDER, body)?;
    let prompt = prompt_of(&body)?;
    let response = Category::detect(&prompt).random_response();

    Ok(Json(json!({
        "id": format!("cmpl-{}", time::now_millis()),
        "object": "text_completion",
        "created": time::now_secs(),
        "model": model_of(&body),
        "choices": [{
            "text": response,
            "index": 0,
            "logprobs": null,
            "finish_reason": "stop"
        }],
        "usage": Usage::of(&prompt, response)
    })))
}

fn model_card(
    id: &str,
    created: i64,
    owned_by: &str,
    pricing: (&str, &str),
    context_length: u32,
    tokenizer: &str,
    instruct_type: &str,
) -> Value {
    json!({
        "id": id,
        "object": "model",
        "created": created,
        "owned_by": owned_by,
        "pricing": { "prompt": pricing.0, "completion": pricing.1 },
        "context_length": context_length,
        "architecture": {
            "modality": "text",
            "tokenizer": tokenizer,
            "instruct_type": instruct_type
        }
    })
}

/// GET /api/v1/models
async fn models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [
            model_card(DEFAULT_MODEL, 1677610602, "anthropic", ("0.000003", "0.000015"), 200000, "Claude", "claude"),
            model_card("openai/gpt-3.5-turbo", 1677610602, "openai", ("0.0000005", "0.0000015"), 4096, "cl100k_base", "chatml"),
            model_card("openai/gpt-4", 1687882411, "openai", ("0.00003", "0.00006"), 8192, "cl100k_base", "chatml"),
        ]
    }))
}

/// POST /api/v1/generation `{prompt, type}`
async fn generation(body: Result<Json<Value>, JsonRejection>) -> MockResult<Json<Value>> {
    let body = json_body(PROVIDER, body)?;
    let prompt = prompt_of(&body)?;
    let kind = body
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("general")
        .to_string();

    let category = Category::from_name(&kind).unwrap_or_else(|| Category::detect(&prompt));
    let response = category.random_response();

    Ok(Json(json!({
        "id": format!("gen-{}", time::now_millis()),
        "object": "generation",
        "created": time::now_secs(),
        "result": { "text": response, "type": kind },
        "usage": Usage::of(&prompt, response)
    })))
}

/// GET /api/v1/usage
async fn usage() -> Json<Value> {
    Json(json!({
        "object": "usage",
        "data": {
            "total_usage": "$2.45",
            "current_month": "$0.87",
            "requests_count": 156,
            "tokens_used": 12450,
            "models_used": [
                { "model": DEFAULT_MODEL, "requests": 89, "tokens": 7890, "cost": "$1.23" },
                { "model": "openai/gpt-3.5-turbo", "requests": 67, "tokens": 4560, "cost": "$1.22" }
            ]
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_detection() {
        assert_eq!(Category::detect("Write an Instagram caption"), Category::SocialMedia);
        assert_eq!(Category::detect("Suggest a SETLIST order"), Category::Creative);
        assert_eq!(Category::detect("How many shows should we book?"), Category::Planning);
        // social keywords win when both appear
        assert_eq!(Category::detect("post about our new song"), Category::SocialMedia);
    }

    #[test]
    fn test_every_category_has_three_responses() {
        for category in [Category::SocialMedia, Category::Planning, Category::Creative] {
            assert_eq!(category.responses().len(), 3);
            assert!(category.responses().contains(&category.random_response()));
        }
    }

    #[test]
    fn test_usage_counts_characters() {
        let usage = Usage::of("abcdefgh", "abcd");
        assert_eq!(usage.prompt_tokens, 2);
        assert_eq!(usage.completion_tokens, 1);
        assert_eq!(usage.total_tokens, 3);
        assert_eq!(estimate_tokens("🎵🎵🎵🎵"), 1);
    }

    #[test]
    fn test_explicit_generation_type() {
        assert_eq!(Category::from_name("creative"), Some(Category::Creative));
        assert_eq!(Category::from_name("general"), None);
    }
}
