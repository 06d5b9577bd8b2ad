//! Answer generation boundary
//!
//! The model call itself lives behind [`AnswerGenerator`]; the pipeline's
//! responsibility ends at handing it the retrieved context and question,
//! then relaying the answer to the transport as an ordered stream of
//! fragments. Fragments go through a bounded channel in strict generation
//! order, and the de-duplicated source list is appended as one final
//! fragment after the answer completes.

use crate::config::AnswerConfig;
use crate::error::{Error, Result};
use crate::retrieve::{user_message, Retrieved};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Bound on in-flight answer fragments between producer and transport
const FRAGMENT_BUFFER: usize = 64;

/// External collaborator that turns (context, question) into an answer
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, context: &str, question: &str) -> Result<String>;
}

/// OpenAI-compatible chat completions generator
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    instructions: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl ChatCompletionsGenerator {
    pub fn new(config: &AnswerConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(Error::Config(format!(
                "API key missing: set {}",
                config.api_key_env
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            instructions: config.instructions.clone(),
        })
    }
}

#[async_trait]
impl AnswerGenerator for ChatCompletionsGenerator {
    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        let prompt = format!(
            "Context from the site:\n{}\n\nQuestion: {}",
            context, question
        );
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Answer(format!(
                "Chat completion failed with HTTP {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Answer("Chat completion returned no choices".to_string()))
    }
}

/// Stream an answer for already-retrieved context.
///
/// Spawns a producer that generates the answer and sends it through a
/// bounded channel one fragment at a time, in generation order, followed by
/// a final sources fragment built from the first-seen de-duplicated URL
/// list. Generation failures arrive as a final user-facing message rather
/// than an abrupt channel close.
pub fn stream_answer(
    generator: Arc<dyn AnswerGenerator>,
    retrieved: Retrieved,
    question: String,
) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);

    tokio::spawn(async move {
        let context = retrieved.context();
        let sources = retrieved.sources();

        match generator.generate(&context, &question).await {
            Ok(answer) => {
                for ch in answer.chars() {
                    // A dropped receiver means the caller went away.
                    if tx.send(ch.to_string()).await.is_err() {
                        return;
                    }
                }
                if !sources.is_empty() {
                    let _ = tx.send(format_sources(&sources)).await;
                }
            }
            Err(e) => {
                warn!("Answer generation failed: {}", e);
                let _ = tx.send(user_message(&e)).await;
            }
        }
    });

    rx
}

fn format_sources(sources: &[String]) -> String {
    let mut out = String::from("\n\nSources:\n");
    for url in sources {
        out.push_str("- ");
        out.push_str(url);
        out.push('\n');
    }
    out
}
