//! # API Module
//!
//! This module handles the chat-completion call that turns a prompt into a draft
//! document.
//!
//! The call sits behind the [`CompletionBackend`] trait so the pipeline receives an
//! explicit client handle instead of reaching for global state; [`OpenAiBackend`] is the
//! production implementation over `async-openai`, and tests swap in a scripted double.
//!
//! [`fetch_response`] wraps any backend in the retry policy:
//!
//! - at most `max_retries` attempts in total, back to back, no delay;
//! - only [`FetchError::Transport`] and [`FetchError::MalformedResponse`] are retried,
//!   each retry logged as a warning;
//! - the last retryable error is returned once attempts run out;
//! - any other error is logged and returned at once.
//!
//! # Example
//!
//! ```no_run
//! use awful_scribe::api::{OpenAiBackend, fetch_response};
//! use awful_scribe::config::ScribeConfig;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScribeConfig::default();
//! let backend = OpenAiBackend::new(&config, "gsk_...");
//! let text = fetch_response(&backend, "Write a haiku about DOCX.", config.max_retries).await?;
//! println!("{text}");
//! # Ok(()) }
//! ```
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::{config::ScribeConfig, error::FetchError};

/// Something that answers a prompt with generated text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Perform exactly one completion attempt.
    async fn complete(&self, prompt: &str) -> Result<String, FetchError>;
}

/// Chat-completion backend for any OpenAI compatible endpoint.
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

/// Creates a new OpenAI API client from configuration.
///
/// The client's own rate-limit backoff is given a zero time budget, so every call
/// is a single HTTP request and [`fetch_response`] alone decides on retries.
///
/// # Parameters
/// - `config: &ScribeConfig`: Configuration containing the API base.
/// - `api_key: &str`: Secret read from the environment.
fn create_client(config: &ScribeConfig, api_key: &str) -> Client<OpenAIConfig> {
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(config.api_base.clone());
    debug!("Client created for {}", config.api_base);
    let no_backoff = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();
    Client::with_config(openai_config).with_backoff(no_backoff)
}

impl OpenAiBackend {
    pub fn new(config: &ScribeConfig, api_key: &str) -> Self {
        Self {
            client: create_client(config, api_key),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Sort an `async-openai` error into a retry class.
///
/// Any status the service answers with, 5xx and 429 included, is an
/// [`FetchError::Api`] and is not retried.
fn classify(err: OpenAIError) -> FetchError {
    match &err {
        OpenAIError::Reqwest(_) => FetchError::Transport(err.to_string()),
        OpenAIError::JSONDeserialize(..) => FetchError::MalformedResponse(err.to_string()),
        OpenAIError::ApiError(_) => FetchError::Api(err.to_string()),
        _ => FetchError::Other(err.to_string()),
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, prompt: &str) -> Result<String, FetchError> {
        let message: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(classify)?
            .into();

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .messages(vec![message])
            .build()
            .map_err(classify)?;

        debug!("Sending request: model={} prompt_chars={}", self.model, prompt.len());

        let response = self.client.chat().create(request).await.map_err(classify)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| FetchError::MalformedResponse("response carried no text".to_string()))
    }
}

/// Ask `backend` for a completion, retrying transient failures.
///
/// # Parameters
/// - `backend`: The completion handle.
/// - `prompt`: The full prompt, sent as a single user message.
/// - `max_retries`: Total attempts; `0` behaves like `1`.
///
/// # Returns
/// - `Ok(String)`: The first choice's text, verbatim.
/// - `Err(FetchError)`: The final retryable error, or the first non-retryable one.
pub async fn fetch_response(
    backend: &dyn CompletionBackend,
    prompt: &str,
    max_retries: u32,
) -> Result<String, FetchError> {
    let attempts = max_retries.max(1);
    let mut attempt = 1;

    loop {
        match backend.complete(prompt).await {
            Ok(text) => {
                info!("AI response received successfully on attempt {}", attempt);
                return Ok(text);
            }
            Err(err) if err.is_retryable() && attempt < attempts => {
                warn!("Attempt {} of {} failed: {}", attempt, attempts, err);
                attempt += 1;
            }
            Err(err) if err.is_retryable() => {
                error!("Max retries reached. Error: {}", err);
                return Err(err);
            }
            Err(err) => {
                error!("Unexpected error occurred while getting AI response: {}", err);
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    /// Replays a fixed list of outcomes, repeating the last one.
    struct Scripted {
        outcomes: Mutex<Vec<Result<String, FetchError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(mut outcomes: Vec<Result<String, FetchError>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn clone_outcome(outcome: &Result<String, FetchError>) -> Result<String, FetchError> {
        match outcome {
            Ok(text) => Ok(text.clone()),
            Err(FetchError::Transport(m)) => Err(FetchError::Transport(m.clone())),
            Err(FetchError::MalformedResponse(m)) => Err(FetchError::MalformedResponse(m.clone())),
            Err(FetchError::Api(m)) => Err(FetchError::Api(m.clone())),
            Err(FetchError::Other(m)) => Err(FetchError::Other(m.clone())),
        }
    }

    #[async_trait]
    impl CompletionBackend for Scripted {
        async fn complete(&self, _prompt: &str) -> Result<String, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.len() > 1 {
                outcomes.pop().unwrap()
            } else {
                clone_outcome(&outcomes[0]).map_err(|e| match e {
                    FetchError::Transport(m) => FetchError::Transport(format!("{m} #{n}")),
                    other => other,
                })
            }
        }
    }

    #[tokio::test]
    async fn test_success_first_try() {
        setup();
        let backend = Scripted::new(vec![Ok("draft".into())]);
        let text = fetch_response(&backend, "p", 3).await.unwrap();
        assert_eq!(text, "draft");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_retryable_errors_exhaust_exactly_n_attempts() {
        setup();
        for n in 1..=5 {
            let backend = Scripted::new(vec![Err(FetchError::Transport("reset".into()))]);
            let err = fetch_response(&backend, "p", n).await.unwrap_err();
            assert_eq!(backend.calls(), n as usize);
            // The surfaced error is the one from the final attempt.
            assert_eq!(err.to_string(), format!("transport failure: reset #{}", n - 1));
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        setup();
        let backend = Scripted::new(vec![
            Err(FetchError::MalformedResponse("garbled".into())),
            Err(FetchError::Transport("reset".into())),
            Ok("draft".into()),
        ]);
        let text = fetch_response(&backend, "p", 3).await.unwrap();
        assert_eq!(text, "draft");
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        setup();
        let backend = Scripted::new(vec![
            Err(FetchError::Api("invalid key".into())),
            Ok("never".into()),
        ]);
        let err = fetch_response(&backend, "p", 3).await.unwrap_err();
        assert!(matches!(err, FetchError::Api(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_after_retryable_stops() {
        setup();
        let backend = Scripted::new(vec![
            Err(FetchError::Transport("reset".into())),
            Err(FetchError::Other("boom".into())),
            Ok("never".into()),
        ]);
        let err = fetch_response(&backend, "p", 5).await.unwrap_err();
        assert!(matches!(err, FetchError::Other(_)));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_retries_means_one_attempt() {
        setup();
        let backend = Scripted::new(vec![Err(FetchError::Transport("reset".into()))]);
        assert!(fetch_response(&backend, "p", 0).await.is_err());
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_create_backend() {
        setup();
        let backend = OpenAiBackend::new(&ScribeConfig::default(), "mock_api_key");
        assert_eq!(backend.model, "llama3-8b-8192");
        assert_eq!(backend.max_tokens, 8192);
    }
}
