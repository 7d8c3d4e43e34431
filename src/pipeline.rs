//! The generation flow shared by the window and the headless command.
//!
//! A [`Pipeline`] owns its settings and explicit handles to every outside service:
//! the completion backend plus optional web research and grammar checking. Nothing
//! here reaches for global state, so tests wire in stubs the same way `main` wires in
//! the real clients.
//!
//! [`Pipeline::generate`] runs, in order: content validation, research, prompt
//! construction, the completion call with retries, the grammar pass, the empty response
//! check, and document formatting on a blocking thread.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::api::{CompletionBackend, OpenAiBackend, fetch_response};
use crate::config::{Credentials, ScribeConfig};
use crate::document::{DocumentFormatter, DocumentMetadata, ReportDocument};
use crate::error::{Result, ScribeError};
use crate::grammar::{GrammarChecker, LanguageTool, correct_text};
use crate::params::RequestParams;
use crate::prompt::PromptBuilder;
use crate::search::{SerperSearch, WebSearch, gather_research};
use crate::template::ReportTemplate;

/// Output of one successful generation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub prompt: String,
    pub response: String,
    pub document: ReportDocument,
}

pub struct Pipeline {
    config: ScribeConfig,
    prompt_builder: PromptBuilder,
    formatter: DocumentFormatter,
    backend: Arc<dyn CompletionBackend>,
    search: Option<Arc<dyn WebSearch>>,
    grammar: Option<Arc<dyn GrammarChecker>>,
}

impl Pipeline {
    /// A pipeline with only the completion backend wired in.
    pub fn new(
        config: ScribeConfig,
        template: ReportTemplate,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            prompt_builder: PromptBuilder::new(template, config.max_input_length),
            formatter: DocumentFormatter::new(config.worker_threads),
            config,
            backend,
            search: None,
            grammar: None,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_grammar(mut self, grammar: Arc<dyn GrammarChecker>) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// Wire the production clients according to `config`.
    pub fn from_config(
        config: ScribeConfig,
        credentials: &Credentials,
        template: ReportTemplate,
    ) -> Self {
        let backend = Arc::new(OpenAiBackend::new(&config, &credentials.completion_api_key));

        let search: Option<Arc<dyn WebSearch>> = config.search.enabled.then(|| {
            Arc::new(SerperSearch::new(
                config.search.endpoint.clone(),
                credentials.search_api_key.clone(),
            )) as Arc<dyn WebSearch>
        });

        let grammar: Option<Arc<dyn GrammarChecker>> = config.grammar.enabled.then(|| {
            Arc::new(LanguageTool::new(
                config.grammar.endpoint.clone(),
                config.grammar.language.clone(),
            )) as Arc<dyn GrammarChecker>
        });

        let mut pipeline = Self::new(config, template, backend);
        pipeline.search = search;
        pipeline.grammar = grammar;
        pipeline
    }

    pub fn config(&self) -> &ScribeConfig {
        &self.config
    }

    /// Title page values for a new document.
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata::new(
            self.config.document_title.clone(),
            self.config.document_author.clone(),
        )
    }

    /// Reject content shorter than the configured minimum, counted after trimming.
    pub fn validate_content(&self, content: &str) -> Result<()> {
        let actual = content.trim().chars().count();
        let minimum = self.config.min_content_length;
        if actual < minimum {
            warn!("Content too short: {} < {} characters", actual, minimum);
            return Err(ScribeError::ContentTooShort { actual, minimum });
        }
        Ok(())
    }

    /// Run one generation end to end.
    pub async fn generate(&self, params: &RequestParams) -> Result<Generation> {
        self.validate_content(&params.content)?;

        let research = match &self.search {
            Some(search) => {
                gather_research(
                    search.as_ref(),
                    &params.category,
                    &params.purpose,
                    self.config.search.max_results,
                )
                .await
            }
            None => String::new(),
        };

        let prompt = self
            .prompt_builder
            .build_with_research(params, &research)
            .inspect_err(|e| error!("Error generating prompt: {}", e))?;

        let mut response = fetch_response(self.backend.as_ref(), &prompt, self.config.max_retries)
            .await
            .map_err(ScribeError::from)?;

        if let Some(grammar) = &self.grammar {
            response = correct_text(grammar.as_ref(), &response).await;
        }

        if response.trim().is_empty() {
            error!("Completion service returned an empty response");
            return Err(ScribeError::EmptyResponse);
        }

        let formatter = self.formatter;
        let metadata = self.metadata();
        let text = response.clone();
        let document = tokio::task::spawn_blocking(move || formatter.format(&text, Some(metadata)))
            .await
            .map_err(|e| ScribeError::Document(format!("formatter task failed: {e}")))?
            .inspect_err(|e| error!("Error formatting document: {}", e))?;

        info!("Document generated successfully");
        Ok(Generation {
            prompt,
            response,
            document,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::grammar::{Correction, Replacement};
    use crate::params::{Approach, Category, Purpose};
    use crate::search::SearchResult;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LONG: &str = "A sufficiently long body of content that clears the fifty character minimum.";

    struct Echo {
        reply: String,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl Echo {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for Echo {
        async fn complete(&self, prompt: &str) -> std::result::Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    struct OneHit;

    #[async_trait]
    impl WebSearch for OneHit {
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> std::result::Result<Vec<SearchResult>, String> {
            Ok(vec![SearchResult {
                title: "Style guide".into(),
                snippet: "Write short sentences".into(),
            }])
        }
    }

    struct FixTeh;

    #[async_trait]
    impl GrammarChecker for FixTeh {
        async fn check(&self, text: &str) -> std::result::Result<Vec<Correction>, String> {
            Ok(text
                .match_indices("teh")
                .map(|(offset, _)| Correction {
                    offset,
                    length: 3,
                    replacements: vec![Replacement {
                        value: "the".into(),
                    }],
                })
                .collect())
        }
    }

    fn params(content: &str) -> RequestParams {
        RequestParams::new(content, Approach::Technical, Purpose::Informative, Category::Report)
    }

    fn pipeline(backend: Arc<Echo>) -> Pipeline {
        Pipeline::new(ScribeConfig::default(), ReportTemplate::builtin(), backend)
    }

    #[tokio::test]
    async fn test_short_content_never_reaches_backend() {
        let backend = Echo::new("unused");
        let err = pipeline(backend.clone())
            .generate(&params("too short"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScribeError::ContentTooShort {
                actual: 9,
                minimum: 50
            }
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_padding_does_not_count_towards_minimum() {
        let padded = format!("{}{}", " ".repeat(100), "x");
        let err = pipeline(Echo::new("unused"))
            .generate(&params(&padded))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::ContentTooShort { actual: 1, .. }));
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let err = pipeline(Echo::new("  \n "))
            .generate(&params(LONG))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_generation_formats_response() {
        let generation = pipeline(Echo::new("# Intro\nHello world"))
            .generate(&params(LONG))
            .await
            .unwrap();
        assert_eq!(generation.response, "# Intro\nHello world");
        assert!(generation.prompt.contains("Category: Report"));
        assert!(generation.document.plain_text().ends_with("Intro\nHello world"));
    }

    #[tokio::test]
    async fn test_research_reaches_prompt() {
        let backend = Echo::new("Body");
        pipeline(backend.clone())
            .with_search(Arc::new(OneHit))
            .generate(&params(LONG))
            .await
            .unwrap();
        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("- Style guide: Write short sentences"));
    }

    #[tokio::test]
    async fn test_grammar_pass_is_applied() {
        let generation = pipeline(Echo::new("teh report"))
            .with_grammar(Arc::new(FixTeh))
            .generate(&params(LONG))
            .await
            .unwrap();
        assert_eq!(generation.response, "the report");
    }

    #[test]
    fn test_from_config_respects_toggles() {
        let creds = Credentials::from_lookup(|_| Some("key".into())).unwrap();
        let mut config = ScribeConfig::default();
        config.search.enabled = false;
        config.grammar.enabled = true;
        let pipeline = Pipeline::from_config(config, &creds, ReportTemplate::builtin());
        assert!(pipeline.search.is_none());
        assert!(pipeline.grammar.is_some());
    }
}
