//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the [`ScribeConfig`] struct, which holds the tunable parameters of the
//! generation pipeline, [`Credentials`], which holds the secrets read from the
//! environment, and [`load_config`] to load the configuration from a YAML file.
//!
//! Secrets never live in `config.yaml`. They are read from the process environment
//! (after loading an optional `.env` file) by [`Credentials::from_env`], and a missing
//! secret is a fatal startup error.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use awful_scribe::config::{ScribeConfig, load_config};
//!
//! let config_file_path = "/path/to/config.yaml";
//! let config: ScribeConfig = load_config(config_file_path).unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{env, error::Error, fs, path::Path};

use tracing::*;

use crate::error::ScribeError;

/// Environment variable holding the chat-completion API key.
pub const COMPLETION_KEY_VAR: &str = "GROQ_API_KEY";

/// Environment variable holding the web search API key.
pub const SEARCH_KEY_VAR: &str = "SERPER_API_KEY";

/// Represents the application's configuration.
///
/// Every field has a default, so a partial YAML file only overrides what it names.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct ScribeConfig {
    /// The base URL of the OpenAI compatible API.
    pub api_base: String,

    /// The name of the model used to draft documents.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Completion token ceiling.
    pub max_tokens: u32,

    /// Total attempts for the completion call.
    pub max_retries: u32,

    /// Character budget for every sanitized input field.
    pub max_input_length: usize,

    /// Minimum number of characters of content before a generation is attempted.
    pub min_content_length: usize,

    /// Worker threads used to assemble document sections.
    pub worker_threads: usize,

    /// Name of the report template under `templates/`.
    pub template: String,

    // Defaults for the title page.
    pub document_title: String,
    pub document_author: String,

    /// Converter invoked to turn a DOCX into a PDF.
    pub converter: ConverterConfig,

    pub search: SearchConfig,

    pub grammar: GrammarConfig,
}

/// External DOCX to PDF converter.
///
/// `args` may contain `{input}` and `{outdir}`, which are replaced with the DOCX path
/// and the directory the PDF must land in.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct ConverterConfig {
    pub program: String,
    pub args: Vec<String>,
}

/// Optional web research lookup appended to the prompt.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// How many organic results make it into the prompt.
    pub max_results: usize,
}

/// Optional grammar pass over the generated text.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct GrammarConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub language: String,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            temperature: 0.2,
            max_tokens: 8192,
            max_retries: 3,
            max_input_length: 3000,
            min_content_length: 50,
            worker_threads: 4,
            template: "report".to_string(),
            document_title: "Generated Technical Document".to_string(),
            document_author: "Technical Writing Assistant".to_string(),
            converter: ConverterConfig::default(),
            search: SearchConfig::default(),
            grammar: GrammarConfig::default(),
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "soffice".to_string(),
            args: vec![
                "--headless".to_string(),
                "--convert-to".to_string(),
                "pdf".to_string(),
                "--outdir".to_string(),
                "{outdir}".to_string(),
                "{input}".to_string(),
            ],
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://google.serper.dev/search".to_string(),
            max_results: 3,
        }
    }
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.languagetool.org/v2/check".to_string(),
            language: "en-US".to_string(),
        }
    }
}

/// Secrets read from the environment at startup.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub completion_api_key: String,
    pub search_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("completion_api_key", &"<redacted>")
            .field("search_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Load `.env` (if present) and read both secrets from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::MissingCredentials`] naming every absent or empty variable.
    pub fn from_env() -> Result<Self, ScribeError> {
        if let Err(e) = dotenv::dotenv() {
            debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read both secrets through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScribeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let completion = read(COMPLETION_KEY_VAR);
        let search = read(SEARCH_KEY_VAR);

        let missing: Vec<&str> = [
            (COMPLETION_KEY_VAR, completion.is_none()),
            (SEARCH_KEY_VAR, search.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        match (completion, search) {
            (Some(completion_api_key), Some(search_api_key)) => Ok(Self {
                completion_api_key,
                search_api_key,
            }),
            _ => {
                let err = ScribeError::MissingCredentials(missing.join(", "));
                error!("Failed to load environment variables: {}", err);
                Err(err)
            }
        }
    }
}

/// Loads the application's configuration from a YAML file.
///
/// This function reads the file at the given path, parses it as YAML, and
/// constructs a [`ScribeConfig`] from it.
///
/// # Parameters
///
/// - `file`: The path to the YAML configuration file.
///
/// # Returns
///
/// - `Ok(ScribeConfig)`: The loaded configuration.
/// - `Err(Box<dyn Error>)`: An error occurred while reading the file or parsing the YAML.
///
/// # Examples
///
/// ```no_run
/// use awful_scribe::config::load_config;
///
/// let config_file_path = "/path/to/config.yaml";
/// match load_config(config_file_path) {
///     Ok(config) => println!("{:?}", config),
///     Err(err) => eprintln!("Error loading config: {}", err),
/// }
/// ```
pub fn load_config(file: &str) -> Result<ScribeConfig, Box<dyn Error>> {
    debug!("Loading config: {}", file);
    let content = fs::read_to_string(file)?;
    let config: ScribeConfig = serde_yaml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the built-in defaults.
pub fn load_config_or_default(path: &Path) -> Result<ScribeConfig, Box<dyn Error>> {
    if !path.exists() {
        info!(
            "No config at {}, using built-in defaults (run `scribe init` to create one)",
            path.display()
        );
        return Ok(ScribeConfig::default());
    }
    let file = path
        .to_str()
        .ok_or_else(|| format!("Config path is not valid UTF-8: {}", path.display()))?;
    load_config(file)
}

impl ScribeConfig {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ScribeError> {
        if self.worker_threads == 0 {
            return Err(ScribeError::Config(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.max_input_length == 0 {
            return Err(ScribeError::Config(
                "max_input_length must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ScribeError::Config(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}
