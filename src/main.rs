//! Main module for the Awful Scribe application (scribe).
//!
//! This module provides the main function: it installs logging, parses the
//! command line, loads the configuration and secrets, and then either opens the
//! window, initializes the configuration directory, or runs a headless generation.
//!
//! # Examples
//!
//! Opening the window:
//!
//! ```sh
//! cargo run
//! scribe gui
//! ```
//!
//! Initializing the application's configuration and templates:
//!
//! ```sh
//! scribe init
//! ```
//!
//! Generating a document without the window:
//!
//! ```sh
//! scribe generate -c notes.txt -o manual.docx --category "User Manual" -p audience=operators
//! ```

use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use awful_scribe::{
    commands::{Cli, Commands},
    config::{self, Credentials, ScribeConfig},
    export::{ExportFormat, save_document},
    gui,
    params::{Approach, Category, Purpose, RequestParams},
    pipeline::Pipeline,
    template::{self, ReportTemplate},
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::OnceCell;
use tokio::runtime::Runtime;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    });

    let cli = Cli::parse();
    let config_path = awful_scribe::config_path(cli.config)?;
    let config_home = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if let Some(Commands::Init) = cli.command {
        debug!("Initializing configuration");
        return init(&config_home, &config_path);
    }

    // Secrets are checked before anything is shown.
    let credentials = Credentials::from_env()?;

    debug!("Loading config from: {}", config_path.display());
    let scribe_config = config::load_config_or_default(&config_path)?;
    debug!("Config loaded: {:?}", scribe_config);

    let template = template::load_template(&config_home, &scribe_config.template)?;
    let pipeline = Arc::new(Pipeline::from_config(
        scribe_config,
        &credentials,
        template,
    ));
    let runtime = Arc::new(Runtime::new()?);

    match cli.command {
        Some(Commands::Generate {
            content_file,
            output,
            approach,
            purpose,
            category,
            params,
        }) => runtime.block_on(generate(
            &pipeline,
            &content_file,
            &output,
            (approach, purpose, category),
            params,
        )),
        _ => {
            gui::run(pipeline, runtime)?;
            Ok(())
        }
    }
}

/// Runs one generation without the window and saves the result to `output`.
///
/// # Errors
///
/// Returns an error if the content file cannot be read, the output extension is not
/// supported (checked before any request is made), or the generation or export fails.
async fn generate(
    pipeline: &Pipeline,
    content_file: &Path,
    output: &Path,
    (approach, purpose, category): (Approach, Purpose, Category),
    params: Vec<(String, String)>,
) -> Result<(), Box<dyn Error>> {
    ExportFormat::from_path(output)?;
    let content = fs::read_to_string(content_file)?;

    let request = params.into_iter().fold(
        RequestParams::new(content, approach, purpose, category),
        |request, (key, value)| request.with_extra(key, value),
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Generating document...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = pipeline.generate(&request).await;
    spinner.finish_and_clear();

    let generation = result.inspect_err(|e| error!("Generation failed: {}", e))?;
    let saved = save_document(&generation.document, output, &pipeline.config().converter)?;
    info!("Document saved to {}", saved.display());
    println!("{}", saved.display());

    Ok(())
}

/// Initializes the application's configuration and templates.
///
/// Creates the configuration directory, writes the default `config.yaml` and the
/// built-in report template as `templates/report.yaml`.
///
/// # Errors
///
/// Returns an error if there is an issue creating the directories or files, or
/// serializing the configuration and template to YAML.
fn init(config_home: &Path, config_path: &Path) -> Result<(), Box<dyn Error>> {
    let path = config_home.join("templates");
    info!("Creating template config directory: {}", path.display());
    fs::create_dir_all(&path)?;

    let template_path = path.join("report.yaml");
    info!("Creating template file: {}", template_path.display());
    let template_yaml = serde_yaml::to_string(&ReportTemplate::builtin())?;
    fs::write(template_path, template_yaml)?;

    info!("Creating config file: {}", config_path.display());
    let config_yaml = serde_yaml::to_string(&ScribeConfig::default())?;
    fs::write(config_path, config_yaml)?;

    Ok(())
}
