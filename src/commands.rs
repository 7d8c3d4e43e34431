//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options. Without a subcommand the window is opened.
//!
//! # Examples
//!
//! Parsing command-line arguments:
//!
//! ```no_run
//! use clap::Parser;
//! use awful_scribe::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     None | Some(Commands::Gui) => { /* open the window */ }
//!     Some(Commands::Init) => { /* write config and templates */ }
//!     Some(Commands::Generate { .. }) => { /* headless generation */ }
//! }
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::params::{Approach, Category, Purpose, parse_key_value};

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Use this config file instead of the one in the config directory.
    #[arg(long, global = true, env = "SCRIBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Open the writing assistant window (the default).
    Gui,

    /// Write the default `config.yaml` and `templates/report.yaml` into the config
    /// directory.
    Init,

    /// Generate a document without opening the window.
    #[clap(name = "generate", alias = "g")]
    Generate {
        /// File holding the content to write about.
        #[arg(long, short = 'c')]
        content_file: PathBuf,

        /// Output path; `.docx` or `.pdf`.
        #[arg(long, short = 'o')]
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = Approach::default())]
        approach: Approach,

        #[arg(long, value_enum, default_value_t = Purpose::default())]
        purpose: Purpose,

        #[arg(long, value_enum, default_value_t = Category::default())]
        category: Category,

        /// Extra `key=value` annotation appended to the prompt; repeatable.
        #[arg(long = "param", short = 'p', value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_gui() {
        let cli = Cli::try_parse_from(["scribe"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_generate_arguments() {
        let cli = Cli::try_parse_from([
            "scribe",
            "--config",
            "/tmp/c.yaml",
            "generate",
            "-c",
            "notes.txt",
            "-o",
            "out.pdf",
            "--category",
            "User Manual",
            "--param",
            "audience=ops",
            "-p",
            "tone = dry",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
        match cli.command {
            Some(Commands::Generate {
                content_file,
                output,
                approach,
                category,
                params,
                ..
            }) => {
                assert_eq!(content_file, PathBuf::from("notes.txt"));
                assert_eq!(output, PathBuf::from("out.pdf"));
                assert_eq!(approach, Approach::Technical);
                assert_eq!(category, Category::UserManual);
                assert_eq!(
                    params,
                    vec![
                        ("audience".to_string(), "ops".to_string()),
                        ("tone".to_string(), "dry".to_string())
                    ]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_bad_param_is_rejected() {
        let result = Cli::try_parse_from([
            "scribe", "generate", "-c", "a", "-o", "b.docx", "--param", "oops",
        ]);
        assert!(result.is_err());
    }
}
