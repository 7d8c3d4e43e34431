//! # Awful Scribe (library root)
//!
//! This crate provides the plumbing for the **Awful Scribe** technical writing
//! assistant: a desktop window (plus a headless command) that turns rough content and
//! three writing parameters into a styled DOCX or PDF report drafted by an
//! OpenAI-compatible chat model.
//!
//! The flow, in dependency order:
//!
//! 1. **Prompt building**: [`params`] holds the user's choices, [`prompt`] sanitizes
//!    them into a [`template`], optionally enriched by web research ([`search`]).
//! 2. **Fetching**: [`api`] calls the completion service with retries; [`grammar`]
//!    optionally proofreads the answer.
//! 3. **Formatting**: [`sections`] classifies the answer line by line, [`document`]
//!    builds the report (with [`placeholder`] pictures), [`docx`] serializes it and
//!    [`export`] saves it as DOCX or PDF.
//! 4. **Presentation**: [`gui`] is the window; [`commands`] is the CLI surface.
//!
//! [`pipeline`] wires steps 1 to 3 together; [`config`] and [`error`] are shared.
//!
//! ## Configuration layout
//! Settings live under your per-platform config directory, e.g.:
//!
//! - macOS: `~/Library/Application Support/com.awful-sec.scribe/config.yaml`
//! - Linux (XDG): `~/.config/scribe/config.yaml`
//! - Windows: `C:\Users\<you>\AppData\Roaming\awful-sec\scribe\config\config.yaml`
//!
//! `scribe init` writes the defaults there, along with `templates/report.yaml`.

use directories::ProjectDirs;
use std::error::Error;
use std::path::PathBuf;

pub mod api;
pub mod commands;
pub mod config;
pub mod document;
pub mod docx;
pub mod error;
pub mod export;
pub mod grammar;
pub mod gui;
pub mod params;
pub mod pipeline;
pub mod placeholder;
pub mod prompt;
pub mod search;
pub mod sections;
pub mod template;

/// Return the per-platform configuration directory used by Awful Scribe.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "awful-sec", "scribe")`, so you get the right place on each OS.
///
/// The directory is **not** created by this function; callers that need it should
/// create it with `fs::create_dir_all`.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined
/// (which is rare but possible in heavily sandboxed environments).
///
/// # Examples
/// ```rust
/// let cfg = awful_scribe::config_dir().expect("has a config dir");
/// println!("config at {}", cfg.display());
/// ```
pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "awful-sec", "scribe")
        .ok_or("Unable to determine config directory")?;
    let config_dir = proj_dirs.config_dir().to_path_buf();

    Ok(config_dir)
}

/// Resolve the config file: an explicit path wins, then `./config.yaml` when
/// `IN_TEST_ENVIRONMENT` is set, then `<config_dir>/config.yaml`.
pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf, Box<dyn Error>> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    if std::env::var("IN_TEST_ENVIRONMENT").is_ok() {
        return Ok(std::env::current_dir()?.join("config.yaml"));
    }
    Ok(config_dir()?.join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_path_wins() {
        let path = config_path(Some(PathBuf::from("/etc/scribe.yaml"))).unwrap();
        assert_eq!(path, PathBuf::from("/etc/scribe.yaml"));
    }
}
