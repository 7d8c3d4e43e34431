//! Error types shared across the generation pipeline.
//!
//! Two enums live here:
//!
//! - [`FetchError`] classifies failures of a single chat-completion attempt so the
//!   retry loop in [`crate::api`] can tell a transient hiccup from a hard rejection.
//! - [`ScribeError`] is the crate-wide error returned by the pipeline, the formatter
//!   and the exporter.
//!
//! Detailed messages (`Display`) are meant for the log. Anything shown to a user in
//! the window goes through [`ScribeError::user_message`], which never leaks service
//! detail.

use thiserror::Error;

/// Failure of one completion attempt.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request never produced a usable HTTP exchange (connection reset, DNS, TLS).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered but the reply could not be decoded or carried no text.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The service rejected the request (bad key, unknown model, quota).
    #[error("service rejected request: {0}")]
    Api(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transport(_) | FetchError::MalformedResponse(_)
        )
    }
}

/// Errors raised by the generation pipeline and document output.
#[derive(Error, Debug)]
pub enum ScribeError {
    /// A required environment variable is absent.
    #[error("Missing required environment variables: {0}")]
    MissingCredentials(String),

    /// The configuration file exists but cannot be used.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The user's content does not meet the minimum length.
    #[error("Content is too short: {actual} characters, at least {minimum} required")]
    ContentTooShort { actual: usize, minimum: usize },

    /// The response handed to the formatter was empty.
    #[error("Content is empty")]
    EmptyContent,

    /// The completion service returned no text.
    #[error("The completion service returned an empty response")]
    EmptyResponse,

    /// A report template cannot be rendered.
    #[error("Template error: {0}")]
    Template(String),

    /// All attempts at the completion call failed, or a non-retryable error occurred.
    #[error("Completion failed: {0}")]
    Fetch(#[from] FetchError),

    /// Building the in-memory document failed.
    #[error("Document formatting failed: {0}")]
    Document(String),

    /// The requested output file extension is not DOCX or PDF.
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    /// The external DOCX to PDF converter failed.
    #[error("Conversion to PDF failed: {0}")]
    Conversion(String),

    /// Writing the DOCX package failed.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScribeError {
    /// A short message that is safe to show in a dialog.
    ///
    /// Validation problems are explained; everything else is reported generically and
    /// the caller is pointed at the log.
    pub fn user_message(&self) -> String {
        match self {
            ScribeError::ContentTooShort { .. } => {
                "Content is too short. Please provide more detailed information.".to_string()
            }
            ScribeError::UnsupportedExtension(ext) => {
                format!("Unsupported file type '{ext}'. Please choose .docx or .pdf.")
            }
            ScribeError::MissingCredentials(_) | ScribeError::Config(_) => {
                "The application is not configured correctly. Please check the log for details."
                    .to_string()
            }
            ScribeError::Fetch(_) | ScribeError::EmptyResponse => {
                "Failed to generate content. Please try again.".to_string()
            }
            ScribeError::Conversion(_) | ScribeError::Archive(_) | ScribeError::Io(_) => {
                "Error saving document. Please check the log for details.".to_string()
            }
            _ => "Error generating document. Please check the log for details.".to_string(),
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, ScribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        assert!(FetchError::Transport("reset".into()).is_retryable());
        assert!(FetchError::MalformedResponse("no choices".into()).is_retryable());
        assert!(!FetchError::Api("401".into()).is_retryable());
        assert!(!FetchError::Other("boom".into()).is_retryable());
    }

    #[test]
    fn test_user_message_withholds_detail() {
        let err = ScribeError::Fetch(FetchError::Api("invalid api key sk-123".into()));
        let msg = err.user_message();
        assert!(!msg.contains("sk-123"));
        assert!(msg.contains("try again"));
    }

    #[test]
    fn test_user_message_names_extension() {
        let err = ScribeError::UnsupportedExtension(".txt".into());
        assert!(err.user_message().contains(".txt"));
    }
}
