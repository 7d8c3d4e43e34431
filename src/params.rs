//! Request parameters and the closed vocabularies offered by the window.
//!
//! The dropdowns in [`crate::gui`] and the `generate` subcommand both pick from
//! [`Approach`], [`Purpose`] and [`Category`]. Downstream code (prompt building)
//! only ever sees their labels as plain strings through [`RequestParams`].

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident, { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[value(name = $label)]
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every choice, in display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Human-readable label used in the prompt and the window.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

vocabulary!(
    /// Writing approach.
    Approach, default = Technical, {
        Technical => "Technical",
        NonTechnical => "Non-Technical",
        Conversational => "Conversational",
        Formal => "Formal",
        Objective => "Objective",
        Subjective => "Subjective",
        Collaborative => "Collaborative",
    }
);

vocabulary!(
    /// What the document is for.
    Purpose, default = Instructional, {
        Instructional => "Instructional",
        Informative => "Informative",
        Descriptive => "Descriptive",
        Persuasive => "Persuasive",
        Analytical => "Analytical",
        Evaluative => "Evaluative",
        Creative => "Creative",
    }
);

vocabulary!(
    /// Kind of document to produce.
    Category, default = UserManual, {
        UserManual => "User Manual",
        TechnicalSpecification => "Technical Specification",
        Report => "Report",
        Analysis => "Analysis",
        Whitepaper => "Whitepaper",
        InstructionalVideoScript => "Instructional Video Script",
        ApiDocumentation => "API Documentation",
        TechnicalBlogPost => "Technical Blog Post",
        CaseStudy => "Case Study",
    }
);

/// Everything the user supplies for one generation.
///
/// Re-created on every click; owned by the calling flow for the duration of one
/// request. `extra` keeps insertion order, which is the order the annotations are
/// appended to the prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    pub content: String,
    pub approach: String,
    pub purpose: String,
    pub category: String,
    pub extra: Vec<(String, String)>,
}

impl RequestParams {
    /// Build parameters from the closed vocabularies.
    pub fn new(
        content: impl Into<String>,
        approach: Approach,
        purpose: Purpose,
        category: Category,
    ) -> Self {
        Self {
            content: content.into(),
            approach: approach.label().to_string(),
            purpose: purpose.label().to_string(),
            category: category.label().to_string(),
            extra: Vec::new(),
        }
    }

    /// Append an `Additional {key}: {value}` annotation.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }
}

/// Parse a `key=value` pair as passed to `--param`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_new_document_reset() {
        assert_eq!(Approach::default(), Approach::Technical);
        assert_eq!(Purpose::default(), Purpose::Instructional);
        assert_eq!(Category::default(), Category::UserManual);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Approach::NonTechnical.label(), "Non-Technical");
        assert_eq!(Category::ApiDocumentation.to_string(), "API Documentation");
        assert_eq!(Category::ALL.len(), 9);
        assert_eq!(Approach::ALL.len(), 7);
        assert_eq!(Purpose::ALL.len(), 7);
    }

    #[test]
    fn test_request_params_keep_annotation_order() {
        let params = RequestParams::new("body", Approach::Formal, Purpose::Creative, Category::Report)
            .with_extra("audience", "engineers")
            .with_extra("tone", "dry");
        assert_eq!(params.approach, "Formal");
        assert_eq!(params.extra[0].0, "audience");
        assert_eq!(params.extra[1].0, "tone");
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("audience = ops team").unwrap(),
            ("audience".to_string(), "ops team".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_value_enum_accepts_label() {
        let parsed = Category::from_str("User Manual", false).unwrap();
        assert_eq!(parsed, Category::UserManual);
    }
}
