//! Prompt construction.
//!
//! [`sanitize_input`] normalizes every free-text field and [`PromptBuilder`] drops the
//! results into a [`ReportTemplate`]. Research lines (see [`crate::search`]) are passed
//! in already formatted, so building a prompt never touches the network.

use tracing::info;

use crate::error::ScribeError;
use crate::params::RequestParams;
use crate::template::ReportTemplate;

/// Default character budget per field.
pub const DEFAULT_MAX_INPUT_LENGTH: usize = 3000;

/// Trim, collapse internal whitespace runs to a single space, and truncate to
/// `max_length` characters.
///
/// The result never starts or ends with whitespace, never contains two whitespace
/// characters in a row, and is at most `max_length` characters long. Applying it twice
/// gives the same result as applying it once.
///
/// ```
/// use awful_scribe::prompt::sanitize_input;
///
/// assert_eq!(sanitize_input("  a \n\t b  ", 3000), "a b");
/// assert_eq!(sanitize_input("abc def", 4), "abc");
/// ```
pub fn sanitize_input(text: &str, max_length: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_length) {
        Some((cut, _)) => collapsed[..cut].trim_end().to_string(),
        None => collapsed,
    }
}

/// Builds the prompt sent to the completion service.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: ReportTemplate,
    max_length: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(ReportTemplate::builtin(), DEFAULT_MAX_INPUT_LENGTH)
    }
}

impl PromptBuilder {
    pub fn new(template: ReportTemplate, max_length: usize) -> Self {
        Self {
            template,
            max_length,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Build the prompt without research.
    pub fn build(&self, params: &RequestParams) -> Result<String, ScribeError> {
        self.build_with_research(params, "")
    }

    /// Build the prompt, placing `research` at the template's `{research}` slot.
    ///
    /// Each annotation in `params.extra` is appended as `Additional {key}: {value}` in
    /// insertion order, with key and value sanitized independently.
    ///
    /// # Errors
    ///
    /// Propagates [`ScribeError::Template`] when the template cannot be rendered.
    pub fn build_with_research(
        &self,
        params: &RequestParams,
        research: &str,
    ) -> Result<String, ScribeError> {
        let clean = |text: &str| sanitize_input(text, self.max_length);

        let mut prompt = self.template.render(
            &clean(&params.content),
            &clean(&params.approach),
            &clean(&params.purpose),
            &clean(&params.category),
            research,
        )?;

        for (key, value) in &params.extra {
            prompt.push_str(&format!("\n\nAdditional {}: {}", clean(key), clean(value)));
        }

        info!("Prompt generated successfully ({} chars)", prompt.len());
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Approach, Category, Purpose};

    #[test]
    fn test_sanitize_collapses_and_trims() {
        assert_eq!(sanitize_input("  hello   \n\n world\t ", 3000), "hello world");
        assert_eq!(sanitize_input("", 3000), "");
        assert_eq!(sanitize_input(" \t\n ", 3000), "");
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let text = "é".repeat(10);
        let out = sanitize_input(&text, 4);
        assert_eq!(out.chars().count(), 4);
        assert_eq!(out, "éééé");
    }

    #[test]
    fn test_sanitize_never_ends_with_space_after_truncation() {
        // The cut lands right after "abc ", which would leave a trailing space.
        let out = sanitize_input("abc defgh", 4);
        assert_eq!(out, "abc");
    }

    #[test]
    fn test_sanitize_properties_hold_for_samples() {
        let samples = [
            "plain",
            "  lead and trail  ",
            "tabs\t\tand\nnewlines\r\n",
            "   ",
            "a b c d e f g h i j k l m n o p",
            "unicode\u{2003}em\u{00a0}space",
            "x ".repeat(200).as_str(),
        ]
        .map(str::to_string);

        for max in [1, 2, 5, 16, 3000] {
            for sample in &samples {
                let once = sanitize_input(sample, max);
                assert_eq!(sanitize_input(&once, max), once, "idempotent for {sample:?}");
                assert!(once.chars().count() <= max);
                assert_eq!(once.trim(), once);
                assert!(!once.contains("  "));
                assert!(!once.chars().any(|c| c.is_whitespace() && c != ' '));
            }
        }
    }

    #[test]
    fn test_build_contains_sanitized_fields() {
        let params = RequestParams::new(
            "  Some   content\nwith lines ",
            Approach::Technical,
            Purpose::Informative,
            Category::Report,
        );
        let prompt = PromptBuilder::default().build(&params).unwrap();
        assert!(prompt.contains("Content: Some content with lines"));
        assert!(prompt.contains("Approach: Technical"));
        assert!(prompt.contains("Purpose: Informative"));
        assert!(prompt.contains("Category: Report"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let params = RequestParams::new("x", Approach::Formal, Purpose::Creative, Category::Analysis)
            .with_extra("audience", "ops")
            .with_extra("length", "short");
        let builder = PromptBuilder::default();
        assert_eq!(builder.build(&params).unwrap(), builder.build(&params).unwrap());
    }

    #[test]
    fn test_annotations_appended_in_order_and_sanitized() {
        let params = RequestParams::new("x", Approach::Formal, Purpose::Creative, Category::Analysis)
            .with_extra("zeta", "  last\n\nline ")
            .with_extra("alpha", "first");
        let prompt = PromptBuilder::default().build(&params).unwrap();
        let zeta = prompt.find("\n\nAdditional zeta: last line").unwrap();
        let alpha = prompt.find("\n\nAdditional alpha: first").unwrap();
        assert!(zeta < alpha);
        assert!(prompt.ends_with("Additional alpha: first"));
    }

    #[test]
    fn test_fields_truncated_to_budget() {
        let params = RequestParams {
            content: "word ".repeat(100),
            approach: "A".into(),
            purpose: "P".into(),
            category: "C".into(),
            extra: vec![],
        };
        let builder = PromptBuilder::new(ReportTemplate::builtin(), 9);
        let prompt = builder.build(&params).unwrap();
        assert!(prompt.contains("Content: word word\n"));
    }

    #[test]
    fn test_research_is_placed_in_template() {
        let params = RequestParams::new("x", Approach::Formal, Purpose::Creative, Category::Analysis);
        let prompt = PromptBuilder::default()
            .build_with_research(&params, "- Rust: a language")
            .unwrap();
        assert!(prompt.contains("- Rust: a language"));
    }
}
