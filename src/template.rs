//! # Report templates
//!
//! A report template is a small YAML document holding the instruction text sent to the
//! model. The body contains placeholders that [`crate::prompt::PromptBuilder`] fills in:
//!
//! | Placeholder  | Replaced with                                   |
//! |--------------|-------------------------------------------------|
//! | `{content}`  | the sanitized user content (required)           |
//! | `{approach}` | the sanitized writing approach                  |
//! | `{purpose}`  | the sanitized purpose                           |
//! | `{category}` | the sanitized document category                 |
//! | `{research}` | web research lines, or nothing                  |
//!
//! Templates live per-user under the application's configuration directory:
//!
//! ```text
//! <config_dir>/templates/<name>.yaml
//! ```
//!
//! When that file does not exist the built-in template ([`ReportTemplate::builtin`]) is
//! used, so a fresh install works without running `scribe init`.
//!
//! ## Minimal YAML example
//!
//! ```yaml
//! research_heading: "Recent public sources:"
//! body: |
//!   Write a {category} in a {approach} voice for a {purpose} purpose.
//!   Content: {content}
//!   {research}
//! ```

use serde::{Deserialize, Serialize};
use std::{error::Error, fs, path::Path};

use crate::error::ScribeError;

/// Instruction text sent to the model, with placeholders.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReportTemplate {
    /// Heading placed above the research lines when there are any.
    #[serde(default = "default_research_heading")]
    pub research_heading: String,

    /// The template text.
    pub body: String,
}

fn default_research_heading() -> String {
    "Relevant background from recent web sources:".to_string()
}

const BUILTIN_BODY: &str = r####"As a senior technical writer and content creator, generate a professional, standards-compliant report based on the following parameters:

Content: {content}
Approach: {approach}
Purpose: {purpose}
Category: {category}
{research}
Adhere to relevant international standards including but not limited to:
- ISO/IEC 26514 for systems and software engineering documentation
- ISO/IEC/IEEE 15288 for systems engineering processes
- DITA (Darwin Information Typing Architecture) for technical content
- ISO 9001:2015 for quality management systems documentation
- IEEE 1063 for software user documentation
- ISO/IEC 25062 for usability reports
- The Chicago Manual of Style for editorial practice

Apply these expert approaches and best practices:
1. Contextual Analysis: Thoroughly understand the background, audience, and objectives.
2. Clear and Concise Language: Use precise language to ensure clarity.
3. Structured Content: Organize information logically and hierarchically.
4. Visual Aids: Integrate charts, diagrams, and tables where applicable.
5. Revision and Proofreading: Ensure the document is free of errors and inconsistencies.
6. Accessibility: Make the content accessible to all users, including those with disabilities.

Create a comprehensive and well-structured report with complete details tailored for a Senior Technical Writer.

Include the following content based on the category:
- Medical Reports: Patient data privacy considerations and regulatory compliance (e.g., HIPAA).
- Business Reports: Financial analysis, market research, and strategic recommendations.
- Technical Reports: Detailed methodologies, technical specifications, and performance data.
- Environmental Reports: Impact assessments, sustainability considerations, and regulatory compliance.

Formatting Guidelines:
- Use clear, professional language appropriate for the target audience
- Maintain consistent terminology throughout the document
- Use active voice and present tense where appropriate
- Define all acronyms at first use
- Mark headings with "# ", "## " and "### " at the start of the line
- Suggest visualizations on their own line as [CHART:type], [TABLE:RxC] or [IMAGE:subject]

Focus on accuracy, clarity, and professionalism in the content."####;

impl ReportTemplate {
    /// The template shipped with the application.
    pub fn builtin() -> Self {
        Self {
            research_heading: default_research_heading(),
            body: BUILTIN_BODY.to_string(),
        }
    }

    /// Substitute the placeholders.
    ///
    /// Values are inserted verbatim; callers sanitize them first. Placeholders that
    /// appear inside a substituted value are not expanded again.
    ///
    /// # Errors
    ///
    /// [`ScribeError::Template`] if the body has no `{content}` placeholder, since the
    /// model would never see what the user typed.
    pub fn render(
        &self,
        content: &str,
        approach: &str,
        purpose: &str,
        category: &str,
        research: &str,
    ) -> Result<String, ScribeError> {
        if !self.body.contains("{content}") {
            return Err(ScribeError::Template(
                "template body has no {content} placeholder".to_string(),
            ));
        }

        let research_block = if research.is_empty() {
            String::new()
        } else {
            format!("\n{}\n{}\n", self.research_heading, research)
        };

        let values = [
            ("{content}", content),
            ("{approach}", approach),
            ("{purpose}", purpose),
            ("{category}", category),
            ("{research}", research_block.as_str()),
        ];

        // Single left-to-right scan so substituted text is never rescanned.
        let mut out = String::with_capacity(self.body.len() + content.len());
        let mut rest = self.body.as_str();
        'scan: while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let candidate = &rest[start..];
            for (key, value) in values {
                if candidate.starts_with(key) {
                    out.push_str(value);
                    rest = &candidate[key.len()..];
                    continue 'scan;
                }
            }
            out.push('{');
            rest = &candidate[1..];
        }
        out.push_str(rest);

        Ok(out)
    }
}

/// Load a report template by name from a configuration directory.
///
/// Resolves `<dir>/templates/<name>.yaml`; if the file is absent the built-in
/// template is returned.
///
/// ### Errors
/// Returns an error if:
/// - the template file exists but cannot be read,
/// - the YAML content cannot be deserialized into a `ReportTemplate`.
pub fn load_template(dir: &Path, name: &str) -> Result<ReportTemplate, Box<dyn Error>> {
    let path = dir.join("templates").join(format!("{}.yaml", name));
    load_template_from(&path)
}

/// Load a template from an explicit path, falling back to the built-in one.
pub fn load_template_from(path: &Path) -> Result<ReportTemplate, Box<dyn Error>> {
    if !path.exists() {
        tracing::info!(
            "Template {} not found, using built-in report template",
            path.display()
        );
        return Ok(ReportTemplate::builtin());
    }

    tracing::info!("Loading template: {}", path.display());

    let content = fs::read_to_string(path)?;
    let template: ReportTemplate = serde_yaml::from_str(&content)?;
    Ok(template)
}
