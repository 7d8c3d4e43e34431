//! In-memory report document and the formatter that builds it.
//!
//! [`DocumentFormatter::format`] turns generated text into a [`ReportDocument`]:
//!
//! 1. a title block (title, author, date, page break),
//! 2. a table-of-contents placeholder that word processors fill in on open,
//! 3. one or more blocks per classified [`Section`].
//!
//! Sections are rendered on a bounded `rayon` pool. Each task owns exactly one section
//! and returns its blocks; results are collected in task order, so the output never
//! depends on scheduling. The first failing task aborts the whole document.
//!
//! Serialization lives in [`crate::docx`]; this module knows nothing about OOXML.

use chrono::Local;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ScribeError};
use crate::placeholder::{chart_label, image_label, render_placeholder};
use crate::sections::{Placeholder, Section, SectionKind, parse_sections};

pub const DEFAULT_TITLE: &str = "Generated Technical Document";
pub const DEFAULT_AUTHOR: &str = "Technical Writing Assistant";

/// Field code of the table of contents (levels 1 to 3, hyperlinked).
pub const TOC_FIELD: &str = r#"TOC \o "1-3" \h \z \u"#;

/// Cell text of placeholder tables.
pub const TABLE_FILLER: &str = "Data";

/// Named paragraph styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParagraphStyle {
    Title,
    Subtitle,
    Heading1,
    Heading2,
    Heading3,
    Normal,
}

impl ParagraphStyle {
    /// Style id as referenced from `document.xml`.
    pub fn id(self) -> &'static str {
        match self {
            ParagraphStyle::Title => "Title",
            ParagraphStyle::Subtitle => "Subtitle",
            ParagraphStyle::Heading1 => "Heading1",
            ParagraphStyle::Heading2 => "Heading2",
            ParagraphStyle::Heading3 => "Heading3",
            ParagraphStyle::Normal => "Normal",
        }
    }

    /// Heading style for a level; anything past 3 is clamped to Heading 3.
    pub fn heading(level: u8) -> Self {
        match level {
            0 | 1 => ParagraphStyle::Heading1,
            2 => ParagraphStyle::Heading2,
            _ => ParagraphStyle::Heading3,
        }
    }
}

/// One block of the document body.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph {
        style: ParagraphStyle,
        text: String,
    },
    /// A paragraph holding a single field (e.g. the table of contents).
    Field {
        style: ParagraphStyle,
        instruction: String,
    },
    PageBreak,
    /// An embedded PNG, drawn at the placeholder picture size.
    Picture {
        label: String,
        png: Vec<u8>,
    },
    /// A grid where every cell holds `filler`.
    Table {
        rows: usize,
        cols: usize,
        filler: String,
    },
}

impl Block {
    pub fn paragraph(style: ParagraphStyle, text: impl Into<String>) -> Self {
        Block::Paragraph {
            style,
            text: text.into(),
        }
    }
}

/// Title page values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    /// `%Y-%m-%d`.
    pub date: String,
}

impl DocumentMetadata {
    /// Metadata dated today.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            date: Local::now().format("%Y-%m-%d").to_string(),
        }
    }
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE, DEFAULT_AUTHOR)
    }
}

/// A formatted report, ready to be written as DOCX.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub metadata: DocumentMetadata,
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    /// Text of every paragraph, one per line. Used for preview.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Paragraph { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of embedded pictures.
    pub fn picture_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| matches!(block, Block::Picture { .. }))
            .count()
    }
}

/// Builds [`ReportDocument`]s from generated text.
#[derive(Debug, Clone, Copy)]
pub struct DocumentFormatter {
    workers: usize,
}

impl Default for DocumentFormatter {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

impl DocumentFormatter {
    /// A formatter rendering sections on `workers` threads (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Format `content` into a document.
    ///
    /// # Errors
    ///
    /// - [`ScribeError::EmptyContent`] when `content` is blank.
    /// - [`ScribeError::Document`] when the worker pool cannot start or any section
    ///   fails to render.
    pub fn format(
        &self,
        content: &str,
        metadata: Option<DocumentMetadata>,
    ) -> Result<ReportDocument> {
        if content.trim().is_empty() {
            error!("Refusing to format an empty response");
            return Err(ScribeError::EmptyContent);
        }

        let metadata = metadata.unwrap_or_default();
        let sections = parse_sections(content);
        debug!("Classified response into {} sections", sections.len());

        let mut blocks = title_block(&metadata);
        blocks.extend(toc_block());
        blocks.extend(self.render_sections(&sections)?);

        info!(
            "Document formatted: {} sections, {} blocks",
            sections.len(),
            blocks.len()
        );
        Ok(ReportDocument { metadata, blocks })
    }

    /// Render `sections` on the pool and concatenate their blocks in input order.
    fn render_sections(&self, sections: &[Section]) -> Result<Vec<Block>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| ScribeError::Document(format!("failed to start worker pool: {e}")))?;

        let rendered: Vec<Vec<Block>> = pool.install(|| {
            sections
                .par_iter()
                .map(render_section)
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(rendered.into_iter().flatten().collect())
    }
}

fn title_block(metadata: &DocumentMetadata) -> Vec<Block> {
    vec![
        Block::paragraph(ParagraphStyle::Title, &metadata.title),
        Block::paragraph(
            ParagraphStyle::Subtitle,
            format!("Prepared by: {}", metadata.author),
        ),
        Block::paragraph(ParagraphStyle::Subtitle, format!("Date: {}", metadata.date)),
        Block::PageBreak,
    ]
}

fn toc_block() -> Vec<Block> {
    vec![
        Block::paragraph(ParagraphStyle::Heading1, "Table of Contents"),
        Block::Field {
            style: ParagraphStyle::Normal,
            instruction: TOC_FIELD.to_string(),
        },
        Block::PageBreak,
    ]
}

/// Render one section into its blocks.
fn render_section(section: &Section) -> Result<Vec<Block>> {
    match section.kind {
        SectionKind::Heading(level) => Ok(vec![Block::paragraph(
            ParagraphStyle::heading(level),
            &section.text,
        )]),
        SectionKind::Paragraph => Ok(vec![Block::paragraph(ParagraphStyle::Normal, &section.text)]),
        SectionKind::Chart | SectionKind::Table | SectionKind::Image => {
            match Placeholder::parse(&section.text) {
                Some(placeholder) => Ok(render_placeholder_blocks(placeholder)),
                None => Err(ScribeError::Document(format!(
                    "placeholder section without a marker: {:?}",
                    section.text
                ))),
            }
        }
    }
}

fn render_placeholder_blocks(placeholder: Placeholder) -> Vec<Block> {
    let (caption, label) = match placeholder {
        Placeholder::Table { rows, cols } => {
            return vec![
                Block::paragraph(ParagraphStyle::Normal, "Table Placeholder"),
                Block::Table {
                    rows,
                    cols,
                    filler: TABLE_FILLER.to_string(),
                },
            ];
        }
        Placeholder::Chart { subtype } => ("Chart Placeholder", chart_label(&subtype)),
        Placeholder::Image { subtype } => ("Image Placeholder", image_label(&subtype)),
    };

    let mut blocks = vec![Block::paragraph(ParagraphStyle::Normal, caption)];
    match render_placeholder(&label) {
        Ok(png) => blocks.push(Block::Picture { label, png }),
        Err(e) => warn!("Could not render placeholder '{}': {}", label, e),
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            title: "T".into(),
            author: "A".into(),
            date: "2024-01-02".into(),
        }
    }

    fn paragraphs(doc: &ReportDocument) -> Vec<(ParagraphStyle, &str)> {
        doc.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph { style, text } => Some((*style, text.as_str())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_content_is_rejected() {
        let formatter = DocumentFormatter::default();
        assert!(matches!(
            formatter.format("", None),
            Err(ScribeError::EmptyContent)
        ));
        assert!(matches!(
            formatter.format(" \n\t", None),
            Err(ScribeError::EmptyContent)
        ));
    }

    #[test]
    fn test_title_block_then_toc() {
        let doc = DocumentFormatter::default()
            .format("Body text", Some(metadata()))
            .unwrap();

        assert_eq!(
            &doc.blocks[..7],
            &[
                Block::paragraph(ParagraphStyle::Title, "T"),
                Block::paragraph(ParagraphStyle::Subtitle, "Prepared by: A"),
                Block::paragraph(ParagraphStyle::Subtitle, "Date: 2024-01-02"),
                Block::PageBreak,
                Block::paragraph(ParagraphStyle::Heading1, "Table of Contents"),
                Block::Field {
                    style: ParagraphStyle::Normal,
                    instruction: TOC_FIELD.to_string(),
                },
                Block::PageBreak,
            ]
        );
        assert_eq!(doc.blocks[7], Block::paragraph(ParagraphStyle::Normal, "Body text"));
    }

    #[test]
    fn test_default_metadata_is_dated_today() {
        let meta = DocumentMetadata::default();
        assert_eq!(meta.title, DEFAULT_TITLE);
        assert_eq!(meta.author, DEFAULT_AUTHOR);
        assert_eq!(meta.date, Local::now().format("%Y-%m-%d").to_string());
    }

    #[test]
    fn test_sections_keep_order_across_workers() {
        let content: String = (0..40)
            .map(|i| format!("## Part {i}\nline {i}\n"))
            .collect();
        for workers in [1, 2, 4, 8] {
            let doc = DocumentFormatter::new(workers)
                .format(&content, Some(metadata()))
                .unwrap();
            let body: Vec<_> = paragraphs(&doc).into_iter().skip(4).collect();
            assert_eq!(body.len(), 80);
            for i in 0..40 {
                assert_eq!(body[2 * i], (ParagraphStyle::Heading2, format!("Part {i}").as_str()));
                assert_eq!(body[2 * i + 1], (ParagraphStyle::Normal, format!("line {i}").as_str()));
            }
        }
    }

    #[test]
    fn test_table_marker_renders_grid() {
        let doc = DocumentFormatter::new(2)
            .format("[TABLE:4x2]\n[TABLE]\n[TABLE:60x2]", Some(metadata()))
            .unwrap();
        let tables: Vec<_> = doc
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Table { rows, cols, filler } => Some((*rows, *cols, filler.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(tables, vec![(4, 2, "Data"), (3, 3, "Data"), (60, 2, "Data")]);
        assert!(doc.plain_text().contains("Table Placeholder"));
    }

    #[test]
    fn test_chart_marker_renders_caption_and_picture() {
        let doc = DocumentFormatter::default()
            .format("[CHART:bar]\n[IMAGE]", Some(metadata()))
            .unwrap();
        let text = doc.plain_text();
        assert!(text.contains("Chart Placeholder"));
        assert!(text.contains("Image Placeholder"));
        let labels: Vec<_> = doc
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Picture { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["bar_chart", "generic_image"]);
        assert_eq!(doc.picture_count(), 2);
    }

    #[test]
    fn test_failing_section_aborts_assembly() {
        let sections = vec![
            Section::new(SectionKind::Paragraph, "fine"),
            Section::new(SectionKind::Chart, "no marker here"),
            Section::new(SectionKind::Paragraph, "also fine"),
        ];
        let err = DocumentFormatter::new(3).render_sections(&sections).unwrap_err();
        assert!(matches!(err, ScribeError::Document(_)));
    }

    #[test]
    fn test_plain_text_joins_paragraphs() {
        let doc = DocumentFormatter::default()
            .format("# Intro\nHello world", Some(metadata()))
            .unwrap();
        assert_eq!(
            doc.plain_text(),
            "T\nPrepared by: A\nDate: 2024-01-02\nTable of Contents\nIntro\nHello world"
        );
    }

    #[test]
    fn test_zero_workers_is_clamped() {
        assert_eq!(DocumentFormatter::new(0).workers(), 1);
    }
}
