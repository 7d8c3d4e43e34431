//! Line classification of generated text.
//!
//! [`parse_sections`] walks the response once, line by line, and produces an ordered
//! list of [`Section`]s. Every non-blank line ends up in exactly one section:
//!
//! | Line                                    | Section                               |
//! |-----------------------------------------|---------------------------------------|
//! | `# Title`, `## Title`, `### Title`      | heading of level 1, 2 or 3            |
//! | contains `[CHART...]`                   | chart placeholder                     |
//! | contains `[TABLE...]`                   | table placeholder                     |
//! | contains `[IMAGE...]`                   | image placeholder                     |
//! | anything else                           | joins the current paragraph run       |
//!
//! Headings and placeholders flush the pending paragraph run; consecutive plain lines
//! are joined with `\n` into one paragraph. Placeholder markers may carry a sub-type
//! (`[CHART:bar]`, `[IMAGE:diagram]`) or table dimensions (`[TABLE:4x2]`), parsed by
//! [`Placeholder::parse`].

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Kind of a classified block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Heading level 1 to 3.
    Heading(u8),
    Chart,
    Table,
    Image,
    Paragraph,
}

/// A classified block of the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    /// Heading text without its `#` prefix, the placeholder line, or paragraph lines
    /// joined with `\n`.
    pub text: String,
}

impl Section {
    pub fn new(kind: SectionKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Default grid used when a table marker carries no dimensions.
pub const DEFAULT_TABLE_DIMENSIONS: (usize, usize) = (3, 3);

/// Largest row or column count accepted from a table marker; larger requests are
/// cut down with a warning.
pub const MAX_TABLE_DIMENSION: usize = 1000;

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(CHART|TABLE|IMAGE)(?::([^\]]*))?\]").expect("marker pattern is valid")
});

static DIMENSIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*[xX]\s*(\d+)\s*$").expect("dimension pattern is valid"));

static SUBTYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").expect("subtype pattern is valid"));

/// A parsed placeholder marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Chart { subtype: String },
    Table { rows: usize, cols: usize },
    Image { subtype: String },
}

impl Placeholder {
    /// Parse the first marker in `line`, if any.
    ///
    /// Chart and image sub-types default to `generic`; tables default to
    /// [`DEFAULT_TABLE_DIMENSIONS`] when the size is absent, zero or unreadable.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = MARKER.captures(line)?;
        let argument = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        let subtype = || {
            if SUBTYPE.is_match(argument) {
                argument.to_string()
            } else {
                "generic".to_string()
            }
        };

        match &caps[1] {
            "CHART" => Some(Placeholder::Chart { subtype: subtype() }),
            "IMAGE" => Some(Placeholder::Image { subtype: subtype() }),
            _ => {
                let (rows, cols) = parse_dimensions(argument).unwrap_or(DEFAULT_TABLE_DIMENSIONS);
                Some(Placeholder::Table { rows, cols })
            }
        }
    }
}

fn parse_dimensions(argument: &str) -> Option<(usize, usize)> {
    let caps = DIMENSIONS.captures(argument)?;
    let rows = caps[1].parse::<usize>().ok().filter(|&n| n > 0)?;
    let cols = caps[2].parse::<usize>().ok().filter(|&n| n > 0)?;
    if rows > MAX_TABLE_DIMENSION || cols > MAX_TABLE_DIMENSION {
        warn!(
            "Table {}x{} exceeds the {} limit, truncating",
            rows, cols, MAX_TABLE_DIMENSION
        );
    }
    Some((rows.min(MAX_TABLE_DIMENSION), cols.min(MAX_TABLE_DIMENSION)))
}

fn heading(line: &str) -> Option<(u8, &str)> {
    [("### ", 3), ("## ", 2), ("# ", 1)]
        .into_iter()
        .find_map(|(prefix, level)| line.strip_prefix(prefix).map(|rest| (level, rest.trim())))
}

fn placeholder_kind(line: &str) -> Option<SectionKind> {
    MARKER.captures(line).map(|caps| match &caps[1] {
        "CHART" => SectionKind::Chart,
        "TABLE" => SectionKind::Table,
        _ => SectionKind::Image,
    })
}

fn flush(run: &mut Vec<&str>, sections: &mut Vec<Section>) {
    if !run.is_empty() {
        sections.push(Section::new(SectionKind::Paragraph, run.join("\n")));
        run.clear();
    }
}

/// Classify `content` into sections, preserving line order.
pub fn parse_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((level, text)) = heading(line) {
            flush(&mut run, &mut sections);
            sections.push(Section::new(SectionKind::Heading(level), text));
        } else if let Some(kind) = placeholder_kind(line) {
            flush(&mut run, &mut sections);
            sections.push(Section::new(kind, line));
        } else {
            run.push(line);
        }
    }
    flush(&mut run, &mut sections);

    sections
}
