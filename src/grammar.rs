//! Optional grammar pass over generated text.
//!
//! The text is sent to a LanguageTool-compatible `/v2/check` endpoint. Every match that
//! carries at least one replacement has its first replacement applied. Offsets in the
//! response count UTF-16 code units, so corrections are spliced into the UTF-16 form of
//! the text and applied from the highest offset down; that way an earlier substitution
//! that changes length never shifts a later one. Matches that overlap an already applied
//! correction or fall outside the text are skipped.
//!
//! Like web research this is enrichment: on any failure the original text comes back
//! unchanged.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One suggested correction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Correction {
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Replacement {
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<Correction>,
}

/// Something that can propose corrections for a text.
#[async_trait]
pub trait GrammarChecker: Send + Sync {
    async fn check(&self, text: &str) -> Result<Vec<Correction>, String>;
}

/// Client for a LanguageTool server.
pub struct LanguageTool {
    client: Client,
    endpoint: String,
    language: String,
}

impl LanguageTool {
    pub fn new(endpoint: impl Into<String>, language: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
            language: language.into(),
        }
    }
}

#[async_trait]
impl GrammarChecker for LanguageTool {
    async fn check(&self, text: &str) -> Result<Vec<Correction>, String> {
        debug!("Grammar check of {} chars at {}", text.len(), self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("text", text), ("language", self.language.as_str())])
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("grammar check returned status {status}"));
        }

        let body: CheckResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid grammar response: {e}"))?;
        Ok(body.matches)
    }
}

/// Apply the first replacement of every correction to `text`.
pub fn apply_corrections(text: &str, corrections: &[Correction]) -> String {
    let mut units: Vec<u16> = text.encode_utf16().collect();
    // A position splits a character when it lands on the low half of a surrogate pair.
    let splits_char = |units: &[u16], at: usize| {
        units
            .get(at)
            .is_some_and(|&unit| (0xDC00..=0xDFFF).contains(&unit))
    };

    let mut usable: Vec<(usize, usize, &str)> = corrections
        .iter()
        .filter_map(|c| {
            c.replacements
                .first()
                .map(|r| (c.offset, c.length, r.value.as_str()))
        })
        .collect();
    usable.sort_by(|a, b| b.0.cmp(&a.0));

    // Start of the lowest correction applied so far, in original offsets.
    let mut floor = units.len();
    let mut applied = 0;
    for (offset, length, value) in usable {
        let Some(end) = offset.checked_add(length) else {
            continue;
        };
        if end > floor {
            debug!("Skipping overlapping or out-of-range correction at {}", offset);
            continue;
        }
        if splits_char(&units, offset) || (end < floor && splits_char(&units, end)) {
            debug!("Skipping correction at {} that splits a character", offset);
            continue;
        }
        units.splice(offset..end, value.encode_utf16());
        floor = offset;
        applied += 1;
    }

    debug!("Applied {} grammar corrections", applied);
    String::from_utf16_lossy(&units)
}

/// Check `text` and apply the corrections, returning the original on any failure.
pub async fn correct_text(checker: &dyn GrammarChecker, text: &str) -> String {
    match checker.check(text).await {
        Ok(corrections) => {
            info!("Grammar check suggested {} corrections", corrections.len());
            apply_corrections(text, &corrections)
        }
        Err(e) => {
            warn!("Grammar check failed, keeping original text: {}", e);
            text.to_string()
        }
    }
}
