use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::ExtractorConfig;
use crate::error::{Error, Result};
use crate::normalize::normalize;

/// One menu item recovered from a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub price_text: String,
    pub description: String,
}

impl ItemRecord {
    /// Builds a record whose description is synthesized from name and price.
    pub fn new(name: impl Into<String>, price_text: impl Into<String>) -> Self {
        let name = name.into();
        let price_text = price_text.into();
        let description = format!("{name} - {price_text}");
        Self {
            name,
            price_text,
            description,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Single-pass heuristic that turns menu text lines into [`ItemRecord`]s.
///
/// A line containing the currency marker starts an item. The price comes from
/// that line, or from the next one when the marker stands alone, and the name
/// is the first plausible line in a short window after the price. After each
/// item the cursor jumps `skip_span` lines past the trigger so the sub-lines
/// of the same item are not read as new items.
///
/// Extraction never fails: missing prices and names fall back to the
/// configured sentinel and placeholder.
#[derive(Debug, Clone)]
pub struct ItemExtractor {
    config: ExtractorConfig,
    marker_lower: String,
    marker_pattern: Regex,
    detail_keywords: Vec<String>,
}

impl ItemExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidSettings)?;
        let marker_pattern = RegexBuilder::new(&regex::escape(&config.currency_marker))
            .case_insensitive(true)
            .build()?;
        let marker_lower = config.currency_marker.to_lowercase();
        let detail_keywords = config
            .detail_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Self {
            config,
            marker_lower,
            marker_pattern,
            detail_keywords,
        })
    }

    /// Normalizes raw text and extracts items from the resulting lines.
    pub fn extract_text(&self, raw_text: &str) -> Vec<ItemRecord> {
        self.extract(&normalize(raw_text))
    }

    pub fn extract<L: AsRef<str>>(&self, lines: &[L]) -> Vec<ItemRecord> {
        let mut records = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line: &str = lines[i].as_ref();
            if !self.is_trigger(line) {
                i += 1;
                continue;
            }

            let trigger = i;
            let mut cursor = i;

            // Digits on the trigger line win, even when they are not a price.
            let price_source = if has_digit(line) {
                Some(line)
            } else {
                match lines.get(i + 1).map(AsRef::<str>::as_ref) {
                    Some(next) if has_digit(next) => {
                        cursor += 1;
                        Some(next)
                    }
                    _ => None,
                }
            };

            let price_text = match price_source {
                Some(source) => self.format_price(source),
                None => self.config.price_sentinel.clone(),
            };

            let name = self
                .find_name(lines, cursor + 1)
                .or_else(|| self.name_above(lines, trigger))
                .unwrap_or_else(|| self.config.name_placeholder.clone());

            trace!(trigger, %name, %price_text, "menu item detected");
            records.push(ItemRecord::new(name, price_text));

            // Counted from the trigger: a price read from the next line does not lengthen the jump.
            i = trigger.saturating_add(self.config.skip_span);
        }

        debug!(lines = lines.len(), items = records.len(), "extraction finished");
        records
    }

    pub fn is_trigger(&self, line: &str) -> bool {
        line.to_lowercase().contains(&self.marker_lower)
    }

    fn is_detail(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.detail_keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    fn is_name_candidate(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.chars().count() > self.config.min_name_len && !is_bare_number(trimmed)
    }

    /// Removes every marker occurrence and re-prefixes the cleaned price.
    fn format_price(&self, source: &str) -> String {
        let cleaned = self.marker_pattern.replace_all(source, "");
        format!("{} {}", self.config.currency_marker, cleaned.trim())
    }

    fn find_name<L: AsRef<str>>(&self, lines: &[L], start: usize) -> Option<String> {
        let end = start.saturating_add(self.config.window_size).min(lines.len());
        lines
            .get(start..end)?
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(|candidate| !self.is_detail(candidate))
            .find(|candidate| self.is_name_candidate(candidate))
            .map(|candidate| candidate.trim().to_string())
    }

    fn name_above<L: AsRef<str>>(&self, lines: &[L], trigger: usize) -> Option<String> {
        if !self.config.name_lookbehind || trigger == 0 {
            return None;
        }
        let above: &str = lines[trigger - 1].as_ref();
        if self.is_trigger(above) || self.is_detail(above) || !self.is_name_candidate(above) {
            return None;
        }
        Some(above.trim().to_string())
    }
}

fn has_digit(line: &str) -> bool {
    line.chars().any(|c| c.is_ascii_digit())
}

/// True for continuation lines such as "1.000,00" that carry no words.
fn is_bare_number(line: &str) -> bool {
    let stripped: String = line.chars().filter(|c| *c != ',' && *c != '.').collect();
    !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit())
}
