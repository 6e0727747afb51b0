use serde::Serialize;

/// A non-empty, trimmed line of extracted text.
///
/// `index` is the position in the filtered sequence, not in the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub index: usize,
    pub text: String,
}

impl Line {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl AsRef<str> for Line {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Splits raw document or page text into trimmed, non-empty lines.
pub fn normalize(raw_text: &str) -> Vec<Line> {
    // `str::lines` leaves a lone '\r' inside the line, old Mac-style PDFs emit those.
    raw_text
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, text)| Line {
            index,
            text: text.to_string(),
        })
        .collect()
}
