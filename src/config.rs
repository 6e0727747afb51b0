use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_CURRENCY_MARKER: &str = "R$";
pub const DEFAULT_PRICE_SENTINEL: &str = "???";
pub const DEFAULT_NAME_PLACEHOLDER: &str = "Item detected";

/// Knobs for the line-based item heuristic.
///
/// Every field has a default, so a JSON file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Marker that turns a line into a trigger. Matched case-insensitively.
    pub currency_marker: String,
    /// Lowercase substrings that mark a sub-detail line (portion, flavor, side).
    pub detail_keywords: Vec<String>,
    /// Number of lines searched for a name after the price.
    pub window_size: usize,
    /// Cursor jump after an emitted record, counted from the trigger line.
    pub skip_span: usize,
    /// A name candidate must be strictly longer than this many characters.
    pub min_name_len: usize,
    pub price_sentinel: String,
    pub name_placeholder: String,
    /// Fall back to the line right above the trigger when the forward window
    /// yields no name.
    pub name_lookbehind: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            currency_marker: DEFAULT_CURRENCY_MARKER.to_string(),
            detail_keywords: ["/", "pedaço", "fatia", "sabor", "acompanha", "broto"]
                .into_iter()
                .map(String::from)
                .collect(),
            window_size: 5,
            skip_span: 6,
            min_name_len: 10,
            price_sentinel: DEFAULT_PRICE_SENTINEL.to_string(),
            name_placeholder: DEFAULT_NAME_PLACEHOLDER.to_string(),
            name_lookbehind: false,
        }
    }
}

impl ExtractorConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
        config.validate().map_err(|reason| Error::Config {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Rejects settings that would stall the cursor or emit empty fields.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.currency_marker.trim().is_empty() {
            return Err("currency_marker must not be empty".into());
        }
        if self.skip_span == 0 {
            return Err("skip_span must be at least 1".into());
        }
        if self.price_sentinel.is_empty() {
            return Err("price_sentinel must not be empty".into());
        }
        if self.name_placeholder.is_empty() {
            return Err("name_placeholder must not be empty".into());
        }
        Ok(())
    }
}

/// Remote text-generation endpoint settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Runtime settings for the HTTP service, read from `MENU_*` variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub history_path: PathBuf,
    pub extractor_config_path: Option<PathBuf>,
    pub generator: Option<GeneratorConfig>,
    pub http_timeout: Duration,
    pub page_line_limit: usize,
    pub summary_item_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            history_path: PathBuf::from("history.jsonl"),
            extractor_config_path: None,
            generator: None,
            http_timeout: Duration::from_secs(30),
            page_line_limit: 500,
            summary_item_limit: 20,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unparsable values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let generator = match (lookup("MENU_GENERATOR_ENDPOINT"), lookup("MENU_GENERATOR_API_KEY")) {
            (Some(endpoint), Some(api_key)) if !endpoint.is_empty() && !api_key.is_empty() => {
                Some(GeneratorConfig {
                    endpoint,
                    api_key,
                    model: lookup("MENU_GENERATOR_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                    max_tokens: parse_or(lookup("MENU_GENERATOR_MAX_TOKENS"), 1024),
                    temperature: parse_or(lookup("MENU_GENERATOR_TEMPERATURE"), 0.7),
                })
            }
            _ => None,
        };

        Self {
            bind_addr: parse_or(lookup("MENU_BIND_ADDR"), defaults.bind_addr),
            history_path: lookup("MENU_HISTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_path),
            extractor_config_path: lookup("MENU_EXTRACTOR_CONFIG").map(PathBuf::from),
            generator,
            http_timeout: lookup("MENU_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            page_line_limit: parse_or(lookup("MENU_PAGE_LINE_LIMIT"), defaults.page_line_limit),
            summary_item_limit: parse_or(
                lookup("MENU_SUMMARY_ITEM_LIMIT"),
                defaults.summary_item_limit,
            ),
        }
    }

    pub fn extractor_config(&self) -> Result<ExtractorConfig> {
        match &self.extractor_config_path {
            Some(path) => ExtractorConfig::from_json_file(path),
            None => Ok(ExtractorConfig::default()),
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ExtractorConfig =
            serde_json::from_str(r#"{"currency_marker": "US$", "skip_span": 4}"#).unwrap();
        assert_eq!(config.currency_marker, "US$");
        assert_eq!(config.skip_span, 4);
        assert_eq!(config.window_size, 5);
        assert_eq!(config.price_sentinel, "???");
    }

    #[test]
    fn test_validate_rejects_zero_skip() {
        let config = ExtractorConfig {
            skip_span: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ExtractorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extractor.json");
        std::fs::write(&path, r#"{"skip_span": 0}"#).unwrap();

        let err = ExtractorConfig::from_json_file(&path).unwrap_err();
        assert!(err.to_string().contains("extractor.json"));
    }

    #[test]
    fn test_service_config_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MENU_BIND_ADDR", "127.0.0.1:8081"),
            ("MENU_PAGE_LINE_LIMIT", "not-a-number"),
            ("MENU_GENERATOR_ENDPOINT", "https://llm.example/v1/chat/completions"),
            ("MENU_GENERATOR_API_KEY", "secret"),
        ]);
        let config = ServiceConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.bind_addr.port(), 8081);
        assert_eq!(config.page_line_limit, 500);
        let generator = config.generator.expect("generator configured");
        assert_eq!(generator.model, "gpt-4o-mini");
        assert_eq!(generator.max_tokens, 1024);
    }

    #[test]
    fn test_generator_requires_key() {
        let config = ServiceConfig::from_lookup(|k| {
            (k == "MENU_GENERATOR_ENDPOINT").then(|| "https://llm.example".to_string())
        });
        assert!(config.generator.is_none());
    }
}
