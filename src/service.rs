use std::sync::Arc;

use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{ChatCompletionsGenerator, TemplateGenerator, TextGenerator, build_prompt};
use crate::config::ServiceConfig;
use crate::error::{Error, Result, SourceError};
use crate::extract::{ItemExtractor, ItemRecord};
use crate::history::{HistoryEntry, HistoryStore, JsonLinesHistory};
use crate::source::{self, Table};

pub const DEFAULT_HISTORY_LABEL: &str = "Menu analysed";

/// Result of an analysis request.
///
/// The items are always returned as received; a failed commentary call only
/// fills `error`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub item_count: usize,
    pub items: Vec<ItemRecord>,
    pub generator: &'static str,
    pub commentary: Option<String>,
    pub error: Option<String>,
    pub history_recorded: bool,
}

/// Wires sources, the extractor, the commentary service and the run history.
pub struct MenuService {
    extractor: ItemExtractor,
    client: Client,
    history: Arc<dyn HistoryStore>,
    generator: Arc<dyn TextGenerator>,
    page_line_limit: usize,
    summary_item_limit: usize,
}

impl MenuService {
    pub fn new(
        extractor: ItemExtractor,
        client: Client,
        history: Arc<dyn HistoryStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let defaults = ServiceConfig::default();
        Self {
            extractor,
            client,
            history,
            generator,
            page_line_limit: defaults.page_line_limit,
            summary_item_limit: defaults.summary_item_limit,
        }
    }

    pub fn with_limits(mut self, page_line_limit: usize, summary_item_limit: usize) -> Self {
        self.page_line_limit = page_line_limit;
        self.summary_item_limit = summary_item_limit;
        self
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let extractor = ItemExtractor::new(config.extractor_config()?)?;
        let client = source::build_client(config.http_timeout)?;
        let history: Arc<dyn HistoryStore> = Arc::new(JsonLinesHistory::new(&config.history_path));
        let generator: Arc<dyn TextGenerator> = match &config.generator {
            Some(generator) => Arc::new(ChatCompletionsGenerator::new(
                generator.clone(),
                client.clone(),
            )),
            None => Arc::new(TemplateGenerator),
        };
        info!(generator = generator.name(), history = %config.history_path.display(), "menu service ready");

        Ok(Self::new(extractor, client, history, generator)
            .with_limits(config.page_line_limit, config.summary_item_limit))
    }

    pub fn items_from_text(&self, raw_text: &str) -> Vec<ItemRecord> {
        self.extractor.extract_text(raw_text)
    }

    pub async fn items_from_pdf(&self, bytes: Vec<u8>) -> Result<Vec<ItemRecord>> {
        // PDF decoding is CPU-bound, keep it off the async workers.
        let text = tokio::task::spawn_blocking(move || source::extract_pdf_text(&bytes))
            .await
            .map_err(|err| SourceError::Parse(format!("PDF worker failed: {err}")))??;
        Ok(self.items_from_text(&text))
    }

    pub async fn items_from_page(&self, url: &str) -> Result<Vec<ItemRecord>> {
        let text = source::fetch_page_text(&self.client, url, self.page_line_limit).await?;
        Ok(self.items_from_text(&text))
    }

    pub fn items_from_table(&self, table: &Table) -> Result<Vec<ItemRecord>> {
        Ok(source::items_from_table(table)?)
    }

    pub fn items_from_upload(&self, bytes: &[u8], filename: &str) -> Result<Vec<ItemRecord>> {
        let table = source::read_table(bytes, filename)?;
        self.items_from_table(&table)
    }

    /// Records the run, then asks the generator for commentary.
    pub async fn analyze(&self, items: Vec<ItemRecord>, label: Option<String>) -> Result<AnalysisReport> {
        if items.is_empty() {
            return Err(Error::NothingToAnalyze);
        }

        let entry = HistoryEntry::now(
            label.unwrap_or_else(|| DEFAULT_HISTORY_LABEL.to_string()),
            items.len(),
        );
        let history_recorded = match self.history.append(entry).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to record analysis in history");
                false
            }
        };

        let prompt = build_prompt(&items, self.summary_item_limit);
        let (commentary, error) = match self.generator.generate(&prompt, &items).await {
            Ok(text) => (Some(text), None),
            Err(err) => {
                warn!(generator = self.generator.name(), error = %err, "commentary unavailable");
                (None, Some(err.to_string()))
            }
        };

        Ok(AnalysisReport {
            item_count: items.len(),
            items,
            generator: self.generator.name(),
            commentary,
            error,
            history_recorded,
        })
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.history.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractorConfig;
    use crate::error::{AnalysisError, AnalysisResult};
    use crate::history::MemoryHistory;
    use async_trait::async_trait;

    struct QuotaExhausted;

    #[async_trait]
    impl TextGenerator for QuotaExhausted {
        fn name(&self) -> &'static str {
            "quota-exhausted"
        }

        async fn generate(&self, _prompt: &str, _items: &[ItemRecord]) -> AnalysisResult<String> {
            Err(AnalysisError::Quota)
        }
    }

    fn service(generator: Arc<dyn TextGenerator>) -> (MenuService, Arc<MemoryHistory>) {
        let history = Arc::new(MemoryHistory::new());
        let extractor = ItemExtractor::new(ExtractorConfig::default()).unwrap();
        let client = source::build_client(std::time::Duration::from_secs(1)).unwrap();
        let service = MenuService::new(extractor, client, history.clone(), generator);
        (service, history)
    }

    #[tokio::test]
    async fn test_generator_failure_keeps_items_and_history() {
        let (service, history) = service(Arc::new(QuotaExhausted));
        let items = service.items_from_text("R$ 30,00\nPizza Calabresa Grande\n");

        let report = service.analyze(items.clone(), None).await.unwrap();

        assert_eq!(report.items, items);
        assert_eq!(report.item_count, 1);
        assert!(report.commentary.is_none());
        assert_eq!(report.error.as_deref(), Some("Text generation quota exhausted"));
        assert!(report.history_recorded);

        let entries = history.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, DEFAULT_HISTORY_LABEL);
        assert_eq!(entries[0].item_count, 1);
    }

    #[tokio::test]
    async fn test_template_commentary() {
        let (service, _) = service(Arc::new(TemplateGenerator));
        let items = vec![ItemRecord::new("Cheddar Turbo Supreme", "R$ 19.90")];

        let report = service
            .analyze(items, Some("Lanchonete do Zé".into()))
            .await
            .unwrap();
        assert_eq!(report.generator, "template");
        assert!(report.commentary.unwrap().contains("Cheddar Turbo Supreme"));
        assert_eq!(service.history().await.unwrap()[0].label, "Lanchonete do Zé");
    }

    #[tokio::test]
    async fn test_empty_items_are_rejected() {
        let (service, history) = service(Arc::new(TemplateGenerator));
        assert!(matches!(
            service.analyze(Vec::new(), None).await,
            Err(Error::NothingToAnalyze)
        ));
        assert!(history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_csv_upload_goes_through_table_mapping() {
        let (service, _) = service(Arc::new(TemplateGenerator));
        let items = service
            .items_from_upload(b"nome,preco\nCoxinha de frango,\"6,50\"\n", "salgados.csv")
            .unwrap();
        assert_eq!(
            items,
            vec![ItemRecord::new("Coxinha de frango", "6,50").with_description("No description")]
        );

        let err = service.items_from_upload(b"nome", "salgados.csv").unwrap_err();
        assert!(matches!(err, Error::Source(SourceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_invalid_pdf_is_parse_failure() {
        let (service, _) = service(Arc::new(TemplateGenerator));
        let err = service.items_from_pdf(b"not a pdf".to_vec()).await.unwrap_err();
        assert!(matches!(err, Error::Source(SourceError::Parse(_))));
    }
}
