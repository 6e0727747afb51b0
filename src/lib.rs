pub mod analysis;
pub mod config;
pub mod error;
pub mod extract;
pub mod history;
pub mod normalize;
pub mod service;
pub mod source;

pub use analysis::{
    ChatCompletionsGenerator, TemplateGenerator, TextGenerator, build_prompt, summary_payload,
};
pub use config::{ExtractorConfig, GeneratorConfig, ServiceConfig};
pub use error::{AnalysisError, Error, HistoryError, Result, SourceError};
pub use extract::{ItemExtractor, ItemRecord};
pub use history::{HistoryEntry, HistoryStore, JsonLinesHistory, MemoryHistory};
pub use normalize::{Line, normalize};
pub use service::{AnalysisReport, MenuService};
pub use source::Table;
