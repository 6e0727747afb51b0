use std::io::Cursor;
use std::path::Path;

use calamine::Reader;
use reqwest::{Client, Url};
use scraper::Html;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{SourceError, SourceResult};
use crate::extract::ItemRecord;

/// Browser-like agent, some menu sites refuse unknown clients.
const PAGE_USER_AGENT: &str = "Mozilla/5.0 (compatible; menu-extractor-api/0.1)";

/// Page lines at or below this many characters are dropped as navigation noise.
const PAGE_MIN_LINE_LEN: usize = 10;

const NO_DESCRIPTION: &str = "No description";

pub fn build_client(timeout: std::time::Duration) -> SourceResult<Client> {
    let client = Client::builder()
        // Avoid macOS system proxy lookup that can panic in sandboxed contexts.
        .no_proxy()
        .user_agent(PAGE_USER_AGENT)
        .connect_timeout(std::time::Duration::from_secs(5))
        .timeout(timeout)
        .build()?;
    Ok(client)
}

pub fn extract_pdf_text(bytes: &[u8]) -> SourceResult<String> {
    if bytes.is_empty() {
        return Err(SourceError::Parse("empty PDF upload".to_string()));
    }
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| SourceError::Parse(format!("unreadable PDF: {err}")))?;
    debug!(bytes = bytes.len(), chars = text.len(), "extracted PDF text");
    Ok(text)
}

pub fn read_pdf_file(path: &std::path::Path) -> SourceResult<String> {
    let bytes = std::fs::read(path)?;
    extract_pdf_text(&bytes)
}

/// Fetches a menu page and reduces it to its visible text lines.
pub async fn fetch_page_text(client: &Client, url: &str, max_lines: usize) -> SourceResult<String> {
    let url = Url::parse(url).map_err(|err| SourceError::InvalidUrl(format!("{url}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SourceError::InvalidUrl(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }

    info!(%url, "fetching menu page");
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }
    let body = resp.text().await?;

    Ok(reduce_html(&body, max_lines))
}

/// Drops script and style content, then keeps trimmed lines longer than
/// ten characters, at most `max_lines` of them.
pub fn reduce_html(html: &str, max_lines: usize) -> String {
    let doc = Html::parse_document(html);

    let mut text = String::new();
    for node in doc.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "script" | "style" | "noscript"))
        });
        if !hidden {
            text.push_str(fragment);
        }
    }

    text.lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > PAGE_MIN_LINE_LEN)
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rows of a spreadsheet or CSV that the caller has already parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Parses an uploaded spreadsheet, picking the format from the file extension.
///
/// The first row holds the column headers.
pub fn read_table(bytes: &[u8], filename: &str) -> SourceResult<Table> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let table = match extension.as_str() {
        "csv" => read_csv(bytes)?,
        "xlsx" | "xls" | "ods" => read_workbook(bytes)?,
        _ => {
            return Err(SourceError::Parse(format!(
                "unsupported table format: {filename}"
            )));
        }
    };
    debug!(filename, columns = table.columns.len(), rows = table.rows.len(), "read table upload");
    Ok(table)
}

fn read_csv(bytes: &[u8]) -> SourceResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let columns = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(csv_error)
        })
        .collect::<SourceResult<Vec<Vec<String>>>>()?;

    Ok(Table { columns, rows })
}

fn csv_error(err: csv::Error) -> SourceError {
    SourceError::Parse(format!("malformed CSV: {err}"))
}

fn read_workbook(bytes: &[u8]) -> SourceResult<Table> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|err| SourceError::Parse(format!("unreadable spreadsheet: {err}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SourceError::Parse("spreadsheet has no sheets".to_string()))?
        .map_err(|err| SourceError::Parse(format!("unreadable sheet: {err}")))?;

    let mut rows = range.rows().map(|row| {
        row.iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect::<Vec<String>>()
    });
    let columns = rows.next().unwrap_or_default();

    Ok(Table {
        columns,
        rows: rows.collect(),
    })
}

/// Maps table rows to records by header name, falling back to column order.
pub fn items_from_table(table: &Table) -> SourceResult<Vec<ItemRecord>> {
    if table.columns.len() < 2 {
        return Err(SourceError::Parse(
            "table needs at least a name and a price column".to_string(),
        ));
    }

    let headers: Vec<String> = table.columns.iter().map(|c| fold_header(c)).collect();
    let position = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));

    let name_col = position(&["nome", "name"]).unwrap_or(0);
    let price_col = position(&["preco", "price"]).unwrap_or(1);
    let desc_col = position(&["descricao", "description"]);

    let mut items = Vec::with_capacity(table.rows.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let cell = |col: usize| {
            row.get(col).map(|c| c.trim().to_string()).ok_or_else(|| {
                SourceError::Parse(format!("row {} is missing column {}", row_idx + 1, col + 1))
            })
        };
        let name = cell(name_col)?;
        let price = cell(price_col)?;
        let description = match desc_col {
            Some(col) => cell(col)?,
            None => NO_DESCRIPTION.to_string(),
        };
        items.push(ItemRecord::new(name, price).with_description(description));
    }

    Ok(items)
}

fn fold_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace('ç', "c")
        .replace('ã', "a")
        .replace('ó', "o")
}
