//! Prints the normalized lines of a menu PDF and the items found in them.
//!
//! Usage: `dump_lines <menu.pdf> [extractor.json]`

use anyhow::Context;
use menu_extractor_api::{ExtractorConfig, ItemExtractor, normalize, source};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let pdf_path = args.next().context("usage: dump_lines <menu.pdf> [extractor.json]")?;
    let config = match args.next() {
        Some(path) => ExtractorConfig::from_json_file(&path)?,
        None => ExtractorConfig::default(),
    };

    let text = source::read_pdf_file(std::path::Path::new(&pdf_path))
        .with_context(|| format!("failed to read {pdf_path}"))?;
    let lines = normalize(&text);

    println!("=== NORMALIZED LINES ===");
    for line in &lines {
        println!("{}: {:?}", line.index, line.text);
    }

    let extractor = ItemExtractor::new(config)?;
    let items = extractor.extract(&lines);

    println!("\n=== ITEMS ({}) ===", items.len());
    for item in &items {
        println!("{} | {}", item.name, item.price_text);
    }

    Ok(())
}
