use menu_extractor_api::{ExtractorConfig, ItemExtractor, ItemRecord, normalize};
use rstest::{fixture, rstest};

#[fixture]
fn extractor() -> ItemExtractor {
    ItemExtractor::new(ExtractorConfig::default()).unwrap()
}

fn lookbehind_extractor() -> ItemExtractor {
    ItemExtractor::new(ExtractorConfig {
        name_lookbehind: true,
        ..Default::default()
    })
    .unwrap()
}

const PIZZARIA_PDF: &str = "
Pizzaria Bella Napoli - Cardápio

  R$
  49,90
  Pizza Quatro Queijos Grande
  Mussarela, provolone, parmesão
  Broto ou grande
  8 fatias

  R$
  Refrigerante de cola gelado
  2 litros
  Sabor cola ou guaraná
  Gelo e limão
  Consulte disponibilidade

  R$ 12,00 Batata frita
  Acompanha cheddar / bacon
  1.000.000,00
  Batata frita com cheddar
  Molho especial

Página 2
";

#[rstest]
#[case::name_above_price(&["Cheddar Turbo Supreme", "R$ 19.90"], "Item detected", "R$ 19.90")]
#[case::digits_on_trigger(&["R$19,90 Cheddar Burger Deluxe"], "Item detected", "R$ 19,90 Cheddar Burger Deluxe")]
#[case::detail_line_skipped(&["R$", "Fatia de pizza", "Pizza Margherita Grande"], "Pizza Margherita Grande", "???")]
#[case::trigger_is_last_line(&["Hambúrguer artesanal", "R$"], "Item detected", "???")]
fn single_item_scenarios(
    extractor: ItemExtractor,
    #[case] lines: &[&str],
    #[case] name: &str,
    #[case] price_text: &str,
) {
    let records = extractor.extract(lines);
    assert_eq!(records, vec![ItemRecord::new(name, price_text)]);
}

#[rstest]
fn name_above_price_with_lookbehind() {
    let records = lookbehind_extractor().extract(&["Cheddar Turbo Supreme", "R$ 19.90"]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Cheddar Turbo Supreme");
    assert_eq!(records[0].price_text, "R$ 19.90");
}

#[rstest]
#[case::no_marker(&["X-Burger", "Batata frita média", "19,90"])]
#[case::empty(&[])]
fn no_items(extractor: ItemExtractor, #[case] lines: &[&str]) {
    assert!(extractor.extract(lines).is_empty());
}

#[rstest]
fn pizzaria_menu(extractor: ItemExtractor) {
    let records = extractor.extract(&normalize(PIZZARIA_PDF));

    assert_eq!(
        records,
        vec![
            ItemRecord::new("Pizza Quatro Queijos Grande", "R$ 49,90"),
            ItemRecord::new("Refrigerante de cola gelado", "???"),
            ItemRecord::new("Batata frita com cheddar", "R$ 12,00 Batata frita"),
        ]
    );
}

#[rstest]
fn properties_hold_on_pizzaria_menu(extractor: ItemExtractor) {
    let lines = normalize(PIZZARIA_PDF);
    let first = extractor.extract(&lines);
    let second = extractor.extract(&lines);

    assert_eq!(first, second);
    assert!(first.len() <= lines.len());
    for record in &first {
        assert!(!record.name.is_empty());
        assert!(!record.price_text.is_empty());
        assert!(record.price_text == "???" || record.price_text.starts_with("R$ "));
        assert_eq!(record.description, format!("{} - {}", record.name, record.price_text));
    }
}

#[rstest]
fn every_line_a_trigger(extractor: ItemExtractor) {
    let lines: Vec<String> = (0..20).map(|i| format!("R$ {i},00")).collect();
    let records = extractor.extract(&lines);

    // One item per skip span of six lines: triggers 0, 6, 12, 18.
    assert_eq!(records.len(), 4);
    let prices: Vec<_> = records.iter().map(|r| r.price_text.as_str()).collect();
    assert_eq!(prices, vec!["R$ 0,00", "R$ 6,00", "R$ 12,00", "R$ 18,00"]);
}

#[rstest]
fn skip_span_is_configurable() {
    let extractor = ItemExtractor::new(ExtractorConfig {
        skip_span: 2,
        ..Default::default()
    })
    .unwrap();
    let lines = ["R$ 1,00", "x", "R$ 2,00", "x", "R$ 3,00"];
    assert_eq!(extractor.extract(&lines).len(), 3);
}
