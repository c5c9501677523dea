//! Integration tests for catalog loading from disk.

use std::io::Write;

use data::{Catalog, Provenance};
use tempfile::NamedTempFile;

const SAMPLE: &str = r#"[
	{
		"name": "Scrap Metal",
		"category": "Material",
		"rarity": "Common",
		"value": 40,
		"recyclesInto": {"Metal Parts": 2},
		"recommendation": "recycle"
	},
	{
		"name": "Prototype Lens",
		"category": "Component",
		"rarity": "Rare",
		"value": 350,
		"questUses": ["A Clearer Picture"],
		"questKeep": true
	}
]"#;

#[test]
fn loads_records_with_camel_case_fields() {
	let mut file = NamedTempFile::new().unwrap();
	file.write_all(SAMPLE.as_bytes()).unwrap();

	let catalog = Catalog::load(file.path()).unwrap();
	assert_eq!(catalog.len(), 2);

	let scrap = catalog.resolve("Scrap Metal").unwrap();
	assert_eq!(scrap.value, 40);
	assert_eq!(scrap.recycles_into.get("Metal Parts"), Some(&2));
	assert_eq!(scrap.recommendation.as_deref(), Some("recycle"));
	assert!(!scrap.quest_keep);

	let lens = catalog.resolve("Prototype Lens").unwrap();
	assert!(lens.quest_keep);
	assert_eq!(lens.quest_uses, vec!["A Clearer Picture".to_string()]);
}

#[test]
fn missing_file_degrades_to_empty_catalog() {
	let catalog = Catalog::load_or_empty(std::path::Path::new("/nope/items.json"));
	assert!(catalog.is_empty());

	let result = catalog.resolve_best("Scrap Metal");
	assert!(result.item.is_none());
	assert_eq!(result.provenance, Provenance::None);
}

#[test]
fn malformed_file_degrades_to_empty_catalog() {
	let mut file = NamedTempFile::new().unwrap();
	file.write_all(b"{ definitely not a list").unwrap();

	let catalog = Catalog::load_or_empty(file.path());
	assert!(catalog.is_empty());
}

#[test]
fn resolution_chain_works_end_to_end() {
	let mut file = NamedTempFile::new().unwrap();
	file.write_all(SAMPLE.as_bytes()).unwrap();
	let catalog = Catalog::load(file.path()).unwrap();

	// exact > normalized > fuzzy, as confidence reports.
	assert_eq!(catalog.resolve_best("Scrap Metal").confidence, 1.0);
	assert_eq!(catalog.resolve_best("scrap-metal").confidence, 0.95);

	let fuzzy = catalog.resolve_best("Scrap Metol");
	assert_eq!(fuzzy.provenance, Provenance::Fuzzy);
	assert!(fuzzy.confidence >= 0.60 && fuzzy.confidence < 1.0);
}
