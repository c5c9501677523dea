//! Item catalog and name resolution.
//!
//! OCR output is noisy, so resolution is layered: exact case-insensitive
//! lookup, then a lookup over normalized names (everything but letters and
//! digits stripped), then a fuzzy pass scored by normalized edit distance.
//! Multi-line text blocks additionally get domain-specific line filtering
//! before any of that runs.

use std::{collections::HashMap, fs, path::Path, sync::LazyLock};

use anyhow::{Context, Result};
use regex::Regex;

use crate::schema::ItemRecord;

/// Minimum edit-distance similarity for a fuzzy hit.
pub const FUZZY_ACCEPT: f32 = 0.60;

/// Words that mark a recognized line as UI chrome or a stat readout rather
/// than an item name.
const STAT_WORDS: &[&str] = &[
	"durability",
	"ammo",
	"rarity",
	"weight",
	"value",
	"uses",
	"stack",
	"level",
	"damage",
	"capacity",
	"equipped",
];

/// Lines that are purely numeric / ratio / percentage readouts ("34/40",
/// "12%", "x3", "1,250").
static NON_ITEM_LINE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[\d\s.,:/%xX+-]+$").expect("regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
	pub name: String,
	pub category: String,
	pub rarity: String,
	pub value: u32,
	pub recycles_into: HashMap<String, u32>,
	pub workshop_uses: Vec<String>,
	pub project_uses: Vec<String>,
	pub quest_uses: Vec<String>,
	pub quest_keep: bool,
	pub recommendation: Option<String>,
}

impl From<ItemRecord> for CatalogItem {
	fn from(r: ItemRecord) -> Self {
		Self {
			name: r.name,
			category: r.category,
			rarity: r.rarity,
			value: r.value,
			recycles_into: r.recycles_into,
			workshop_uses: r.workshop_uses,
			project_uses: r.project_uses,
			quest_uses: r.quest_uses,
			quest_keep: r.quest_keep,
			recommendation: r.recommendation,
		}
	}
}

/// How a [`MatchResult`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
	Exact,
	Normalized,
	Fuzzy,
	Icon,
	Edge,
	None,
}

/// One recognition attempt's outcome. Transient; rebuilt per attempt.
#[derive(Debug, Clone)]
pub struct MatchResult {
	pub item: Option<CatalogItem>,
	/// The text (or template name) the match was derived from.
	pub source: String,
	pub confidence: f32,
	pub provenance: Provenance,
}

impl MatchResult {
	pub fn none(source: impl Into<String>, confidence: f32) -> Self {
		Self {
			item: None,
			source: source.into(),
			confidence,
			provenance: Provenance::None,
		}
	}

	pub fn is_match(&self) -> bool {
		self.item.is_some()
	}
}

/// Read-only item catalog, loaded once at startup.
///
/// Items are kept in file order; every maximum-score selection breaks ties
/// toward the earlier entry, which keeps fuzzy resolution deterministic.
pub struct Catalog {
	items: Vec<CatalogItem>,
	by_name: HashMap<String, usize>,
	by_normalized: HashMap<String, usize>,
}

impl Catalog {
	pub fn empty() -> Self {
		Self {
			items: Vec::new(),
			by_name: HashMap::new(),
			by_normalized: HashMap::new(),
		}
	}

	pub fn from_records(records: Vec<ItemRecord>) -> Self {
		let mut catalog = Self::empty();
		for record in records {
			let item = CatalogItem::from(record);
			let idx = catalog.items.len();
			catalog.by_name.entry(item.name.to_lowercase()).or_insert(idx);
			let normalized = normalize_name(&item.name);
			if !normalized.is_empty() {
				catalog.by_normalized.entry(normalized).or_insert(idx);
			}
			catalog.items.push(item);
		}
		catalog
	}

	pub fn load(path: &Path) -> Result<Self> {
		let json = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
		let records: Vec<ItemRecord> =
			serde_json::from_str(&json).with_context(|| format!("parse {}", path.display()))?;
		Ok(Self::from_records(records))
	}

	/// Load the catalog, degrading to an empty one on any failure.
	/// A missing catalog disables item lookup but nothing else.
	pub fn load_or_empty(path: &Path) -> Self {
		match Self::load(path) {
			Ok(catalog) => catalog,
			Err(err) => {
				tracing::warn!(error = %err, "failed to load item catalog; item lookup disabled");
				Self::empty()
			}
		}
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn items(&self) -> &[CatalogItem] {
		&self.items
	}

	/// Resolve a single (possibly noisy) item name.
	///
	/// Tried in order, first hit wins: exact case-insensitive, normalized,
	/// fuzzy at [`FUZZY_ACCEPT`].
	pub fn resolve(&self, name: &str) -> Option<&CatalogItem> {
		let name = name.trim();
		if name.is_empty() {
			return None;
		}

		if let Some(&idx) = self.by_name.get(&name.to_lowercase()) {
			return Some(&self.items[idx]);
		}

		let normalized = normalize_name(name);
		if !normalized.is_empty() {
			if let Some(&idx) = self.by_normalized.get(&normalized) {
				return Some(&self.items[idx]);
			}
		}

		let mut best: Option<(usize, f32)> = None;
		for (idx, item) in self.items.iter().enumerate() {
			let s = similarity(name, &item.name);
			if best.is_none_or(|(_, bs)| s > bs) {
				best = Some((idx, s));
			}
		}

		match best {
			Some((idx, s)) if s >= FUZZY_ACCEPT => Some(&self.items[idx]),
			_ => None,
		}
	}

	/// Resolve the best item mentioned anywhere in a raw recognized text
	/// block (several lines of OCR output around an inspected item).
	pub fn resolve_best(&self, text: &str) -> MatchResult {
		let lines = text
			.lines()
			.map(str::trim)
			.filter(|line| !is_noise_line(line))
			.collect::<Vec<_>>();

		if lines.is_empty() || self.items.is_empty() {
			return MatchResult::none(text.trim(), 0.0);
		}

		// Cheap passes first: any line with an exact or normalized hit
		// short-circuits the whole block.
		for line in &lines {
			if let Some(&idx) = self.by_name.get(&line.to_lowercase()) {
				return MatchResult {
					item: Some(self.items[idx].clone()),
					source: line.to_string(),
					confidence: 1.0,
					provenance: Provenance::Exact,
				};
			}
		}
		for line in &lines {
			let normalized = normalize_name(line);
			if normalized.is_empty() {
				continue;
			}
			if let Some(&idx) = self.by_normalized.get(&normalized) {
				return MatchResult {
					item: Some(self.items[idx].clone()),
					source: line.to_string(),
					confidence: 0.95,
					provenance: Provenance::Normalized,
				};
			}
		}

		// Fuzzy pass over every (line, item) pair. Strict `>` keeps the
		// first-encountered pair on ties: lines top-down, items in file order.
		let mut best: Option<(f32, usize, &str)> = None;
		for line in &lines {
			for (idx, item) in self.items.iter().enumerate() {
				let s = similarity(line, &item.name);
				if best.is_none_or(|(bs, _, _)| s > bs) {
					best = Some((s, idx, line));
				}
			}
		}

		match best {
			Some((score, idx, line)) if score >= FUZZY_ACCEPT => MatchResult {
				item: Some(self.items[idx].clone()),
				source: line.to_string(),
				confidence: score,
				provenance: Provenance::Fuzzy,
			},
			Some((score, _, line)) => MatchResult::none(line, score),
			None => MatchResult::none(text.trim(), 0.0),
		}
	}
}

/// Normalized lookup form: lowercase, letters and digits only.
///
/// "Scrap Metal", "scrap-metal" and "SCRAP_METAL" all map to "scrapmetal".
pub fn normalize_name(s: &str) -> String {
	s.chars()
		.filter(|c| c.is_alphanumeric())
		.flat_map(char::to_lowercase)
		.collect()
}

/// Edit-distance similarity in `[0, 1]`, case-insensitive.
pub fn similarity(a: &str, b: &str) -> f32 {
	let a = a.to_lowercase();
	let b = b.to_lowercase();
	let max_len = a.chars().count().max(b.chars().count());
	if max_len == 0 {
		return 1.0;
	}

	let distance = levenshtein::levenshtein(&a, &b);
	1.0 - distance as f32 / max_len as f32
}

/// Lines that can never be item names: too short, pure numeric readouts,
/// or stat/UI vocabulary.
fn is_noise_line(line: &str) -> bool {
	if line.chars().count() < 3 {
		return true;
	}
	if NON_ITEM_LINE.is_match(line) {
		return true;
	}

	let lower = line.to_lowercase();
	STAT_WORDS.iter().any(|word| lower.contains(word))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(name: &str) -> ItemRecord {
		serde_json::from_value(serde_json::json!({ "name": name })).unwrap()
	}

	fn catalog() -> Catalog {
		Catalog::from_records(vec![
			record("Scrap Metal"),
			record("Metal Parts"),
			record("Wire Spool"),
			record("ARC Alloy"),
		])
	}

	#[test]
	fn similarity_is_reflexive_and_symmetric() {
		assert_eq!(similarity("Scrap Metal", "Scrap Metal"), 1.0);
		assert_eq!(
			similarity("Scrap Metal", "Wire Spool"),
			similarity("Wire Spool", "Scrap Metal"),
		);
	}

	#[test]
	fn resolve_is_case_insensitive() {
		let c = catalog();
		assert_eq!(c.resolve("scrap metal").unwrap().name, "Scrap Metal");
		assert_eq!(c.resolve("SCRAP METAL").unwrap().name, "Scrap Metal");
	}

	#[test]
	fn resolve_falls_back_to_normalized_form() {
		let c = catalog();
		// Punctuation and spacing differences disappear under normalization.
		assert_eq!(c.resolve("scrap-metal").unwrap().name, "Scrap Metal");
		assert_eq!(c.resolve("Wire_Spool").unwrap().name, "Wire Spool");
	}

	#[test]
	fn resolve_accepts_close_typos_only() {
		let c = catalog();
		// One substitution in 11 characters is well above the floor.
		assert!(similarity("Scrap Metol", "Scrap Metal") >= FUZZY_ACCEPT);
		assert_eq!(c.resolve("Scrap Metol").unwrap().name, "Scrap Metal");

		assert!(c.resolve("Quantum Flux Capacitor").is_none());
	}

	#[test]
	fn resolve_rejects_empty_input() {
		assert!(catalog().resolve("   ").is_none());
	}

	#[test]
	fn resolve_best_filters_stat_lines() {
		let c = catalog();
		let text = "Durability 34/40\n12%\nab\nScrap Metal\nAmmo Type: Light";
		let result = c.resolve_best(text);
		assert_eq!(result.item.unwrap().name, "Scrap Metal");
		assert_eq!(result.source, "Scrap Metal");
		assert_eq!(result.confidence, 1.0);
		assert_eq!(result.provenance, Provenance::Exact);
	}

	#[test]
	fn resolve_best_reports_normalized_confidence() {
		let c = catalog();
		let result = c.resolve_best("wire spool.");
		assert_eq!(result.item.unwrap().name, "Wire Spool");
		assert_eq!(result.confidence, 0.95);
		assert_eq!(result.provenance, Provenance::Normalized);
	}

	#[test]
	fn resolve_best_fuzzy_keeps_originating_line() {
		let c = catalog();
		let result = c.resolve_best("some garbage here\nScrap Metol");
		assert_eq!(result.item.unwrap().name, "Scrap Metal");
		assert_eq!(result.source, "Scrap Metol");
		assert_eq!(result.provenance, Provenance::Fuzzy);
		assert!(result.confidence >= FUZZY_ACCEPT);
	}

	#[test]
	fn resolve_best_miss_carries_diagnostic_score() {
		let c = catalog();
		let result = c.resolve_best("zzzzzzzzzzzzzzzzz");
		assert!(result.item.is_none());
		assert_eq!(result.provenance, Provenance::None);
		assert!(result.confidence < FUZZY_ACCEPT);
	}

	#[test]
	fn resolve_best_on_empty_catalog_is_a_miss() {
		let result = Catalog::empty().resolve_best("Scrap Metal");
		assert!(result.item.is_none());
		assert_eq!(result.confidence, 0.0);
	}

	#[test]
	fn fuzzy_ties_resolve_to_file_order() {
		// Both names are the same distance from the query; the earlier
		// record must win every time.
		let c = Catalog::from_records(vec![record("Boltt"), record("Boltz")]);
		let result = c.resolve_best("unrelated junk line\nBolty");
		assert_eq!(result.item.unwrap().name, "Boltt");
	}

	#[test]
	fn normalization_strips_everything_but_alphanumerics() {
		assert_eq!(normalize_name("Scrap-Metal!"), "scrapmetal");
		assert_eq!(normalize_name("  A R C  "), "arc");
		assert_eq!(normalize_name("---"), "");
	}
}
