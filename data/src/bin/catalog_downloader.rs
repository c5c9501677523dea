//! Fetches the community item dataset and merges it into a local
//! `items.json`, preserving locally-maintained fields.
//!
//! Usage:
//!     catalog_downloader [output] [--dry-run] [--no-cache]
//!
//! Downloads are cached under the platform cache dir so repeated runs do not
//! hammer the raw-content host.

use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use data::schema::ItemRecord;

const INDEX_URL: &str = "https://api.github.com/repos/RaidTheory/arcraiders-data/contents/items";
const RAW_URL: &str = "https://raw.githubusercontent.com/RaidTheory/arcraiders-data/main/items";

/// Dataset item type -> our category names.
const CATEGORY_MAP: &[(&str, &str)] = &[
	("Basic Material", "Material"),
	("Refined Material", "Component"),
	("Consumable", "Consumable"),
	("Quick Use", "Consumable"),
	("Tool", "Material"),
	("Weapon", "Weapon"),
	("Attachment", "Attachment"),
	("Key", "Quest"),
	("Quest Item", "Quest"),
	("Armor", "Armor"),
	("Blueprint", "Blueprint"),
	("Valuable", "Valuable"),
	("Ammo", "Ammo"),
	("Grenade", "Consumable"),
];

#[derive(Deserialize)]
struct IndexEntry {
	name: String,
}

/// Raw upstream record. Recycle outputs reference items by id, so the merge
/// needs two passes: collect the id -> name table, then convert.
#[derive(Deserialize)]
struct UpstreamItem {
	id: String,
	name: String,
	#[serde(default, rename = "type")]
	item_type: Option<String>,
	#[serde(default)]
	rarity: Option<String>,
	#[serde(default)]
	value: Option<u32>,
	#[serde(default, rename = "recyclesInto")]
	recycles_into: HashMap<String, u32>,
}

fn main() -> Result<()> {
	let mut output = PathBuf::from("assets/items.json");
	let mut dry_run = false;
	let mut use_cache = true;

	for arg in std::env::args().skip(1) {
		match arg.as_str() {
			"--dry-run" => dry_run = true,
			"--no-cache" => use_cache = false,
			other => output = PathBuf::from(other),
		}
	}

	let files = fetch_index().context("fetch dataset index")?;
	println!("dataset lists {} item files", files.len());

	let mut upstream = Vec::new();
	for file in &files {
		match fetch_item(file, use_cache) {
			Ok(item) => upstream.push(item),
			// One bad record must not sink the merge.
			Err(err) => eprintln!("skipping {file}: {err:#}"),
		}
	}

	let id_to_name: HashMap<String, String> = upstream
		.iter()
		.map(|v| (v.id.clone(), v.name.clone()))
		.collect();

	let existing = load_existing(&output)?;
	let merged = merge(upstream, &id_to_name, existing);
	println!("merged catalog holds {} items", merged.len());

	if dry_run {
		println!("dry run; not writing {}", output.display());
		return Ok(());
	}

	if let Some(parent) = output.parent() {
		fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
	}
	let json = serde_json::to_string_pretty(&merged).context("serialize catalog")?;
	fs::write(&output, json).with_context(|| format!("write {}", output.display()))?;
	println!("wrote {}", output.display());

	Ok(())
}

fn fetch_index() -> Result<Vec<String>> {
	let mut res = ureq::get(INDEX_URL)
		.header("User-Agent", "arcbuddy-catalog/1.0")
		.call()
		.context("GET index")?;
	let entries = res
		.body_mut()
		.read_json::<Vec<IndexEntry>>()
		.context("decode index JSON")?;

	Ok(entries
		.into_iter()
		.map(|e| e.name)
		.filter(|name| name.ends_with(".json"))
		.collect())
}

fn cache_path(file: &str) -> Option<PathBuf> {
	dirs::cache_dir().map(|p| p.join("arcbuddy").join("items").join(file))
}

fn fetch_item(file: &str, use_cache: bool) -> Result<UpstreamItem> {
	if use_cache {
		if let Some(path) = cache_path(file) {
			if let Ok(bytes) = fs::read(&path) {
				if let Ok(item) = serde_json::from_slice(&bytes) {
					return Ok(item);
				}
			}
		}
	}

	let url = format!("{RAW_URL}/{file}");
	let mut res = ureq::get(url.as_str())
		.header("User-Agent", "arcbuddy-catalog/1.0")
		.call()
		.with_context(|| format!("GET {file}"))?;
	let body = res
		.body_mut()
		.read_to_string()
		.with_context(|| format!("read {file}"))?;

	let item: UpstreamItem =
		serde_json::from_str(&body).with_context(|| format!("decode {file}"))?;

	if let Some(path) = cache_path(file) {
		if let Some(parent) = path.parent() {
			let _ = fs::create_dir_all(parent);
		}
		let _ = fs::write(&path, &body);
	}

	Ok(item)
}

fn load_existing(path: &Path) -> Result<Vec<ItemRecord>> {
	if !path.exists() {
		return Ok(Vec::new());
	}
	let json = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
	serde_json::from_str(&json).with_context(|| format!("parse {}", path.display()))
}

fn merge(
	upstream: Vec<UpstreamItem>,
	id_to_name: &HashMap<String, String>,
	existing: Vec<ItemRecord>,
) -> Vec<ItemRecord> {
	let mut by_name: HashMap<String, ItemRecord> = existing
		.into_iter()
		.map(|r| (r.name.clone(), r))
		.collect();

	let mut merged = Vec::with_capacity(upstream.len());
	for item in upstream {
		let category = item
			.item_type
			.as_deref()
			.and_then(|t| {
				CATEGORY_MAP
					.iter()
					.find(|(from, _)| *from == t)
					.map(|(_, to)| to.to_string())
			})
			.unwrap_or_else(|| "Material".to_string());

		let recycles_into = item
			.recycles_into
			.iter()
			.map(|(id, count)| {
				let name = id_to_name.get(id).cloned().unwrap_or_else(|| id.clone());
				(name, *count)
			})
			.collect();

		// Locally-maintained fields survive the merge.
		let local = by_name.remove(&item.name);

		merged.push(ItemRecord {
			name: item.name,
			category,
			rarity: item.rarity.unwrap_or_default(),
			value: item.value.unwrap_or_default(),
			recycles_into,
			workshop_uses: local.as_ref().map(|l| l.workshop_uses.clone()).unwrap_or_default(),
			project_uses: local.as_ref().map(|l| l.project_uses.clone()).unwrap_or_default(),
			quest_uses: local.as_ref().map(|l| l.quest_uses.clone()).unwrap_or_default(),
			quest_keep: local.as_ref().map(|l| l.quest_keep).unwrap_or_default(),
			recommendation: local.and_then(|l| l.recommendation),
		});
	}

	// Local-only items (not in the upstream dataset) are kept as-is.
	merged.extend(by_name.into_values());

	merged.sort_by(|a, b| a.name.cmp(&b.name));
	merged
}
