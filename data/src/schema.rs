//! On-disk record shapes.
//!
//! Field names mirror the community dataset JSON (camelCase), so these
//! structs stay deserialization-only; the rest of the crate works with the
//! converted domain types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One record in `items.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
	pub name: String,
	#[serde(default)]
	pub category: String,
	#[serde(default)]
	pub rarity: String,
	#[serde(default)]
	pub value: u32,
	/// Output item name -> quantity produced when recycling one unit.
	#[serde(default)]
	pub recycles_into: HashMap<String, u32>,
	#[serde(default)]
	pub workshop_uses: Vec<String>,
	#[serde(default)]
	pub project_uses: Vec<String>,
	#[serde(default)]
	pub quest_uses: Vec<String>,
	#[serde(default)]
	pub quest_keep: bool,
	#[serde(default)]
	pub recommendation: Option<String>,
}

/// One record in `maps.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapRecord {
	pub name: String,
	#[serde(default)]
	pub file: Option<String>,
	#[serde(default)]
	pub aliases: Vec<String>,
}
