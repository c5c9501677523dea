//! Map detection from recognized text.

use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::schema::MapRecord;

/// One known raid map plus the strings that betray it in OCR output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDescriptor {
	pub name: String,
	/// Reference to the bundled minimap image, when one ships with the app.
	pub file: Option<String>,
	pub aliases: Vec<String>,
}

impl From<MapRecord> for MapDescriptor {
	fn from(r: MapRecord) -> Self {
		Self {
			name: r.name,
			file: r.file,
			aliases: r.aliases,
		}
	}
}

/// Built-in descriptor set used when no `maps.json` is present.
pub fn default_maps() -> Vec<MapDescriptor> {
	let descriptor = |name: &str, file: &str, aliases: &[&str]| MapDescriptor {
		name: name.to_string(),
		file: Some(file.to_string()),
		aliases: aliases.iter().map(|s| s.to_string()).collect(),
	};

	vec![
		descriptor("Dam Battlegrounds", "dam_battlegrounds.png", &["dam", "battlegrounds"]),
		descriptor("Buried City", "buried_city.png", &["buried"]),
		descriptor("Spaceport", "spaceport.png", &["space port"]),
		descriptor("Blue Gate", "blue_gate.png", &["bluegate"]),
		descriptor("Stella Montis", "stella_montis.png", &["stella", "montis"]),
	]
}

pub fn load_maps(path: &Path) -> Result<Vec<MapDescriptor>> {
	let json = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
	let records: Vec<MapRecord> =
		serde_json::from_str(&json).with_context(|| format!("parse {}", path.display()))?;
	Ok(records.into_iter().map(MapDescriptor::from).collect())
}

/// Load the descriptor list, falling back to [`default_maps`] when the file
/// is missing or unreadable.
pub fn load_maps_or_default(path: &Path) -> Vec<MapDescriptor> {
	match load_maps(path) {
		Ok(maps) => maps,
		Err(err) => {
			tracing::warn!(error = %err, "failed to load map descriptors; using built-in set");
			default_maps()
		}
	}
}

/// Detect the active map in recognized text.
///
/// Rules are staged globally: every descriptor is tried for a canonical-name
/// substring first; only if none hits are aliases tried, and only then the
/// all-words rule. Within a stage, configuration order wins. (Staging
/// globally keeps a later map's exact name from losing to an earlier map's
/// loose alias.)
pub fn detect_map<'a>(text: &str, maps: &'a [MapDescriptor]) -> Option<&'a MapDescriptor> {
	let haystack = text.to_lowercase();
	if haystack.trim().is_empty() {
		return None;
	}

	if let Some(map) = maps
		.iter()
		.find(|m| haystack.contains(&m.name.to_lowercase()))
	{
		return Some(map);
	}

	if let Some(map) = maps.iter().find(|m| {
		m.aliases
			.iter()
			.any(|alias| haystack.contains(&alias.to_lowercase()))
	}) {
		return Some(map);
	}

	maps.iter().find(|m| {
		!m.name.is_empty()
			&& m.name
				.split_whitespace()
				.all(|word| haystack.contains(&word.to_lowercase()))
	})
}
