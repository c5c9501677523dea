//! Asset discovery.
//!
//! Finds the `assets/` folder whether the app runs from the repo
//! (`cargo run`) or as a packaged binary (assets next to the executable).
//! Discovery can be overridden with `ARCBUDDY_ASSETS_DIR`.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AssetPaths {
	pub items_file: PathBuf,
	pub maps_file: PathBuf,
	pub icons_dir: PathBuf,
	pub icon_names_file: PathBuf,
	pub ocr_detection: PathBuf,
	pub ocr_recognition: PathBuf,
	pub ocr_charset: PathBuf,
}

impl AssetPaths {
	fn under(base: PathBuf) -> Self {
		Self {
			items_file: base.join("items.json"),
			maps_file: base.join("maps.json"),
			icons_dir: base.join("icons"),
			icon_names_file: base.join("icons/names.json"),
			ocr_detection: base.join("ocr/detection.mnn"),
			ocr_recognition: base.join("ocr/latin_recognition.mnn"),
			ocr_charset: base.join("ocr/latin_charset.txt"),
		}
	}
}

fn looks_like_assets_dir(dir: &PathBuf) -> bool {
	dir.join("items.json").is_file() || dir.join("icons").is_dir()
}

/// Resolve asset paths from the first plausible candidate directory.
///
/// Falls back to `./assets` when nothing is found; every consumer degrades
/// on its own missing file, so a bad guess only costs log warnings.
pub fn resolve() -> AssetPaths {
	let mut candidates: Vec<PathBuf> = Vec::new();

	if let Some(dir) = std::env::var_os("ARCBUDDY_ASSETS_DIR") {
		candidates.push(PathBuf::from(dir));
	}
	if let Ok(exe) = std::env::current_exe()
		&& let Some(dir) = exe.parent()
	{
		candidates.push(dir.join("assets"));
	}
	if let Ok(cwd) = std::env::current_dir() {
		candidates.push(cwd.join("assets"));
	}
	// Compile-time path to the workspace root, for `cargo run` from anywhere.
	#[cfg(debug_assertions)]
	candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../assets"));

	for candidate in &candidates {
		if looks_like_assets_dir(candidate) {
			return AssetPaths::under(candidate.clone());
		}
	}

	tracing::warn!(
		tried = ?candidates,
		"no assets directory found; recognition features will be disabled"
	);
	AssetPaths::under(PathBuf::from("assets"))
}
