//! Recognition scan orchestration.
//!
//! One scan cycle converts the calibrated game-relative regions to screen
//! coordinates, captures them, and runs the recognition pipeline: icon
//! matching with a text fallback for the item region, text parsing for the
//! event region. A cycle that fails (window lost mid-cycle, capture error)
//! reports and aborts only itself; nothing carries over to the next cycle.

use anyhow::Result;
use data::{Catalog, GameEvent, MapDescriptor, MatchResult, Provenance};
use vision::{MatchMethod, OwnedImage, Vision};

use crate::config::Config;
use crate::window::WindowTracker;

/// Everything one scan produced. Rebuilt from scratch every cycle.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub item: Option<MatchResult>,
    pub events: Vec<GameEvent>,
    pub map: Option<String>,
}

impl ScanReport {
    /// One-line status for the log/status surface.
    pub fn status_line(&self) -> String {
        let item = match &self.item {
            Some(m) => match &m.item {
                Some(item) => format!("{} ({:.0}%)", item.name, m.confidence * 100.0),
                None => format!("no confident match (best {:.0}%)", m.confidence * 100.0),
            },
            None => "item scan off".to_string(),
        };

        let map = self.map.as_deref().unwrap_or("unknown map");
        format!("item: {item} | events: {} | {map}", self.events.len())
    }
}

/// Run one full scan cycle against the currently tracked window.
pub fn run_scan(
    vision: &Vision,
    catalog: &Catalog,
    maps: &[MapDescriptor],
    tracker: &WindowTracker,
    cfg: &Config,
) -> Result<ScanReport> {
    let mut report = ScanReport::default();

    if let Some(region) = cfg.item_region {
        let absolute = tracker.relative_to_screen(region)?;
        match crate::capture::capture_region(absolute) {
            Ok(image) => {
                report.item = Some(identify_item(vision, catalog, &image, cfg.icon_accept_threshold));
            }
            Err(err) => {
                tracing::warn!(error = %err, "item capture failed; skipping this cycle");
            }
        }
    }

    if let Some(region) = cfg.event_region {
        let absolute = tracker.relative_to_screen(region)?;
        match crate::capture::capture_region(absolute) {
            Ok(image) => {
                let (events, map) = read_events(vision, maps, &image);
                report.events = events;
                report.map = map.map(|m| m.name.clone());
            }
            Err(err) => {
                tracing::warn!(error = %err, "event capture failed; skipping this cycle");
            }
        }
    }

    Ok(report)
}

/// Identify the item in a captured icon region.
///
/// Icon matching first (both passes); when it stays below the threshold,
/// fall back to OCR and catalog resolution over the recognized text. A miss
/// still carries the best diagnostic confidence seen along the way.
pub fn identify_item(
    vision: &Vision,
    catalog: &Catalog,
    image: &OwnedImage,
    accept: f32,
) -> MatchResult {
    let icon = vision.icons.identify(image, accept);

    if let Some(name) = &icon.name {
        let provenance = match icon.method {
            Some(MatchMethod::Edge) => Provenance::Edge,
            _ => Provenance::Icon,
        };
        return MatchResult {
            item: catalog.resolve(name).cloned(),
            source: name.clone(),
            confidence: icon.score,
            provenance,
        };
    }

    let text = vision.read_text(image);
    if text.trim().is_empty() {
        return MatchResult::none(icon.best_candidate.unwrap_or_default(), icon.score);
    }

    let mut result = catalog.resolve_best(&text);
    if !result.is_match() && icon.score > result.confidence {
        // Keep the strongest diagnostic signal on a full miss.
        result.confidence = icon.score;
    }
    result
}

/// Parse the event region's text into events and a detected map.
pub fn read_events<'a>(
    vision: &Vision,
    maps: &'a [MapDescriptor],
    image: &OwnedImage,
) -> (Vec<GameEvent>, Option<&'a MapDescriptor>) {
    let text = vision.read_text(image);
    if text.trim().is_empty() {
        return (Vec::new(), None);
    }

    let events = data::parse(&text);
    let map = data::detect_map(&text, maps);
    (events, map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vision::IconLibrary;

    fn flat_image() -> OwnedImage {
        let bytes = vec![127u8; 64 * 64 * 4];
        OwnedImage::from_rgba(64, &bytes)
    }

    #[test]
    fn identify_with_no_recognizers_is_a_clean_miss() {
        let vision = Vision::new(IconLibrary::empty(), None);
        let catalog = Catalog::empty();

        let result = identify_item(&vision, &catalog, &flat_image(), 0.70);
        assert!(result.item.is_none());
        assert_eq!(result.provenance, Provenance::None);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn empty_event_capture_yields_no_events() {
        let vision = Vision::new(IconLibrary::empty(), None);
        let maps = data::default_maps();

        let (events, map) = read_events(&vision, &maps, &flat_image());
        assert!(events.is_empty());
        assert!(map.is_none());
    }

    #[test]
    fn status_line_reads_like_a_sentence() {
        let report = ScanReport {
            item: Some(MatchResult::none("garbled", 0.55)),
            events: Vec::new(),
            map: Some("Buried City".to_string()),
        };
        let line = report.status_line();
        assert!(line.contains("no confident match"));
        assert!(line.contains("55%"));
        assert!(line.contains("Buried City"));
    }
}
