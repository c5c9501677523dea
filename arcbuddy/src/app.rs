//! Application loop.
//!
//! Two cadences drive everything: a window-detection poll and a recognition
//! scan. Both run inline on this thread, so at most one cycle of each kind
//! is ever in flight and a slow scan simply delays the next one.

use std::time::{Duration, Instant};

use anyhow::Result;
use data::{Catalog, MapDescriptor};
use vision::{IconLibrary, Ocr, Vision};

use crate::config::Config;
use crate::poll::Cadence;
use crate::scanner;
use crate::window::{WindowEvent, WindowTracker, XcapProvider};

/// Shortest sleep between loop turns; keeps poke latency low without
/// busy-waiting.
const MIN_SLEEP: Duration = Duration::from_millis(50);

pub fn run(cfg: Config) -> Result<()> {
    let assets = crate::assets::resolve();

    let icons = match IconLibrary::load(&assets.icons_dir, Some(assets.icon_names_file.as_path())) {
        Ok(icons) => {
            tracing::info!(count = icons.len(), "icon templates loaded");
            icons
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load icon templates; icon matching disabled");
            IconLibrary::empty()
        }
    };

    let ocr = match Ocr::try_new(&assets.ocr_detection, &assets.ocr_recognition, &assets.ocr_charset) {
        Ok(ocr) => Some(ocr),
        Err(err) => {
            tracing::warn!(error = %err, "failed to initialize OCR; text fallback disabled");
            None
        }
    };

    let vision = Vision::new(icons, ocr);
    let catalog = Catalog::load_or_empty(&assets.items_file);
    tracing::info!(items = catalog.len(), "item catalog loaded");
    let maps: Vec<MapDescriptor> = data::load_maps_or_default(&assets.maps_file);

    let mut tracker = WindowTracker::new(cfg.window_titles.clone(), cfg.app_names.clone());
    let provider = XcapProvider;

    let now = Instant::now();
    let mut detect = Cadence::new(Duration::from_secs_f32(cfg.detect_interval_s.max(0.5)), now);
    let mut scan = Cadence::new(Duration::from_secs_f32(cfg.scan_interval_s.max(0.5)), now);

    loop {
        let now = Instant::now();

        if detect.due(now) {
            match tracker.detect(&provider) {
                Some(WindowEvent::Appeared(info)) => {
                    tracing::info!(title = %info.title, bounds = ?info.bounds, scale = info.scale_factor, "game window found");
                    // Scan right away instead of waiting out the interval.
                    scan.poke(now);
                }
                Some(WindowEvent::Changed(info)) => {
                    tracing::info!(title = %info.title, bounds = ?info.bounds, "game window changed");
                }
                Some(WindowEvent::Lost) => {
                    tracing::info!("game window lost");
                }
                None => {}
            }
        }

        if scan.due(now) {
            if tracker.current().is_some() {
                match scanner::run_scan(&vision, &catalog, &maps, &tracker, &cfg) {
                    Ok(report) => tracing::info!("{}", report.status_line()),
                    Err(err) => tracing::warn!(error = %err, "scan cycle aborted"),
                }
            } else {
                tracing::debug!("scan skipped; no game window");
            }
        }

        let next = detect.next_due().min(scan.next_due());
        let sleep = next.saturating_duration_since(Instant::now()).max(MIN_SLEEP);
        std::thread::sleep(sleep);
    }
}
