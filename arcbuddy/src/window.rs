//! Game window tracking and coordinate conversion.
//!
//! The tracker polls the set of top-level windows, picks the game window by a
//! layered strategy, and publishes its geometry as one immutable snapshot.
//! Consumers convert calibrated game-relative regions to absolute screen
//! coordinates through the tracker; conversion while no window is tracked is
//! an explicit error, never a silent zero-offset.

use anyhow::{bail, Context, Result};

use crate::geometry::ScreenRegion;

const BASE_DPI: f32 = 96.0;

/// Snapshot of the tracked window. Replaced wholesale on every detection
/// poll; never mutated field-by-field.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub id: u32,
    pub title: String,
    pub app_name: String,
    pub bounds: ScreenRegion,
    pub monitor_bounds: ScreenRegion,
    /// Monitor area excluding shell chrome. The capture backend exposes no
    /// shell metrics, so this currently equals `monitor_bounds`.
    pub work_area: ScreenRegion,
    pub scale_factor: f32,
    pub dpi_x: f32,
    pub dpi_y: f32,
}

impl WindowInfo {
    pub fn scaled(id: u32, title: &str, app_name: &str, bounds: ScreenRegion, monitor_bounds: ScreenRegion, scale_factor: f32) -> Self {
        Self {
            id,
            title: title.to_string(),
            app_name: app_name.to_string(),
            bounds,
            monitor_bounds,
            work_area: monitor_bounds,
            scale_factor,
            dpi_x: BASE_DPI * scale_factor,
            dpi_y: BASE_DPI * scale_factor,
        }
    }
}

#[derive(Debug, Clone)]
pub enum WindowEvent {
    Appeared(WindowInfo),
    Changed(WindowInfo),
    Lost,
}

/// Iterator abstraction over the current top-level windows, so detection
/// logic stays platform-free and testable.
pub trait WindowProvider {
    fn windows(&self) -> Result<Vec<WindowInfo>>;
}

/// Production provider backed by `xcap`.
pub struct XcapProvider;

impl WindowProvider for XcapProvider {
    fn windows(&self) -> Result<Vec<WindowInfo>> {
        let windows = xcap::Window::all().context("enumerate windows")?;

        let mut out = Vec::with_capacity(windows.len());
        for window in windows {
            // Skip windows we cannot fully describe rather than failing the poll.
            let Ok(id) = window.id() else { continue };
            let title = window.title().unwrap_or_default();
            let app_name = window.app_name().unwrap_or_default();

            let (Ok(x), Ok(y), Ok(w), Ok(h)) = (window.x(), window.y(), window.width(), window.height()) else {
                continue;
            };
            let bounds = ScreenRegion::new(x, y, w as i32, h as i32);

            let (monitor_bounds, scale_factor) = match window.current_monitor() {
                Ok(monitor) => {
                    let bounds = ScreenRegion::new(
                        monitor.x().unwrap_or(0),
                        monitor.y().unwrap_or(0),
                        monitor.width().unwrap_or(0) as i32,
                        monitor.height().unwrap_or(0) as i32,
                    );
                    (bounds, monitor.scale_factor().unwrap_or(1.0))
                }
                Err(_) => (bounds, 1.0),
            };

            out.push(WindowInfo::scaled(id, &title, &app_name, bounds, monitor_bounds, scale_factor));
        }
        Ok(out)
    }
}

/// Finds and follows the game window.
pub struct WindowTracker {
    titles: Vec<String>,
    app_names: Vec<String>,
    current: Option<WindowInfo>,
}

impl WindowTracker {
    pub fn new(titles: Vec<String>, app_names: Vec<String>) -> Self {
        Self {
            titles,
            app_names,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&WindowInfo> {
        self.current.as_ref()
    }

    /// One detection poll. Returns the transition event, if any.
    ///
    /// A failed enumeration counts as "no window found": if we were tracking
    /// one, that is a loss, exactly as if the window had closed.
    pub fn detect(&mut self, provider: &dyn WindowProvider) -> Option<WindowEvent> {
        let windows = match provider.windows() {
            Ok(windows) => windows,
            Err(err) => {
                tracing::warn!(error = %err, "window enumeration failed");
                Vec::new()
            }
        };

        let found = self.select(&windows);
        let tracked_id = self.current.as_ref().map(|w| w.id);

        match (tracked_id, found) {
            (None, Some(new)) => {
                let event = WindowEvent::Appeared(new.clone());
                self.current = Some(new);
                Some(event)
            }
            (Some(old_id), Some(new)) if old_id != new.id => {
                let event = WindowEvent::Changed(new.clone());
                self.current = Some(new);
                Some(event)
            }
            (Some(_), Some(new)) => {
                // Same handle; republish the fresh geometry silently.
                self.current = Some(new);
                None
            }
            (Some(_), None) => {
                self.current = None;
                Some(WindowEvent::Lost)
            }
            (None, None) => None,
        }
    }

    /// Layered selection, first stage with a hit wins:
    /// 1. exact title match,
    /// 2. known process/app name,
    /// 3. case-insensitive substring title match.
    fn select(&self, windows: &[WindowInfo]) -> Option<WindowInfo> {
        if let Some(w) = windows
            .iter()
            .find(|w| self.titles.iter().any(|t| w.title == *t))
        {
            return Some(w.clone());
        }

        if let Some(w) = windows.iter().find(|w| {
            self.app_names
                .iter()
                .any(|name| w.app_name.eq_ignore_ascii_case(name))
        }) {
            return Some(w.clone());
        }

        windows
            .iter()
            .find(|w| {
                let title = w.title.to_lowercase();
                !title.is_empty() && self.titles.iter().any(|t| title.contains(&t.to_lowercase()))
            })
            .cloned()
    }

    /// Convert a game-relative region to absolute screen coordinates.
    pub fn relative_to_screen(&self, region: ScreenRegion) -> Result<ScreenRegion> {
        let Some(window) = &self.current else {
            bail!("cannot convert game-relative region: no game window is tracked");
        };
        Ok(region.translated(window.bounds.x, window.bounds.y))
    }

    /// Symmetric inverse of [`relative_to_screen`].
    ///
    /// [`relative_to_screen`]: WindowTracker::relative_to_screen
    pub fn screen_to_relative(&self, region: ScreenRegion) -> Result<ScreenRegion> {
        let Some(window) = &self.current else {
            bail!("cannot convert screen region: no game window is tracked");
        };
        Ok(region.translated(-window.bounds.x, -window.bounds.y))
    }

    /// Where an overlay panel should sit: the window origin plus the given
    /// offsets, clamped into the window's monitor.
    pub fn recommended_overlay_position(&self, offset_x: i32, offset_y: i32) -> Option<(i32, i32)> {
        let window = self.current.as_ref()?;
        let monitor = &window.monitor_bounds;

        let x = (window.bounds.x + offset_x).clamp(monitor.x, monitor.right() - 1);
        let y = (window.bounds.y + offset_y).clamp(monitor.y, monitor.bottom() - 1);
        Some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider(Vec<WindowInfo>);

    impl WindowProvider for FakeProvider {
        fn windows(&self) -> Result<Vec<WindowInfo>> {
            Ok(self.0.clone())
        }
    }

    fn window(id: u32, title: &str, app_name: &str, x: i32, y: i32) -> WindowInfo {
        WindowInfo::scaled(
            id,
            title,
            app_name,
            ScreenRegion::new(x, y, 1920, 1080),
            ScreenRegion::new(0, 0, 2560, 1440),
            1.0,
        )
    }

    fn tracker() -> WindowTracker {
        WindowTracker::new(
            vec!["ARC Raiders".to_string()],
            vec!["PioneerClient-Win64-Shipping".to_string()],
        )
    }

    #[test]
    fn exact_title_beats_process_match() {
        let mut t = tracker();
        let provider = FakeProvider(vec![
            window(1, "editor", "PioneerClient-Win64-Shipping", 0, 0),
            window(2, "ARC Raiders", "someapp", 100, 100),
        ]);

        t.detect(&provider);
        assert_eq!(t.current().unwrap().id, 2);
    }

    #[test]
    fn process_match_beats_substring_title() {
        let mut t = tracker();
        let provider = FakeProvider(vec![
            window(1, "arc raiders wiki - browser", "browser", 0, 0),
            window(2, "some window", "pioneerclient-win64-shipping", 100, 100),
        ]);

        t.detect(&provider);
        assert_eq!(t.current().unwrap().id, 2);
    }

    #[test]
    fn substring_title_is_the_last_resort() {
        let mut t = tracker();
        let provider = FakeProvider(vec![
            window(7, "unrelated", "other", 0, 0),
            window(9, "my arc raiders session", "whatever", 0, 0),
        ]);

        t.detect(&provider);
        assert_eq!(t.current().unwrap().id, 9);
    }

    #[test]
    fn emits_appeared_changed_and_lost() {
        let mut t = tracker();

        let event = t.detect(&FakeProvider(vec![window(1, "ARC Raiders", "a", 0, 0)]));
        assert!(matches!(event, Some(WindowEvent::Appeared(_))));

        // Same handle, moved: geometry refreshes without an event.
        let event = t.detect(&FakeProvider(vec![window(1, "ARC Raiders", "a", 50, 50)]));
        assert!(event.is_none());
        assert_eq!(t.current().unwrap().bounds.x, 50);

        let event = t.detect(&FakeProvider(vec![window(2, "ARC Raiders", "a", 0, 0)]));
        assert!(matches!(event, Some(WindowEvent::Changed(_))));

        let event = t.detect(&FakeProvider(vec![]));
        assert!(matches!(event, Some(WindowEvent::Lost)));
        assert!(t.current().is_none());

        let event = t.detect(&FakeProvider(vec![]));
        assert!(event.is_none());
    }

    #[test]
    fn conversions_roundtrip_for_any_origin() {
        let mut t = tracker();
        // Window on a monitor left of the primary (negative origin).
        t.detect(&FakeProvider(vec![window(1, "ARC Raiders", "a", -1920, -200)]));

        let relative = ScreenRegion::new(140, 900, 260, 48);
        let absolute = t.relative_to_screen(relative).unwrap();
        assert_eq!(absolute, ScreenRegion::new(-1780, 700, 260, 48));
        assert_eq!(t.screen_to_relative(absolute).unwrap(), relative);
    }

    #[test]
    fn conversion_without_window_is_an_explicit_error() {
        let t = tracker();
        let region = ScreenRegion::new(0, 0, 10, 10);
        assert!(t.relative_to_screen(region).is_err());
        assert!(t.screen_to_relative(region).is_err());
        assert!(t.recommended_overlay_position(0, 0).is_none());
    }

    #[test]
    fn overlay_position_clamps_to_monitor() {
        let mut t = tracker();
        t.detect(&FakeProvider(vec![window(1, "ARC Raiders", "a", 2000, 1000)]));

        let (x, y) = t.recommended_overlay_position(5000, 5000).unwrap();
        assert_eq!((x, y), (2559, 1439));
    }
}
