//! Screen capture.
//!
//! The capture backend (`xcap`) grabs whole monitors; region captures are
//! cropped out of the owning monitor's frame. All rectangles here are
//! absolute virtual-desktop coordinates.

use anyhow::{bail, Context, Result};

use crate::geometry::{ScreenPoint, ScreenRegion};

fn monitor_bounds(monitor: &xcap::Monitor) -> Result<ScreenRegion> {
	Ok(ScreenRegion::new(
		monitor.x().context("monitor x")?,
		monitor.y().context("monitor y")?,
		monitor.width().context("monitor width")? as i32,
		monitor.height().context("monitor height")? as i32,
	))
}

/// The monitor owning a point, together with its bounds.
fn monitor_at(x: i32, y: i32) -> Result<(xcap::Monitor, ScreenRegion)> {
	let monitors = xcap::Monitor::all().context("enumerate monitors")?;
	for monitor in monitors {
		let bounds = monitor_bounds(&monitor)?;
		if bounds.contains_point(x, y) {
			return Ok((monitor, bounds));
		}
	}
	bail!("no monitor owns point ({x}, {y})");
}

/// Capture an absolute screen rectangle.
///
/// The region must have positive dimensions and at least partially overlap
/// the monitor owning its origin; the returned image covers the overlap.
pub fn capture_region(region: ScreenRegion) -> Result<vision::OwnedImage> {
	if !region.is_valid() {
		bail!(
			"invalid capture region {}x{} (dimensions must be positive)",
			region.width,
			region.height
		);
	}

	let (monitor, bounds) = monitor_at(region.x, region.y)?;
	let clipped = region
		.intersect(&bounds)
		.context("capture region does not overlap its monitor")?;

	let frame = monitor.capture_image().context("capture monitor frame")?;
	let width = frame.width() as usize;
	let image = vision::OwnedImage::from_rgba(width, frame.into_raw().as_slice());

	// Monitor-local crop.
	let local = clipped.translated(-bounds.x, -bounds.y);
	Ok(image.crop(
		local.x as u32,
		local.y as u32,
		local.width as u32,
		local.height as u32,
	))
}

/// Capture a `width` x `height` rectangle centered on `center` plus
/// `offset`, clamped into the owning monitor.
pub fn capture_centered(
	center: ScreenPoint,
	width: u32,
	height: u32,
	offset: (i32, i32),
) -> Result<vision::OwnedImage> {
	if width == 0 || height == 0 {
		bail!("invalid capture size {width}x{height} (dimensions must be positive)");
	}

	let cx = center.x + offset.0;
	let cy = center.y + offset.1;
	let (_, bounds) = monitor_at(cx, cy)?;

	let w = width as i32;
	let h = height as i32;
	let x = (cx - w / 2)
		.clamp(bounds.x, (bounds.right() - w).max(bounds.x));
	let y = (cy - h / 2)
		.clamp(bounds.y, (bounds.bottom() - h).max(bounds.y));

	capture_region(ScreenRegion::new(x, y, w, h))
}
