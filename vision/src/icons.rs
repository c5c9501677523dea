//! Icon template matching.
//!
//! Identification runs in two passes over the whole template library:
//! a normalized cross-correlation pass on grayscale pixels, then (when that
//! stays below the acceptance threshold) the same correlation on edge maps.
//! Edge maps compare shape instead of color, which survives the varying
//! backdrops items are rendered on in-game.
//!
//! The matcher never fails a whole scan because of one bad template; corrupt
//! files are skipped at load time and size mismatches are skipped per compare.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use image::GrayImage;

use crate::image::OwnedImage;

/// All templates and captures are compared at this fixed square size.
pub const CANONICAL_SIZE: u32 = 64;

/// Minimum similarity for an icon match to be accepted.
///
/// Applied to both the color pass and the edge pass.
pub const DEFAULT_ACCEPT_THRESHOLD: f32 = 0.70;

/// Stride of the coarse pass when searching a larger capture.
const SEARCH_STRIDE: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    /// Grayscale correlation against the template pixels.
    Template,
    /// Correlation against precomputed edge maps.
    Edge,
}

/// Outcome of one identification attempt.
///
/// `name` is only set when the score cleared the acceptance threshold;
/// `best_candidate` and `score` are always reported so callers can decide
/// whether to fall back to text recognition.
#[derive(Debug, Clone)]
pub struct IconMatch {
    pub name: Option<String>,
    pub best_candidate: Option<String>,
    pub score: f32,
    pub method: Option<MatchMethod>,
}

impl IconMatch {
    fn miss(best_candidate: Option<String>, score: f32, method: Option<MatchMethod>) -> Self {
        Self {
            name: None,
            best_candidate,
            score,
            method,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.name.is_some()
    }
}

struct IconTemplate {
    name: String,
    gray: Vec<u8>,
    edges: Vec<u8>,
}

/// Immutable set of canonical icon images, loaded once at startup.
pub struct IconLibrary {
    templates: Vec<IconTemplate>,
}

impl IconLibrary {
    pub fn empty() -> Self {
        Self { templates: Vec::new() }
    }

    /// Load every decodable image in `dir`.
    ///
    /// Template identity comes from `mapping` (a JSON file of
    /// `file-stem -> display name`) when present, else from the file stem.
    /// Files that fail to decode are logged and skipped.
    pub fn load(dir: &Path, mapping: Option<&Path>) -> Result<Self> {
        let names = match mapping {
            Some(path) if path.is_file() => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("read icon name mapping {}", path.display()))?;
                serde_json::from_str::<HashMap<String, String>>(&json)
                    .with_context(|| format!("parse icon name mapping {}", path.display()))?
            }
            _ => HashMap::new(),
        };

        let mut templates = Vec::new();
        let entries = fs::read_dir(dir).with_context(|| format!("read icon dir {}", dir.display()))?;

        for entry in entries {
            let entry = entry.context("read icon dir entry")?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = names.get(stem).cloned().unwrap_or_else(|| stem.to_string());

            match template_from_file(&path, name) {
                Ok(template) => templates.push(template),
                Err(err) => {
                    tracing::warn!(file = %path.display(), error = %err, "skipping unreadable icon template");
                }
            }
        }

        // File-system enumeration order varies by platform; sort so ties in
        // maximum-score selection resolve the same way on every machine.
        templates.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self { templates })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Identify the item shown in `captured`, which is expected to contain
    /// just the icon (the capture region is calibrated to the slot).
    pub fn identify(&self, captured: &OwnedImage, accept: f32) -> IconMatch {
        if self.templates.is_empty() {
            return IconMatch::miss(None, 0.0, None);
        }

        let canonical = captured
            .clone()
            .resized_exact(CANONICAL_SIZE, CANONICAL_SIZE);
        let gray = canonical.to_gray_image();
        let gray_pixels = gray.as_raw().as_slice();

        let (color_idx, color_score) = self.best_by(|t| ncc_score(gray_pixels, &t.gray));
        if color_score >= accept {
            return IconMatch {
                name: Some(self.templates[color_idx].name.clone()),
                best_candidate: Some(self.templates[color_idx].name.clone()),
                score: color_score,
                method: Some(MatchMethod::Template),
            };
        }

        let edges = edge_map(&gray);
        let edge_pixels = edges.as_raw().as_slice();

        let (edge_idx, edge_score) = self.best_by(|t| ncc_score(edge_pixels, &t.edges));
        if edge_score >= accept {
            return IconMatch {
                name: Some(self.templates[edge_idx].name.clone()),
                best_candidate: Some(self.templates[edge_idx].name.clone()),
                score: edge_score,
                method: Some(MatchMethod::Edge),
            };
        }

        // No confident match; report the best score so the caller can fall
        // back to text recognition with a diagnostic confidence attached.
        if color_score >= edge_score {
            IconMatch::miss(
                Some(self.templates[color_idx].name.clone()),
                color_score,
                Some(MatchMethod::Template),
            )
        } else {
            IconMatch::miss(
                Some(self.templates[edge_idx].name.clone()),
                edge_score,
                Some(MatchMethod::Edge),
            )
        }
    }

    /// Same comparison as [`identify`], but the capture may be larger than a
    /// template: a sliding window searches for the best-matching
    /// sub-rectangle and its top-left position is returned alongside.
    ///
    /// [`identify`]: IconLibrary::identify
    pub fn identify_in_region(&self, captured: &OwnedImage, accept: f32) -> (IconMatch, Option<(u32, u32)>) {
        if self.templates.is_empty() {
            return (IconMatch::miss(None, 0.0, None), None);
        }
        if captured.width() < CANONICAL_SIZE || captured.height() < CANONICAL_SIZE {
            return (self.identify(captured, accept), None);
        }

        let gray = captured.to_gray_image();
        let Some((idx, score, x, y)) = self.best_window(&gray, |t| t.gray.as_slice()) else {
            return (self.identify(captured, accept), None);
        };

        if score >= accept {
            let m = IconMatch {
                name: Some(self.templates[idx].name.clone()),
                best_candidate: Some(self.templates[idx].name.clone()),
                score,
                method: Some(MatchMethod::Template),
            };
            return (m, Some((x, y)));
        }

        // Edge pass over the full capture plane.
        let edges = edge_map(&gray);
        if let Some((eidx, escore, ex, ey)) = self.best_window(&edges, |t| t.edges.as_slice()) {
            if escore >= accept {
                let m = IconMatch {
                    name: Some(self.templates[eidx].name.clone()),
                    best_candidate: Some(self.templates[eidx].name.clone()),
                    score: escore,
                    method: Some(MatchMethod::Edge),
                };
                return (m, Some((ex, ey)));
            }
            if escore > score {
                let m = IconMatch::miss(
                    Some(self.templates[eidx].name.clone()),
                    escore,
                    Some(MatchMethod::Edge),
                );
                return (m, Some((ex, ey)));
            }
        }

        let m = IconMatch::miss(
            Some(self.templates[idx].name.clone()),
            score,
            Some(MatchMethod::Template),
        );
        (m, Some((x, y)))
    }

    /// Best `(template index, score)` over the whole library.
    ///
    /// A comparison that cannot be computed (size mismatch, empty plane)
    /// yields `None` and is skipped, never aborting the scan.
    fn best_by(&self, score: impl Fn(&IconTemplate) -> Option<f32>) -> (usize, f32) {
        let mut best = (0usize, 0.0f32);
        for (i, template) in self.templates.iter().enumerate() {
            let Some(s) = score(template) else {
                continue;
            };
            if s > best.1 {
                best = (i, s);
            }
        }
        best
    }

    /// Coarse-then-refined sliding-window search over `plane`.
    fn best_window<'a>(
        &'a self,
        plane: &GrayImage,
        pick: impl Fn(&'a IconTemplate) -> &'a [u8],
    ) -> Option<(usize, f32, u32, u32)> {
        let (w, h) = plane.dimensions();
        if w < CANONICAL_SIZE || h < CANONICAL_SIZE {
            return None;
        }

        let max_x = w - CANONICAL_SIZE;
        let max_y = h - CANONICAL_SIZE;

        let mut best: Option<(usize, f32, u32, u32)> = None;
        let mut window = vec![0u8; (CANONICAL_SIZE * CANONICAL_SIZE) as usize];

        let mut y = 0;
        loop {
            let mut x = 0;
            loop {
                extract_window(plane, x, y, &mut window);
                for (i, template) in self.templates.iter().enumerate() {
                    if let Some(s) = ncc_score(&window, pick(template)) {
                        if best.is_none_or(|(_, bs, _, _)| s > bs) {
                            best = Some((i, s, x, y));
                        }
                    }
                }

                if x == max_x {
                    break;
                }
                x = (x + SEARCH_STRIDE).min(max_x);
            }
            if y == max_y {
                break;
            }
            y = (y + SEARCH_STRIDE).min(max_y);
        }

        // Refine around the coarse winner, single template, stride 1.
        let (idx, _, cx, cy) = best?;
        let template = &self.templates[idx];
        let rx1 = cx.saturating_sub(SEARCH_STRIDE - 1);
        let ry1 = cy.saturating_sub(SEARCH_STRIDE - 1);
        let rx2 = (cx + SEARCH_STRIDE - 1).min(max_x);
        let ry2 = (cy + SEARCH_STRIDE - 1).min(max_y);

        for y in ry1..=ry2 {
            for x in rx1..=rx2 {
                extract_window(plane, x, y, &mut window);
                if let Some(s) = ncc_score(&window, pick(template)) {
                    if best.is_none_or(|(_, bs, _, _)| s > bs) {
                        best = Some((idx, s, x, y));
                    }
                }
            }
        }

        best
    }
}

fn template_from_file(path: &Path, name: String) -> Result<IconTemplate> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let canonical = OwnedImage::from_png_bytes(&bytes)?.resized_exact(CANONICAL_SIZE, CANONICAL_SIZE);
    let gray = canonical.to_gray_image();
    let edges = edge_map(&gray);

    Ok(IconTemplate {
        name,
        gray: gray.into_raw(),
        edges: edges.into_raw(),
    })
}

/// Binary edge map: histogram equalization, gradient magnitude, Otsu
/// threshold. Border pixels stay zero.
fn edge_map(gray: &GrayImage) -> GrayImage {
    use imageproc::contrast::{equalize_histogram, otsu_level, threshold, ThresholdType};

    let eq = equalize_histogram(gray);
    let (w, h) = eq.dimensions();

    let mut gradient = GrayImage::new(w, h);
    if w >= 3 && h >= 3 {
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let gx = eq.get_pixel(x + 1, y).0[0] as i32 - eq.get_pixel(x - 1, y).0[0] as i32;
                let gy = eq.get_pixel(x, y + 1).0[0] as i32 - eq.get_pixel(x, y - 1).0[0] as i32;
                let mag = ((gx.abs() + gy.abs()) / 2).min(255) as u8;
                gradient.put_pixel(x, y, image::Luma([mag]));
            }
        }
    }

    let level = otsu_level(&gradient);
    threshold(&gradient, level, ThresholdType::Binary)
}

fn extract_window(plane: &GrayImage, x: u32, y: u32, out: &mut [u8]) {
    let raw = plane.as_raw();
    let stride = plane.width() as usize;
    for row in 0..CANONICAL_SIZE as usize {
        let src = (y as usize + row) * stride + x as usize;
        let dst = row * CANONICAL_SIZE as usize;
        out[dst..dst + CANONICAL_SIZE as usize]
            .copy_from_slice(&raw[src..src + CANONICAL_SIZE as usize]);
    }
}

/// Zero-mean normalized cross-correlation, clamped into `[0, 1]`.
///
/// Subtracting the per-image mean makes the score invariant to a uniform
/// brightness offset; two flat images therefore compare as identical
/// regardless of their absolute level. Negative correlation (inverted
/// structure) is clamped to 0.
fn ncc_score(a: &[u8], b: &[u8]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let n = a.len() as f64;
    let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut num = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        num += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 && var_b == 0.0 {
        return Some(1.0);
    }
    if var_a == 0.0 || var_b == 0.0 {
        return Some(0.0);
    }

    Some(((num / (var_a.sqrt() * var_b.sqrt())) as f32).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> OwnedImage {
        let mut bytes = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = f(x, y);
                bytes.extend_from_slice(&[v, v, v, 255]);
            }
        }
        OwnedImage::from_rgba(width as usize, &bytes)
    }

    fn checker(x: u32, y: u32) -> u8 {
        if (x / 8 + y / 8) % 2 == 0 { 230 } else { 20 }
    }

    fn stripes(x: u32, _y: u32) -> u8 {
        if (x / 4) % 2 == 0 { 240 } else { 10 }
    }

    fn library_of(images: &[(&str, &OwnedImage)]) -> IconLibrary {
        let templates = images
            .iter()
            .map(|(name, img)| {
                let canonical = (*img).clone().resized_exact(CANONICAL_SIZE, CANONICAL_SIZE);
                let gray = canonical.to_gray_image();
                let edges = edge_map(&gray);
                IconTemplate {
                    name: name.to_string(),
                    gray: gray.into_raw(),
                    edges: edges.into_raw(),
                }
            })
            .collect();
        IconLibrary { templates }
    }

    #[test]
    fn ncc_is_reflexive() {
        let img = synthetic(64, 64, checker).to_gray_image();
        let s = ncc_score(img.as_raw(), img.as_raw()).unwrap();
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ncc_is_symmetric() {
        let a = synthetic(64, 64, checker).to_gray_image();
        let b = synthetic(64, 64, stripes).to_gray_image();
        let ab = ncc_score(a.as_raw(), b.as_raw()).unwrap();
        let ba = ncc_score(b.as_raw(), a.as_raw()).unwrap();
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn ncc_ignores_brightness_offset() {
        // Two flat images at different levels differ only by a brightness
        // offset, which the zero-mean correlation is invariant to.
        let dark = synthetic(64, 64, |_, _| 40).to_gray_image();
        let light = synthetic(64, 64, |_, _| 200).to_gray_image();
        assert_eq!(ncc_score(dark.as_raw(), light.as_raw()), Some(1.0));
    }

    #[test]
    fn ncc_rejects_mismatched_sizes() {
        let a = synthetic(64, 64, checker).to_gray_image();
        let b = synthetic(32, 32, checker).to_gray_image();
        assert_eq!(ncc_score(a.as_raw(), b.as_raw()), None);
    }

    #[test]
    fn identify_accepts_identical_capture() {
        let icon = synthetic(64, 64, checker);
        let lib = library_of(&[("Scrap Metal", &icon)]);

        let result = lib.identify(&icon, DEFAULT_ACCEPT_THRESHOLD);
        assert_eq!(result.name.as_deref(), Some("Scrap Metal"));
        assert!(result.score > 0.99);
        assert_eq!(result.method, Some(MatchMethod::Template));
    }

    #[test]
    fn identify_below_threshold_reports_score_not_panic() {
        let template = synthetic(64, 64, stripes);
        // Same stripes rotated 90 degrees: the patterns are separable in
        // opposite axes, so both passes correlate to exactly zero.
        let unrelated = synthetic(64, 64, |x, y| stripes(y, x));
        let lib = library_of(&[("Wire Spool", &template)]);

        let result = lib.identify(&unrelated, DEFAULT_ACCEPT_THRESHOLD);
        assert!(result.name.is_none());
        assert!(result.score < DEFAULT_ACCEPT_THRESHOLD);
        assert!(result.score >= 0.0);
        assert_eq!(result.best_candidate.as_deref(), Some("Wire Spool"));
    }

    #[test]
    fn identify_with_empty_library_is_a_miss() {
        let lib = IconLibrary::empty();
        let result = lib.identify(&synthetic(64, 64, checker), DEFAULT_ACCEPT_THRESHOLD);
        assert!(result.name.is_none());
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn identify_in_region_locates_embedded_icon() {
        let icon = synthetic(64, 64, checker);

        // Flat backdrop with the icon pasted at (32, 48).
        let composite = synthetic(160, 160, |x, y| {
            if (32..96).contains(&x) && (48..112).contains(&y) {
                checker(x - 32, y - 48)
            } else {
                128
            }
        });

        let lib = library_of(&[("Battery Pack", &icon)]);
        let (result, location) = lib.identify_in_region(&composite, DEFAULT_ACCEPT_THRESHOLD);

        assert_eq!(result.name.as_deref(), Some("Battery Pack"));
        let (x, y) = location.expect("location");
        assert!(x.abs_diff(32) <= 2, "x = {x}");
        assert!(y.abs_diff(48) <= 2, "y = {y}");
    }

    #[test]
    fn load_skips_corrupt_templates() {
        let dir = tempfile::tempdir().unwrap();

        let good = synthetic(48, 48, checker);
        good.save_png(dir.path().join("am_scrap.png")).unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();

        let lib = IconLibrary::load(dir.path(), None).unwrap();
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.templates[0].name, "am_scrap");
    }

    #[test]
    fn load_prefers_mapping_file_names() {
        let dir = tempfile::tempdir().unwrap();

        synthetic(48, 48, checker)
            .save_png(dir.path().join("am_scrap.png"))
            .unwrap();
        synthetic(48, 48, stripes)
            .save_png(dir.path().join("unmapped.png"))
            .unwrap();

        let mapping = dir.path().join("names.json");
        std::fs::write(&mapping, r#"{"am_scrap": "Scrap Metal"}"#).unwrap();

        let lib = IconLibrary::load(dir.path(), Some(&mapping)).unwrap();
        let mut names: Vec<&str> = lib.templates.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Scrap Metal", "unmapped"]);
    }
}
