//! OCR wrapper.
//!
//! The pipeline relies on `ocr-rs` (Rust PaddleOCR bindings). OCR engines are
//! sensitive to input quality, so [`Ocr::read`] binarizes the crop a couple of
//! different ways and keeps whichever output looks most like text. Everything
//! above this module treats recognition as an opaque text-for-image oracle;
//! empty output is a normal result, not an error.

use std::path::Path;

use anyhow::{Context, Result};

use crate::image::OwnedImage;

pub struct Ocr {
    engine: ocr_rs::OcrEngine,
}

impl Ocr {
    /// Initialize the OCR engine with the given model paths.
    ///
    /// Errors propagate so the caller can degrade the text-fallback feature
    /// instead of aborting startup.
    pub fn try_new(
        detection: impl AsRef<Path>,
        recognition: impl AsRef<Path>,
        charset: impl AsRef<Path>,
    ) -> Result<Self> {
        let thread_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let engine = ocr_rs::OcrEngine::new(
            detection,
            recognition,
            charset,
            Some(ocr_rs::OcrEngineConfig {
                backend: ocr_rs::Backend::CPU,
                thread_count,
                precision_mode: ocr_rs::PrecisionMode::High,
                enable_parallel: thread_count > 1,
                min_result_confidence: 0.5,
                ..Default::default()
            }),
        )
        .context("initialize OCR engine")?;

        Ok(Self { engine })
    }

    /// Recognize text with preprocessing (upscale, threshold candidates).
    pub fn read(&self, image: &OwnedImage) -> String {
        use imageproc::contrast::{adaptive_threshold, equalize_histogram, otsu_level, threshold, ThresholdType};

        // Upscale small crops; OCR generally performs better on larger glyphs.
        const MIN_H: u32 = 80;
        let base = if image.height() < MIN_H {
            image.clone().resized_h(MIN_H)
        } else {
            image.clone()
        };

        // Candidate 1: adaptive threshold (handles gradients/transparency).
        let adaptive = {
            let gray = equalize_histogram(&base.to_gray_image());
            let bin = adaptive_threshold(&gray, 7, 10);
            OwnedImage::from_gray_as_rgb(&ensure_dark_text_on_light(bin))
        };

        // Candidate 2: global Otsu.
        let otsu = {
            let gray = equalize_histogram(&base.to_gray_image());
            let level = otsu_level(&gray);
            let bin = threshold(&gray, level, ThresholdType::Binary);
            OwnedImage::from_gray_as_rgb(&ensure_dark_text_on_light(bin))
        };

        let mut best = String::new();
        let mut best_score = i64::MIN;

        for cand in [adaptive, otsu] {
            let text = self.recognize_raw(&cand);
            let score = text_plausibility(&text);
            if score > best_score {
                best_score = score;
                best = text;
            }
        }

        // Optional debug snapshots.
        if std::env::var("ARCBUDDY_WRITE_IMAGE").as_deref() == Ok("1") {
            let tag = best
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(40)
                .collect::<String>();
            let _ = image.save_png(format!("./debug_ocr_{tag}.png"));
        }

        best
    }

    /// One raw engine pass, joining line results with spaces.
    fn recognize_raw(&self, image: &OwnedImage) -> String {
        let bytes = image.rgb_bytes();
        let input = ocr_rs::preprocess::rgb_to_image(&bytes, image.width(), image.height());

        match self.engine.recognize(&input) {
            Ok(results) => results
                .into_iter()
                .map(|v| v.text)
                .collect::<Vec<_>>()
                .join("\n"),
            Err(_) => String::new(),
        }
    }
}

fn ensure_dark_text_on_light(mut bin: image::GrayImage) -> image::GrayImage {
    // If the image is mostly black, invert it so background becomes light.
    let mut white = 0u64;
    let mut black = 0u64;
    for p in bin.pixels() {
        if p.0[0] > 0 {
            white += 1;
        } else {
            black += 1;
        }
    }
    if black > white {
        for p in bin.pixels_mut() {
            p.0[0] = 255u8.saturating_sub(p.0[0]);
        }
    }
    bin
}

/// Prefer candidates with more alphanumerics (less binarization noise).
fn text_plausibility(text: &str) -> i64 {
    let mut score = 0i64;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            score += 3;
        } else if !ch.is_whitespace() {
            score += 1;
        }
    }
    score + text.len() as i64
}
