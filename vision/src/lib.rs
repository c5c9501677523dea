mod image;
pub use image::*;
mod icons;
pub use icons::*;
mod ocr;
pub use ocr::Ocr;

/// Recognition engine: the icon template library plus an optional OCR engine.
///
/// Both halves degrade independently. An empty icon library means every
/// identification goes straight to the text fallback; a missing OCR engine
/// means the text fallback reads as empty. Neither is fatal.
pub struct Vision {
	pub icons: IconLibrary,
	ocr: Option<Ocr>,
}

impl Vision {
	pub fn new(icons: IconLibrary, ocr: Option<Ocr>) -> Self {
		Self { icons, ocr }
	}

	pub fn has_ocr(&self) -> bool {
		self.ocr.is_some()
	}

	/// Recognized text for the capture, or an empty string when no OCR
	/// engine is available (callers already treat empty text as a miss).
	pub fn read_text(&self, image: &OwnedImage) -> String {
		match &self.ocr {
			Some(ocr) => ocr.read(image),
			None => String::new(),
		}
	}
}
