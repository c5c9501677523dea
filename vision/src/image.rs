//! Image primitives.
//!
//! The pipeline works on a small owned RGB image type (`OwnedImage`) that is
//! cheap to crop and resize. Captures arrive as RGBA byte buffers, icon
//! templates arrive as PNG files; both are converted into `OwnedImage` once
//! and stay in that form until they are handed to the comparison or OCR
//! stages (which want grayscale).

use anyhow::{Context, Result};

/// Owned RGB image (no alpha).
#[derive(Clone, Debug)]
pub struct OwnedImage {
    width: u32,
    height: u32,
    data: Vec<Color>,
}

impl OwnedImage {
    /// Build an `OwnedImage` from RGBA bytes (alpha is discarded).
    ///
    /// The buffer is expected to be tightly packed: `width * height * 4` bytes.
    pub fn from_rgba(width: usize, bytes: &[u8]) -> Self {
        let height = bytes.len() / width / 4;
        let data = bytes
            .chunks_exact(4)
            .map(|v| Color::new(v[0], v[1], v[2]))
            .collect::<Vec<_>>();

        Self {
            width: width as u32,
            height: height as u32,
            data,
        }
    }

    /// Decode a PNG (or any format `image` understands) into an `OwnedImage`.
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .context("decode image")?
            .to_rgb8();
        let (width, height) = img.dimensions();
        let data = img
            .pixels()
            .map(|p| Color::new(p.0[0], p.0[1], p.0[2]))
            .collect::<Vec<_>>();

        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline(always)]
    fn pixel(&self, x: u32, y: u32) -> Color {
        self.data[(x + y * self.width) as usize]
    }

    /// Copy out a sub-rectangle. Out-of-range coordinates are clamped, so
    /// the result may be smaller than requested (down to zero pixels).
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(self.width);
        let y = y.min(self.height);
        let width = width.min(self.width - x);
        let height = height.min(self.height - y);

        let mut data = Vec::with_capacity((width * height) as usize);
        for yy in y..y + height {
            for xx in x..x + width {
                data.push(self.pixel(xx, yy));
            }
        }

        Self {
            width,
            height,
            data,
        }
    }

    /// Resize this image to exact dimensions (aspect ratio is not preserved).
    ///
    /// Uses `fast_image_resize` (SIMD-optimized) and keeps output in `Vec<Color>`.
    pub fn resize_exact(&mut self, width: u32, height: u32) {
        if (self.width == width && self.height == height) || self.data.is_empty() {
            return;
        }

        let width = width.max(1);
        let height = height.max(1);

        // SAFETY: `Color` is `#[repr(C)]` with 3 x `u8`, so it is layout-compatible
        // with `fast_image_resize::pixels::U8x3` (alignment 1).
        let src_pixels = unsafe {
            std::slice::from_raw_parts(
                self.data.as_ptr() as *const fast_image_resize::pixels::U8x3,
                self.data.len(),
            )
        };

        let src = fast_image_resize::images::ImageRef::from_pixels(self.width, self.height, src_pixels)
            .expect("fast_image_resize: ImageRef::from_pixels failed");

        let mut dst = fast_image_resize::images::Image::new(width, height, fast_image_resize::PixelType::U8x3);

        let mut resizer = fast_image_resize::Resizer::new();
        let options = fast_image_resize::ResizeOptions::new().resize_alg(
            fast_image_resize::ResizeAlg::Interpolation(fast_image_resize::FilterType::CatmullRom),
        );

        resizer
            .resize(&src, &mut dst, &Some(options))
            .expect("fast_image_resize: resize failed");

        let bytes: Vec<u8> = dst.into_vec();
        let mut data = Vec::with_capacity((width * height) as usize);
        for px in bytes.chunks_exact(3) {
            data.push(Color::new(px[0], px[1], px[2]));
        }

        self.width = width;
        self.height = height;
        self.data = data;
    }

    #[inline]
    pub fn resized_exact(mut self, width: u32, height: u32) -> Self {
        self.resize_exact(width, height);
        self
    }

    /// Resize to the given height, preserving aspect ratio.
    pub fn resized_h(self, height: u32) -> Self {
        let height = height.max(1);
        let width = (self.width as u64 * height as u64 / self.height.max(1) as u64).max(1) as u32;
        self.resized_exact(width, height)
    }

    /// Convert to a grayscale `GrayImage` (luma).
    pub fn to_gray_image(&self) -> image::GrayImage {
        use image::{GrayImage, Luma};
        let mut out = GrayImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                out.put_pixel(x, y, Luma([self.pixel(x, y).luma()]));
            }
        }
        out
    }

    /// Create an RGB `OwnedImage` from a grayscale image (each pixel repeated into RGB).
    pub fn from_gray_as_rgb(gray: &image::GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let mut data = Vec::with_capacity((w * h) as usize);
        for p in gray.pixels() {
            let v = p.0[0];
            data.push(Color::new(v, v, v));
        }
        Self {
            width: w,
            height: h,
            data,
        }
    }

    /// Tightly packed RGB bytes (3 per pixel), row-major.
    pub fn rgb_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len() * 3);
        for clr in &self.data {
            bytes.push(clr.r);
            bytes.push(clr.g);
            bytes.push(clr.b);
        }
        bytes
    }

    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let img = image::RgbImage::from_raw(self.width, self.height, self.rgb_bytes())
            .context("RgbImage::from_raw failed")?;
        img.save_with_format(path, image::ImageFormat::Png)
            .context("save png")?;
        Ok(())
    }
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Compute luma (grayscale intensity).
    pub fn luma(&self) -> u8 {
        let r = self.r as u32;
        let g = self.g as u32;
        let b = self.b as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }
}
