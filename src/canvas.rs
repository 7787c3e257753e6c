//! Pixel grids the compositor works on: the part-id mask, the base photo,
//! and the composited output frame.

use std::collections::BTreeMap;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, Pixel, RgbaImage};

use crate::parts::PartId;

/// Composited output. Owned by whoever asked for it.
pub type CompositeFrame = RgbaImage;

// ============================================================================
// MASK
// ============================================================================

/// Per-pixel part ids, stored as the 8-bit values of a grayscale mask image.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    pixels: GrayImage,
}

impl Mask {
    /// Bytes past the pixel grid (which `ImageBuffer::from_raw` tolerates)
    /// are dropped.
    pub fn from_gray(pixels: GrayImage) -> Self {
        Self {
            pixels: trim_to_grid(pixels, 1),
        }
    }

    /// Build from a row-major buffer. `None` if `data.len() != width * height`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        GrayImage::from_raw(width, height, data).map(Self::from_gray)
    }

    /// Build from rows of part ids. `None` for ragged rows.
    pub fn from_rows(rows: &[&[u8]]) -> Option<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len()) as u32;
        if rows.iter().any(|r| r.len() as u32 != width) {
            return None;
        }
        let data: Vec<u8> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::from_raw(width, height, data)
    }

    /// Grayscale decode: each luma value is taken as a part id.
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        Self::from_gray(img.to_luma8())
    }

    pub fn get(&self, x: u32, y: u32) -> PartId {
        PartId::from_mask_value(self.pixels.get_pixel(x, y).0[0])
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Pixel count per part id occurring in the mask.
    pub fn coverage(&self) -> BTreeMap<PartId, u64> {
        let mut counts = [0u64; 256];
        for &v in self.pixels.as_raw() {
            counts[v as usize] += 1;
        }
        counts
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .map(|(v, &n)| (PartId::from_mask_value(v as u8), n))
            .collect()
    }

    pub fn contains_part(&self, id: PartId) -> bool {
        match id.index() {
            Some(i) => self.pixels.as_raw().iter().any(|&v| v as usize == i),
            None => false,
        }
    }
}

// ============================================================================
// BASE IMAGE
// ============================================================================

/// The uploaded photo, as straight (non-premultiplied) RGBA.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseImage {
    pixels: RgbaImage,
}

impl BaseImage {
    /// Bytes past the pixel grid are dropped, as for [`Mask::from_gray`].
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels: trim_to_grid(pixels, 4),
        }
    }

    pub fn from_dynamic(img: DynamicImage) -> Self {
        Self::from_rgba(img.to_rgba8())
    }

    /// Uniform opaque image, mostly useful for tests and previews.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::from_rgba(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([rgb[0], rgb[1], rgb[2], 255]),
        ))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Resample to the given working resolution. Returns `self` unchanged when
    /// the size already matches.
    pub fn resampled(self, width: u32, height: u32) -> Self {
        if self.dimensions() == (width, height) {
            return self;
        }
        Self::from_rgba(imageops::resize(&self.pixels, width, height, FilterType::Triangle))
    }
}

/// Cut an image's backing buffer down to exactly `width * height * channels`.
fn trim_to_grid<P>(img: ImageBuffer<P, Vec<u8>>, channels: usize) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = img.dimensions();
    let needed = width as usize * height as usize * channels;
    if img.as_raw().len() == needed {
        return img;
    }
    let mut raw = img.into_raw();
    raw.truncate(needed);
    ImageBuffer::from_raw(width, height, raw).unwrap_or_else(|| ImageBuffer::new(width, height))
}
