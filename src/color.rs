use image::{Rgba, RgbaImage};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::EditError;
use crate::words::BBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`, upper case.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Accepts `RRGGBB` or `RGB`, with or without a leading `#`, in either case.
    pub fn from_hex(value: &str) -> Result<Self, EditError> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let invalid = || EditError::InvalidInput(format!("invalid hex color '{}'", value));
        if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let expanded = match digits.len() {
            6 => digits.to_string(),
            3 => digits.chars().flat_map(|ch| [ch, ch]).collect(),
            _ => return Err(invalid()),
        };
        let channel = |idx: usize| u8::from_str_radix(&expanded[idx..idx + 2], 16);
        match (channel(0), channel(2), channel(4)) {
            (Ok(r), Ok(g), Ok(b)) => Ok(Self { r, g, b }),
            _ => Err(invalid()),
        }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl From<Rgba<u8>> for Rgb {
    fn from(pixel: Rgba<u8>) -> Self {
        let [r, g, b, _] = pixel.0;
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = EditError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_hex(value)
    }
}

pub fn sample_at(image: &RgbaImage, x: i64, y: i64) -> Result<Rgba<u8>, EditError> {
    if x < 0 || y < 0 {
        return Err(EditError::SamplingFailure { x, y });
    }
    image
        .get_pixel_checked(x as u32, y as u32)
        .copied()
        .ok_or(EditError::SamplingFailure { x, y })
}

/// Color of the pixel at the center of `bbox`. Must be read before the box is
/// erased. Falls back to black when the center is not readable.
pub fn sample_text_color(image: &RgbaImage, bbox: &BBox) -> Rgb {
    let cx = (bbox.x0 as i64 + bbox.x1 as i64) / 2;
    let cy = (bbox.y0 as i64 + bbox.y1 as i64) / 2;
    match sample_at(image, cx, cy) {
        Ok(pixel) => Rgb::from(pixel),
        Err(err) => {
            debug!("text color fallback to black: {}", err);
            Rgb::BLACK
        }
    }
}

/// Mean RGB over `region` clipped to the image; white when nothing overlaps.
pub fn sample_average(image: &RgbaImage, region: &BBox) -> Rgb {
    match channel_sums(image, region) {
        Some((sums, count)) => mean_of(sums, count),
        None => Rgb::WHITE,
    }
}

pub(crate) fn channel_sums(image: &RgbaImage, region: &BBox) -> Option<([u64; 3], u64)> {
    let x1 = region.x1.min(image.width());
    let y1 = region.y1.min(image.height());
    if region.x0 >= x1 || region.y0 >= y1 {
        return None;
    }
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for y in region.y0..y1 {
        for x in region.x0..x1 {
            let [r, g, b, _] = image.get_pixel(x, y).0;
            sums[0] += r as u64;
            sums[1] += g as u64;
            sums[2] += b as u64;
            count += 1;
        }
    }
    Some((sums, count))
}

pub(crate) fn mean_of(sums: [u64; 3], count: u64) -> Rgb {
    let count = count.max(1) as f64;
    let channel = |sum: u64| (sum as f64 / count).round().clamp(0.0, 255.0) as u8;
    Rgb::new(channel(sums[0]), channel(sums[1]), channel(sums[2]))
}
