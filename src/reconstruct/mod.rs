mod border;
mod classify;
mod gradient;
mod texture;

use image::{Rgba, RgbaImage};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::color::{self, Rgb};
use crate::error::EditError;
use crate::words::BBox;

pub use border::{BorderSample, analyze_border, border_margin};
pub use classify::{BorderStats, Classification, border_stats, classify};
pub use texture::{
    BLOCK_OVERLAP, BLOCK_SIZE, PATCH_SIZE, SourcePatch, collect_source_patches, source_margin,
};

/// How a vacated word box is filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EraseMode {
    /// Classify the border and pick solid, gradient or textured synthesis.
    #[default]
    Auto,
    /// Flat fill with the average color of the ring around the box.
    Legacy,
    White,
}

impl EraseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EraseMode::Auto => "auto",
            EraseMode::Legacy => "legacy",
            EraseMode::White => "white",
        }
    }
}

impl fmt::Display for EraseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EraseMode {
    type Err = EditError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(EraseMode::Auto),
            "legacy" => Ok(EraseMode::Legacy),
            "white" => Ok(EraseMode::White),
            other => Err(EditError::InvalidInput(format!(
                "unknown erase mode '{}' (expected auto, legacy or white)",
                other
            ))),
        }
    }
}

/// What was actually written into the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Solid(Rgb),
    Gradient,
    Textured { blocks: usize },
    Legacy(Rgb),
    White,
}

/// Box clipped to the image; the unit reconstruction reads and commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Target {
    pub(crate) x0: u32,
    pub(crate) y0: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl Target {
    pub(crate) fn clip(image: &RgbaImage, bbox: &BBox) -> Result<Self, EditError> {
        let x1 = bbox.x1.min(image.width());
        let y1 = bbox.y1.min(image.height());
        if bbox.x0 >= x1 || bbox.y0 >= y1 {
            return Err(EditError::ReconstructionFailure(format!(
                "box ({}, {})-({}, {}) has no pixels inside the image",
                bbox.x0, bbox.y0, bbox.x1, bbox.y1
            )));
        }
        Ok(Self {
            x0: bbox.x0,
            y0: bbox.y0,
            width: x1 - bbox.x0,
            height: y1 - bbox.y0,
        })
    }

    pub(crate) fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub(crate) fn local_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub(crate) fn read(&self, canvas: &RgbaImage) -> Vec<Rgba<u8>> {
        let mut pixels = Vec::with_capacity(self.area());
        for y in self.y0..self.y0 + self.height {
            for x in self.x0..self.x0 + self.width {
                pixels.push(*canvas.get_pixel(x, y));
            }
        }
        pixels
    }

    fn commit(&self, canvas: &mut RgbaImage, pixels: &[Rgba<u8>]) {
        for (idx, pixel) in pixels.iter().enumerate() {
            let x = self.x0 + (idx % self.width as usize) as u32;
            let y = self.y0 + (idx / self.width as usize) as u32;
            canvas.put_pixel(x, y, *pixel);
        }
    }
}

/// Erases `bbox` on `canvas` using `mode`. Never fails: any error in the
/// pipeline degrades to a white fill, and the box is written in one commit.
pub fn reconstruct(canvas: &mut RgbaImage, bbox: &BBox, mode: EraseMode) -> Applied {
    let result = match mode {
        EraseMode::Auto => reconstruct_auto(canvas, bbox),
        EraseMode::Legacy => erase_legacy(canvas, bbox),
        EraseMode::White => {
            fill_rect(canvas, bbox, Rgb::WHITE);
            Ok(Applied::White)
        }
    };
    match result {
        Ok(applied) => applied,
        Err(err) => {
            warn!("reconstruction fell back to white fill: {}", err);
            fill_rect(canvas, bbox, Rgb::WHITE);
            Applied::White
        }
    }
}

fn reconstruct_auto(canvas: &mut RgbaImage, bbox: &BBox) -> Result<Applied, EditError> {
    let target = Target::clip(canvas, bbox)?;
    let samples = analyze_border(canvas, bbox, border_margin(bbox));
    let classification = classify(samples);
    debug!(
        "background at ({}, {}) classified as {}",
        bbox.x0,
        bbox.y0,
        classification.kind()
    );
    let (pixels, applied) = match classification {
        Classification::Solid(color) => (vec![color.to_rgba(); target.area()], Applied::Solid(color)),
        Classification::Gradient(samples) => {
            (gradient::gradient_fill(&target, &samples)?, Applied::Gradient)
        }
        Classification::Textured(samples) => match texture::synthesize(canvas, bbox, &target) {
            Some((pixels, blocks)) => (pixels, Applied::Textured { blocks }),
            None => {
                debug!("no source patches around box, using gradient fill");
                (gradient::gradient_fill(&target, &samples)?, Applied::Gradient)
            }
        },
    };
    target.commit(canvas, &pixels);
    Ok(applied)
}

fn erase_legacy(canvas: &mut RgbaImage, bbox: &BBox) -> Result<Applied, EditError> {
    Target::clip(canvas, bbox)?;
    let m = border_margin(bbox);
    let ring = [
        BBox::new(
            bbox.x0.saturating_sub(m),
            bbox.y0.saturating_sub(m),
            bbox.x1.saturating_add(m),
            bbox.y0,
        ),
        BBox::new(
            bbox.x0.saturating_sub(m),
            bbox.y1,
            bbox.x1.saturating_add(m),
            bbox.y1.saturating_add(m),
        ),
        BBox::new(bbox.x0.saturating_sub(m), bbox.y0, bbox.x0, bbox.y1),
        BBox::new(bbox.x1, bbox.y0, bbox.x1.saturating_add(m), bbox.y1),
    ];
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for region in &ring {
        if let Some((part, n)) = color::channel_sums(canvas, region) {
            for idx in 0..3 {
                sums[idx] += part[idx];
            }
            count += n;
        }
    }
    if count == 0 {
        return Err(EditError::ReconstructionFailure(
            "no pixels around box to average".to_string(),
        ));
    }
    let average = color::mean_of(sums, count);
    fill_rect(canvas, bbox, average);
    Ok(Applied::Legacy(average))
}

/// Flat fill of `region` clipped to the canvas.
pub fn fill_rect(canvas: &mut RgbaImage, region: &BBox, color: Rgb) {
    let x1 = region.x1.min(canvas.width());
    let y1 = region.y1.min(canvas.height());
    let pixel = color.to_rgba();
    for y in region.y0.min(y1)..y1 {
        for x in region.x0.min(x1)..x1 {
            canvas.put_pixel(x, y, pixel);
        }
    }
}
