use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::words::BBox;

use super::Target;
use super::border::clip_strided;

pub const PATCH_SIZE: u32 = 9;
pub const BLOCK_SIZE: u32 = 16;
pub const BLOCK_OVERLAP: u32 = 4;
const PATCH_STRIDE: usize = 2;
const MIN_SOURCE_MARGIN: u32 = 20;

/// A 9x9 block of background copied from around the target box.
#[derive(Debug, Clone)]
pub struct SourcePatch {
    pub x: u32,
    pub y: u32,
    pixels: Vec<Rgba<u8>>,
}

impl SourcePatch {
    fn pixel(&self, dx: u32, dy: u32) -> Rgba<u8> {
        self.pixels[(dy * PATCH_SIZE + dx) as usize]
    }

    fn top_row(&self) -> &[Rgba<u8>] {
        &self.pixels[..PATCH_SIZE as usize]
    }
}

/// Search radius for source patches: `max(20, 0.5 * min(w, h))`.
pub fn source_margin(bbox: &BBox) -> u32 {
    let short_side = bbox.width().min(bbox.height()) as f32;
    ((short_side * 0.5).floor() as u32).max(MIN_SOURCE_MARGIN)
}

/// Patches fully inside the image that do not overlap `bbox`, scanned on a 2px grid.
pub fn collect_source_patches(image: &RgbaImage, bbox: &BBox, margin: u32) -> Vec<SourcePatch> {
    let (width, height) = image.dimensions();
    let size = PATCH_SIZE as i64;
    let m = margin as i64;
    let start_x = bbox.x0 as i64 - m;
    let start_y = bbox.y0 as i64 - m;
    let end_x = bbox.x1 as i64 + m - size;
    let end_y = bbox.y1 as i64 + m - size;

    let mut patches = Vec::new();
    if end_x < start_x || end_y < start_y {
        return patches;
    }
    let stride = PATCH_STRIDE as i64;
    let xs = clip_strided(start_x..end_x + 1, width as i64 - size + 1, stride);
    let ys = clip_strided(start_y..end_y + 1, height as i64 - size + 1, stride);
    for py in ys.step_by(PATCH_STRIDE) {
        for px in xs.clone().step_by(PATCH_STRIDE) {
            if overlaps_box(px, py, size, bbox) {
                continue;
            }
            let (px, py) = (px as u32, py as u32);
            let mut pixels = Vec::with_capacity((PATCH_SIZE * PATCH_SIZE) as usize);
            for dy in 0..PATCH_SIZE {
                for dx in 0..PATCH_SIZE {
                    pixels.push(*image.get_pixel(px + dx, py + dy));
                }
            }
            patches.push(SourcePatch {
                x: px,
                y: py,
                pixels,
            });
        }
    }
    patches
}

fn overlaps_box(px: i64, py: i64, size: i64, bbox: &BBox) -> bool {
    px < bbox.x1 as i64
        && px + size > bbox.x0 as i64
        && py < bbox.y1 as i64
        && py + size > bbox.y0 as i64
}

/// Patch-based fill of `target`. Returns the synthesized pixels and the block
/// count, or `None` when no source patch is available.
pub(crate) fn synthesize(
    canvas: &RgbaImage,
    bbox: &BBox,
    target: &Target,
) -> Option<(Vec<Rgba<u8>>, usize)> {
    let sources = collect_source_patches(canvas, bbox, source_margin(bbox));
    if sources.is_empty() {
        return None;
    }

    let mut pixels = target.read(canvas);
    let step = (BLOCK_SIZE - BLOCK_OVERLAP) as usize;
    let mut blocks = 0usize;
    // Blocks stay sequential: later blocks score against pixels written by earlier ones.
    for by in (0..target.height).step_by(step) {
        for bx in (0..target.width).step_by(step) {
            let bw = BLOCK_SIZE.min(target.width - bx);
            let bh = BLOCK_SIZE.min(target.height - by);
            let boundary = block_boundary(canvas, target, &pixels, bx, by, bw);
            let best = best_patch(&sources, &boundary);
            paste_block(&mut pixels, target, &sources[best], bx, by, bw, bh);
            blocks += 1;
        }
    }
    Some((pixels, blocks))
}

/// Row directly above the block: already synthesized pixels inside the box,
/// real background above the box, or the block's own first row at the image edge.
fn block_boundary(
    canvas: &RgbaImage,
    target: &Target,
    pixels: &[Rgba<u8>],
    bx: u32,
    by: u32,
    bw: u32,
) -> Vec<Rgba<u8>> {
    let len = bw.min(PATCH_SIZE);
    (0..len)
        .map(|dx| {
            let x = bx + dx;
            if by > 0 {
                pixels[target.local_index(x, by - 1)]
            } else if target.y0 > 0 {
                *canvas.get_pixel(target.x0 + x, target.y0 - 1)
            } else {
                pixels[target.local_index(x, 0)]
            }
        })
        .collect()
}

fn boundary_score(patch: &SourcePatch, boundary: &[Rgba<u8>]) -> f64 {
    patch
        .top_row()
        .iter()
        .zip(boundary)
        .map(|(a, b)| {
            let dr = a[0] as f64 - b[0] as f64;
            let dg = a[1] as f64 - b[1] as f64;
            let db = a[2] as f64 - b[2] as f64;
            (dr * dr + dg * dg + db * db).sqrt()
        })
        .sum()
}

/// Lowest boundary score wins; ties go to the earliest patch so results are stable.
fn best_patch(sources: &[SourcePatch], boundary: &[Rgba<u8>]) -> usize {
    sources
        .par_iter()
        .enumerate()
        .map(|(idx, patch)| (boundary_score(patch, boundary), idx))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(_, idx)| idx)
        .unwrap_or(0)
}

fn paste_block(
    pixels: &mut [Rgba<u8>],
    target: &Target,
    patch: &SourcePatch,
    bx: u32,
    by: u32,
    bw: u32,
    bh: u32,
) {
    for dy in 0..bh {
        for dx in 0..bw {
            let idx = target.local_index(bx + dx, by + dy);
            let src = patch.pixel(dx % PATCH_SIZE, dy % PATCH_SIZE);
            pixels[idx] = composite(src, pixels[idx]);
        }
    }
}

/// `src * a + dst * (1 - a)` with the result forced opaque.
fn composite(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let alpha = src[3] as f32 / 255.0;
    let blend = |s: u8, d: u8| (s as f32 * alpha + d as f32 * (1.0 - alpha)).round() as u8;
    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        255,
    ])
}
