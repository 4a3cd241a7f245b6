use image::RgbaImage;
use std::ops::Range;

use crate::words::BBox;

const SAMPLE_STRIDE: usize = 2;
/// Rows/columns next to the box that are skipped so anti-aliased ink is never sampled.
const EDGE_BUFFER: i64 = 2;
const MIN_MARGIN: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderSample {
    pub x: u32,
    pub y: u32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Strip width used around a box: `max(5, 0.3 * min(w, h))`.
pub fn border_margin(bbox: &BBox) -> u32 {
    let short_side = bbox.width().min(bbox.height()) as f32;
    ((short_side * 0.3).floor() as u32).max(MIN_MARGIN)
}

/// Samples the four strips around `bbox` on a 2px grid, clipped to the image.
pub fn analyze_border(image: &RgbaImage, bbox: &BBox, margin: u32) -> Vec<BorderSample> {
    let x0 = bbox.x0 as i64;
    let y0 = bbox.y0 as i64;
    let x1 = bbox.x1 as i64;
    let y1 = bbox.y1 as i64;
    let m = margin as i64;

    let mut samples = Vec::new();
    push_strip(image, x0 - m..x1 + m, y0 - m..y0 - EDGE_BUFFER, &mut samples);
    push_strip(image, x0 - m..x1 + m, y1 + EDGE_BUFFER..y1 + m, &mut samples);
    push_strip(image, x0 - m..x0 - EDGE_BUFFER, y0..y1, &mut samples);
    push_strip(image, x1 + EDGE_BUFFER..x1 + m, y0..y1, &mut samples);
    samples
}

/// Trims `range` to `0..limit` while keeping its values on the original
/// `stride` grid.
pub(crate) fn clip_strided(range: Range<i64>, limit: i64, stride: i64) -> Range<i64> {
    let start = if range.start < 0 {
        range.start + (-range.start + stride - 1) / stride * stride
    } else {
        range.start
    };
    start..range.end.min(limit)
}

fn push_strip(image: &RgbaImage, xs: Range<i64>, ys: Range<i64>, out: &mut Vec<BorderSample>) {
    let (width, height) = image.dimensions();
    let stride = SAMPLE_STRIDE as i64;
    let xs = clip_strided(xs, width as i64, stride);
    for y in clip_strided(ys, height as i64, stride).step_by(SAMPLE_STRIDE) {
        for x in xs.clone().step_by(SAMPLE_STRIDE) {
            let [r, g, b, a] = image.get_pixel(x as u32, y as u32).0;
            out.push(BorderSample {
                x: x as u32,
                y: y as u32,
                r,
                g,
                b,
                a,
            });
        }
    }
}
