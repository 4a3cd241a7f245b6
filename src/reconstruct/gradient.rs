use image::Rgba;
use rayon::prelude::*;

use crate::error::EditError;

use super::Target;
use super::border::BorderSample;

/// Inverse-distance weighted fill: every pixel blends all border samples with
/// `weight = 1 / (distance + 1)`.
pub(crate) fn gradient_fill(
    target: &Target,
    samples: &[BorderSample],
) -> Result<Vec<Rgba<u8>>, EditError> {
    if samples.is_empty() {
        return Err(EditError::ReconstructionFailure(
            "gradient fill needs border samples".to_string(),
        ));
    }
    let width = target.width as usize;
    let mut pixels = vec![Rgba([0, 0, 0, 255]); target.area()];
    pixels
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, line)| {
            let y = (target.y0 as usize + row) as f64;
            for (col, pixel) in line.iter_mut().enumerate() {
                let x = (target.x0 as usize + col) as f64;
                *pixel = weighted_color(x, y, samples);
            }
        });
    Ok(pixels)
}

fn weighted_color(x: f64, y: f64, samples: &[BorderSample]) -> Rgba<u8> {
    let mut total = 0.0f64;
    let mut acc = [0.0f64; 3];
    for sample in samples {
        let dx = sample.x as f64 - x;
        let dy = sample.y as f64 - y;
        let weight = 1.0 / ((dx * dx + dy * dy).sqrt() + 1.0);
        acc[0] += weight * sample.r as f64;
        acc[1] += weight * sample.g as f64;
        acc[2] += weight * sample.b as f64;
        total += weight;
    }
    let channel = |value: f64| (value / total).round().clamp(0.0, 255.0) as u8;
    Rgba([channel(acc[0]), channel(acc[1]), channel(acc[2]), 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: u32, y: u32, value: u8) -> BorderSample {
        BorderSample {
            x,
            y,
            r: value,
            g: value,
            b: value,
            a: 255,
        }
    }

    #[test]
    fn single_sample_fills_its_color() {
        let target = Target {
            x0: 0,
            y0: 0,
            width: 3,
            height: 2,
        };
        let pixels = gradient_fill(&target, &[sample(10, 10, 42)]).expect("fill");
        assert_eq!(pixels.len(), 6);
        assert!(pixels.iter().all(|p| *p == Rgba([42, 42, 42, 255])));
    }

    #[test]
    fn nearer_sample_dominates() {
        let target = Target {
            x0: 1,
            y0: 0,
            width: 8,
            height: 1,
        };
        let samples = [sample(0, 0, 0), sample(10, 0, 200)];
        let pixels = gradient_fill(&target, &samples).expect("fill");
        assert!(pixels[0][0] < 100);
        assert!(pixels[7][0] > 100);
        assert!(pixels.windows(2).all(|pair| pair[0][0] <= pair[1][0]));
    }

    #[test]
    fn empty_samples_fail() {
        let target = Target {
            x0: 0,
            y0: 0,
            width: 1,
            height: 1,
        };
        assert!(gradient_fill(&target, &[]).is_err());
    }
}
