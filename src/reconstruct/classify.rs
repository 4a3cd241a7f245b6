use crate::color::Rgb;

use super::border::BorderSample;

const SOLID_MAX_VARIANCE: f64 = 100.0;
const GRADIENT_MAX_VARIANCE: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Solid(Rgb),
    Gradient(Vec<BorderSample>),
    Textured(Vec<BorderSample>),
}

impl Classification {
    pub fn kind(&self) -> &'static str {
        match self {
            Classification::Solid(_) => "solid",
            Classification::Gradient(_) => "gradient",
            Classification::Textured(_) => "textured",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderStats {
    pub mean: [f64; 3],
    /// Population variance averaged over R, G and B.
    pub variance: f64,
}

pub fn border_stats(samples: &[BorderSample]) -> Option<BorderStats> {
    if samples.is_empty() {
        return None;
    }
    let count = samples.len() as f64;
    let mut mean = [0.0f64; 3];
    for sample in samples {
        mean[0] += sample.r as f64;
        mean[1] += sample.g as f64;
        mean[2] += sample.b as f64;
    }
    for channel in &mut mean {
        *channel /= count;
    }
    let mut variance = [0.0f64; 3];
    for sample in samples {
        let values = [sample.r as f64, sample.g as f64, sample.b as f64];
        for idx in 0..3 {
            let diff = values[idx] - mean[idx];
            variance[idx] += diff * diff;
        }
    }
    let variance = variance.iter().map(|sum| sum / count).sum::<f64>() / 3.0;
    Some(BorderStats { mean, variance })
}

/// Solid below 100, gradient below 1000, textured above. No samples means white.
pub fn classify(samples: Vec<BorderSample>) -> Classification {
    let Some(stats) = border_stats(&samples) else {
        return Classification::Solid(Rgb::WHITE);
    };
    if stats.variance < SOLID_MAX_VARIANCE {
        let channel = |value: f64| value.round().clamp(0.0, 255.0) as u8;
        Classification::Solid(Rgb::new(
            channel(stats.mean[0]),
            channel(stats.mean[1]),
            channel(stats.mean[2]),
        ))
    } else if stats.variance < GRADIENT_MAX_VARIANCE {
        Classification::Gradient(samples)
    } else {
        Classification::Textured(samples)
    }
}
