use super::font::TextMeasure;

pub const MIN_FONT_SIZE: u32 = 8;
pub const MAX_FONT_SIZE: u32 = 72;
const WIDTH_TOLERANCE_PX: f32 = 2.0;
const MAX_ITERATIONS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub size: u32,
    pub measured_width: f32,
    pub iterations: u32,
    pub converged: bool,
}

/// Walks the font size one pixel at a time, starting from 90% of the box
/// height, until the measured width is within 2px of `target_width`. Gives up
/// after 50 measurements or when the size is pinned at 8 or 72.
pub fn calculate_font_size(
    text: &str,
    target_width: f32,
    target_height: f32,
    measure: &impl TextMeasure,
) -> Calibration {
    let initial = (target_height * 0.9).floor() as i64;
    let mut size = initial.clamp(MIN_FONT_SIZE as i64, MAX_FONT_SIZE as i64) as u32;
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS {
        iterations += 1;
        let measured = measure.text_width(text, size as f32);
        if (measured - target_width).abs() <= WIDTH_TOLERANCE_PX {
            return Calibration {
                size,
                measured_width: measured,
                iterations,
                converged: true,
            };
        }
        let next = if measured > target_width {
            size.saturating_sub(1)
        } else {
            size + 1
        }
        .clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        if next == size {
            break;
        }
        size = next;
    }

    let measured = measure.text_width(text, size as f32);
    Calibration {
        size,
        measured_width: measured,
        iterations,
        converged: (measured - target_width).abs() <= WIDTH_TOLERANCE_PX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::font::{EstimatedMetrics, VerticalMetrics};

    /// Every character is `factor` em wide.
    struct Monospace {
        factor: f32,
    }

    impl TextMeasure for Monospace {
        fn text_width(&self, text: &str, font_size: f32) -> f32 {
            text.chars().count() as f32 * self.factor * font_size
        }

        fn vertical_metrics(&self, _font_size: f32) -> Option<VerticalMetrics> {
            None
        }
    }

    #[test]
    fn converges_on_box_width() {
        let result = calculate_font_size("Hi", 50.0, 20.0, &EstimatedMetrics);
        assert!(result.converged);
        assert!((result.measured_width - 50.0).abs() <= 2.0);
        assert_eq!(result.size, 44);
        assert!(result.iterations <= 50);
    }

    #[test]
    fn starts_at_ninety_percent_of_height() {
        let measure = Monospace { factor: 0.5 };
        // 4 chars * 0.5 * 18 = 36 matches immediately
        let result = calculate_font_size("abcd", 36.0, 20.0, &measure);
        assert_eq!(result.size, 18);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn shrinks_until_minimum() {
        let result = calculate_font_size("Supercalifragilistic", 10.0, 30.0, &EstimatedMetrics);
        assert_eq!(result.size, MIN_FONT_SIZE);
        assert!(!result.converged);
    }

    #[test]
    fn stops_after_fifty_iterations() {
        let measure = Monospace { factor: 0.55 };
        let result = calculate_font_size("a", 40.0, 5.0, &measure);
        assert_eq!(result.iterations, 50);
        assert!(!result.converged);
        assert_eq!(result.size, 58);
        assert!((MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&result.size));
    }

    #[test]
    fn huge_boxes_clamp_to_maximum() {
        let result = calculate_font_size("x", 5000.0, 400.0, &EstimatedMetrics);
        assert_eq!(result.size, MAX_FONT_SIZE);
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
    }
}
