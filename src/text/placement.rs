use crate::words::BBox;

use super::font::TextMeasure;

/// Baseline anchor for drawing text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
}

/// Left-aligns with the box and puts the glyph bottoms on the box's bottom
/// edge. Without real metrics the descent is approximated as 20% of the size.
pub fn place(bbox: &BBox, font_size: f32, measure: &impl TextMeasure) -> Placement {
    let bottom = bbox.y1 as f32;
    let y = match measure.vertical_metrics(font_size) {
        Some(metrics) => bottom - metrics.descent,
        None => bottom - font_size * 0.2,
    };
    Placement {
        x: bbox.x0 as f32,
        y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::font::{EstimatedMetrics, VerticalMetrics};

    struct Fixed;

    impl TextMeasure for Fixed {
        fn text_width(&self, text: &str, font_size: f32) -> f32 {
            text.len() as f32 * font_size
        }

        fn vertical_metrics(&self, font_size: f32) -> Option<VerticalMetrics> {
            Some(VerticalMetrics {
                ascent: font_size * 0.8,
                descent: font_size * 0.25,
            })
        }
    }

    #[test]
    fn uses_descent_when_available() {
        let placement = place(&BBox::new(10, 10, 60, 30), 20.0, &Fixed);
        assert_eq!(placement, Placement { x: 10.0, y: 25.0 });
    }

    #[test]
    fn approximates_without_metrics() {
        let placement = place(&BBox::new(10, 10, 60, 30), 20.0, &EstimatedMetrics);
        assert_eq!(placement, Placement { x: 10.0, y: 26.0 });
    }
}
