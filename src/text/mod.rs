mod calibrate;
mod font;
mod placement;
mod render;

pub use calibrate::{Calibration, MAX_FONT_SIZE, MIN_FONT_SIZE, calculate_font_size};
pub use font::{
    EstimatedMetrics, FontBook, FontMetrics, TextFont, TextMeasure, VerticalMetrics,
    load_font_metrics,
};
pub use placement::{Placement, place};
pub use render::{TextDraw, draw_text, encode_png, outline_rect};
