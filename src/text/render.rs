use anyhow::{Context, Result, anyhow};
use image::{ImageFormat, Rgba, RgbaImage};
use resvg::render;
use std::io::Cursor;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use crate::color::Rgb;
use crate::reconstruct::fill_rect;
use crate::words::BBox;

pub struct TextDraw<'a> {
    pub text: &'a str,
    /// Baseline origin.
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub font_family: &'a str,
    pub color: Rgb,
    /// Expected rendered width; sizes the layer the text is rasterized into.
    pub width_hint: f32,
}

/// Rasterizes bold text with resvg into a layer covering only the text's
/// neighborhood, then alpha-blends that layer onto `canvas`.
pub fn draw_text(
    canvas: &mut RgbaImage,
    draw: &TextDraw<'_>,
    fontdb: Arc<fontdb::Database>,
) -> Result<()> {
    if draw.text.trim().is_empty() {
        return Ok(());
    }
    let (canvas_w, canvas_h) = canvas.dimensions();
    let pad = draw.font_size.max(1.0);
    let left = (draw.x - pad).floor().max(0.0);
    let top = (draw.y - draw.font_size * 1.5).floor().max(0.0);
    let right = (draw.x + draw.width_hint * 1.25 + pad)
        .ceil()
        .min(canvas_w as f32);
    let bottom = (draw.y + draw.font_size * 0.6).ceil().min(canvas_h as f32);
    if right <= left || bottom <= top {
        return Ok(());
    }
    let layer_w = (right - left) as u32;
    let layer_h = (bottom - top) as u32;

    let svg = text_svg(draw, left, top, layer_w, layer_h);
    let options = Options {
        fontdb,
        ..Options::default()
    };
    let tree = Tree::from_str(&svg, &options).with_context(|| "failed to parse text SVG")?;
    let mut pixmap =
        Pixmap::new(layer_w, layer_h).ok_or_else(|| anyhow!("empty text layer size"))?;
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    blend_layer(canvas, &pixmap, left as u32, top as u32);
    Ok(())
}

fn text_svg(draw: &TextDraw<'_>, left: f32, top: f32, width: u32, height: u32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="{vx} {vy} {w} {h}"><text x="{x}" y="{y}" font-size="{size}" font-family="{family}" font-weight="bold" fill="{color}" xml:space="preserve">{text}</text></svg>"#,
        w = width,
        h = height,
        vx = left,
        vy = top,
        x = draw.x,
        y = draw.y,
        size = draw.font_size,
        family = escape_xml(draw.font_family),
        color = draw.color.to_hex(),
        text = escape_xml(draw.text)
    )
}

fn blend_layer(canvas: &mut RgbaImage, layer: &Pixmap, origin_x: u32, origin_y: u32) {
    let layer_w = layer.width() as usize;
    for (idx, pixel) in layer.pixels().iter().enumerate() {
        let color = pixel.demultiply();
        if color.alpha() == 0 {
            continue;
        }
        let x = origin_x + (idx % layer_w) as u32;
        let y = origin_y + (idx / layer_w) as u32;
        let Some(dst) = canvas.get_pixel_checked(x, y).copied() else {
            continue;
        };
        let alpha = color.alpha() as f32 / 255.0;
        let blend = |s: u8, d: u8| (s as f32 * alpha + d as f32 * (1.0 - alpha)).round() as u8;
        let out_alpha = (255.0 * alpha + dst[3] as f32 * (1.0 - alpha)).round() as u8;
        canvas.put_pixel(
            x,
            y,
            Rgba([
                blend(color.red(), dst[0]),
                blend(color.green(), dst[1]),
                blend(color.blue(), dst[2]),
                out_alpha,
            ]),
        );
    }
}

/// Strokes the outside of `bbox` with `stroke` pixels of `color`.
pub fn outline_rect(canvas: &mut RgbaImage, bbox: &BBox, color: Rgb, stroke: u32) {
    let outer = BBox::new(
        bbox.x0.saturating_sub(stroke),
        bbox.y0.saturating_sub(stroke),
        bbox.x1.saturating_add(stroke),
        bbox.y1.saturating_add(stroke),
    );
    fill_rect(canvas, &BBox::new(outer.x0, outer.y0, outer.x1, bbox.y0), color);
    fill_rect(canvas, &BBox::new(outer.x0, bbox.y1, outer.x1, outer.y1), color);
    fill_rect(canvas, &BBox::new(outer.x0, bbox.y0, bbox.x0, bbox.y1), color);
    fill_rect(canvas, &BBox::new(bbox.x1, bbox.y0, outer.x1, bbox.y1), color);
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .with_context(|| "failed to encode PNG")?;
    Ok(bytes)
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
