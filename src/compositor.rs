use anyhow::{Result, anyhow};
use image::RgbaImage;
use std::borrow::Cow;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::color::{self, Rgb};
use crate::error::EditError;
use crate::history::ReplacementHistory;
use crate::ingest;
use crate::ocr::{Progress, Recognition, Recognizer};
use crate::reconstruct::{Applied, EraseMode, fill_rect, reconstruct};
use crate::text::{
    FontBook, Placement, TextDraw, calculate_font_size, draw_text, encode_png, outline_rect, place,
};
use crate::words::{BBox, BoxStyle, Word, WordId, WordRegistry, WordStyle};

const OVERLAY_COLOR: Rgb = Rgb::new(0x00, 0xC8, 0x53);
const OVERLAY_STROKE: u32 = 2;

/// Session-wide rendering options. Changing them triggers a full redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub erase_mode: EraseMode,
    pub font_family: String,
    pub background_box: Option<BoxStyle>,
    /// Outline every word box on the display view.
    pub show_boxes: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            erase_mode: EraseMode::Auto,
            font_family: "sans-serif".to_string(),
            background_box: None,
            show_boxes: false,
        }
    }
}

/// Overrides for a single replacement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleOptions {
    pub text_color: Option<Rgb>,
    pub background_box: Option<BoxStyle>,
    pub font_family: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
    RecognitionPending,
    RecognitionComplete,
    RecognitionFailed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Empty => "empty",
            SessionState::Loaded => "loaded",
            SessionState::RecognitionPending => "recognizing",
            SessionState::RecognitionComplete => "ready",
            SessionState::RecognitionFailed => "failed",
        }
    }
}

/// Proof that a recognition request was issued for a specific image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognitionTicket {
    generation: u64,
}

impl RecognitionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplaceOutcome {
    pub applied: Applied,
    pub font_size: u32,
    pub converged: bool,
    pub position: Placement,
    pub text_color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerResult {
    Selected(WordId),
    /// Click outside every word; the selection was dropped.
    Cleared,
    /// Color-pick mode: the sampled color is now the session text color.
    Picked(Rgb),
    Missed,
}

struct Raster {
    base: RgbaImage,
    canvas: RgbaImage,
}

/// One editing session over one image at a time.
pub struct Compositor {
    state: SessionState,
    raster: Option<Raster>,
    registry: WordRegistry,
    history: ReplacementHistory,
    options: RenderOptions,
    fonts: FontBook,
    session_color: Option<Rgb>,
    color_pick: bool,
    generation: u64,
}

pub type SharedCompositor = Arc<Mutex<Compositor>>;

impl Compositor {
    pub fn new(fonts: FontBook, options: RenderOptions) -> Self {
        Self {
            state: SessionState::Empty,
            raster: None,
            registry: WordRegistry::new(),
            history: ReplacementHistory::new(),
            options,
            fonts,
            session_color: None,
            color_pick: false,
            generation: 0,
        }
    }

    pub fn into_shared(self) -> SharedCompositor {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn registry(&self) -> &WordRegistry {
        &self.registry
    }

    pub fn words(&self) -> &[Word] {
        self.registry.words()
    }

    pub fn history(&self) -> &ReplacementHistory {
        &self.history
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn text_color(&self) -> Option<Rgb> {
        self.session_color
    }

    pub fn is_color_picking(&self) -> bool {
        self.color_pick
    }

    pub fn base(&self) -> Option<&RgbaImage> {
        self.raster.as_ref().map(|raster| &raster.base)
    }

    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.raster.as_ref().map(|raster| &raster.canvas)
    }

    /// Starts over with a new image. Words, history and any pending
    /// recognition of the previous image are discarded.
    pub fn load_image(&mut self, image: RgbaImage) {
        debug!("loaded {}x{} image", image.width(), image.height());
        self.raster = Some(Raster {
            canvas: image.clone(),
            base: image,
        });
        self.registry.clear();
        self.history.clear();
        self.generation += 1;
        self.state = SessionState::Loaded;
    }

    /// Validates and decodes `bytes`; on error the session is left untouched.
    pub fn load_image_bytes(&mut self, bytes: &[u8], mime_hint: Option<&str>) -> Result<(), EditError> {
        let image = ingest::decode_image(bytes, mime_hint)?;
        self.load_image(image);
        Ok(())
    }

    pub fn begin_recognition(&mut self) -> Result<RecognitionTicket, EditError> {
        if self.raster.is_none() {
            return Err(EditError::InvalidState(self.state.as_str()));
        }
        self.generation += 1;
        self.state = SessionState::RecognitionPending;
        Ok(RecognitionTicket {
            generation: self.generation,
        })
    }

    /// Applies a recognition result. Returns `Ok(false)` when the ticket
    /// belongs to an image or request that has since been replaced.
    pub fn complete_recognition(
        &mut self,
        ticket: RecognitionTicket,
        result: Result<Recognition, EditError>,
    ) -> Result<bool, EditError> {
        if ticket.generation != self.generation || self.state != SessionState::RecognitionPending {
            info!(
                "dropping stale recognition result (ticket {}, current {})",
                ticket.generation, self.generation
            );
            return Ok(false);
        }
        match result {
            Ok(recognition) => {
                info!("recognized {} words", recognition.words.len());
                self.registry.load(recognition.words);
                self.state = SessionState::RecognitionComplete;
                Ok(true)
            }
            Err(err) => {
                warn!("recognition failed: {}", err);
                self.registry.clear();
                self.state = SessionState::RecognitionFailed;
                Err(err)
            }
        }
    }

    /// Runs `recognizer` on the calling thread against the base image.
    pub fn recognize(
        &mut self,
        recognizer: &dyn Recognizer,
        language: &str,
        progress: Progress<'_>,
    ) -> Result<usize, EditError> {
        let ticket = self.begin_recognition()?;
        let result = match self.base() {
            Some(image) => recognizer.recognize(image, language, progress),
            None => Err(EditError::InvalidState(SessionState::Empty.as_str())),
        };
        self.complete_recognition(ticket, result)?;
        Ok(self.registry.len())
    }

    pub fn select(&mut self, id: WordId) -> Result<(), EditError> {
        self.ensure_editable()?;
        self.registry.select(id)
    }

    pub fn clear_selection(&mut self) {
        self.registry.clear_selection();
    }

    pub fn set_color_pick(&mut self, enabled: bool) {
        self.color_pick = enabled;
    }

    /// Explicit text color for the following replacements; `None` returns to
    /// sampled colors.
    pub fn set_text_color(&mut self, color: Option<Rgb>) {
        self.session_color = color;
    }

    pub fn pointer_click(&mut self, x: u32, y: u32) -> PointerResult {
        if self.color_pick {
            let Some(canvas) = self.canvas() else {
                return PointerResult::Missed;
            };
            return match color::sample_at(canvas, x as i64, y as i64) {
                Ok(pixel) => {
                    let picked = Rgb::from(pixel);
                    self.session_color = Some(picked);
                    self.color_pick = false;
                    debug!("picked text color {}", picked);
                    PointerResult::Picked(picked)
                }
                Err(err) => {
                    debug!("color pick missed: {}", err);
                    PointerResult::Missed
                }
            };
        }
        if self.state != SessionState::RecognitionComplete {
            return PointerResult::Missed;
        }
        match self.registry.hit_test(x, y) {
            Some(id) => match self.registry.select(id) {
                Ok(()) => PointerResult::Selected(id),
                Err(_) => PointerResult::Missed,
            },
            None => {
                self.registry.clear_selection();
                PointerResult::Cleared
            }
        }
    }

    /// Live color preview under the pointer while picking.
    pub fn pointer_move(&self, x: u32, y: u32) -> Option<Rgb> {
        if !self.color_pick {
            return None;
        }
        let canvas = self.canvas()?;
        color::sample_at(canvas, x as i64, y as i64).ok().map(Rgb::from)
    }

    /// Erases word `id`, draws `new_text` in its place and records the edit.
    pub fn replace(
        &mut self,
        id: WordId,
        new_text: &str,
        style: &StyleOptions,
    ) -> Result<ReplaceOutcome, EditError> {
        self.ensure_editable()?;
        let word = self.registry.get(id).cloned().ok_or(EditError::NotFound(id))?;
        let raster = self
            .raster
            .as_mut()
            .ok_or(EditError::InvalidState(SessionState::Empty.as_str()))?;

        // A previously edited box already holds our own text; keep its ink color.
        let sampled_color = match &word.style {
            Some(previous) => previous.sampled_color,
            None => color::sample_text_color(&raster.canvas, &word.bbox),
        };
        let word_style = WordStyle {
            sampled_color,
            custom_color: style.text_color.or(self.session_color),
            font_family: style
                .font_family
                .clone()
                .unwrap_or_else(|| self.options.font_family.clone()),
            erase_mode: self.options.erase_mode,
            background_box: style.background_box.or(self.options.background_box),
        };

        let outcome = render_edit(
            &mut raster.canvas,
            &mut self.fonts,
            &word.bbox,
            new_text,
            &word_style,
        );
        self.registry.apply_edit(id, new_text, word_style)?;
        self.history.push(id, &word.original_text, new_text);
        info!(
            "replaced word {} '{}' -> '{}' ({:?}, size {})",
            id, word.original_text, new_text, outcome.applied, outcome.font_size
        );
        Ok(outcome)
    }

    /// Restores the base image and replays every edit with its stored style.
    pub fn redraw(&mut self) {
        let Some(raster) = self.raster.as_mut() else {
            return;
        };
        raster.canvas = raster.base.clone();
        let mut replayed = 0;
        for word in self.registry.edited() {
            let Some(style) = &word.style else {
                continue;
            };
            render_edit(&mut raster.canvas, &mut self.fonts, &word.bbox, &word.text, style);
            replayed += 1;
        }
        debug!("redraw replayed {} edits", replayed);
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        if self.options == options {
            return;
        }
        self.options = options;
        self.redraw();
    }

    pub fn set_show_boxes(&mut self, show: bool) {
        let options = RenderOptions {
            show_boxes: show,
            ..self.options.clone()
        };
        self.set_options(options);
    }

    /// Drops every edit and the history; the canvas returns to the base image.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.history.clear();
        if let Some(raster) = self.raster.as_mut() {
            raster.canvas = raster.base.clone();
        }
        info!("reset all edits");
    }

    /// Canvas as it should be shown, with word outlines when enabled.
    pub fn display(&self) -> Option<Cow<'_, RgbaImage>> {
        let canvas = self.canvas()?;
        if !self.options.show_boxes {
            return Some(Cow::Borrowed(canvas));
        }
        let mut view = canvas.clone();
        for word in self.registry.words() {
            outline_rect(&mut view, &word.bbox, OVERLAY_COLOR, OVERLAY_STROKE);
        }
        Some(Cow::Owned(view))
    }

    pub fn export_png(&self) -> Result<Vec<u8>> {
        let canvas = self.canvas().ok_or_else(|| anyhow!("no image loaded"))?;
        encode_png(canvas)
    }

    fn ensure_editable(&self) -> Result<(), EditError> {
        match self.state {
            SessionState::RecognitionComplete => Ok(()),
            other => Err(EditError::InvalidState(other.as_str())),
        }
    }
}

fn render_edit(
    canvas: &mut RgbaImage,
    fonts: &mut FontBook,
    bbox: &BBox,
    text: &str,
    style: &WordStyle,
) -> ReplaceOutcome {
    let applied = reconstruct(canvas, bbox, style.erase_mode);
    if let Some(background) = style.background_box {
        let padded = BBox::new(
            bbox.x0.saturating_sub(background.padding.left),
            bbox.y0.saturating_sub(background.padding.top),
            bbox.x1.saturating_add(background.padding.right),
            bbox.y1.saturating_add(background.padding.bottom),
        );
        fill_rect(canvas, &padded, background.color);
    }

    let font = fonts.resolve(&style.font_family);
    let calibration = calculate_font_size(
        text,
        bbox.width() as f32,
        bbox.height() as f32,
        &font,
    );
    debug!(
        "calibrated '{}' to {}px in {} steps (converged: {})",
        text, calibration.size, calibration.iterations, calibration.converged
    );
    let position = place(bbox, calibration.size as f32, &font);
    let text_color = style.text_color();
    let draw = TextDraw {
        text,
        x: position.x,
        y: position.y,
        font_size: calibration.size as f32,
        font_family: font.family_or(&style.font_family),
        color: text_color,
        width_hint: calibration.measured_width,
    };
    if let Err(err) = draw_text(canvas, &draw, fonts.database()) {
        warn!("failed to draw '{}': {:#}", text, err);
    }

    ReplaceOutcome {
        applied,
        font_size: calibration.size,
        converged: calibration.converged,
        position,
        text_color,
    }
}
