use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::EditError;
use crate::ocr::RecognizedWord;
use crate::reconstruct::EraseMode;

pub type WordId = u32;

/// Axis-aligned pixel rectangle `(x0, y0)-(x1, y1)`, half-open on the far edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawBBox")]
pub struct BBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

#[derive(Deserialize)]
struct RawBBox {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl From<RawBBox> for BBox {
    fn from(raw: RawBBox) -> Self {
        BBox::new(raw.x0, raw.y0, raw.x1, raw.y1)
    }
}

impl BBox {
    /// Builds a box, swapping coordinates so that `x0 <= x1` and `y0 <= y1`.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Edges are inclusive so clicks on the outline still hit the word.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Padding {
    pub fn uniform(value: u32) -> Self {
        Self {
            top: value,
            bottom: value,
            left: value,
            right: value,
        }
    }
}

/// Filled rectangle drawn behind replacement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxStyle {
    pub color: Rgb,
    pub padding: Padding,
}

/// Style an edit was rendered with. Redraws replay from this, not from the
/// live options.
#[derive(Debug, Clone, PartialEq)]
pub struct WordStyle {
    /// Color read from the original ink before the first erase.
    pub sampled_color: Rgb,
    pub custom_color: Option<Rgb>,
    pub font_family: String,
    pub erase_mode: EraseMode,
    pub background_box: Option<BoxStyle>,
}

impl WordStyle {
    /// A user-chosen color always wins over the sampled one.
    pub fn text_color(&self) -> Rgb {
        self.custom_color.unwrap_or(self.sampled_color)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub id: WordId,
    pub text: String,
    pub original_text: String,
    pub confidence: f32,
    pub bbox: BBox,
    pub is_selected: bool,
    pub is_edited: bool,
    pub style: Option<WordStyle>,
}

/// Recognized words of the current image plus their selection/edit state.
#[derive(Debug, Default)]
pub struct WordRegistry {
    words: Vec<Word>,
}

impl WordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole set. Ids follow recognition order.
    pub fn load(&mut self, words: Vec<RecognizedWord>) {
        self.words = words
            .into_iter()
            .enumerate()
            .map(|(idx, word)| Word {
                id: idx as WordId,
                original_text: word.text.clone(),
                text: word.text,
                confidence: word.confidence.clamp(0.0, 100.0),
                bbox: BBox::new(word.bbox.x0, word.bbox.y0, word.bbox.x1, word.bbox.y1),
                is_selected: false,
                is_edited: false,
                style: None,
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, id: WordId) -> Option<&Word> {
        self.words.iter().find(|word| word.id == id)
    }

    pub fn selected(&self) -> Option<&Word> {
        self.words.iter().find(|word| word.is_selected)
    }

    pub fn edited(&self) -> impl Iterator<Item = &Word> {
        self.words.iter().filter(|word| word.is_edited)
    }

    /// Exclusive selection. An unknown id still clears the previous selection.
    pub fn select(&mut self, id: WordId) -> Result<(), EditError> {
        let mut found = false;
        for word in &mut self.words {
            word.is_selected = word.id == id;
            found |= word.is_selected;
        }
        if found {
            Ok(())
        } else {
            Err(EditError::NotFound(id))
        }
    }

    pub fn clear_selection(&mut self) {
        for word in &mut self.words {
            word.is_selected = false;
        }
    }

    pub fn apply_edit(
        &mut self,
        id: WordId,
        new_text: &str,
        style: WordStyle,
    ) -> Result<(), EditError> {
        let word = self
            .words
            .iter_mut()
            .find(|word| word.id == id)
            .ok_or(EditError::NotFound(id))?;
        word.text = new_text.to_string();
        word.is_edited = true;
        word.is_selected = false;
        word.style = Some(style);
        Ok(())
    }

    pub fn reset(&mut self) {
        for word in &mut self.words {
            word.text = word.original_text.clone();
            word.is_edited = false;
            word.is_selected = false;
            word.style = None;
        }
    }

    /// First word, in registry order, whose box contains the point.
    pub fn hit_test(&self, x: u32, y: u32) -> Option<WordId> {
        self.words
            .iter()
            .find(|word| word.bbox.contains(x, y))
            .map(|word| word.id)
    }
}
