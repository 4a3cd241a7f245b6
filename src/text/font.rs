use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use ttf_parser::Face;
use ttf_parser::name_id;
use usvg::fontdb;

/// Width and vertical metrics of text at a given pixel size.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32;

    /// `None` when the measurement source has no real font metrics.
    fn vertical_metrics(&self, font_size: f32) -> Option<VerticalMetrics>;
}

/// Both values are positive pixel distances from the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMetrics {
    pub ascent: f32,
    pub descent: f32,
}

#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    ascender: i16,
    descender: i16,
    family: Option<String>,
    face_index: u32,
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn scale(&self, font_size: f32) -> f32 {
        font_size / self.units_per_em.max(1) as f32
    }
}

impl TextMeasure for FontMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let Ok(face) = Face::parse(&self.data, self.face_index) else {
            return EstimatedMetrics.text_width(text, font_size);
        };
        let mut advance = 0u32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            if ch == ' ' {
                advance = advance.saturating_add(self.space_advance as u32);
                continue;
            }
            let glyph_advance = face
                .glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .unwrap_or(self.space_advance);
            advance = advance.saturating_add(glyph_advance as u32);
        }
        advance as f32 * self.scale(font_size)
    }

    fn vertical_metrics(&self, font_size: f32) -> Option<VerticalMetrics> {
        let scale = self.scale(font_size);
        Some(VerticalMetrics {
            ascent: self.ascender as f32 * scale,
            descent: (self.descender as f32).abs() * scale,
        })
    }
}

/// Per-character width heuristic used when no font file is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedMetrics;

impl TextMeasure for EstimatedMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        estimate_text_width_units(text) * font_size
    }

    fn vertical_metrics(&self, _font_size: f32) -> Option<VerticalMetrics> {
        None
    }
}

fn estimate_char_units(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF
    ) {
        1.0
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars()
        .filter(|ch| *ch != '\n')
        .map(estimate_char_units)
        .sum()
}

/// Font used for one edit: a parsed face, or the width heuristic.
#[derive(Clone)]
pub enum TextFont {
    Loaded(FontMetrics),
    Estimated,
}

impl TextFont {
    /// Family name to hand to the rasterizer.
    pub fn family_or<'a>(&'a self, requested: &'a str) -> &'a str {
        match self {
            TextFont::Loaded(metrics) => metrics.family().unwrap_or(requested),
            TextFont::Estimated => requested,
        }
    }
}

impl TextMeasure for TextFont {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match self {
            TextFont::Loaded(metrics) => metrics.text_width(text, font_size),
            TextFont::Estimated => EstimatedMetrics.text_width(text, font_size),
        }
    }

    fn vertical_metrics(&self, font_size: f32) -> Option<VerticalMetrics> {
        match self {
            TextFont::Loaded(metrics) => metrics.vertical_metrics(font_size),
            TextFont::Estimated => None,
        }
    }
}

pub fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(&data, None)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

/// Font database shared with the rasterizer plus a per-family cache of bold faces.
pub struct FontBook {
    db: Arc<fontdb::Database>,
    custom: Option<FontMetrics>,
    cache: HashMap<String, Option<FontMetrics>>,
}

impl FontBook {
    /// System fonts, plus the font file at `font_path` when given.
    pub fn system(font_path: Option<&Path>) -> Result<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(family) = installed_fallback_family(&db) {
            debug!("generic sans-serif resolves to '{}'", family);
            db.set_sans_serif_family(family);
        }
        let custom = match font_path {
            Some(path) => {
                let metrics = load_font_metrics(path)?;
                db.load_font_data(metrics.data().to_vec());
                Some(metrics)
            }
            None => None,
        };
        debug!("font database has {} faces", db.len());
        Ok(Self {
            db: Arc::new(db),
            custom,
            cache: HashMap::new(),
        })
    }

    /// No fonts at all; every family measures with [`EstimatedMetrics`].
    pub fn estimated() -> Self {
        Self {
            db: Arc::new(fontdb::Database::new()),
            custom: None,
            cache: HashMap::new(),
        }
    }

    pub fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    pub fn custom_family(&self) -> Option<&str> {
        self.custom.as_ref().and_then(|metrics| metrics.family())
    }

    pub fn resolve(&mut self, family: &str) -> TextFont {
        if let Some(custom) = &self.custom
            && custom
                .family()
                .is_some_and(|name| name.eq_ignore_ascii_case(family))
        {
            return TextFont::Loaded(custom.clone());
        }
        let db = &self.db;
        let entry = self
            .cache
            .entry(family.to_string())
            .or_insert_with(|| match load_bold_face(db, family) {
                Ok(metrics) => Some(metrics),
                Err(err) if db.is_empty() => {
                    debug!("measuring '{}' with estimates: {}", family, err);
                    None
                }
                Err(err) => {
                    warn!("no usable face for '{}', text will not be drawn: {}", family, err);
                    None
                }
            });
        match entry {
            Some(metrics) => TextFont::Loaded(metrics.clone()),
            None => TextFont::Estimated,
        }
    }
}

#[cfg(target_os = "macos")]
fn fallback_families() -> &'static [&'static str] {
    &["Noto Sans", "Helvetica Neue", "Hiragino Sans", "Arial"]
}

#[cfg(target_os = "windows")]
fn fallback_families() -> &'static [&'static str] {
    &["Noto Sans", "Arial", "Segoe UI", "Arial Unicode MS"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn fallback_families() -> &'static [&'static str] {
    &["Noto Sans", "DejaVu Sans", "Liberation Sans", "FreeSans", "Cantarell"]
}

/// First installed fallback family, else the family of the first face.
fn installed_fallback_family(db: &fontdb::Database) -> Option<String> {
    let installed = |candidate: &str| {
        db.faces().any(|face| {
            face.families
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(candidate))
        })
    };
    fallback_families()
        .iter()
        .find(|candidate| installed(candidate))
        .map(|candidate| candidate.to_string())
        .or_else(|| {
            db.faces()
                .next()
                .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
        })
}

/// Bold face for `family`, then the fallback families, then any face at all.
fn load_bold_face(db: &fontdb::Database, family: &str) -> Result<FontMetrics> {
    let requested = match family.to_ascii_lowercase().as_str() {
        "sans-serif" => fontdb::Family::SansSerif,
        "serif" => fontdb::Family::Serif,
        "monospace" => fontdb::Family::Monospace,
        _ => fontdb::Family::Name(family),
    };
    let mut families = vec![requested];
    families.extend(fallback_families().iter().map(|name| fontdb::Family::Name(name)));
    let query = fontdb::Query {
        families: &families,
        weight: fontdb::Weight::BOLD,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .or_else(|| db.faces().next().map(|face| face.id))
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    load_font_metrics_from_data(&data, Some(face_index))
}

fn load_font_metrics_from_data(data: &[u8], face_index: Option<u32>) -> Result<FontMetrics> {
    let indices = match face_index {
        Some(index) => index..index + 1,
        None => 0..ttf_parser::fonts_in_collection(data).unwrap_or(1),
    };
    let shared = Arc::new(data.to_vec());
    for index in indices {
        let Ok(face) = Face::parse(data, index) else {
            continue;
        };
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 2);
        return Ok(FontMetrics {
            data: Arc::clone(&shared),
            units_per_em,
            space_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            family: extract_family_name(&face),
            face_index: index,
        });
    }
    Err(anyhow!("failed to parse font data"))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_weights_character_classes() {
        let width = EstimatedMetrics.text_width("Hi", 10.0);
        assert!((width - 11.0).abs() < 1e-4);
        let spaced = EstimatedMetrics.text_width("a b", 10.0);
        assert!((spaced - 13.5).abs() < 1e-4);
        assert!(EstimatedMetrics.vertical_metrics(12.0).is_none());
    }

    #[test]
    fn estimated_book_never_loads_fonts() {
        let mut book = FontBook::estimated();
        let font = book.resolve("sans-serif");
        assert!(matches!(font, TextFont::Estimated));
        assert_eq!(font.family_or("sans-serif"), "sans-serif");
        assert!(book.custom_family().is_none());
    }

    #[test]
    fn generic_family_resolves_to_installed_face() {
        let mut book = FontBook::system(None).expect("system fonts");
        if book.database().is_empty() {
            return;
        }
        let font = book.resolve("sans-serif");
        let TextFont::Loaded(metrics) = &font else {
            panic!("sans-serif should resolve when fonts are installed");
        };
        assert!(metrics.family().is_some());
        assert_ne!(font.family_or("sans-serif"), "sans-serif");
        assert!(font.vertical_metrics(20.0).is_some());

        let unknown = book.resolve("No Such Family 12345");
        assert!(matches!(unknown, TextFont::Loaded(_)));
    }

    #[test]
    fn font_path_is_preferred_for_its_family() {
        let system = FontBook::system(None).expect("system fonts");
        let path = system.database().faces().find_map(|face| match &face.source {
            fontdb::Source::File(path) if face.index == 0 => Some(path.clone()),
            _ => None,
        });
        let Some(path) = path else {
            return;
        };
        let mut book = FontBook::system(Some(&path)).expect("custom font");
        let family = book.custom_family().expect("custom family").to_string();
        assert!(matches!(book.resolve(&family), TextFont::Loaded(_)));
    }

    #[test]
    fn garbage_font_data_is_rejected() {
        assert!(load_font_metrics_from_data(b"not a font", None).is_err());
    }

    #[test]
    fn missing_font_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_font_metrics(&dir.path().join("missing.ttf"))
            .err()
            .expect("missing font");
        assert!(err.to_string().contains("failed to read font"));
    }
}
