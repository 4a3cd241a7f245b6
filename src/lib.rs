use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub mod color;
pub mod compositor;
pub mod edits;
pub mod error;
pub mod history;
pub mod ingest;
pub mod logging;
pub mod ocr;
pub mod reconstruct;
pub mod settings;
pub mod text;
pub mod words;

#[cfg(test)]
mod test_util;

pub use color::Rgb;
pub use compositor::{
    Compositor, PointerResult, RecognitionTicket, RenderOptions, ReplaceOutcome, SessionState,
    SharedCompositor, StyleOptions,
};
pub use error::EditError;
pub use history::{HISTORY_LIMIT, ReplacementHistory, ReplacementHistoryEntry};
pub use ocr::{Recognition, RecognizedWord, Recognizer, StaticRecognizer, TesseractRecognizer};
pub use reconstruct::{Applied, EraseMode};
pub use settings::Settings;
pub use text::FontBook;
pub use words::{BBox, BoxStyle, Padding, Word, WordId, WordRegistry, WordStyle};

/// Batch run: load, recognize, apply edits, export.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub input: PathBuf,
    pub words_path: Option<PathBuf>,
    pub ocr_lang: Option<String>,
    pub replacements: Vec<String>,
    pub edits_path: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub erase_mode: Option<String>,
    pub font_family: Option<String>,
    pub font_path: Option<String>,
    pub text_color: Option<String>,
    pub box_color: Option<String>,
    pub box_padding: Option<u32>,
    pub show_boxes: bool,
    pub list_words: bool,
    pub verbose: bool,
    pub settings_path: Option<String>,
}

pub async fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    apply_overrides(&mut settings, &config)?;
    let fonts = FontBook::system(settings.font_path.as_deref().map(Path::new))
        .with_context(|| "failed to load fonts")?;
    adopt_custom_family(&mut settings, &fonts);
    execute(config, settings, fonts).await
}

/// A font file loaded with `--font-path` becomes the default family unless
/// another family was chosen.
fn adopt_custom_family(settings: &mut Settings, fonts: &FontBook) {
    let Some(family) = fonts.custom_family() else {
        return;
    };
    if settings.font_family == Settings::default().font_family {
        debug!("using '{}' from the font file as default family", family);
        settings.font_family = family.to_string();
    }
}

/// Same as [`run`] with settings and fonts already resolved.
pub async fn execute(config: Config, settings: Settings, fonts: FontBook) -> Result<String> {
    if !config.list_words && config.output.is_none() {
        return Err(anyhow!("nothing to do: pass --output and/or --list-words"));
    }
    let mut edits = config
        .replacements
        .iter()
        .map(|value| edits::parse_replacement(value))
        .collect::<Result<Vec<_>>>()?;
    if let Some(path) = &config.edits_path {
        edits.extend(edits::load_edit_script(path)?);
    }

    let image = ingest::load_image_file(&config.input)?;
    let mut compositor = Compositor::new(fonts, settings.render_options()?);
    compositor.set_text_color(settings.text_color()?);
    compositor.load_image(image.clone());

    let recognizer: Arc<dyn Recognizer> = match &config.words_path {
        Some(path) => Arc::new(StaticRecognizer::from_json_file(path)?),
        None => Arc::new(TesseractRecognizer::new(settings.min_confidence)),
    };
    let language = config
        .ocr_lang
        .clone()
        .unwrap_or_else(|| settings.ocr_languages.clone());
    let ticket = compositor.begin_recognition()?;
    debug!("recognition request {}", ticket.generation());
    let result = ocr::recognize_async(recognizer, image, language, |status, fraction| {
        debug!("recognition: {} ({:.0}%)", status, fraction * 100.0);
    })
    .await;
    if !compositor.complete_recognition(ticket, result)? {
        return Err(anyhow!("recognition result was discarded"));
    }

    for edit in &edits {
        let style = edit.style_options()?;
        compositor
            .replace(edit.id, &edit.text, &style)
            .with_context(|| format!("failed to replace word {}", edit.id))?;
    }
    if config.verbose && !compositor.history().is_empty() {
        eprint!("{}", format_history(compositor.history()));
    }

    if let Some(output) = &config.output {
        let view = compositor
            .display()
            .ok_or_else(|| anyhow!("no image loaded"))?;
        let bytes = text::encode_png(&view)?;
        std::fs::write(output, bytes)
            .with_context(|| format!("failed to write output: {}", output.display()))?;
    }

    if config.list_words {
        Ok(format_word_list(compositor.words()))
    } else {
        Ok(String::new())
    }
}

fn apply_overrides(settings: &mut Settings, config: &Config) -> Result<()> {
    if let Some(mode) = &config.erase_mode {
        settings.erase_mode = mode.parse::<EraseMode>()?;
    }
    if let Some(family) = &config.font_family {
        settings.font_family = family.clone();
    }
    if let Some(path) = &config.font_path {
        settings.font_path = Some(path.clone());
    }
    if let Some(color) = &config.text_color {
        settings.text_color = Some(color.clone());
    }
    if let Some(color) = &config.box_color {
        settings.box_enabled = true;
        settings.box_color = color.clone();
    }
    if let Some(padding) = config.box_padding {
        settings.box_padding = Padding::uniform(padding);
    }
    if config.show_boxes {
        settings.show_boxes = true;
    }
    Ok(())
}

/// One `id<TAB>confidence<TAB>x0,y0,x1,y1<TAB>text` line per word.
pub fn format_word_list(words: &[Word]) -> String {
    let mut output = String::new();
    for word in words {
        output.push_str(&format!(
            "{}\t{:.1}\t{},{},{},{}\t{}\n",
            word.id,
            word.confidence,
            word.bbox.x0,
            word.bbox.y0,
            word.bbox.x1,
            word.bbox.y1,
            word.text
        ));
    }
    output
}

pub fn format_history(history: &ReplacementHistory) -> String {
    let mut output = String::new();
    for entry in history.entries() {
        output.push_str(&format!(
            "{}\t{}\t{} -> {}\n",
            entry.timestamp_rfc3339(),
            entry.id,
            entry.old_text,
            entry.new_text
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_take_precedence_over_settings() {
        let mut settings = Settings::default();
        let config = Config {
            erase_mode: Some("white".to_string()),
            box_color: Some("#000000".to_string()),
            box_padding: Some(2),
            ..Config::default()
        };
        apply_overrides(&mut settings, &config).expect("overrides");
        assert_eq!(settings.erase_mode, EraseMode::White);
        let options = settings.render_options().expect("options");
        assert_eq!(
            options.background_box,
            Some(BoxStyle {
                color: Rgb::BLACK,
                padding: Padding::uniform(2),
            })
        );
    }

    #[test]
    fn unknown_erase_mode_is_rejected() {
        let mut settings = Settings::default();
        let config = Config {
            erase_mode: Some("smudge".to_string()),
            ..Config::default()
        };
        assert!(apply_overrides(&mut settings, &config).is_err());
    }

    #[test]
    fn font_file_family_is_default_only_when_unset() {
        let fonts = FontBook::estimated();
        let mut settings = Settings::default();
        adopt_custom_family(&mut settings, &fonts);
        assert_eq!(settings.font_family, "sans-serif");

        let db = FontBook::system(None).expect("fonts").database();
        let Some(path) = db.faces().find_map(|face| match &face.source {
            usvg::fontdb::Source::File(path) if face.index == 0 => Some(path.clone()),
            _ => None,
        }) else {
            return;
        };
        let fonts = FontBook::system(Some(&path)).expect("fonts");
        let family = fonts.custom_family().expect("family").to_string();

        let mut settings = Settings::default();
        adopt_custom_family(&mut settings, &fonts);
        assert_eq!(settings.font_family, family);

        let mut settings = Settings::default();
        settings.font_family = "Serif".to_string();
        adopt_custom_family(&mut settings, &fonts);
        assert_eq!(settings.font_family, "Serif");
    }

    #[test]
    fn history_lines_are_most_recent_first() {
        let mut history = ReplacementHistory::new();
        history.push(0, "Hello", "Hi");
        history.push(1, "World", "There");
        let formatted = format_history(&history);
        let lines = formatted.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("\t1\tWorld -> There"));
        assert!(lines[1].ends_with("\t0\tHello -> Hi"));
    }
}
