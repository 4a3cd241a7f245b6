use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "image-text-editor",
    version,
    about = "Replace words inside an image, keeping the background and text style"
)]
struct Cli {
    /// Image to edit (png, jpeg, webp, ...)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Recognized words as JSON instead of running tesseract
    #[arg(short = 'w', long = "words")]
    words: Option<PathBuf>,

    /// Tesseract language(s), e.g. eng or eng+jpn
    #[arg(short = 'l', long = "ocr-lang")]
    ocr_lang: Option<String>,

    /// Replacement as ID=TEXT (repeatable, applied in order)
    #[arg(short = 'R', long = "replace")]
    replace: Vec<String>,

    /// TOML file with [[edits]] entries, applied after --replace
    #[arg(short = 'e', long = "edits")]
    edits: Option<PathBuf>,

    /// Where to write the edited PNG
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Background reconstruction: auto, legacy or white
    #[arg(long = "erase-mode")]
    erase_mode: Option<String>,

    /// Font family for replacement text
    #[arg(long = "font-family")]
    font_family: Option<String>,

    /// Font file to load in addition to system fonts
    #[arg(long = "font-path")]
    font_path: Option<String>,

    /// Text color as hex; overrides sampled colors
    #[arg(long = "text-color")]
    text_color: Option<String>,

    /// Draw a filled box of this color behind replacement text
    #[arg(long = "box-color")]
    box_color: Option<String>,

    /// Padding around the background box in pixels
    #[arg(long = "box-padding")]
    box_padding: Option<u32>,

    /// Outline every recognized word in the output
    #[arg(long = "show-boxes")]
    show_boxes: bool,

    /// Print recognized words (id, confidence, box, text) after edits
    #[arg(long = "list-words")]
    list_words: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    image_text_editor::logging::init(cli.verbose)?;

    let config = image_text_editor::Config {
        input: cli.input,
        words_path: cli.words,
        ocr_lang: cli.ocr_lang,
        replacements: cli.replace,
        edits_path: cli.edits,
        output: cli.output,
        erase_mode: cli.erase_mode,
        font_family: cli.font_family,
        font_path: cli.font_path,
        text_color: cli.text_color,
        box_color: cli.box_color,
        box_padding: cli.box_padding,
        show_boxes: cli.show_boxes,
        list_words: cli.list_words,
        verbose: cli.verbose,
        settings_path: cli.read_settings,
    };
    let output = image_text_editor::run(config).await?;
    if !output.is_empty() {
        print!("{}", output);
    }
    Ok(())
}
