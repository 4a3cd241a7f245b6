use image::{Rgba, RgbaImage};
use image_text_editor::{Config, FontBook, Settings, execute};

const WORDS: &str = r#"{"words": [
    {"text": "Hello", "confidence": 95, "bbox": {"x0": 10, "y0": 10, "x1": 60, "y1": 30}},
    {"text": "World", "confidence": 80, "bbox": {"x0": 80, "y0": 10, "x1": 140, "y1": 30}}
]}"#;

fn fixture(dir: &std::path::Path) -> Config {
    let input = dir.join("input.png");
    RgbaImage::from_pixel(200, 50, Rgba([255, 255, 255, 255]))
        .save(&input)
        .expect("save input");
    let words = dir.join("words.json");
    std::fs::write(&words, WORDS).expect("write words");
    Config {
        input,
        words_path: Some(words),
        ..Config::default()
    }
}

#[tokio::test]
async fn word_list() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        replacements: vec!["0=Hi".to_string()],
        list_words: true,
        ..fixture(dir.path())
    };
    let output = execute(config, Settings::default(), FontBook::estimated())
        .await
        .expect("run");
    let output = output.trim_end().to_string();
    insta::assert_snapshot!(output);
}

#[tokio::test]
async fn writes_edited_png() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("out.png");
    let config = Config {
        replacements: vec!["1=There".to_string()],
        output: Some(out.clone()),
        show_boxes: true,
        ..fixture(dir.path())
    };
    let settings = Settings {
        show_boxes: true,
        ..Settings::default()
    };
    let output = execute(config, settings, FontBook::estimated())
        .await
        .expect("run");
    assert!(output.is_empty());

    let written = image::open(&out).expect("open output").to_rgba8();
    assert_eq!(written.dimensions(), (200, 50));
    assert_eq!(*written.get_pixel(8, 8), Rgba([0x00, 0xC8, 0x53, 255]));
}

#[tokio::test]
async fn unknown_word_id_fails_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        replacements: vec!["9=nope".to_string()],
        list_words: true,
        ..fixture(dir.path())
    };
    let err = execute(config, Settings::default(), FontBook::estimated())
        .await
        .expect_err("unknown id");
    assert!(format!("{:#}", err).contains("word 9 not found"));
}

#[tokio::test]
async fn requires_an_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = execute(fixture(dir.path()), Settings::default(), FontBook::estimated())
        .await
        .expect_err("nothing to do");
    assert!(err.to_string().contains("nothing to do"));
}
