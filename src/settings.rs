use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::color::Rgb;
use crate::compositor::RenderOptions;
use crate::reconstruct::EraseMode;
use crate::words::{BoxStyle, Padding};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub erase_mode: EraseMode,
    pub font_family: String,
    pub font_path: Option<String>,
    pub text_color: Option<String>,
    pub show_boxes: bool,
    pub box_enabled: bool,
    pub box_color: String,
    pub box_padding: Padding,
    pub ocr_languages: String,
    pub min_confidence: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            erase_mode: EraseMode::Auto,
            font_family: "sans-serif".to_string(),
            font_path: None,
            text_color: None,
            show_boxes: false,
            box_enabled: false,
            box_color: "#ffffff".to_string(),
            box_padding: Padding::default(),
            ocr_languages: "eng".to_string(),
            min_confidence: 0.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    render: Option<RenderSettings>,
    #[serde(rename = "box")]
    background_box: Option<BoxSettings>,
    ocr: Option<OcrSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderSettings {
    erase_mode: Option<EraseMode>,
    font_family: Option<String>,
    font_path: Option<String>,
    text_color: Option<String>,
    show_boxes: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct BoxSettings {
    enabled: Option<bool>,
    color: Option<String>,
    padding_top: Option<u32>,
    padding_bottom: Option<u32>,
    padding_left: Option<u32>,
    padding_right: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    languages: Option<String>,
    min_confidence: Option<f32>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(render) = incoming.render {
            if let Some(mode) = render.erase_mode {
                self.erase_mode = mode;
            }
            if let Some(family) = render.font_family {
                if !family.trim().is_empty() {
                    self.font_family = family;
                }
            }
            if let Some(path) = render.font_path {
                if !path.trim().is_empty() {
                    self.font_path = Some(path);
                }
            }
            if let Some(color) = render.text_color {
                if !color.trim().is_empty() {
                    self.text_color = Some(color);
                }
            }
            if let Some(show) = render.show_boxes {
                self.show_boxes = show;
            }
        }
        if let Some(background) = incoming.background_box {
            if let Some(enabled) = background.enabled {
                self.box_enabled = enabled;
            }
            if let Some(color) = background.color {
                if !color.trim().is_empty() {
                    self.box_color = color;
                }
            }
            if let Some(top) = background.padding_top {
                self.box_padding.top = top;
            }
            if let Some(bottom) = background.padding_bottom {
                self.box_padding.bottom = bottom;
            }
            if let Some(left) = background.padding_left {
                self.box_padding.left = left;
            }
            if let Some(right) = background.padding_right {
                self.box_padding.right = right;
            }
        }
        if let Some(ocr) = incoming.ocr {
            if let Some(languages) = ocr.languages {
                if !languages.trim().is_empty() {
                    self.ocr_languages = languages;
                }
            }
            if let Some(confidence) = ocr.min_confidence {
                self.min_confidence = confidence.clamp(0.0, 100.0);
            }
        }
    }

    pub fn text_color(&self) -> Result<Option<Rgb>> {
        self.text_color
            .as_deref()
            .map(|value| {
                Rgb::from_hex(value).with_context(|| "invalid render.text_color in settings")
            })
            .transpose()
    }

    pub fn render_options(&self) -> Result<RenderOptions> {
        let background_box = if self.box_enabled {
            Some(BoxStyle {
                color: Rgb::from_hex(&self.box_color)
                    .with_context(|| "invalid box.color in settings")?,
                padding: self.box_padding,
            })
        } else {
            None
        };
        Ok(RenderOptions {
            erase_mode: self.erase_mode,
            font_family: self.font_family.clone(),
            background_box,
            show_boxes: self.show_boxes,
        })
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".image-text-editor"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn embedded_defaults_match_struct_defaults() {
        let parsed: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML).expect("defaults");
        let mut settings = Settings::default();
        settings.merge(parsed);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn writes_home_settings_on_first_load() {
        with_temp_home(|home| {
            load_settings(None).expect("settings");
            let written = home.join(".image-text-editor").join("settings.toml");
            assert!(written.exists());
        });
    }

    #[test]
    fn extra_settings_override_and_must_exist() {
        with_temp_home(|home| {
            let extra = home.join("extra.toml");
            std::fs::write(
                &extra,
                r##"
[render]
erase_mode = "legacy"
text_color = "#112233"

[box]
enabled = true
color = "000"
padding_left = 4

[ocr]
min_confidence = 150
"##,
            )
            .expect("write");
            let settings = load_settings(Some(&extra)).expect("settings");
            assert_eq!(settings.erase_mode, EraseMode::Legacy);
            assert_eq!(settings.min_confidence, 100.0);
            assert_eq!(settings.text_color().expect("color"), Some(Rgb::new(0x11, 0x22, 0x33)));

            let options = settings.render_options().expect("options");
            let background = options.background_box.expect("box");
            assert_eq!(background.color, Rgb::BLACK);
            assert_eq!(background.padding.left, 4);
            assert_eq!(background.padding.top, 0);

            assert!(load_settings(Some(&home.join("missing.toml"))).is_err());
        });
    }

    #[test]
    fn bad_box_color_is_reported() {
        let settings = Settings {
            box_enabled: true,
            box_color: "nope".to_string(),
            ..Settings::default()
        };
        assert!(settings.render_options().is_err());
    }
}
