use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::path::Path;

use crate::color::Rgb;
use crate::compositor::StyleOptions;
use crate::error::EditError;
use crate::words::{BoxStyle, Padding, WordId};

/// One replacement read from `--replace` or an edits file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptedEdit {
    pub id: WordId,
    pub text: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub box_color: Option<String>,
    #[serde(default)]
    pub box_padding: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct EditsFile {
    #[serde(default)]
    edits: Vec<ScriptedEdit>,
}

impl ScriptedEdit {
    pub fn new(id: WordId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            color: None,
            font_family: None,
            box_color: None,
            box_padding: None,
        }
    }

    /// Per-edit overrides; unset fields fall back to the session options.
    pub fn style_options(&self) -> Result<StyleOptions, EditError> {
        let text_color = self.color.as_deref().map(Rgb::from_hex).transpose()?;
        let background_box = match (&self.box_color, self.box_padding) {
            (Some(color), padding) => Some(BoxStyle {
                color: Rgb::from_hex(color)?,
                padding: Padding::uniform(padding.unwrap_or(0)),
            }),
            (None, Some(_)) => {
                return Err(EditError::InvalidInput(format!(
                    "edit for word {} sets box_padding without box_color",
                    self.id
                )));
            }
            (None, None) => None,
        };
        Ok(StyleOptions {
            text_color,
            background_box,
            font_family: self.font_family.clone(),
        })
    }
}

/// Parses `ID=TEXT`. The text may itself contain `=` and may be empty.
pub fn parse_replacement(value: &str) -> Result<ScriptedEdit> {
    let (id, text) = value
        .split_once('=')
        .ok_or_else(|| anyhow!("replacement must look like ID=TEXT: {}", value))?;
    let id = id
        .trim()
        .parse::<WordId>()
        .with_context(|| format!("invalid word id in replacement: {}", value))?;
    Ok(ScriptedEdit::new(id, text))
}

/// Reads `[[edits]]` tables from a TOML file, in file order.
pub fn load_edit_script(path: &Path) -> Result<Vec<ScriptedEdit>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read edits: {}", path.display()))?;
    let parsed: EditsFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse edits: {}", path.display()))?;
    Ok(parsed.edits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_replacement_pairs() {
        let edit = parse_replacement("3=a=b").expect("edit");
        assert_eq!(edit, ScriptedEdit::new(3, "a=b"));
        assert!(parse_replacement("hello").is_err());
        assert!(parse_replacement("x=1").is_err());
    }

    #[test]
    fn loads_edit_script_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("edits.toml");
        std::fs::write(
            &path,
            r##"
[[edits]]
id = 1
text = "Hi"
color = "#ff0000"

[[edits]]
id = 0
text = "There"
box_color = "fff"
box_padding = 2
"##,
        )
        .expect("write");
        let edits = load_edit_script(&path).expect("edits");
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].id, 1);

        let first = edits[0].style_options().expect("style");
        assert_eq!(first.text_color, Some(Rgb::new(255, 0, 0)));
        assert!(first.background_box.is_none());

        let second = edits[1].style_options().expect("style");
        assert_eq!(
            second.background_box,
            Some(BoxStyle {
                color: Rgb::WHITE,
                padding: Padding::uniform(2),
            })
        );
    }

    #[test]
    fn padding_without_color_is_rejected() {
        let mut edit = ScriptedEdit::new(0, "x");
        edit.box_padding = Some(4);
        assert!(matches!(
            edit.style_options(),
            Err(EditError::InvalidInput(_))
        ));
    }
}
