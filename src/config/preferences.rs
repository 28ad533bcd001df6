use crate::error::Result;
use crate::storage::{ LocalStorage, THEME_KEY };
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Model shown in the header. Display-only: the `/ask` endpoint picks its own model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Model {
    #[default]
    Gpt4,
    Gpt4o,
    Gpt35,
}

impl Model {
    pub const ALL: [Model; 3] = [Model::Gpt4, Model::Gpt4o, Model::Gpt35];

    pub fn display_name(&self) -> &'static str {
        match self {
            Model::Gpt4 => "GPT-4",
            Model::Gpt4o => "GPT-4o",
            Model::Gpt35 => "GPT-3.5",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseModelError {
    message: String,
}

impl fmt::Display for ParseModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseModelError {}

impl FromStr for Model {
    type Err = ParseModelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Model::ALL.iter()
            .find(|m| m.display_name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| ParseModelError {
                message: format!(
                    "Invalid model: '{}' (choose from {})",
                    s,
                    Model::ALL.map(|m| m.display_name()).join(", ")
                ),
            })
    }
}

/// UI preferences. Only the theme is persisted.
pub struct Preferences {
    storage: Arc<dyn LocalStorage>,
    theme: Theme,
    model: Model,
}

impl Preferences {
    pub fn load(storage: Arc<dyn LocalStorage>) -> Self {
        let theme = match storage.get_item(THEME_KEY).as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        };
        Self { storage, theme, model: Model::default() }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        self.theme = self.theme.toggled();
        self.storage.set_item(THEME_KEY, self.theme.as_str())?;
        Ok(self.theme)
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }
}
