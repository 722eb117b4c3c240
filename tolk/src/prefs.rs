//! Theme and interface-locale preferences

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
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

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }
}

/// Per-client preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: Theme,
    /// Interface locale, e.g. "en" or "he"
    pub locale: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            locale: "en".to_string(),
        }
    }
}

impl Preferences {
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn set_dark(&mut self, dark: bool) {
        self.theme = if dark { Theme::Dark } else { Theme::Light };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_theme() {
        let mut prefs = Preferences::default();
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.toggle_theme(), Theme::Dark);
        assert!(prefs.theme.is_dark());
        assert_eq!(prefs.toggle_theme(), Theme::Light);
    }

    #[test]
    fn test_set_dark() {
        let mut prefs = Preferences::default();
        prefs.set_dark(true);
        assert_eq!(prefs.theme, Theme::Dark);
        prefs.set_dark(false);
        assert_eq!(prefs.theme, Theme::Light);
    }

    #[test]
    fn test_serde_shape() {
        let prefs: Preferences =
            serde_json::from_str(r#"{"theme": "dark", "locale": "he"}"#).unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.locale, "he");
        assert_eq!(
            serde_json::to_string(&Preferences::default()).unwrap(),
            r#"{"theme":"light","locale":"en"}"#
        );
    }
}
