//! Settings model.

use serde::{Deserialize, Serialize};

/// Application settings that persist across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Dark color scheme.
    pub dark_mode: bool,
    /// Larger font sizes for readability.
    pub large_text: bool,
    /// High-contrast palette.
    pub high_contrast: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            dark_mode: true,
            large_text: false,
            high_contrast: false,
        }
    }
}

impl AppSettings {
    /// Returns a copy with dark mode flipped.
    #[must_use]
    pub const fn toggle_dark_mode(mut self) -> Self {
        self.dark_mode = !self.dark_mode;
        self
    }

    /// Returns a copy with large text flipped.
    #[must_use]
    pub const fn toggle_large_text(mut self) -> Self {
        self.large_text = !self.large_text;
        self
    }

    /// Returns a copy with high contrast flipped.
    #[must_use]
    pub const fn toggle_high_contrast(mut self) -> Self {
        self.high_contrast = !self.high_contrast;
        self
    }
}
