//! User preference scalars
//!
//! Reading preferences the UI shell consumes, written through the same
//! durable surface as everything else. Each scalar lives under its own
//! fixed key; absent keys fall back to defaults.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::storage::{keys, KeyValueStore};

/// Smallest readable font size
pub const MIN_FONT_SIZE: u32 = 8;
/// Largest readable font size
pub const MAX_FONT_SIZE: u32 = 72;
/// Default reading font size
pub const DEFAULT_FONT_SIZE: u32 = 16;

/// Which script(s) to display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Arabic,
    Urdu,
    #[default]
    Both,
}

/// Color theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Typed accessors over the preference keys
pub struct Preferences {
    kv: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn font_size(&self) -> CoreResult<u32> {
        Ok(self
            .kv
            .get_json(keys::FONT_SIZE)
            .await?
            .unwrap_or(DEFAULT_FONT_SIZE))
    }

    pub async fn set_font_size(&self, size: u32) -> CoreResult<()> {
        if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size) {
            return Err(CoreError::validation(
                "fontSize",
                format!("must be between {MIN_FONT_SIZE} and {MAX_FONT_SIZE}"),
            ));
        }
        Ok(self.kv.set_json(keys::FONT_SIZE, &size).await?)
    }

    pub async fn language(&self) -> CoreResult<Language> {
        Ok(self
            .kv
            .get_json(keys::LANGUAGE)
            .await?
            .unwrap_or_default())
    }

    pub async fn set_language(&self, language: Language) -> CoreResult<()> {
        Ok(self.kv.set_json(keys::LANGUAGE, &language).await?)
    }

    pub async fn theme(&self) -> CoreResult<Theme> {
        Ok(self.kv.get_json(keys::THEME).await?.unwrap_or_default())
    }

    pub async fn set_theme(&self, theme: Theme) -> CoreResult<()> {
        Ok(self.kv.set_json(keys::THEME, &theme).await?)
    }

    pub async fn auto_bookmark(&self) -> CoreResult<bool> {
        Ok(self
            .kv
            .get_json(keys::AUTO_BOOKMARK)
            .await?
            .unwrap_or(false))
    }

    pub async fn set_auto_bookmark(&self, enabled: bool) -> CoreResult<()> {
        Ok(self.kv.set_json(keys::AUTO_BOOKMARK, &enabled).await?)
    }

    pub async fn transliteration(&self) -> CoreResult<bool> {
        Ok(self
            .kv
            .get_json(keys::TRANSLITERATION)
            .await?
            .unwrap_or(false))
    }

    pub async fn set_transliteration(&self, enabled: bool) -> CoreResult<()> {
        Ok(self.kv.set_json(keys::TRANSLITERATION, &enabled).await?)
    }

    /// Remove every preference key, restoring defaults
    pub async fn reset(&self) -> CoreResult<()> {
        for key in [
            keys::FONT_SIZE,
            keys::LANGUAGE,
            keys::THEME,
            keys::AUTO_BOOKMARK,
            keys::TRANSLITERATION,
        ] {
            self.kv.remove(key).await?;
        }
        Ok(())
    }
}
