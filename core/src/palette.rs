// Source color policy
//
// Every color lookup for an energy source goes through SourcePalette so an
// unknown source id resolves to the fallback token instead of failing.

use crate::model::SourceId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Render color token (CSS variable or hex literal)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorToken(String);

impl ColorToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const GRID_COLOR: &str = "var(--secondary)";
pub const SOLAR_COLOR: &str = "var(--accent-yellow)";
pub const DIESEL_COLOR: &str = "var(--danger)";
pub const FALLBACK_COLOR: &str = "var(--text-muted)";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourcePalette {
    colors: HashMap<SourceId, ColorToken>,
    fallback: ColorToken,
}

impl SourcePalette {
    /// Palette with no known sources; everything renders in `fallback`
    pub fn empty(fallback: ColorToken) -> Self {
        Self {
            colors: HashMap::new(),
            fallback,
        }
    }

    pub fn with_color(mut self, source: impl Into<SourceId>, color: ColorToken) -> Self {
        self.insert(source, color);
        self
    }

    pub fn insert(&mut self, source: impl Into<SourceId>, color: ColorToken) {
        self.colors.insert(source.into(), color);
    }

    pub fn set_fallback(&mut self, color: ColorToken) {
        self.fallback = color;
    }

    pub fn fallback(&self) -> &ColorToken {
        &self.fallback
    }

    pub fn is_known(&self, source: &SourceId) -> bool {
        self.colors.contains_key(source)
    }

    pub fn color_for(&self, source: &SourceId) -> ColorToken {
        self.colors
            .get(source)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for SourcePalette {
    fn default() -> Self {
        Self::empty(ColorToken::new(FALLBACK_COLOR))
            .with_color("grid", ColorToken::new(GRID_COLOR))
            .with_color("solar", ColorToken::new(SOLAR_COLOR))
            .with_color("diesel", ColorToken::new(DIESEL_COLOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sources_resolve() {
        let palette = SourcePalette::default();
        assert_eq!(palette.color_for(&"Solar".into()).as_str(), SOLAR_COLOR);
        assert!(palette.is_known(&"grid".into()));
    }

    #[test]
    fn unknown_source_uses_fallback() {
        let palette = SourcePalette::default();
        assert_eq!(palette.color_for(&"wind".into()).as_str(), FALLBACK_COLOR);

        let custom = SourcePalette::empty(ColorToken::new("#999"));
        assert_eq!(custom.color_for(&"grid".into()).as_str(), "#999");
    }
}
