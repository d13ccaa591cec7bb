//! Layout settings
//!
//! Mirrors the settings collaborator's `layoutStyle` object. Every field has a
//! default, so a partial object (or `{}`) deserializes.

use crate::error::{MindmapError, Result};
use crate::models::NodeSize;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_HORIZONTAL_GAP: f64 = 100.0;
const DEFAULT_VERTICAL_GAP: f64 = 20.0;
const DEFAULT_NODE_WIDTH: f64 = 150.0;
const DEFAULT_NODE_HEIGHT: f64 = 40.0;
const DEFAULT_POSITION_EPSILON: f64 = 0.1;
const DEFAULT_DEBOUNCE_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Gap between a parent's right edge and its children
    pub horizontal_gap: f64,
    /// Padding added to every node's vertical band
    pub vertical_gap: f64,
    /// Width assumed for nodes the presentation layer has not measured yet
    pub default_width: f64,
    pub default_height: f64,
    /// Positions closer than this to the stored value are not rewritten
    pub position_epsilon: f64,
    /// Idle window for debounced relayout
    pub debounce_ms: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_gap: DEFAULT_HORIZONTAL_GAP,
            vertical_gap: DEFAULT_VERTICAL_GAP,
            default_width: DEFAULT_NODE_WIDTH,
            default_height: DEFAULT_NODE_HEIGHT,
            position_epsilon: DEFAULT_POSITION_EPSILON,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl LayoutConfig {
    /// Override only the spacing, as the settings collaborator does
    pub fn with_gaps(horizontal_gap: f64, vertical_gap: f64) -> Self {
        Self {
            horizontal_gap,
            vertical_gap,
            ..Self::default()
        }
    }

    pub fn default_size(&self) -> NodeSize {
        NodeSize::new(self.default_width, self.default_height)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("horizontalGap", self.horizontal_gap),
            ("verticalGap", self.vertical_gap),
            ("defaultWidth", self.default_width),
            ("defaultHeight", self.default_height),
            ("positionEpsilon", self.position_epsilon),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(MindmapError::config(format!("{} must be a finite number", name)));
        }

        if self.horizontal_gap < 0.0 || self.vertical_gap < 0.0 {
            return Err(MindmapError::config("gaps cannot be negative"));
        }

        if self.default_width <= 0.0 || self.default_height <= 0.0 {
            return Err(MindmapError::config(
                "default node size must be greater than 0",
            ));
        }

        if self.position_epsilon < 0.0 {
            return Err(MindmapError::config("positionEpsilon cannot be negative"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LayoutConfig::default();
        assert_eq!(config.horizontal_gap, 100.0);
        assert_eq!(config.vertical_gap, 20.0);
        assert_eq!(config.default_size(), NodeSize::new(150.0, 40.0));
        assert_eq!(config.debounce_window(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_settings_object() {
        let config: LayoutConfig =
            serde_json::from_str(r#"{"horizontalGap": 60, "verticalGap": 8}"#).unwrap();
        assert_eq!(config, LayoutConfig::with_gaps(60.0, 8.0));
        assert_eq!(config.default_width, 150.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(LayoutConfig::with_gaps(-1.0, 20.0).validate().is_err());
        assert!(LayoutConfig::with_gaps(100.0, f64::NAN).validate().is_err());

        let config = LayoutConfig {
            default_height: 0.0,
            ..LayoutConfig::default()
        };
        assert!(matches!(config.validate(), Err(MindmapError::Config(_))));
    }
}
