use anyhow::{Context, Result};
use nodecanvas_core::EdgeShape;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User-tunable canvas behavior. Persisted as JSON in the platform config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    /// Width of one grid cell in unzoomed pixels.
    pub grid_width: i32,
    /// Height of one grid cell in unzoomed pixels.
    pub grid_height: i32,
    pub auto_hide_edges: bool,
    /// Edges whose endpoints are closer than this (Manhattan, pixels) are never auto-hidden.
    pub auto_hide_edge_distance_threshold: f32,
    /// Dice score above which a long edge counts as a duplicate route.
    pub auto_hide_edge_overlap_threshold: f32,
    /// Mute every edge not touching the selection while something is selected.
    pub auto_mute_by_selection: bool,
    /// Draw edges of selected nodes in distinct hues.
    pub color_selected_node_edges: bool,
    pub draw_arrow_heads: bool,
    pub layout_after_connect: bool,
    pub auto_layout_moves_other_nodes: bool,
    pub graph_annotations_locked: bool,
    /// Minimum time between two negative-coordinate expansions while dragging.
    pub expansion_throttle_ms: u64,
    pub default_edge_shape: EdgeShape,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            grid_width: 25,
            grid_height: 25,
            auto_hide_edges: true,
            auto_hide_edge_distance_threshold: 512.0,
            auto_hide_edge_overlap_threshold: 0.5,
            auto_mute_by_selection: true,
            color_selected_node_edges: true,
            draw_arrow_heads: true,
            layout_after_connect: false,
            auto_layout_moves_other_nodes: false,
            graph_annotations_locked: false,
            expansion_throttle_ms: 100,
            default_edge_shape: EdgeShape::Elbow,
        }
    }
}

impl CanvasSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nodecanvas").join("canvas.json"))
    }

    /// Load from the default location, falling back to defaults on any problem.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        tracing::info!("Loading canvas settings from {:?}", path);
        if !path.exists() {
            tracing::info!("Settings file not found, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("Failed to load canvas settings: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_path().context("no config directory on this platform")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: CanvasSettings =
            serde_json::from_str(r#"{ "auto_hide_edges": false, "grid_width": 30 }"#).unwrap();
        assert!(!settings.auto_hide_edges);
        assert_eq!(settings.grid_width, 30);
        assert_eq!(settings.grid_height, 25);
        assert_eq!(settings.auto_hide_edge_distance_threshold, 512.0);
        assert_eq!(settings.default_edge_shape, EdgeShape::Elbow);
    }

    #[test]
    fn test_save_and_load_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nodecanvas").join("canvas.json");
        let settings = CanvasSettings {
            layout_after_connect: true,
            auto_hide_edge_overlap_threshold: 0.25,
            ..CanvasSettings::default()
        };
        settings.save_to(&path)?;
        let loaded = CanvasSettings::load_from(&path)?;
        assert_eq!(loaded, settings);
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("canvas.json");
        std::fs::write(&path, "{ not json")?;
        assert!(CanvasSettings::load_from(&path).is_err());
        Ok(())
    }
}
