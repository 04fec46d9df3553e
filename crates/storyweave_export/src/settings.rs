// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export settings.
//!
//! Stored as RON (`storyweave.ron`):
//!
//! ```ron
//! ExportSettings(
//!     version: 1,
//!     title: "VISUAL NOVEL SCREENPLAY",
//!     json_title: "Visual Novel Node Sequence",
//!     format_version: "1.0",
//!     dialog_width: 50,
//!     action_width: 65,
//!     revisit_policy: PerPath,
//!     max_routes: 256,
//!     default_format: text,
//! )
//! ```

use crate::coordinator::Exporter;
use crate::render::{
    ExportFormat, RenderContext, DEFAULT_FORMAT_VERSION, DEFAULT_JSON_TITLE, DEFAULT_TITLE,
};
use crate::wrap::{ACTION_WIDTH, DIALOG_WIDTH};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storyweave_graph::{RevisitPolicy, DEFAULT_MAX_ROUTES};

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "storyweave.ron";

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Export defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Settings format version
    pub version: u32,
    /// Screenplay title line
    pub title: String,
    /// JSON metadata title
    pub json_title: String,
    /// JSON metadata version
    pub format_version: String,
    /// Dialog wrap width
    pub dialog_width: usize,
    /// Action wrap width
    pub action_width: usize,
    /// Revisit policy for route exports
    pub revisit_policy: RevisitPolicy,
    /// Most routes a route export may produce
    pub max_routes: usize,
    /// Format used when none is requested
    pub default_format: ExportFormat,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            title: DEFAULT_TITLE.to_string(),
            json_title: DEFAULT_JSON_TITLE.to_string(),
            format_version: DEFAULT_FORMAT_VERSION.to_string(),
            dialog_width: DIALOG_WIDTH,
            action_width: ACTION_WIDTH,
            revisit_policy: RevisitPolicy::default(),
            max_routes: DEFAULT_MAX_ROUTES,
            default_format: ExportFormat::default(),
        }
    }
}

impl ExportSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: ExportSettings = ron::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Settings version {} is newer than supported version {}",
                    settings.version, SETTINGS_FORMAT_VERSION
                ),
            ));
        }
        if settings.dialog_width == 0 || settings.action_width == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Wrap widths must be greater than zero",
            ));
        }
        if settings.max_routes == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "max_routes must be greater than zero",
            ));
        }

        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        let content = ron::ser::to_string_pretty(self, config).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        std::fs::write(path, content)
    }

    /// Settings file path inside a directory
    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILE_NAME)
    }

    /// Render context stamped with `generated`
    pub fn render_context(&self, generated: NaiveDateTime) -> RenderContext {
        RenderContext {
            title: self.title.clone(),
            json_title: self.json_title.clone(),
            format_version: self.format_version.clone(),
            generated,
            dialog_width: self.dialog_width,
            action_width: self.action_width,
        }
    }

    /// Exporter using the configured revisit policy and route cap
    pub fn exporter(&self) -> Exporter {
        Exporter::new(self.revisit_policy).with_max_routes(self.max_routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fixtures::generated;

    #[test]
    fn test_default_settings() {
        let settings = ExportSettings::default();
        assert_eq!(settings.version, SETTINGS_FORMAT_VERSION);
        assert_eq!(settings.dialog_width, 50);
        assert_eq!(settings.action_width, 65);
        assert_eq!(settings.render_context(generated()), RenderContext::new(generated()));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = ExportSettings::file_path(dir.path());

        let settings = ExportSettings {
            title: "MY STORY".to_string(),
            revisit_policy: RevisitPolicy::Global,
            default_format: ExportFormat::Csv,
            ..Default::default()
        };
        settings.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("ExportSettings("));
        assert_eq!(ExportSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.ron");
        std::fs::write(&path, "(dialog_width: 40, default_format: json)").unwrap();

        let settings = ExportSettings::load(&path).unwrap();
        assert_eq!(settings.dialog_width, 40);
        assert_eq!(settings.max_routes, DEFAULT_MAX_ROUTES);
        assert_eq!(settings.action_width, 65);
        assert_eq!(settings.default_format, ExportFormat::Json);
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.ron");
        std::fs::write(&path, "(version: 99)").unwrap();
        assert!(ExportSettings::load(&path).is_err());
    }

    #[test]
    fn test_zero_route_cap_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.ron");
        std::fs::write(&path, "(max_routes: 0)").unwrap();
        assert!(ExportSettings::load(&path).is_err());
    }
}
