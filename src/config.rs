use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scrub::SmoothingProfile;


const CONFIG_ENV_VAR: &str = "SCRUBWAVE_CONFIG";


#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStyle {
	Bars,
	Line,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingPreset {
	Responsive,
	Gentle,
}

impl SmoothingPreset {
	pub fn profile(self) -> SmoothingProfile {
		match self {
			SmoothingPreset::Responsive => SmoothingProfile::responsive(),
			SmoothingPreset::Gentle => SmoothingProfile::gentle(),
		}
	}
}


/// Viewer settings, read once at startup.
///
/// Every field has a default so a partial settings file only overrides what it names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
	pub render_style: RenderStyle,
	pub bar_width: f32,
	pub bar_gap: f32,

	pub zoom_min: f32,
	pub zoom_max: f32,
	pub zoom_default: f32,

	pub bars_per_second: f32,
	pub drag_sensitivity: f32,
	pub smoothing: SmoothingPreset,

	pub loop_by_default: bool,
	pub preserve_pitch: bool,
}

impl Default for ViewerConfig {
	fn default() -> Self {
		ViewerConfig {
			render_style: RenderStyle::Bars,
			bar_width: 6.0,
			bar_gap: 1.0,

			zoom_min: 0.2,
			zoom_max: 2.0,
			zoom_default: 0.8,

			bars_per_second: 2.0,
			drag_sensitivity: 1.0,
			smoothing: SmoothingPreset::Responsive,

			loop_by_default: true,
			preserve_pitch: false,
		}
	}
}


impl ViewerConfig {
	/// Loads from `$SCRUBWAVE_CONFIG` if set, otherwise from the platform config directory.
	pub fn load() -> ViewerConfig {
		match Self::config_path() {
			Some(path) => Self::load_from(&path),
			None => {
				log::warn!("Could not determine a config directory, using default settings");
				ViewerConfig::default()
			}
		}
	}

	pub fn config_path() -> Option<PathBuf> {
		if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
			return Some(PathBuf::from(path));
		}

		directories::ProjectDirs::from("", "", "scrubwave")
			.map(|dirs| dirs.config_dir().join("settings.json"))
	}

	pub fn load_from(path: &Path) -> ViewerConfig {
		let contents = match std::fs::read_to_string(path) {
			Ok(contents) => contents,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				log::debug!("No settings file at {}, using defaults", path.display());
				return ViewerConfig::default();
			}
			Err(err) => {
				log::warn!("Failed to read settings from {}: {err}", path.display());
				return ViewerConfig::default();
			}
		};

		match serde_json::from_str::<ViewerConfig>(&contents) {
			Ok(config) => {
				log::info!("Loaded settings from {}", path.display());
				config.sanitized()
			}
			Err(err) => {
				log::warn!("Ignoring malformed settings file {}: {err}", path.display());
				ViewerConfig::default()
			}
		}
	}

	/// Replaces out-of-range values so the rest of the viewer can rely on them.
	pub fn sanitized(mut self) -> ViewerConfig {
		let defaults = ViewerConfig::default();

		if !(self.bar_width > 0.0) {
			self.bar_width = defaults.bar_width;
		}
		if !(self.bar_gap >= 0.0) {
			self.bar_gap = defaults.bar_gap;
		}
		if !(self.bars_per_second > 0.0) {
			self.bars_per_second = defaults.bars_per_second;
		}
		if !(self.drag_sensitivity > 0.0) {
			self.drag_sensitivity = defaults.drag_sensitivity;
		}

		if !(self.zoom_min > 0.0 && self.zoom_min <= self.zoom_max) {
			self.zoom_min = defaults.zoom_min;
			self.zoom_max = defaults.zoom_max;
		}
		self.zoom_default = self.zoom_default.clamp(self.zoom_min, self.zoom_max);

		self
	}
}
