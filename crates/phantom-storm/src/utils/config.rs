//! Configuration file management.
//!
//! Handles loading and saving user preferences to `~/.phantom-storm.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::{AnalyserSettings, DEFAULT_MIN_THRESHOLD, DEFAULT_NOISE_FLOOR, DEFAULT_SENSITIVITY};
use crate::error::Result;
use crate::lightning::{DEFAULT_MAX_DISTANCE, DEFAULT_SMOOTHING_FACTOR};

const DEFAULT_FRAME_RATE: f32 = 60.0;
const DEFAULT_LOG_LEVEL: &str = "info";

const CONFIG_TEMPLATE: &str = r#"# phantom-storm configuration file

# Frames analysed per second of audio (default: 60)
# frame_rate = 60.0

# Default log level when RUST_LOG is not set (default: "info")
# log_level = "info"

# Capture device used with --live (auto-saved)
# last_device = "pipewire"

# =============================================================================
# Detection
# =============================================================================

# sensitivity = 100               # Percent, scales the base threshold
# min_threshold = 100.0           # Base threshold at 100% sensitivity
# noise_floor = 8.0               # Bins at or below this are ignored

# =============================================================================
# Analyser
# =============================================================================

# fft_size = 256                  # Power of two, 128 frequency bins at 256
# smoothing_time_constant = 0.8   # 0 = no smoothing, 1 = frozen
# min_decibels = -100.0
# max_decibels = -30.0

# =============================================================================
# Lightning
# =============================================================================

# smoothing_factor = 0.04         # Subject brightness follow rate per frame
# illumination_radius = 400.0     # Flashes further than this do not light the subject
# canvas_width = 1200.0
# canvas_height = 800.0
# device_pixel_ratio = 1.0
# subject_aspect = 0.6667         # Portrait width / height
# seed = 42                       # Fixed seed for reproducible storms
"#;

/// Engine tuning with defaults resolved by the getters
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LightningConfig {
    pub sensitivity: Option<u32>,
    pub min_threshold: Option<f32>,
    pub noise_floor: Option<f32>,
    pub smoothing_factor: Option<f32>,
    pub illumination_radius: Option<f32>,
    pub canvas_width: Option<f32>,
    pub canvas_height: Option<f32>,
    pub device_pixel_ratio: Option<f32>,
    pub subject_aspect: Option<f32>,
    pub seed: Option<u64>,
}

impl LightningConfig {
    pub fn sensitivity(&self) -> u32 {
        self.sensitivity.unwrap_or(DEFAULT_SENSITIVITY)
    }
    pub fn min_threshold(&self) -> f32 {
        self.min_threshold.unwrap_or(DEFAULT_MIN_THRESHOLD)
    }
    pub fn noise_floor(&self) -> f32 {
        self.noise_floor.unwrap_or(DEFAULT_NOISE_FLOOR)
    }
    pub fn smoothing_factor(&self) -> f32 {
        self.smoothing_factor.unwrap_or(DEFAULT_SMOOTHING_FACTOR)
    }
    pub fn illumination_radius(&self) -> f32 {
        self.illumination_radius.unwrap_or(DEFAULT_MAX_DISTANCE)
    }
    pub fn canvas_width(&self) -> f32 {
        self.canvas_width.unwrap_or(1200.0)
    }
    pub fn canvas_height(&self) -> f32 {
        self.canvas_height.unwrap_or(800.0)
    }
    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio.unwrap_or(1.0)
    }
    pub fn subject_aspect(&self) -> f32 {
        self.subject_aspect.unwrap_or(2.0 / 3.0)
    }
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

#[derive(Serialize, Deserialize, Default, Debug)]
pub struct Config {
    pub frame_rate: Option<f32>,
    pub log_level: Option<String>,
    pub last_device: Option<String>,

    // Detection
    pub sensitivity: Option<u32>,
    pub min_threshold: Option<f32>,
    pub noise_floor: Option<f32>,

    // Analyser
    pub fft_size: Option<usize>,
    pub smoothing_time_constant: Option<f32>,
    pub min_decibels: Option<f32>,
    pub max_decibels: Option<f32>,

    // Lightning (flattened for simpler TOML)
    pub smoothing_factor: Option<f32>,
    pub illumination_radius: Option<f32>,
    pub canvas_width: Option<f32>,
    pub canvas_height: Option<f32>,
    pub device_pixel_ratio: Option<f32>,
    pub subject_aspect: Option<f32>,
    pub seed: Option<u64>,
}

impl Config {
    fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".phantom-storm.toml"))
    }

    /// Load from the home directory, writing the template on first run.
    /// Falls back to defaults when the file cannot be read or parsed.
    pub fn load() -> Self {
        let path = match Self::path() {
            Some(p) => p,
            None => return Self::default(),
        };

        if !path.exists() {
            match fs::write(&path, CONFIG_TEMPLATE) {
                Ok(()) => tracing::info!("created config template at {}", path.display()),
                Err(e) => tracing::warn!("could not write config template: {}", e),
            }
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::path() {
            let content = toml::to_string(self)?;
            fs::write(&path, content)?;
            tracing::debug!("config saved to {}", path.display());
        }
        Ok(())
    }

    pub fn set_device(&mut self, name: &str) -> Result<()> {
        self.last_device = Some(name.to_string());
        self.save()
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate.unwrap_or(DEFAULT_FRAME_RATE)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Get engine configuration with defaults
    pub fn lightning(&self) -> LightningConfig {
        LightningConfig {
            sensitivity: self.sensitivity,
            min_threshold: self.min_threshold,
            noise_floor: self.noise_floor,
            smoothing_factor: self.smoothing_factor,
            illumination_radius: self.illumination_radius,
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
            device_pixel_ratio: self.device_pixel_ratio,
            subject_aspect: self.subject_aspect,
            seed: self.seed,
        }
    }

    /// Analyser settings, defaults filled in (not validated here)
    pub fn analyser(&self) -> AnalyserSettings {
        let defaults = AnalyserSettings::default();
        AnalyserSettings {
            fft_size: self.fft_size.unwrap_or(defaults.fft_size),
            smoothing_time_constant: self
                .smoothing_time_constant
                .unwrap_or(defaults.smoothing_time_constant),
            min_decibels: self.min_decibels.unwrap_or(defaults.min_decibels),
            max_decibels: self.max_decibels.unwrap_or(defaults.max_decibels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = Config::from_toml_str(CONFIG_TEMPLATE).unwrap();
        let lightning = config.lightning();
        assert_eq!(lightning.sensitivity(), 100);
        assert_eq!(lightning.min_threshold(), 100.0);
        assert_eq!(lightning.noise_floor(), 8.0);
        assert_eq!(lightning.smoothing_factor(), 0.04);
        assert_eq!(lightning.illumination_radius(), 400.0);
        assert_eq!(lightning.seed(), None);
        assert_eq!(config.frame_rate(), 60.0);
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.analyser(), AnalyserSettings::default());
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let config = Config::from_toml_str(
            r#"
            sensitivity = 150
            seed = 7
            fft_size = 512
            canvas_width = 1920.0
            "#,
        )
        .unwrap();
        let lightning = config.lightning();
        assert_eq!(lightning.sensitivity(), 150);
        assert_eq!(lightning.seed(), Some(7));
        assert_eq!(lightning.canvas_width(), 1920.0);
        assert_eq!(lightning.canvas_height(), 800.0);

        let analyser = config.analyser();
        assert_eq!(analyser.fft_size, 512);
        assert_eq!(analyser.smoothing_time_constant, 0.8);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::from_toml_str("sensitivity = \"loud\"").is_err());
    }
}
