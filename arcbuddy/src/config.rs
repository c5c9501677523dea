//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory. Calibrated
//! capture regions are the only pipeline state that persists across
//! sessions; everything else is rebuilt at startup.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geometry::ScreenRegion;

/// On-disk configuration for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Exact window titles the game is known to use.
    pub window_titles: Vec<String>,

    /// Process/app names to match when no title does.
    pub app_names: Vec<String>,

    /// Poll interval (seconds) for window detection.
    pub detect_interval_s: f32,

    /// Poll interval (seconds) for the recognition scan.
    pub scan_interval_s: f32,

    /// Acceptance threshold for icon matching (both passes).
    pub icon_accept_threshold: f32,

    /// Game-relative region showing the inspected item's icon.
    pub item_region: Option<ScreenRegion>,

    /// Game-relative region showing the event broadcast text.
    pub event_region: Option<ScreenRegion>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_titles: vec!["ARC Raiders".to_string()],
            app_names: vec![
                "ARCRaiders".to_string(),
                "PioneerClient-Win64-Shipping".to_string(),
            ],
            detect_interval_s: 2.0,
            scan_interval_s: 5.0,
            icon_accept_threshold: vision::DEFAULT_ACCEPT_THRESHOLD,
            item_region: None,
            event_region: None,
        }
    }
}

impl Config {
    /// Path to the config file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("arcbuddy.json"))
    }

    /// Load configuration from disk, falling back to defaults on missing file.
    pub fn load_or_default() -> Self {
        match Self::try_load() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from disk.
    pub fn try_load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(&path).with_context(|| format!("read {:?}", path))?;
        let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
        Ok(cfg)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(&path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_json() {
        let mut cfg = Config::default();
        cfg.item_region = Some(ScreenRegion::new(-40, 120, 96, 96));
        cfg.scan_interval_s = 1.5;

        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.item_region, cfg.item_region);
        assert_eq!(back.scan_interval_s, cfg.scan_interval_s);
        assert_eq!(back.window_titles, cfg.window_titles);
    }

    #[test]
    fn unknown_or_missing_fields_fall_back_to_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"scan_interval_s": 9.0}"#).unwrap();
        assert_eq!(cfg.scan_interval_s, 9.0);
        assert_eq!(cfg.detect_interval_s, 2.0);
        assert!(cfg.item_region.is_none());
    }
}
