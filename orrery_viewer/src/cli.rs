use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(about = "Token holder orrery: holders rendered as planets around a sun", version)]
pub struct Args {
    /// Feed address streaming holder snapshots (host:port)
    #[arg(long, default_value = "127.0.0.1:17471")]
    pub feed: String,

    /// When set, load holder rows from a JSON snapshot instead of the feed
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Optional customization JSON applied on top of the snapshot
    #[arg(long)]
    pub customizations: Option<PathBuf>,

    /// Token label shown in the status line until the feed names one
    #[arg(long, default_value = "HOLDERS")]
    pub token_name: String,

    /// Directory scanned for planet texture PNGs
    #[arg(long, default_value = "assets/planets")]
    pub textures: PathBuf,

    /// Font used by the overlay panels
    #[arg(long, default_value = "assets/fonts/overlay.ttf")]
    pub font: PathBuf,

    /// Optional layout preset JSON describing overlay panel sizes
    #[arg(long)]
    pub layout_preset: Option<PathBuf>,

    /// Seed for the placement scatter; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Populate the scene without opening a window, print a summary, exit
    #[arg(long)]
    pub headless: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LayoutPreset {
    #[serde(default)]
    pub status: Option<PanelPreset>,
    #[serde(default)]
    pub holders: Option<PanelPreset>,
    #[serde(default)]
    pub focus: Option<PanelPreset>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PanelPreset {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub padding_x: Option<u32>,
    #[serde(default)]
    pub padding_y: Option<u32>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl PanelPreset {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

pub fn load_layout_preset(path: &Path) -> Result<LayoutPreset> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading layout preset {}", path.display()))?;
    let preset: LayoutPreset = serde_json::from_str(&data)
        .with_context(|| format!("parsing layout preset {}", path.display()))?;
    Ok(preset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_preset_fills_missing_panels_with_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("layout.json");
        let preset_json = serde_json::json!({
            "holders": { "width": 420, "enabled": false }
        });
        fs::write(&path, preset_json.to_string()).expect("write preset");

        let preset = load_layout_preset(&path).expect("load preset");
        assert!(preset.status.is_none());
        assert!(preset.focus.is_none());
        let holders = preset.holders.expect("holders panel present");
        assert_eq!(holders.width, Some(420));
        assert_eq!(holders.height, None);
        assert!(!holders.enabled());
    }

    #[test]
    fn layout_preset_error_names_the_path() {
        let err = load_layout_preset(Path::new("does/not/exist.json"))
            .expect_err("missing file fails");
        assert!(format!("{err:#}").contains("does/not/exist.json"));
    }
}
