use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::admission::{PlanTier, TierLimits};
use crate::job::{AudioFormat, JobOptions};
use crate::supervisor::ExtractorPaths;

/// Default per-job options (`[defaults]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDefaults {
    /// Where finished files go; the caller's fallback (usually the current directory) if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    pub audio_format: AudioFormat,
    pub embed_metadata: bool,
    pub embed_thumbnail: bool,
    pub allow_playlists: bool,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            output_dir: None,
            audio_format: AudioFormat::Mp3,
            embed_metadata: true,
            embed_thumbnail: true,
            allow_playlists: false,
        }
    }
}

/// Global configuration loaded from `~/.config/adq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdqConfig {
    /// Extractor executable (yt-dlp compatible); a bare name is looked up on PATH.
    pub extractor_path: PathBuf,
    /// Transcoder handed to the extractor via `--ffmpeg-location`.
    pub encoder_path: PathBuf,
    /// Plan tier; unknown names fall back to "free".
    #[serde(default)]
    pub plan: String,
    /// Optional override of the finite tier limits.
    #[serde(default)]
    pub limits: Option<TierLimits>,
    #[serde(default)]
    pub defaults: JobDefaults,
}

impl Default for AdqConfig {
    fn default() -> Self {
        Self {
            extractor_path: PathBuf::from("yt-dlp"),
            encoder_path: PathBuf::from("ffmpeg"),
            plan: PlanTier::Free.as_str().to_string(),
            limits: None,
            defaults: JobDefaults::default(),
        }
    }
}

impl AdqConfig {
    pub fn plan_tier(&self) -> PlanTier {
        PlanTier::from_str_lossy(&self.plan)
    }

    pub fn tier_limits(&self) -> TierLimits {
        self.limits.unwrap_or_default()
    }

    pub fn extractor_paths(&self) -> ExtractorPaths {
        ExtractorPaths {
            extractor: self.extractor_path.clone(),
            encoder: self.encoder_path.clone(),
        }
    }

    /// Resolve the `[defaults]` section into concrete job options.
    pub fn job_options(&self, fallback_dir: &Path) -> JobOptions {
        let d = &self.defaults;
        JobOptions {
            output_dir: d
                .output_dir
                .clone()
                .unwrap_or_else(|| fallback_dir.to_path_buf()),
            audio_format: d.audio_format,
            embed_metadata: d.embed_metadata,
            embed_thumbnail: d.embed_thumbnail,
            allow_playlists: d.allow_playlists,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("adq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AdqConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<AdqConfig> {
    if !path.exists() {
        let default_cfg = AdqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write config {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: AdqConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
